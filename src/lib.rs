//! # Timeteller
//!
//! Core logic of a clock reading game. A level shows an analog clock for a
//! few seconds, hides it, and asks the player what time it showed, either by
//! picking among candidates or by typing the time. Levels get harder as the
//! clock gets finer (whole hours down to seconds) and the countdowns shorter.
//!
//! The crate owns the rules: time generation, distractors, scoring, the
//! round state machine, end of level aggregation and progression. Timers,
//! persistence and rendering belong to the host, which plugs in through
//! [`countdown::Scheduler`], [`progress::ProgressStore`] and
//! [`leaderboard::LeaderboardStore`].

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use derive_where::derive_where;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub mod clock;
pub mod constants;
pub mod countdown;
pub mod leaderboard;
pub mod level;
pub mod player;
pub mod progress;
pub mod round;
pub mod session;
pub mod summary;

/// A truncated vector that maintains the exact count while limiting displayed items
///
/// Leaderboards use it to show the best few entries together with how many
/// entries the board holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derive_where(Default)]
pub struct TruncatedVec<T> {
    /// The exact total count of items
    exact_count: usize,
    /// The truncated list of items (up to the limit)
    items: Vec<T>,
}

impl<T: Clone> TruncatedVec<T> {
    /// Creates a new truncated vector from an iterator
    ///
    /// # Arguments
    ///
    /// * `list` - An iterator over items to include
    /// * `limit` - Maximum number of items to include in the truncated vector
    /// * `exact_count` - The exact total count of items (may be larger than limit)
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let items = list.take(limit).collect_vec();
        Self { exact_count, items }
    }

    /// Maps a function over the items in the truncated vector
    pub fn map<F, U>(self, f: F) -> TruncatedVec<U>
    where
        F: Fn(T) -> U,
    {
        TruncatedVec {
            exact_count: self.exact_count,
            items: self.items.into_iter().map(f).collect_vec(),
        }
    }

    /// Returns the exact count of items
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// Returns the truncated items
    pub fn items(&self) -> &[T] {
        &self.items
    }
}
