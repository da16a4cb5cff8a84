//! Per-level leaderboards
//!
//! Members who beat their own best score on a level submit it to a
//! [`LeaderboardStore`]. Each player holds at most one entry per level, a
//! board keeps only the best [`MAX_ENTRIES`] entries, and equal scores keep
//! the order in which they were submitted.

use std::{cmp::Reverse, collections::HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use web_time::SystemTime;

use crate::{
    TruncatedVec,
    constants::leaderboard::MAX_ENTRIES,
    level::LevelId,
    player::{DisplayName, PlayerId},
    progress::StoreError,
};

/// One line of a leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Who submitted the score
    pub player: PlayerId,
    /// Name shown for the player at submission time
    pub display_name: DisplayName,
    /// Total score of the run
    pub score: u64,
    /// When the score was submitted
    pub submitted_at: SystemTime,
}

/// Collaborator owning the shared leaderboards
pub trait LeaderboardStore {
    /// Submits `score` for `player` on `level`, replacing their earlier entry
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the score could not be stored.
    fn submit_score(
        &mut self,
        level: LevelId,
        player: PlayerId,
        display_name: &DisplayName,
        score: u64,
    ) -> Result<(), StoreError>;

    /// Best entries of `level`, highest first
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the board could not be read.
    fn fetch_top(
        &self,
        level: LevelId,
        limit: usize,
    ) -> Result<TruncatedVec<LeaderboardEntry>, StoreError>;
}

/// Leaderboards kept in memory
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemoryLeaderboard {
    boards: HashMap<LevelId, Vec<LeaderboardEntry>>,
}

impl MemoryLeaderboard {
    /// Creates empty leaderboards
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardStore for MemoryLeaderboard {
    fn submit_score(
        &mut self,
        level: LevelId,
        player: PlayerId,
        display_name: &DisplayName,
        score: u64,
    ) -> Result<(), StoreError> {
        let board = self.boards.entry(level).or_default();

        let entries = board
            .drain(..)
            .filter(|entry| entry.player != player)
            .chain(std::iter::once(LeaderboardEntry {
                player,
                display_name: display_name.clone(),
                score,
                submitted_at: SystemTime::now(),
            }))
            .sorted_by_key(|entry| Reverse(entry.score))
            .take(MAX_ENTRIES)
            .collect_vec();
        *board = entries;

        log::debug!("{display_name} submitted {score} on level {level}");
        Ok(())
    }

    fn fetch_top(
        &self,
        level: LevelId,
        limit: usize,
    ) -> Result<TruncatedVec<LeaderboardEntry>, StoreError> {
        Ok(self.boards.get(&level).map_or_else(TruncatedVec::default, |board| {
            TruncatedVec::new(board.iter().cloned(), limit, board.len())
        }))
    }
}
