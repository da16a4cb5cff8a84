//! Per-level progress
//!
//! The engine never persists anything itself. It talks to a
//! [`ProgressStore`] to learn which levels are unlocked and to record the
//! score of every finished run. [`MemoryProgress`] is the in-memory store
//! used for guest play; it serializes to JSON so a host can keep it around.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::level::{LevelId, LevelTable};

/// Failures of a progress or leaderboard collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StoreError {
    /// The backing store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store knows nothing about this level
    #[error("unknown level {0}")]
    UnknownLevel(LevelId),
}

/// Progress on one level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// Whether the level was ever passed
    pub completed: bool,
    /// Best score recorded
    pub high_score: u64,
    /// Whether the level may be started
    pub unlocked: bool,
}

/// What recording a score meant for the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    /// The score beats the previous best
    pub is_new_high_score: bool,
    /// The score reaches the level's pass score
    pub is_passing: bool,
}

/// Collaborator owning the player's progress
pub trait ProgressStore {
    /// Reads the progress on `level`
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot answer.
    fn progress(&self, level: LevelId) -> Result<LevelProgress, StoreError>;

    /// Records the score of a finished run of `level`
    ///
    /// Passing unlocks the following level. Unlocking is never revoked.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if nothing could be recorded.
    fn record_level_result(
        &mut self,
        level: LevelId,
        score: u64,
    ) -> Result<RecordOutcome, StoreError>;
}

/// In-memory progress for a level table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryProgress {
    levels: BTreeMap<LevelId, LevelProgress>,
    pass_scores: BTreeMap<LevelId, u64>,
    total_points: u64,
}

impl MemoryProgress {
    /// Fresh progress with only the first level unlocked
    pub fn new(table: &LevelTable) -> Self {
        let first = table.first().id();
        Self {
            levels: table
                .iter()
                .map(|level| {
                    (
                        level.id(),
                        LevelProgress {
                            unlocked: level.id() == first,
                            ..LevelProgress::default()
                        },
                    )
                })
                .collect(),
            pass_scores: table
                .iter()
                .map(|level| (level.id(), level.pass_score()))
                .collect(),
            total_points: 0,
        }
    }

    /// Sum of every score ever recorded
    pub fn total_points(&self) -> u64 {
        self.total_points
    }

    /// Number of levels passed at least once
    pub fn completed_count(&self) -> usize {
        self.levels.values().filter(|p| p.completed).count()
    }
}

impl ProgressStore for MemoryProgress {
    fn progress(&self, level: LevelId) -> Result<LevelProgress, StoreError> {
        self.levels
            .get(&level)
            .copied()
            .ok_or(StoreError::UnknownLevel(level))
    }

    fn record_level_result(
        &mut self,
        level: LevelId,
        score: u64,
    ) -> Result<RecordOutcome, StoreError> {
        let pass_score = *self
            .pass_scores
            .get(&level)
            .ok_or(StoreError::UnknownLevel(level))?;
        let progress = self
            .levels
            .get_mut(&level)
            .ok_or(StoreError::UnknownLevel(level))?;

        let outcome = RecordOutcome {
            is_new_high_score: score > progress.high_score,
            is_passing: score >= pass_score,
        };

        progress.high_score = progress.high_score.max(score);
        progress.completed |= outcome.is_passing;
        self.total_points += score;

        if outcome.is_passing {
            if let Some((next, progress)) = self.levels.range_mut(level..).nth(1) {
                if !progress.unlocked {
                    log::debug!("level {next} unlocked");
                }
                progress.unlocked = true;
            }
        }

        Ok(outcome)
    }
}
