//! End of level aggregation
//!
//! Everything here is a pure function of a level's configuration and the
//! results of its rounds, so the same run always yields the same verdict.

use serde::{Deserialize, Serialize};

use crate::{
    constants::scoring::STAR_SCALE,
    level::{LevelConfig, LevelId},
    round::RoundResult,
};

/// Star thresholds as a share of [`STAR_SCALE`], best first
const STAR_THRESHOLDS: [(f64, u8); 5] = [(0.9, 5), (0.8, 4), (0.7, 3), (0.5, 2), (0.3, 1)];

/// Star rating, 0 to 5, for a cumulative score
pub fn stars(total_score: u64) -> u8 {
    let ratio = total_score as f64 / STAR_SCALE as f64;
    STAR_THRESHOLDS
        .iter()
        .find(|(threshold, _)| ratio >= *threshold)
        .map_or(0, |(_, stars)| *stars)
}

/// Final verdict of a level run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOutcome {
    /// Sum of all round scores
    pub total_score: u64,
    /// Whether the pass score was reached
    pub passed: bool,
    /// Star rating
    pub stars: u8,
}

impl LevelOutcome {
    /// Aggregates the results of a run
    pub fn compute(config: &LevelConfig, results: &[RoundResult]) -> Self {
        let total_score = results.iter().map(RoundResult::score).sum();
        Self {
            total_score,
            passed: total_score >= config.pass_score(),
            stars: stars(total_score),
        }
    }
}

/// One line of the per-round breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundBreakdown {
    /// Round number, starting at 1
    pub round: usize,
    /// The time that was shown
    pub correct: String,
    /// The time guessed, or `--` when time ran out
    pub guessed: String,
    /// Points earned
    pub points: u64,
    /// Whether the guess was exact
    pub is_exact: bool,
}

/// Everything shown on the summary screen after a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    /// Level that was played
    pub level: LevelId,
    /// Per-round breakdown in play order
    pub rounds: Vec<RoundBreakdown>,
    /// Score, pass/fail and stars
    pub outcome: LevelOutcome,
    /// Whether the score beats the previous best
    pub is_new_high_score: bool,
    /// Level the player can move on to, when passed and one exists
    pub next_level: Option<LevelId>,
}

impl LevelSummary {
    /// Builds the summary of a finished run
    ///
    /// `previous_high_score` is the best score on record before this run,
    /// or `None` when it could not be determined; in that case the run is
    /// never reported as a new high score.
    pub fn new(
        config: &LevelConfig,
        results: &[RoundResult],
        previous_high_score: Option<u64>,
        next_level: Option<LevelId>,
    ) -> Self {
        let with_seconds = config.includes_seconds();
        let outcome = LevelOutcome::compute(config, results);

        Self {
            level: config.id(),
            rounds: results
                .iter()
                .enumerate()
                .map(|(index, result)| RoundBreakdown {
                    round: index + 1,
                    correct: result.correct_time().format(with_seconds),
                    guessed: result
                        .guessed_time()
                        .map_or_else(|| "--".to_owned(), |t| t.format(with_seconds)),
                    points: result.score(),
                    is_exact: result.is_exact(),
                })
                .collect(),
            outcome,
            is_new_high_score: previous_high_score
                .is_some_and(|previous| outcome.total_score > previous),
            next_level: next_level.filter(|_| outcome.passed),
        }
    }
}
