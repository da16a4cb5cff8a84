//! Round scoring
//!
//! A guess earns up to [`EXACT_MATCH_POINTS`] for accuracy, losing
//! [`MINUTE_PENALTY`] points per minute it is off (measured around the
//! clock face, so 12 and 1 are one hour apart). On levels with seconds a
//! small slack in the seconds still counts as a full match. A scoring guess
//! made in the first half of the guess window earns a flat [`SPEED_BONUS`].

use std::time::Duration;

use serde::Serialize;

use super::time::ClockTime;
use crate::constants::scoring::{
    EXACT_MATCH_POINTS, MINUTE_PENALTY, SECONDS_TOLERANCE, SPEED_BONUS, SPEED_BONUS_THRESHOLD,
};

/// Points earned by a single guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    /// Points including any speed bonus
    pub points: u64,
    /// Whether the guess matched exactly at the level's precision
    pub is_exact: bool,
}

impl Score {
    /// The score of a round where no guess was made
    pub const NONE: Self = Self {
        points: 0,
        is_exact: false,
    };
}

fn accuracy(correct: ClockTime, guess: ClockTime, includes_seconds: bool) -> Score {
    let hour_diff = u64::from(correct.hours().abs_diff(guess.hours()));
    let hour_diff = hour_diff.min(12 - hour_diff);
    let minute_diff = u64::from(correct.minutes().abs_diff(guess.minutes()));

    if hour_diff == 0 && minute_diff == 0 {
        if !includes_seconds {
            return Score {
                points: EXACT_MATCH_POINTS,
                is_exact: true,
            };
        }

        let second_diff = u64::from(correct.seconds().abs_diff(guess.seconds()));
        if second_diff <= SECONDS_TOLERANCE {
            Score {
                points: EXACT_MATCH_POINTS,
                is_exact: second_diff == 0,
            }
        } else {
            Score {
                points: EXACT_MATCH_POINTS.saturating_sub(second_diff),
                is_exact: false,
            }
        }
    } else {
        let total_minute_diff = hour_diff * 60 + minute_diff;
        Score {
            points: EXACT_MATCH_POINTS.saturating_sub(total_minute_diff * MINUTE_PENALTY),
            is_exact: false,
        }
    }
}

/// Scores `guess` against `correct`
///
/// `guess` is `None` when the guess window ran out; `elapsed` is `None`
/// when no guess time was recorded, which never earns the speed bonus.
pub fn score(
    correct: ClockTime,
    guess: Option<ClockTime>,
    elapsed: Option<Duration>,
    max_guess_time: Duration,
    includes_seconds: bool,
) -> Score {
    let Some(guess) = guess else {
        return Score::NONE;
    };

    let mut score = accuracy(correct, guess, includes_seconds);

    let fast = elapsed.is_some_and(|elapsed| {
        elapsed.as_secs_f64() < max_guess_time.as_secs_f64() * SPEED_BONUS_THRESHOLD
    });
    if fast && score.points > 0 {
        score.points += SPEED_BONUS;
    }

    score
}
