//! Wrong answers for multiple choice rounds
//!
//! Distractors are drawn close to the shown time so that the choice
//! actually tests reading the clock: hour-only levels vary the hour,
//! half-hour levels vary the hour and/or the half-hour slot, and any
//! other resolution falls back to a random hour on a five-minute step.

use super::time::{ClockTime, Resolution, random_hour};

/// Number of distinct hour/minute pairs a resolution can offer besides the correct one
fn capacity(resolution: Resolution) -> usize {
    match resolution {
        Resolution::HourOnly => 11,
        Resolution::HalfHour => 23,
        Resolution::FiveMinute | Resolution::AnyMinute | Resolution::WithSeconds => 143,
    }
}

fn other_hour(hours: u8, rng: &mut fastrand::Rng) -> u8 {
    loop {
        let candidate = random_hour(rng);
        if candidate != hours {
            return candidate;
        }
    }
}

fn candidate(correct: ClockTime, resolution: Resolution, rng: &mut fastrand::Rng) -> (u8, u8) {
    let (hours, minutes) = (correct.hours(), correct.minutes());

    match resolution {
        Resolution::HourOnly => (other_hour(hours, rng), 0),
        Resolution::HalfHour => {
            let change_hour = rng.f64() < 0.7;
            let change_minute = rng.f64() < 0.5;

            let wrong_hours = if change_hour {
                other_hour(hours, rng)
            } else {
                hours
            };
            let wrong_minutes = if change_minute || !change_hour {
                if minutes == 0 { 30 } else { 0 }
            } else {
                minutes
            };

            (wrong_hours, wrong_minutes)
        }
        Resolution::FiveMinute | Resolution::AnyMinute | Resolution::WithSeconds => loop {
            let pair = (random_hour(rng), rng.u8(0..12) * 5);
            if pair != (hours, minutes) {
                break pair;
            }
        },
    }
}

/// Produces `count` distinct wrong answers for `correct`
///
/// No returned time shares its hour and minute with `correct` or with
/// another returned time. Distractors never carry seconds. When `count`
/// exceeds what the resolution can offer, the count is clamped.
pub fn generate_wrong_answers(
    correct: ClockTime,
    resolution: Resolution,
    count: usize,
    rng: &mut fastrand::Rng,
) -> Vec<ClockTime> {
    let available = capacity(resolution);
    let count = if count > available {
        log::warn!("{resolution:?} offers only {available} distractors, {count} requested");
        available
    } else {
        count
    };

    let mut wrong_answers: Vec<ClockTime> = Vec::with_capacity(count);

    while wrong_answers.len() < count {
        let (hours, minutes) = candidate(correct, resolution, rng);
        let Ok(wrong) = ClockTime::new(hours, minutes, 0) else {
            continue;
        };

        let duplicate = wrong.same_minute(&correct)
            || wrong_answers.iter().any(|accepted| accepted.same_minute(&wrong));
        if !duplicate {
            wrong_answers.push(wrong);
        }
    }

    wrong_answers
}
