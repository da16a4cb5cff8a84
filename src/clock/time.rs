//! Clock times, resolutions and random time generation
//!
//! A [`ClockTime`] is always a valid reading of a 12-hour analogue clock.
//! The [`Resolution`] of a level decides which minute and second values
//! can appear, both when generating a time to show and when judging how
//! precise the player is expected to be.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The granularity of valid minute and second values for a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Whole hours only
    HourOnly,
    /// Whole and half hours
    HalfHour,
    /// Five minute steps
    FiveMinute,
    /// Any minute
    AnyMinute,
    /// Any minute plus a second hand
    WithSeconds,
}

impl Resolution {
    /// Whether times at this resolution carry meaningful seconds
    pub fn includes_seconds(self) -> bool {
        matches!(self, Self::WithSeconds)
    }

    /// Whether `time` can be produced at this resolution
    pub fn allows(self, time: ClockTime) -> bool {
        let minutes_ok = match self {
            Self::HourOnly => time.minutes == 0,
            Self::HalfHour => time.minutes == 0 || time.minutes == 30,
            Self::FiveMinute => time.minutes % 5 == 0,
            Self::AnyMinute | Self::WithSeconds => true,
        };

        minutes_ok && (self.includes_seconds() || time.seconds == 0)
    }
}

/// The field of a typed guess that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum Field {
    /// The hour field
    #[display("hours")]
    Hours,
    /// The minute field
    #[display("minutes")]
    Minutes,
    /// The second field
    #[display("seconds")]
    Seconds,
}

/// Errors produced when building a time from player input
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputError {
    /// The field does not contain a whole number
    #[error("{0} is not a number")]
    NotANumber(Field),
    /// The field is a number but outside the clock face
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        /// Offending field
        field: Field,
        /// Smallest accepted value
        min: u8,
        /// Largest accepted value
        max: u8,
    },
}

/// A reading of a 12-hour analogue clock
///
/// Hours are in `1..=12`, minutes and seconds in `0..=59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawClockTime")]
pub struct ClockTime {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

#[derive(Deserialize)]
struct RawClockTime {
    hours: u8,
    minutes: u8,
    #[serde(default)]
    seconds: u8,
}

impl TryFrom<RawClockTime> for ClockTime {
    type Error = InputError;

    fn try_from(raw: RawClockTime) -> Result<Self, Self::Error> {
        Self::new(raw.hours, raw.minutes, raw.seconds)
    }
}

/// Rotation of each clock hand in degrees, clockwise from twelve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandAngles {
    /// Hour hand, including its drift through the hour
    pub hour: f64,
    /// Minute hand
    pub minute: f64,
    /// Second hand
    pub second: f64,
}

fn check_range(field: Field, value: i64, min: u8, max: u8) -> Result<u8, InputError> {
    if (i64::from(min)..=i64::from(max)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(InputError::OutOfRange { field, min, max })
    }
}

fn parse_field(field: Field, text: &str, min: u8, max: u8) -> Result<u8, InputError> {
    let value = text
        .trim()
        .parse::<i64>()
        .map_err(|_| InputError::NotANumber(field))?;
    check_range(field, value, min, max)
}

impl ClockTime {
    /// Builds a time after checking every field against the clock face
    ///
    /// # Errors
    ///
    /// Returns `InputError::OutOfRange` naming the first field outside its range.
    pub fn new(hours: u8, minutes: u8, seconds: u8) -> Result<Self, InputError> {
        Ok(Self {
            hours: check_range(Field::Hours, hours.into(), 1, 12)?,
            minutes: check_range(Field::Minutes, minutes.into(), 0, 59)?,
            seconds: check_range(Field::Seconds, seconds.into(), 0, 59)?,
        })
    }

    /// Parses the text fields of a typed guess
    ///
    /// A missing or blank seconds field reads as zero.
    ///
    /// # Errors
    ///
    /// * `InputError::NotANumber` - a field is not a whole number
    /// * `InputError::OutOfRange` - a field is outside the clock face
    pub fn parse_typed(
        hours: &str,
        minutes: &str,
        seconds: Option<&str>,
    ) -> Result<Self, InputError> {
        let hours = parse_field(Field::Hours, hours, 1, 12)?;
        let minutes = parse_field(Field::Minutes, minutes, 0, 59)?;
        let seconds = match seconds.map(str::trim) {
            None | Some("") => 0,
            Some(text) => parse_field(Field::Seconds, text, 0, 59)?,
        };

        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }

    /// Hour on the clock face, `1..=12`
    pub fn hours(&self) -> u8 {
        self.hours
    }

    /// Minutes past the hour
    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    /// Seconds past the minute
    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    /// The same reading with the seconds dropped
    pub fn without_seconds(self) -> Self {
        Self { seconds: 0, ..self }
    }

    /// Whether hour and minute agree, ignoring seconds
    pub fn same_minute(&self, other: &Self) -> bool {
        self.hours == other.hours && self.minutes == other.minutes
    }

    /// Angles of the three hands for drawing the clock
    pub fn hand_angles(&self) -> HandAngles {
        let minutes = f64::from(self.minutes);
        HandAngles {
            hour: f64::from(self.hours % 12) * 30. + minutes * 0.5,
            minute: minutes * 6.,
            second: f64::from(self.seconds) * 6.,
        }
    }

    /// Renders `H:MM`, or `H:MM:SS` when `with_seconds` is set
    pub fn format(&self, with_seconds: bool) -> String {
        if with_seconds {
            format!("{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
        } else {
            self.to_string()
        }
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:02}", self.hours, self.minutes)
    }
}

/// Draws a uniformly random clock hour
pub(crate) fn random_hour(rng: &mut fastrand::Rng) -> u8 {
    rng.u8(1..=12)
}

/// Generates a random time whose minutes and seconds fit `resolution`
pub fn generate(resolution: Resolution, rng: &mut fastrand::Rng) -> ClockTime {
    let hours = random_hour(rng);
    let minutes = match resolution {
        Resolution::HourOnly => 0,
        Resolution::HalfHour => {
            if rng.bool() {
                0
            } else {
                30
            }
        }
        Resolution::FiveMinute => rng.u8(0..12) * 5,
        Resolution::AnyMinute | Resolution::WithSeconds => rng.u8(0..60),
    };
    let seconds = if resolution.includes_seconds() {
        rng.u8(0..60)
    } else {
        0
    };

    ClockTime {
        hours,
        minutes,
        seconds,
    }
}
