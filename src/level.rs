//! Level definitions
//!
//! A [`LevelTable`] is the fixed, ordered list of levels supplied at
//! startup. Each [`LevelConfig`] names how long the clock is shown, how
//! long the player has to answer, how answers are entered and at what
//! [`Resolution`] times are drawn. Tables are validated once on
//! construction and are immutable afterwards.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    clock::time::Resolution,
    constants::{
        level::{
            MAX_DESCRIPTION_LENGTH, MAX_GUESS_TIME, MAX_LEVEL_COUNT, MAX_NAME_LENGTH,
            MAX_ROUND_COUNT, MAX_SHOW_TIME, MIN_GUESS_TIME, MIN_SHOW_TIME,
        },
        scoring::{EXACT_MATCH_POINTS, SPEED_BONUS},
    },
};

/// Identifier of a level; tables number their levels from 1
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct LevelId(u8);

impl LevelId {
    /// Wraps a raw level number
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// The raw level number
    pub fn get(self) -> u8 {
        self.0
    }
}

/// How the player enters a guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// Pick one of several candidate times
    MultipleChoice,
    /// Type hours, minutes and (when applicable) seconds
    Typed,
}

type ValidationResult = garde::Result;

fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    field: &'static str,
    val: &Duration,
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) && val.subsec_nanos() == 0 {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "{field} is outside of the bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

fn validate_show_time(val: &Duration) -> ValidationResult {
    validate_duration::<MIN_SHOW_TIME, MAX_SHOW_TIME>("show_time", val)
}

fn validate_guess_time(val: &Duration) -> ValidationResult {
    validate_duration::<MIN_GUESS_TIME, MAX_GUESS_TIME>("guess_time", val)
}

/// Configuration of a single level
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    /// Position of the level in its table
    #[garde(skip)]
    id: LevelId,
    /// Short name shown on the level select screen
    #[garde(length(min = 1, max = MAX_NAME_LENGTH))]
    name: String,
    /// One line explaining what the level practises
    #[garde(length(max = MAX_DESCRIPTION_LENGTH))]
    #[serde(default)]
    description: String,
    /// How long the clock is visible before guessing starts
    #[garde(custom(|v, _| validate_show_time(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    show_time: Duration,
    /// How long the player has to guess
    #[garde(custom(|v, _| validate_guess_time(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    guess_time: Duration,
    /// How guesses are entered
    #[garde(skip)]
    input_mode: InputMode,
    /// Granularity of the times shown
    #[garde(skip)]
    resolution: Resolution,
    /// Cumulative score needed to pass
    #[garde(skip)]
    pass_score: u64,
    /// Number of rounds played
    #[garde(range(min = 1, max = MAX_ROUND_COUNT))]
    round_count: usize,
}

impl LevelConfig {
    /// Creates a level configuration; validation happens when it joins a [`LevelTable`]
    pub fn new(
        id: LevelId,
        name: impl Into<String>,
        show_time: Duration,
        guess_time: Duration,
        input_mode: InputMode,
        resolution: Resolution,
        pass_score: u64,
        round_count: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            show_time,
            guess_time,
            input_mode,
            resolution,
            pass_score,
            round_count,
        }
    }

    /// Sets the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Level identifier
    pub fn id(&self) -> LevelId {
        self.id
    }

    /// Level name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Time the clock is shown each round
    pub fn show_time(&self) -> Duration {
        self.show_time
    }

    /// Time allowed for each guess
    pub fn guess_time(&self) -> Duration {
        self.guess_time
    }

    /// How guesses are entered
    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    /// Granularity of the times shown
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Whether guesses are judged to the second
    pub fn includes_seconds(&self) -> bool {
        self.resolution.includes_seconds()
    }

    /// Score needed to pass
    pub fn pass_score(&self) -> u64 {
        self.pass_score
    }

    /// Rounds per run
    pub fn round_count(&self) -> usize {
        self.round_count
    }

    /// Highest cumulative score a run of this level can reach
    pub fn max_score(&self) -> u64 {
        self.round_count as u64 * (EXACT_MATCH_POINTS + SPEED_BONUS)
    }
}

/// Errors raised while loading a level table
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The table is not valid JSON for a list of levels
    #[error("level table could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    /// A level breaks one of the field limits
    #[error("level table is invalid: {0}")]
    Invalid(#[from] garde::Report),
    /// Level ids must run 1, 2, 3... in table order
    #[error("level ids must be numbered from 1 in order")]
    NonSequentialIds,
    /// The pass score cannot be reached within the level's rounds
    #[error("level {0} cannot be passed")]
    UnreachablePassScore(LevelId),
}

/// The ordered, validated list of levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[serde(transparent)]
pub struct LevelTable {
    #[garde(length(min = 1, max = MAX_LEVEL_COUNT), dive)]
    levels: Vec<LevelConfig>,
}

impl LevelTable {
    /// Validates and wraps a list of levels
    ///
    /// # Errors
    ///
    /// * `ConfigError::Invalid` - a level breaks a field limit, or the list is empty or too long
    /// * `ConfigError::NonSequentialIds` - ids are not `1..=n` in order
    /// * `ConfigError::UnreachablePassScore` - a pass score exceeds the level's maximum
    pub fn new(levels: Vec<LevelConfig>) -> Result<Self, ConfigError> {
        let table = Self { levels };
        table.validate()?;

        if !table
            .levels
            .iter()
            .enumerate()
            .all(|(index, level)| usize::from(level.id.get()) == index + 1)
        {
            return Err(ConfigError::NonSequentialIds);
        }

        if let Some(level) = table
            .levels
            .iter()
            .find(|level| level.pass_score > level.max_score())
        {
            return Err(ConfigError::UnreachablePassScore(level.id));
        }

        Ok(table)
    }

    /// Parses a JSON array of levels and validates it
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed JSON, otherwise as [`LevelTable::new`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Looks up a level by id
    pub fn get(&self, id: LevelId) -> Option<&LevelConfig> {
        usize::from(id.get())
            .checked_sub(1)
            .and_then(|index| self.levels.get(index))
    }

    /// The first level, which starts unlocked
    pub fn first(&self) -> &LevelConfig {
        &self.levels[0]
    }

    /// The level unlocked by passing `id`, if any
    pub fn next_after(&self, id: LevelId) -> Option<&LevelConfig> {
        self.get(LevelId(id.get().checked_add(1)?))
    }

    /// Iterates levels in order
    pub fn iter(&self) -> impl Iterator<Item = &LevelConfig> {
        self.levels.iter()
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always `false`; a table holds at least one level
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl<'de> Deserialize<'de> for LevelTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let levels = Vec::<LevelConfig>::deserialize(deserializer)?;
        Self::new(levels).map_err(serde::de::Error::custom)
    }
}

impl Default for LevelTable {
    /// The five standard levels, from reading the hour hand to reading seconds
    fn default() -> Self {
        let level = |id: u8,
                     name: &str,
                     description: &str,
                     show: u64,
                     guess: u64,
                     input_mode: InputMode,
                     resolution: Resolution| {
            LevelConfig::new(
                LevelId(id),
                name,
                Duration::from_secs(show),
                Duration::from_secs(guess),
                input_mode,
                resolution,
                700,
                10,
            )
            .with_description(description)
        };

        Self {
            levels: vec![
                level(
                    1,
                    "Beginner",
                    "Read the hour hand position",
                    10,
                    20,
                    InputMode::MultipleChoice,
                    Resolution::HourOnly,
                ),
                level(
                    2,
                    "Easy",
                    "Hours and half-hours",
                    8,
                    15,
                    InputMode::MultipleChoice,
                    Resolution::HalfHour,
                ),
                level(
                    3,
                    "Intermediate",
                    "Minutes in 5-minute increments",
                    6,
                    12,
                    InputMode::Typed,
                    Resolution::FiveMinute,
                ),
                level(
                    4,
                    "Advanced",
                    "Any minute position",
                    4,
                    10,
                    InputMode::Typed,
                    Resolution::AnyMinute,
                ),
                level(
                    5,
                    "Expert",
                    "Include seconds",
                    3,
                    8,
                    InputMode::Typed,
                    Resolution::WithSeconds,
                ),
            ],
        }
    }
}
