//! Player identity
//!
//! Members are identified by a [`PlayerId`] and shown on leaderboards under
//! a [`DisplayName`]. Names are trimmed, length limited and filtered for
//! inappropriate content before they are accepted.

use std::{fmt::Display, str::FromStr};

use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::display_name::MAX_LENGTH;

/// A unique identifier for a signed in player
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Creates a new random player ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PlayerId {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Errors that can occur when validating a display name
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

/// A validated, trimmed name shown on leaderboards
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validates and trims a requested name
    ///
    /// # Errors
    ///
    /// * `Error::Empty` - Name is empty after trimming whitespace
    /// * `Error::TooLong` - Trimmed name has more characters than the limit
    /// * `Error::Sinful` - Name contains inappropriate content
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = rustrict::trim_whitespace(name);
        if name.is_empty() {
            return Err(Error::Empty);
        }
        if name.chars().count() > MAX_LENGTH {
            return Err(Error::TooLong);
        }
        if name.is_inappropriate() {
            return Err(Error::Sinful);
        }
        Ok(Self(name.to_owned()))
    }

    /// The name as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DisplayName {
    fn default() -> Self {
        Self("Player".to_owned())
    }
}

impl Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DisplayName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}
