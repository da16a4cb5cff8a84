//! Configuration constants for the clock-reading game
//!
//! This module contains the scoring parameters and configuration limits
//! used throughout the engine so that level tables, scoring and the
//! leaderboard all agree on the same boundaries.

/// Scoring parameters applied to every round
pub mod scoring {
    /// Points awarded for a guess that matches the hour and minute exactly
    pub const EXACT_MATCH_POINTS: u64 = 100;
    /// Points deducted per minute of (wrap-adjusted) difference
    pub const MINUTE_PENALTY: u64 = 10;
    /// Flat bonus for a scoring guess made in the first part of the guess window
    pub const SPEED_BONUS: u64 = 20;
    /// Fraction of the guess window inside which the speed bonus applies
    pub const SPEED_BONUS_THRESHOLD: f64 = 0.5;
    /// Seconds of slack still scored as a full match on levels with seconds
    pub const SECONDS_TOLERANCE: u64 = 5;
    /// Score the star rating is measured against
    pub const STAR_SCALE: u64 = 1000;
}

/// Level table limits
pub mod level {
    /// Maximum number of levels in a table
    pub const MAX_LEVEL_COUNT: usize = 12;
    /// Maximum length of a level name
    pub const MAX_NAME_LENGTH: usize = 40;
    /// Maximum length of a level description
    pub const MAX_DESCRIPTION_LENGTH: usize = 200;
    /// Minimum time in seconds the clock is shown
    pub const MIN_SHOW_TIME: u64 = 0;
    /// Maximum time in seconds the clock is shown
    pub const MAX_SHOW_TIME: u64 = 60;
    /// Minimum time in seconds allowed for a guess
    pub const MIN_GUESS_TIME: u64 = 1;
    /// Maximum time in seconds allowed for a guess
    pub const MAX_GUESS_TIME: u64 = 240;
    /// Maximum number of rounds in a level
    pub const MAX_ROUND_COUNT: usize = 50;
}

/// Multiple choice candidate set
pub mod choices {
    /// Number of wrong answers shown next to the correct one
    pub const DISTRACTOR_COUNT: usize = 3;
}

/// Leaderboard limits
pub mod leaderboard {
    /// Number of entries kept per level
    pub const MAX_ENTRIES: usize = 10;
}

/// Player display name limits
pub mod display_name {
    /// Maximum length of a trimmed display name in characters
    pub const MAX_LENGTH: usize = 30;
}
