//! A player's session with the game
//!
//! A [`Session`] ties the level table, the player's identity and the two
//! persistence collaborators together. It decides which levels may be
//! started, and once a run has ended it records the result, updates the
//! leaderboard and builds the [`LevelSummary`].
//!
//! Collaborator failures never reach the player: they are logged, and the
//! summary of the run is produced from what is known.

use serde::Serialize;
use thiserror::Error;
use web_time::Instant;

use crate::{
    TruncatedVec,
    countdown::Scheduler,
    leaderboard::{LeaderboardEntry, LeaderboardStore},
    level::{LevelId, LevelTable},
    player::{self, DisplayName, PlayerId},
    progress::ProgressStore,
    round::LevelRunState,
    summary::LevelSummary,
};

/// Who is playing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Player {
    /// Anonymous play; nothing is sent to the leaderboard
    Guest,
    /// A signed in player
    Member {
        /// Stable identity
        id: PlayerId,
        /// Name shown on leaderboards
        display_name: DisplayName,
    },
}

/// Errors that can occur when driving a session
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Error {
    /// The level table has no such level
    #[error("unknown level {0}")]
    UnknownLevel(LevelId),
    /// The level has not been unlocked yet
    #[error("level {0} is locked")]
    Locked(LevelId),
    /// The run has not reached its end
    #[error("the run has not ended")]
    NotEnded,
    /// The run's result was already recorded
    #[error("the run has already been finished")]
    AlreadyFinished,
    /// The level's configuration cannot be played
    #[error("level {0} cannot be played")]
    InvalidLevel(LevelId),
    /// The requested display name was rejected
    #[error(transparent)]
    Name(#[from] player::Error),
    /// Guests have no display name
    #[error("guests cannot pick a display name")]
    Guest,
}

/// A player's session
#[derive(Debug)]
pub struct Session<P, L> {
    levels: LevelTable,
    player: Player,
    progress: P,
    leaderboard: L,
}

impl<P: ProgressStore, L: LeaderboardStore> Session<P, L> {
    /// Creates a session
    pub fn new(levels: LevelTable, player: Player, progress: P, leaderboard: L) -> Self {
        Self {
            levels,
            player,
            progress,
            leaderboard,
        }
    }

    /// Whether `level` may be started
    ///
    /// When progress cannot be read only the first level is playable.
    pub fn is_unlocked(&self, level: LevelId) -> bool {
        match self.progress.progress(level) {
            Ok(progress) => progress.unlocked,
            Err(e) => {
                log::error!("could not read progress of level {level}: {e}");
                level == self.levels.first().id()
            }
        }
    }

    /// Starts a run of `level`
    ///
    /// # Errors
    ///
    /// * `Error::UnknownLevel` - the level table has no such level
    /// * `Error::Locked` - the level has not been unlocked
    /// * `Error::InvalidLevel` - the level's configuration was rejected
    pub fn start_level<S: Scheduler>(
        &self,
        level: LevelId,
        rng: &mut fastrand::Rng,
        scheduler: &mut S,
        now: Instant,
    ) -> Result<LevelRunState, Error> {
        let config = self.levels.get(level).ok_or(Error::UnknownLevel(level))?;
        if !self.is_unlocked(level) {
            return Err(Error::Locked(level));
        }

        LevelRunState::start(config.clone(), rng, scheduler, now).map_err(|e| {
            log::error!("could not start level {level}: {e}");
            Error::InvalidLevel(level)
        })
    }

    /// Records an ended run and builds its summary
    ///
    /// The previous high score is read before the result is recorded; when
    /// it cannot be read, the store's own verdict on the recorded score is
    /// used instead. Members who set a new high score are submitted to the
    /// leaderboard. A run is recorded at most once.
    ///
    /// # Errors
    ///
    /// * `Error::NotEnded` - the run is still being played
    /// * `Error::AlreadyFinished` - the run was finished before
    pub fn finish_level(&mut self, run: &mut LevelRunState) -> Result<LevelSummary, Error> {
        let outcome = *run.outcome().ok_or(Error::NotEnded)?;
        if !run.mark_recorded() {
            return Err(Error::AlreadyFinished);
        }
        let level = run.config().id();

        let previous_high_score = self
            .progress
            .progress(level)
            .map(|progress| progress.high_score)
            .inspect_err(|e| log::error!("could not read progress of level {level}: {e}"))
            .ok();

        let recorded = self
            .progress
            .record_level_result(level, outcome.total_score)
            .inspect_err(|e| log::error!("could not record result of level {level}: {e}"))
            .ok();

        let mut summary = LevelSummary::new(
            run.config(),
            run.results(),
            previous_high_score,
            self.levels.next_after(level).map(|next| next.id()),
        );
        if previous_high_score.is_none() {
            summary.is_new_high_score = recorded.is_some_and(|r| r.is_new_high_score);
        }

        if let Player::Member { id, display_name } = &self.player {
            if summary.is_new_high_score {
                if let Err(e) = self.leaderboard.submit_score(
                    level,
                    *id,
                    display_name,
                    outcome.total_score,
                ) {
                    log::error!("could not submit score of level {level}: {e}");
                }
            }
        }

        log::info!(
            "level {level} finished with {} points ({} stars)",
            outcome.total_score,
            outcome.stars
        );

        Ok(summary)
    }

    /// Best entries of `level`; empty when the leaderboard cannot be read
    pub fn leaderboard(&self, level: LevelId, limit: usize) -> TruncatedVec<LeaderboardEntry> {
        self.leaderboard
            .fetch_top(level, limit)
            .unwrap_or_else(|e| {
                log::error!("could not fetch leaderboard of level {level}: {e}");
                TruncatedVec::default()
            })
    }

    /// Changes the member's display name
    ///
    /// # Errors
    ///
    /// * `Error::Guest` - the player is not signed in
    /// * `Error::Name` - the name was rejected
    pub fn rename(&mut self, name: &str) -> Result<(), Error> {
        match &mut self.player {
            Player::Guest => Err(Error::Guest),
            Player::Member { display_name, .. } => {
                *display_name = DisplayName::new(name)?;
                Ok(())
            }
        }
    }

    /// The level table
    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    /// Who is playing
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// The progress collaborator
    pub fn progress(&self) -> &P {
        &self.progress
    }

    /// The leaderboard collaborator
    pub fn leaderboard_store(&self) -> &L {
        &self.leaderboard
    }
}
