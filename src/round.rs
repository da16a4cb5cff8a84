//! Level runs and their round state machine
//!
//! A [`LevelRunState`] plays one level from its first round to the end.
//! Each round moves through three phases:
//!
//! 1. [`Phase::Show`]: a new time is drawn and shown until the show
//!    countdown runs out. Guesses are ignored.
//! 2. [`Phase::Guess`]: the clock is hidden and the player has until the
//!    guess countdown runs out to answer. On multiple choice levels the
//!    shuffled candidates are drawn when this phase starts. Invalid typed
//!    input is rejected without using up the round.
//! 3. [`Phase::Feedback`]: the round's [`RoundResult`] has been recorded
//!    and the run waits for the player to continue.
//!
//! After the last round the run is [`Phase::Ended`]. Exactly one result is
//! recorded per round: whichever of a valid guess or the guess countdown
//! comes first resolves the round and every later event for it is ignored.
//!
//! The run owns no timers and no randomness. Callers pass in a
//! [`Scheduler`], a `fastrand::Rng` and the current [`Instant`], and hand
//! fired alarms back through [`LevelRunState::receive_alarm`].

use std::time::Duration;

use garde::Validate;
use itertools::Itertools;
use once_cell_serde::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::Instant;

use crate::{
    clock::{
        distractors::generate_wrong_answers,
        scoring,
        time::{self, ClockTime, HandAngles, InputError},
    },
    constants::choices::DISTRACTOR_COUNT,
    countdown::{AlarmMessage, Countdown, RunId, Scheduler},
    level::{ConfigError, InputMode, LevelConfig},
    summary::LevelOutcome,
};

/// The phase a run is in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// The clock is visible
    Show,
    /// Waiting for the player's answer
    Guess,
    /// Showing how the last round went
    Feedback,
    /// All rounds are played
    Ended,
}

/// A guess sent by the player
#[derive(Debug, Clone, Deserialize)]
pub enum GuessMessage {
    /// Index into the candidates of a multiple choice round
    Choice(usize),
    /// Raw text fields of a typed answer
    Typed {
        /// Hour field
        hours: String,
        /// Minute field
        minutes: String,
        /// Second field, only read on levels with seconds
        #[serde(default)]
        seconds: Option<String>,
    },
}

/// Reasons a guess is rejected without resolving the round
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GuessError {
    /// The typed time is malformed
    #[error(transparent)]
    Input(#[from] InputError),
    /// The guess does not match the level's input mode
    #[error("this level does not accept that kind of answer")]
    WrongInputMode,
    /// The chosen candidate does not exist
    #[error("there is no choice {0}")]
    NoSuchChoice(usize),
}

/// How a round went, for feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Exact match
    Correct,
    /// A guess was made but it was off
    NotQuite,
    /// No guess before the countdown ran out
    TimesUp,
}

/// The recorded outcome of one round
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    correct_time: ClockTime,
    guessed_time: Option<ClockTime>,
    score: u64,
    is_exact: bool,
    #[serde_as(as = "Option<serde_with::DurationMilliSeconds<u64>>")]
    elapsed: Option<Duration>,
}

impl RoundResult {
    /// Scores a guess for `config`; `None` guess means time ran out
    pub fn new(
        config: &LevelConfig,
        correct_time: ClockTime,
        guessed_time: Option<ClockTime>,
        elapsed: Option<Duration>,
    ) -> Self {
        let score = scoring::score(
            correct_time,
            guessed_time,
            elapsed,
            config.guess_time(),
            config.includes_seconds(),
        );

        Self {
            correct_time,
            guessed_time,
            score: score.points,
            is_exact: score.is_exact,
            elapsed: guessed_time.and(elapsed),
        }
    }

    /// The time that was shown
    pub fn correct_time(&self) -> ClockTime {
        self.correct_time
    }

    /// The time guessed, if any
    pub fn guessed_time(&self) -> Option<ClockTime> {
        self.guessed_time
    }

    /// Points earned
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Whether the guess was exact
    pub fn is_exact(&self) -> bool {
        self.is_exact
    }

    /// Time from the start of the guess phase to the guess; `None` when time ran out
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Feedback classification
    pub fn verdict(&self) -> Verdict {
        match (self.guessed_time, self.is_exact) {
            (None, _) => Verdict::TimesUp,
            (Some(_), true) => Verdict::Correct,
            (Some(_), false) => Verdict::NotQuite,
        }
    }
}

/// Snapshot of a run for presenting it
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub enum RunView {
    /// The clock is on screen
    Show {
        /// Current round, starting at 1
        round: usize,
        /// Rounds in the level
        round_count: usize,
        /// Score so far
        score: u64,
        /// Time to draw
        time: ClockTime,
        /// Hand rotations for `time`
        hands: HandAngles,
        /// Whether to draw the second hand
        show_seconds: bool,
        /// Time until the clock is hidden
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
    },
    /// The player is guessing
    Guess {
        /// Current round, starting at 1
        round: usize,
        /// Rounds in the level
        round_count: usize,
        /// Score so far
        score: u64,
        /// Candidates on multiple choice levels
        choices: Option<Vec<ClockTime>>,
        /// Whether a seconds field is expected
        show_seconds: bool,
        /// Time left to answer
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
    },
    /// The last round's result is on screen
    Feedback {
        /// Current round, starting at 1
        round: usize,
        /// Rounds in the level
        round_count: usize,
        /// Score so far
        score: u64,
        /// The round just played
        result: RoundResult,
        /// How it went
        verdict: Verdict,
        /// Whether continuing ends the level
        last_round: bool,
    },
    /// The level is over
    Ended {
        /// Final verdict
        outcome: LevelOutcome,
    },
}

/// State of one play-through of a level
#[derive(Debug)]
pub struct LevelRunState {
    id: RunId,
    config: LevelConfig,
    round_index: usize,
    cumulative_score: u64,
    results: Vec<RoundResult>,
    phase: Phase,
    current_time: ClockTime,
    choices: Vec<ClockTime>,
    countdown: Countdown,
    guess_started: Option<Instant>,
    outcome: OnceCell<LevelOutcome>,
    recorded: bool,
}

impl LevelRunState {
    /// Starts a run of `config` and enters the show phase of round 1
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `config` breaks a field limit, such
    /// as having no rounds; nothing is scheduled in that case.
    pub fn start<S: Scheduler>(
        config: LevelConfig,
        rng: &mut fastrand::Rng,
        scheduler: &mut S,
        now: Instant,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let id = RunId::new();
        let current_time = time::generate(config.resolution(), rng);

        let mut run = Self {
            id,
            round_index: 0,
            cumulative_score: 0,
            results: Vec::with_capacity(config.round_count()),
            phase: Phase::Feedback,
            current_time,
            choices: Vec::new(),
            countdown: Countdown::new(id),
            guess_started: None,
            outcome: OnceCell::new(),
            recorded: false,
            config,
        };
        log::debug!("run {id} started for level {}", run.config.id());
        run.begin_round(rng, scheduler, now);
        Ok(run)
    }

    /// Attempts to change phase, returning `false` if the run is not in `before`
    fn change_phase(&mut self, before: Phase, after: Phase) -> bool {
        if self.phase == before {
            self.phase = after;
            true
        } else {
            false
        }
    }

    fn begin_round<S: Scheduler>(
        &mut self,
        rng: &mut fastrand::Rng,
        scheduler: &mut S,
        now: Instant,
    ) {
        if !self.change_phase(Phase::Feedback, Phase::Show) {
            return;
        }

        self.round_index += 1;
        if self.round_index > 1 {
            self.current_time = time::generate(self.config.resolution(), rng);
        }
        self.choices.clear();
        self.guess_started = None;
        log::debug!(
            "run {} round {}/{} showing {}",
            self.id,
            self.round_index,
            self.config.round_count(),
            self.current_time.format(self.config.includes_seconds())
        );

        if self.config.show_time().is_zero() {
            self.begin_guess(rng, scheduler, now);
        } else {
            self.countdown.arm(
                AlarmMessage::ShowElapsed,
                self.config.show_time(),
                now,
                scheduler,
            );
        }
    }

    fn begin_guess<S: Scheduler>(
        &mut self,
        rng: &mut fastrand::Rng,
        scheduler: &mut S,
        now: Instant,
    ) -> bool {
        if !self.change_phase(Phase::Show, Phase::Guess) {
            return false;
        }

        if self.config.input_mode() == InputMode::MultipleChoice {
            let mut choices = generate_wrong_answers(
                self.current_time,
                self.config.resolution(),
                DISTRACTOR_COUNT,
                rng,
            );
            choices.push(self.current_time);
            rng.shuffle(&mut choices);
            self.choices = choices;
        }

        self.guess_started = Some(now);
        self.countdown.arm(
            AlarmMessage::GuessElapsed,
            self.config.guess_time(),
            now,
            scheduler,
        );
        true
    }

    fn resolve<S: Scheduler>(
        &mut self,
        guess: Option<ClockTime>,
        elapsed: Option<Duration>,
        scheduler: &mut S,
    ) -> Option<RoundResult> {
        if !self.change_phase(Phase::Guess, Phase::Feedback) {
            return None;
        }

        self.countdown.cancel(scheduler);
        let result = RoundResult::new(&self.config, self.current_time, guess, elapsed);
        self.cumulative_score += result.score();
        self.results.push(result);
        log::debug!(
            "run {} round {} resolved: {:?}, {} points",
            self.id,
            self.round_index,
            result.verdict(),
            result.score()
        );

        Some(result)
    }

    fn read_guess(&self, message: &GuessMessage) -> Result<ClockTime, GuessError> {
        match (self.config.input_mode(), message) {
            (InputMode::MultipleChoice, GuessMessage::Choice(index)) => self
                .choices
                .get(*index)
                .copied()
                .ok_or(GuessError::NoSuchChoice(*index)),
            (
                InputMode::Typed,
                GuessMessage::Typed {
                    hours,
                    minutes,
                    seconds,
                },
            ) => {
                let seconds = if self.config.includes_seconds() {
                    seconds.as_deref()
                } else {
                    None
                };
                Ok(ClockTime::parse_typed(hours, minutes, seconds)?)
            }
            _ => Err(GuessError::WrongInputMode),
        }
    }

    /// Handles a guess from the player
    ///
    /// Returns the round's result when the guess resolved the round, and
    /// `Ok(None)` when the run is not waiting for a guess. A guess arriving
    /// after the guess window closed resolves the round as a timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`GuessError`] for malformed or mismatched input; the
    /// round stays open and the countdown keeps running.
    pub fn submit_guess<S: Scheduler>(
        &mut self,
        message: &GuessMessage,
        scheduler: &mut S,
        now: Instant,
    ) -> Result<Option<RoundResult>, GuessError> {
        if self.phase != Phase::Guess {
            log::debug!("run {} ignoring guess during {:?}", self.id, self.phase);
            return Ok(None);
        }

        let guess = self.read_guess(message)?;
        let elapsed = self
            .guess_started
            .map_or(Duration::ZERO, |started| now.saturating_duration_since(started));

        if elapsed >= self.config.guess_time() {
            return Ok(self.resolve(None, None, scheduler));
        }

        Ok(self.resolve(Some(guess), Some(elapsed), scheduler))
    }

    /// Handles a fired countdown
    ///
    /// Returns `true` if the alarm moved the run on. Alarms for cancelled,
    /// superseded or foreign countdowns are ignored.
    pub fn receive_alarm<S: Scheduler>(
        &mut self,
        alarm: &AlarmMessage,
        rng: &mut fastrand::Rng,
        scheduler: &mut S,
        now: Instant,
    ) -> bool {
        if !self.countdown.take_fired(alarm) {
            log::warn!("run {} ignoring stale {alarm:?}", self.id);
            return false;
        }

        match alarm {
            AlarmMessage::ShowElapsed(_) => self.begin_guess(rng, scheduler, now),
            AlarmMessage::GuessElapsed(_) => self.resolve(None, None, scheduler).is_some(),
        }
    }

    /// Leaves the feedback phase, starting the next round or ending the level
    ///
    /// Does nothing outside the feedback phase. Returns the phase the run is in afterwards.
    pub fn continue_round<S: Scheduler>(
        &mut self,
        rng: &mut fastrand::Rng,
        scheduler: &mut S,
        now: Instant,
    ) -> Phase {
        if self.phase == Phase::Feedback {
            if self.round_index < self.config.round_count() {
                self.begin_round(rng, scheduler, now);
            } else if self.change_phase(Phase::Feedback, Phase::Ended) {
                let outcome = self.outcome_cell();
                log::info!(
                    "run {} of level {} ended with {} points",
                    self.id,
                    self.config.id(),
                    outcome.total_score
                );
            }
        }

        self.phase
    }

    /// Discards the run, cancelling its armed countdown
    pub fn abandon<S: Scheduler>(mut self, scheduler: &mut S) {
        if self.countdown.is_armed() {
            self.countdown.cancel(scheduler);
        }
        log::debug!(
            "run {} abandoned in round {} ({:?})",
            self.id,
            self.round_index,
            self.phase
        );
    }

    fn outcome_cell(&self) -> &LevelOutcome {
        self.outcome
            .get_or_init(|| LevelOutcome::compute(&self.config, &self.results))
    }

    /// Final verdict, available once the run has ended
    pub fn outcome(&self) -> Option<&LevelOutcome> {
        (self.phase == Phase::Ended).then(|| self.outcome_cell())
    }

    /// Marks an ended run as handed to the progress store
    ///
    /// Returns `false` if the run had already been marked.
    pub(crate) fn mark_recorded(&mut self) -> bool {
        !std::mem::replace(&mut self.recorded, true)
    }

    /// Whether the result of this run has been recorded
    pub fn is_recorded(&self) -> bool {
        self.recorded
    }

    /// Identifier of this run
    pub fn id(&self) -> RunId {
        self.id
    }

    /// The level being played
    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current round number, starting at 1
    pub fn round(&self) -> usize {
        self.round_index
    }

    /// Sum of the scores recorded so far
    pub fn cumulative_score(&self) -> u64 {
        self.cumulative_score
    }

    /// Results recorded so far, in round order
    pub fn results(&self) -> &[RoundResult] {
        &self.results
    }

    /// The time drawn for the current round
    pub fn current_time(&self) -> ClockTime {
        self.current_time
    }

    /// Candidates of the current multiple choice round; empty otherwise
    pub fn choices(&self) -> &[ClockTime] {
        &self.choices
    }

    /// Time left on the running countdown
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.countdown.remaining(now)
    }

    /// Snapshot of the run for presentation
    pub fn view(&self, now: Instant) -> RunView {
        let round = self.round_index;
        let round_count = self.config.round_count();
        let score = self.cumulative_score;
        let show_seconds = self.config.includes_seconds();
        let remaining = self.remaining(now).unwrap_or_default();

        match (self.phase, self.results.last()) {
            (Phase::Show, _) => RunView::Show {
                round,
                round_count,
                score,
                time: self.current_time,
                hands: self.current_time.hand_angles(),
                show_seconds,
                remaining,
            },
            (Phase::Guess, _) => RunView::Guess {
                round,
                round_count,
                score,
                choices: (self.config.input_mode() == InputMode::MultipleChoice)
                    .then(|| self.choices.iter().copied().collect_vec()),
                show_seconds,
                remaining,
            },
            (Phase::Feedback, Some(&result)) => RunView::Feedback {
                round,
                round_count,
                score,
                result,
                verdict: result.verdict(),
                last_round: round >= round_count,
            },
            (Phase::Feedback, None) => RunView::Ended {
                outcome: LevelOutcome::compute(&self.config, &self.results),
            },
            (Phase::Ended, _) => RunView::Ended {
                outcome: *self.outcome_cell(),
            },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{
        clock::time::{Field, Resolution},
        countdown::Timeline,
        level::{LevelId, LevelTable},
    };

    fn level(id: u8) -> LevelConfig {
        LevelTable::default()
            .get(LevelId::new(id))
            .cloned()
            .unwrap()
    }

    fn typed(time: ClockTime) -> GuessMessage {
        GuessMessage::Typed {
            hours: time.hours().to_string(),
            minutes: time.minutes().to_string(),
            seconds: Some(time.seconds().to_string()),
        }
    }

    /// Fires every alarm due by `until`, feeding it to `run`
    fn run_until(
        run: &mut LevelRunState,
        timeline: &mut Timeline,
        rng: &mut fastrand::Rng,
        until: Instant,
    ) {
        while let Some(alarm) = timeline.next_due(until) {
            let now = timeline.now();
            run.receive_alarm(&alarm, rng, timeline, now);
        }
        timeline.advance_to(until);
    }

    fn correct_choice(run: &LevelRunState) -> usize {
        run.choices()
            .iter()
            .position(|c| *c == run.current_time())
            .unwrap()
    }

    #[test]
    fn test_start_enters_show() {
        let mut rng = fastrand::Rng::with_seed(1);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        assert_eq!(run.phase(), Phase::Show);
        assert_eq!(run.round(), 1);
        assert!(run.results().is_empty());
        assert!(Resolution::HourOnly.allows(run.current_time()));
        assert_eq!(run.remaining(start), Some(Duration::from_secs(10)));
        assert_eq!(timeline.pending(), 1);
    }

    #[test]
    fn test_guess_ignored_while_showing() {
        let mut rng = fastrand::Rng::with_seed(1);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(3), &mut rng, &mut timeline, start).unwrap();
        let guess = typed(run.current_time());
        assert_eq!(run.submit_guess(&guess, &mut timeline, start), Ok(None));
        assert_eq!(run.phase(), Phase::Show);
        assert!(run.results().is_empty());
    }

    #[test]
    fn test_show_countdown_moves_to_guess_with_choices() {
        let mut rng = fastrand::Rng::with_seed(2);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(2), &mut rng, &mut timeline, start).unwrap();
        run_until(&mut run, &mut timeline, &mut rng, start + Duration::from_secs(8));

        assert_eq!(run.phase(), Phase::Guess);
        assert_eq!(run.choices().len(), 4);
        assert_eq!(
            run.choices()
                .iter()
                .filter(|c| **c == run.current_time())
                .count(),
            1
        );
        assert!(run.choices().iter().map(|c| (c.hours(), c.minutes())).all_unique());
        assert_eq!(
            run.remaining(start + Duration::from_secs(8)),
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_typed_levels_have_no_choices() {
        let mut rng = fastrand::Rng::with_seed(2);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(4), &mut rng, &mut timeline, start).unwrap();
        run_until(&mut run, &mut timeline, &mut rng, start + Duration::from_secs(4));

        assert_eq!(run.phase(), Phase::Guess);
        assert!(run.choices().is_empty());
        assert!(matches!(
            run.view(start + Duration::from_secs(4)),
            RunView::Guess { choices: None, .. }
        ));
    }

    #[test]
    fn test_correct_choice_scores_with_speed_bonus() {
        let mut rng = fastrand::Rng::with_seed(3);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        let guess_start = start + Duration::from_secs(10);
        run_until(&mut run, &mut timeline, &mut rng, guess_start);

        let choice = GuessMessage::Choice(correct_choice(&run));
        let result = run
            .submit_guess(&choice, &mut timeline, guess_start + Duration::from_secs(2))
            .unwrap()
            .unwrap();

        assert_eq!(result.score(), 120);
        assert!(result.is_exact());
        assert_eq!(result.verdict(), Verdict::Correct);
        assert_eq!(result.elapsed(), Some(Duration::from_secs(2)));
        assert_eq!(run.phase(), Phase::Feedback);
        assert_eq!(run.cumulative_score(), 120);
        assert_eq!(timeline.pending(), 0);
    }

    #[test]
    fn test_invalid_typed_input_keeps_round_open() {
        let mut rng = fastrand::Rng::with_seed(4);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(3), &mut rng, &mut timeline, start).unwrap();
        let guess_start = start + Duration::from_secs(6);
        run_until(&mut run, &mut timeline, &mut rng, guess_start);

        let bad = GuessMessage::Typed {
            hours: "13".to_owned(),
            minutes: "00".to_owned(),
            seconds: None,
        };
        assert_eq!(
            run.submit_guess(&bad, &mut timeline, guess_start),
            Err(GuessError::Input(InputError::OutOfRange {
                field: Field::Hours,
                min: 1,
                max: 12
            }))
        );
        assert_eq!(
            run.submit_guess(&GuessMessage::Choice(0), &mut timeline, guess_start),
            Err(GuessError::WrongInputMode)
        );
        assert_eq!(run.phase(), Phase::Guess);
        assert_eq!(timeline.pending(), 1);

        let good = typed(run.current_time());
        let result = run
            .submit_guess(&good, &mut timeline, guess_start + Duration::from_secs(7))
            .unwrap()
            .unwrap();
        assert_eq!(result.score(), 100);
        assert!(result.is_exact());
    }

    #[test]
    fn test_no_such_choice() {
        let mut rng = fastrand::Rng::with_seed(5);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        run_until(&mut run, &mut timeline, &mut rng, start + Duration::from_secs(10));

        assert_eq!(
            run.submit_guess(&GuessMessage::Choice(4), &mut timeline, start),
            Err(GuessError::NoSuchChoice(4))
        );
    }

    #[test]
    fn test_guess_countdown_records_timeout_and_later_guess_is_ignored() {
        let mut rng = fastrand::Rng::with_seed(6);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        let end = start + Duration::from_secs(30);
        run_until(&mut run, &mut timeline, &mut rng, end);

        assert_eq!(run.phase(), Phase::Feedback);
        assert_eq!(run.results().len(), 1);
        let result = run.results()[0];
        assert_eq!(result.guessed_time(), None);
        assert_eq!(result.elapsed(), None);
        assert_eq!(result.score(), 0);
        assert_eq!(result.verdict(), Verdict::TimesUp);

        assert_eq!(
            run.submit_guess(&GuessMessage::Choice(0), &mut timeline, end),
            Ok(None)
        );
        assert_eq!(run.results().len(), 1);
    }

    #[test]
    fn test_late_guess_counts_as_timeout() {
        let mut rng = fastrand::Rng::with_seed(7);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(3), &mut rng, &mut timeline, start).unwrap();
        let guess_start = start + Duration::from_secs(6);
        run_until(&mut run, &mut timeline, &mut rng, guess_start);

        let guess = typed(run.current_time());
        let result = run
            .submit_guess(&guess, &mut timeline, guess_start + Duration::from_secs(12))
            .unwrap()
            .unwrap();
        assert_eq!(result.verdict(), Verdict::TimesUp);
        assert_eq!(timeline.pending(), 0);
    }

    #[test]
    fn test_stale_alarm_after_guess_is_ignored() {
        let mut rng = fastrand::Rng::with_seed(8);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        let show_alarm = timeline.next_due(start + Duration::from_secs(10)).unwrap();
        let now = timeline.now();
        assert!(run.receive_alarm(&show_alarm, &mut rng, &mut timeline, now));
        let guess_alarm = timeline.next_due(start + Duration::from_secs(30)).unwrap();

        let choice = GuessMessage::Choice(correct_choice(&run));
        run.submit_guess(&choice, &mut timeline, start + Duration::from_secs(11))
            .unwrap();

        let now = timeline.now();
        assert!(!run.receive_alarm(&guess_alarm, &mut rng, &mut timeline, now));
        assert!(!run.receive_alarm(&show_alarm, &mut rng, &mut timeline, now));
        assert_eq!(run.results().len(), 1);
        assert_eq!(run.phase(), Phase::Feedback);
    }

    #[test]
    fn test_feedback_waits_for_continue() {
        let mut rng = fastrand::Rng::with_seed(9);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        run_until(&mut run, &mut timeline, &mut rng, start + Duration::from_secs(30));
        assert_eq!(run.phase(), Phase::Feedback);
        assert_eq!(timeline.pending(), 0);

        run_until(&mut run, &mut timeline, &mut rng, start + Duration::from_secs(300));
        assert_eq!(run.phase(), Phase::Feedback);

        let now = timeline.now();
        assert_eq!(
            run.continue_round(&mut rng, &mut timeline, now),
            Phase::Show
        );
        assert_eq!(run.round(), 2);
        assert!(run.choices().is_empty());
    }

    #[test]
    fn test_full_run_ends_after_round_count() {
        let mut rng = fastrand::Rng::with_seed(10);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);
        let config = level(5);
        let round_count = config.round_count();

        let mut run = LevelRunState::start(config, &mut rng, &mut timeline, start).unwrap();
        let mut now = start;

        for round in 1..=round_count {
            assert_eq!(run.round(), round);
            now += Duration::from_secs(3);
            run_until(&mut run, &mut timeline, &mut rng, now);
            assert_eq!(run.phase(), Phase::Guess);

            now += Duration::from_secs(1);
            let guess = typed(run.current_time());
            assert!(run.submit_guess(&guess, &mut timeline, now).unwrap().is_some());
            assert_eq!(run.results().len(), round);
            timeline.advance_to(now);

            assert!(matches!(
                run.view(now),
                RunView::Feedback { last_round, .. } if last_round == (round == round_count)
            ));
            run.continue_round(&mut rng, &mut timeline, now);
        }

        assert_eq!(run.phase(), Phase::Ended);
        assert_eq!(run.results().len(), round_count);
        assert_eq!(run.cumulative_score(), 1200);
        assert_eq!(
            run.outcome(),
            Some(&LevelOutcome {
                total_score: 1200,
                passed: true,
                stars: 5
            })
        );
        assert_eq!(timeline.pending(), 0);

        assert_eq!(
            run.continue_round(&mut rng, &mut timeline, now),
            Phase::Ended
        );
        assert_eq!(run.results().len(), round_count);
    }

    #[test]
    fn test_outcome_only_when_ended() {
        let mut rng = fastrand::Rng::with_seed(11);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        assert!(run.outcome().is_none());
    }

    #[test]
    fn test_abandon_cancels_countdown() {
        let mut rng = fastrand::Rng::with_seed(12);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        assert_eq!(timeline.pending(), 1);
        run.abandon(&mut timeline);
        assert_eq!(timeline.pending(), 0);
    }

    #[test]
    fn test_replacement_run_ignores_old_alarms() {
        let mut rng = fastrand::Rng::with_seed(13);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);
        let mut other = Timeline::new(start);

        let old = LevelRunState::start(level(1), &mut rng, &mut other, start).unwrap();
        let stale = other.next_due(start + Duration::from_secs(60)).unwrap();
        old.abandon(&mut other);

        let mut run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        assert!(!run.receive_alarm(&stale, &mut rng, &mut timeline, start));
        assert_eq!(run.phase(), Phase::Show);
    }

    #[test]
    fn test_zero_show_time_goes_straight_to_guess() {
        let mut rng = fastrand::Rng::with_seed(14);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);
        let config = LevelConfig::new(
            LevelId::new(1),
            "Blink",
            Duration::ZERO,
            Duration::from_secs(5),
            InputMode::MultipleChoice,
            Resolution::HalfHour,
            0,
            2,
        );

        let run = LevelRunState::start(config, &mut rng, &mut timeline, start).unwrap();
        assert_eq!(run.phase(), Phase::Guess);
        assert_eq!(run.choices().len(), 4);
        assert_eq!(timeline.pending(), 1);
    }

    #[test]
    fn test_view_during_feedback_shows_last_result() {
        let mut rng = fastrand::Rng::with_seed(20);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        let end = start + Duration::from_secs(30);
        run_until(&mut run, &mut timeline, &mut rng, end);

        assert!(matches!(
            run.view(end),
            RunView::Feedback {
                round: 1,
                verdict: Verdict::TimesUp,
                last_round: false,
                result,
                ..
            } if result == run.results()[0]
        ));
    }

    #[test]
    fn test_start_rejects_level_without_rounds() {
        let mut rng = fastrand::Rng::with_seed(17);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);
        let config = LevelConfig::new(
            LevelId::new(1),
            "Empty",
            Duration::from_secs(1),
            Duration::from_secs(5),
            InputMode::Typed,
            Resolution::AnyMinute,
            0,
            0,
        );

        assert!(matches!(
            LevelRunState::start(config, &mut rng, &mut timeline, start),
            Err(ConfigError::Invalid(_))
        ));
        assert_eq!(timeline.pending(), 0);
    }

    #[test]
    fn test_start_rejects_level_without_guess_time() {
        let mut rng = fastrand::Rng::with_seed(18);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);
        let config = LevelConfig::new(
            LevelId::new(1),
            "Instant",
            Duration::from_secs(1),
            Duration::ZERO,
            InputMode::MultipleChoice,
            Resolution::HourOnly,
            0,
            3,
        );

        assert!(LevelRunState::start(config, &mut rng, &mut timeline, start).is_err());
        assert_eq!(timeline.pending(), 0);
    }

    #[test]
    fn test_mark_recorded_once() {
        let mut rng = fastrand::Rng::with_seed(19);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(1), &mut rng, &mut timeline, start).unwrap();
        assert!(!run.is_recorded());
        assert!(run.mark_recorded());
        assert!(run.is_recorded());
        assert!(!run.mark_recorded());
    }

    #[test]
    fn test_seconds_field_ignored_below_expert() {
        let mut rng = fastrand::Rng::with_seed(15);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let mut run = LevelRunState::start(level(4), &mut rng, &mut timeline, start).unwrap();
        run_until(&mut run, &mut timeline, &mut rng, start + Duration::from_secs(4));

        let time = run.current_time();
        let guess = GuessMessage::Typed {
            hours: time.hours().to_string(),
            minutes: time.minutes().to_string(),
            seconds: Some("not a number".to_owned()),
        };
        let result = run
            .submit_guess(&guess, &mut timeline, start + Duration::from_secs(9))
            .unwrap()
            .unwrap();
        assert!(result.is_exact());
        assert_eq!(result.guessed_time().map(|t| t.seconds()), Some(0));
    }

    #[test]
    fn test_view_during_show() {
        let mut rng = fastrand::Rng::with_seed(16);
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let run = LevelRunState::start(level(5), &mut rng, &mut timeline, start).unwrap();
        let view = run.view(start + Duration::from_secs(1));
        assert!(matches!(
            view,
            RunView::Show {
                round: 1,
                round_count: 10,
                score: 0,
                show_seconds: true,
                remaining,
                ..
            } if remaining == Duration::from_secs(2)
        ));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["Show"]["remaining"], 2000);
    }

    #[test]
    fn test_guess_message_from_json() {
        let message: GuessMessage = serde_json::from_str(r#"{"Choice":2}"#).unwrap();
        assert!(matches!(message, GuessMessage::Choice(2)));

        let message: GuessMessage =
            serde_json::from_str(r#"{"Typed":{"hours":"3","minutes":"15"}}"#).unwrap();
        assert!(matches!(message, GuessMessage::Typed { seconds: None, .. }));
    }

    #[test]
    fn test_round_result_serializes_timeout_as_null() {
        let config = level(1);
        let result = RoundResult::new(&config, ClockTime::new(1, 0, 0).unwrap(), None, None);
        let json = serde_json::to_value(result).unwrap();
        assert!(json["guessed_time"].is_null());
        assert!(json["elapsed"].is_null());
    }
}
