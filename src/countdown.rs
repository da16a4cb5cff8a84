//! Cancellable countdowns
//!
//! A level run never owns a timer. Instead it asks a [`Scheduler`] to
//! deliver an [`AlarmMessage`] after a delay, and hands the message back
//! to the run when it fires. Every armed countdown gets a fresh
//! [`CountdownId`]; the run only honours the alarm whose id it armed last,
//! so a cancelled or superseded countdown can never move a run forward,
//! even if the host delivers it anyway.
//!
//! [`Timeline`] is a deterministic in-memory scheduler, useful both for
//! hosts that poll on their own tick and for driving runs in tests.

use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use web_time::Instant;

/// Identifier of a single level run
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle of one armed countdown
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountdownId {
    run: RunId,
    serial: u32,
}

impl CountdownId {
    /// The run that armed this countdown
    pub fn run(&self) -> RunId {
        self.run
    }
}

/// Message delivered when a countdown runs out
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// The clock has been shown long enough
    ShowElapsed(CountdownId),
    /// The player ran out of time to guess
    GuessElapsed(CountdownId),
}

impl AlarmMessage {
    /// The countdown this alarm belongs to
    pub fn countdown(&self) -> CountdownId {
        match self {
            Self::ShowElapsed(id) | Self::GuessElapsed(id) => *id,
        }
    }
}

/// Something that can deliver alarms after a delay
pub trait Scheduler {
    /// Delivers `alarm` back to its run once `after` has passed
    fn schedule(&mut self, alarm: AlarmMessage, after: Duration);

    /// Drops a pending alarm; unknown or already fired ids are ignored
    fn cancel(&mut self, countdown: CountdownId);
}

impl<S: Scheduler + ?Sized> Scheduler for &mut S {
    fn schedule(&mut self, alarm: AlarmMessage, after: Duration) {
        (**self).schedule(alarm, after);
    }

    fn cancel(&mut self, countdown: CountdownId) {
        (**self).cancel(countdown);
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    alarm: AlarmMessage,
    started: Instant,
    duration: Duration,
}

/// The countdown slot of a run; at most one countdown is armed at a time
#[derive(Debug, Clone)]
pub(crate) struct Countdown {
    run: RunId,
    next_serial: u32,
    armed: Option<Armed>,
}

impl Countdown {
    pub(crate) fn new(run: RunId) -> Self {
        Self {
            run,
            next_serial: 0,
            armed: None,
        }
    }

    /// Arms a new countdown, cancelling any previous one
    pub(crate) fn arm<S: Scheduler>(
        &mut self,
        kind: fn(CountdownId) -> AlarmMessage,
        duration: Duration,
        now: Instant,
        scheduler: &mut S,
    ) -> CountdownId {
        self.cancel(scheduler);

        let id = CountdownId {
            run: self.run,
            serial: self.next_serial,
        };
        self.next_serial = self.next_serial.wrapping_add(1);

        let alarm = kind(id);
        self.armed = Some(Armed {
            alarm,
            started: now,
            duration,
        });
        log::debug!("armed {alarm:?} for {duration:?}");
        scheduler.schedule(alarm, duration);

        id
    }

    /// Cancels the armed countdown, if any
    pub(crate) fn cancel<S: Scheduler>(&mut self, scheduler: &mut S) {
        if let Some(armed) = self.armed.take() {
            scheduler.cancel(armed.alarm.countdown());
        }
    }

    /// Consumes `alarm` if it is the one currently armed
    pub(crate) fn take_fired(&mut self, alarm: &AlarmMessage) -> bool {
        if self.armed.is_some_and(|armed| armed.alarm == *alarm) {
            self.armed = None;
            true
        } else {
            false
        }
    }

    /// Time left on the armed countdown
    pub(crate) fn remaining(&self, now: Instant) -> Option<Duration> {
        self.armed.map(|armed| {
            armed
                .duration
                .saturating_sub(now.saturating_duration_since(armed.started))
        })
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

/// A deterministic scheduler keeping pending alarms in memory
///
/// The timeline has its own notion of "now", moved forward with
/// [`Timeline::next_due`] and [`Timeline::advance_to`]. Alarms scheduled
/// while handling a fired alarm are measured from that alarm's deadline.
#[derive(Debug)]
pub struct Timeline {
    now: Instant,
    sequence: u64,
    pending: Vec<(Instant, u64, AlarmMessage)>,
}

impl Timeline {
    /// Creates an empty timeline starting at `now`
    pub fn new(now: Instant) -> Self {
        Self {
            now,
            sequence: 0,
            pending: Vec::new(),
        }
    }

    /// The current position of the timeline
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Number of alarms waiting to fire
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the earliest pending alarm
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(deadline, _, _)| *deadline).min()
    }

    /// Removes and returns the earliest alarm due at or before `until`
    ///
    /// The timeline moves to the alarm's deadline. Alarms with equal
    /// deadlines fire in the order they were scheduled.
    pub fn next_due(&mut self, until: Instant) -> Option<AlarmMessage> {
        let (index, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (deadline, _, _))| *deadline <= until)
            .min_by_key(|(_, (deadline, sequence, _))| (*deadline, *sequence))?;

        let (deadline, _, alarm) = self.pending.remove(index);
        self.now = self.now.max(deadline);
        Some(alarm)
    }

    /// Moves the timeline to `now` without firing anything
    pub fn advance_to(&mut self, now: Instant) {
        self.now = self.now.max(now);
    }
}

impl Scheduler for Timeline {
    fn schedule(&mut self, alarm: AlarmMessage, after: Duration) {
        self.pending.push((self.now + after, self.sequence, alarm));
        self.sequence += 1;
    }

    fn cancel(&mut self, countdown: CountdownId) {
        self.pending
            .retain(|(_, _, alarm)| alarm.countdown() != countdown);
    }
}
