//! Exposure timing: the scheduler seam and a simulated clock.
//!
//! The sequencer never sleeps. It asks a [`Scheduler`] to deliver a
//! [`TimerToken`] after a delay, and the host hands the token back through
//! [`EnlargerSession::fire_timer`](crate::EnlargerSession::fire_timer) when
//! the delay elapses. Each arm gets a fresh token, so a fire for a timer
//! that has since been cancelled or replaced is recognised as stale and
//! ignored.
//!
//! [`VirtualScheduler`] keeps timers in a queue ordered by deadline and
//! only moves its clock when told to, which makes exposure runs fully
//! deterministic under test.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifies one armed timer.
///
/// Tokens are never reused within a sequencer, so comparing a fired token
/// with the live one is enough to detect stale fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Token for a given arm generation.
    #[must_use]
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// The arm generation this token was issued for.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Host event loop binding for single-shot timers.
///
/// Implementations deliver each scheduled token at most once, after
/// `delay`, by calling back into the session. A cancelled token must not
/// be delivered; if it is anyway, the sequencer ignores it.
pub trait Scheduler {
    /// Deliver `token` once `delay` has elapsed.
    fn schedule(&mut self, token: TimerToken, delay: Duration);

    /// Forget `token` if it has not fired yet.
    fn cancel(&mut self, token: TimerToken);
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn schedule(&mut self, token: TimerToken, delay: Duration) {
        (**self).schedule(token, delay);
    }

    fn cancel(&mut self, token: TimerToken) {
        (**self).cancel(token);
    }
}

// ───────────────────────────── exposure time ─────────────────────────────

/// How an exposure ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureTime {
    /// The operator ends the exposure with a trigger.
    #[default]
    Manual,
    /// A timer ends the exposure (or each test strip) after this long.
    Timed(Duration),
}

impl ExposureTime {
    /// Exposure time from a number of seconds.
    ///
    /// Anything that is not a positive finite number, including zero,
    /// means manual timing.
    #[must_use]
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::Manual;
        }
        Duration::try_from_secs_f64(seconds).map_or(Self::Manual, Self::Timed)
    }

    /// Parse operator input such as `"8"` or `" 2.5 "`.
    ///
    /// Never fails: empty, non-numeric, negative or zero input falls back
    /// to [`Manual`](Self::Manual).
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<f64>() {
            Ok(seconds) => {
                let time = Self::from_seconds(seconds);
                if time == Self::Manual {
                    tracing::debug!("exposure time {trimmed:?} is not positive, using manual");
                }
                time
            }
            Err(_) => {
                if !trimmed.is_empty() {
                    tracing::debug!("exposure time {trimmed:?} is not a number, using manual");
                }
                Self::Manual
            }
        }
    }

    /// Delay for a timed exposure.
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::Manual => None,
            Self::Timed(duration) => Some(duration),
        }
    }
}

impl FromStr for ExposureTime {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<Option<f64>> for ExposureTime {
    fn from(seconds: Option<f64>) -> Self {
        seconds.map_or(Self::Manual, Self::from_seconds)
    }
}

impl fmt::Display for ExposureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Timed(duration) => write!(f, "{}s", duration.as_secs_f64()),
        }
    }
}

// ─────────────────────────── simulated clock ─────────────────────────────

/// Deterministic scheduler driven by an explicit clock.
///
/// Time starts at zero and only moves through [`pop_due`](Self::pop_due)
/// and [`set_clock`](Self::set_clock). Timers with equal deadlines fire in
/// the order they were scheduled.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now: Duration,
    sequence: u64,
    queue: BTreeMap<(Duration, u64), TimerToken>,
}

impl VirtualScheduler {
    /// An empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time since creation.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|&(deadline, _)| deadline)
    }

    /// Remove and return the earliest timer due at or before `until`,
    /// moving the clock to its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<TimerToken> {
        let (&(deadline, _), _) = self.queue.first_key_value()?;
        if deadline > until {
            return None;
        }
        let (_, token) = self.queue.pop_first()?;
        self.now = self.now.max(deadline);
        Some(token)
    }

    /// Move the clock forward to `at`. The clock never runs backwards.
    ///
    /// Timers due before `at` are not fired; drain them with
    /// [`pop_due`](Self::pop_due) first.
    pub fn set_clock(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&mut self, token: TimerToken, delay: Duration) {
        let deadline = self.now.saturating_add(delay);
        self.sequence += 1;
        self.queue.insert((deadline, self.sequence), token);
    }

    fn cancel(&mut self, token: TimerToken) {
        self.queue.retain(|_, queued| *queued != token);
    }
}
