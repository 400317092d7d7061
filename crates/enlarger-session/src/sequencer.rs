//! The exposure sequencer: a five-state cyclic machine with timers.
//!
//! Every transition goes through one place, [`Sequencer::enter`], which
//! runs the exit action of the old state (cancel the timer) and the entry
//! action of the new one:
//!
//! | State  | Entry action                                  |
//! |--------|-----------------------------------------------|
//! | Setup  | cancel timer, reset strip counter             |
//! | Align  | cancel timer                                  |
//! | Hidden | cancel timer                                  |
//! | Expose | arm exposure or strip timer if timing is set  |
//! | Blank  | cancel timer, reset strip counter             |
//!
//! Parameter setters never touch the armed timer. A timer armed on entry
//! to `Expose` keeps the behaviour it was armed with until it fires or the
//! state changes. A strip run always ends after the number of strips it
//! was armed with; the counter only tracks strips while the mode is on.
//!
//! The sequencer does not call observers itself. It queues
//! [`SequencerEvent`]s, which the owning session drains and forwards.

use enlarger_pipeline::{ExposureState, StripProgress};

use crate::strip::{StripCounter, StripStep};
use crate::timer::{ExposureTime, Scheduler, TimerToken};

/// A change the sequencer made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    /// The machine entered a new state.
    StateChanged(ExposureState),
    /// The strip counter or test-strip mode changed.
    StripChanged(StripProgress),
}

/// What an armed timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    /// End the exposure.
    Exposure,
    /// Finish the current test strip. `remaining` counts this strip.
    Strip { remaining: u32 },
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    token: TimerToken,
    kind: TimerKind,
}

/// Exposure state machine bound to a [`Scheduler`].
#[derive(Debug)]
pub struct Sequencer<S: Scheduler> {
    state: ExposureState,
    exposure_time: ExposureTime,
    test_strip_mode: bool,
    strips: StripCounter,
    timer: Option<ArmedTimer>,
    generation: u64,
    scheduler: S,
    events: Vec<SequencerEvent>,
}

impl<S: Scheduler> Sequencer<S> {
    /// A sequencer in `Setup` with manual timing and test strips off.
    pub fn new(scheduler: S, total_strips: u32) -> Self {
        Self {
            state: ExposureState::Setup,
            exposure_time: ExposureTime::Manual,
            test_strip_mode: false,
            strips: StripCounter::new(total_strips),
            timer: None,
            generation: 0,
            scheduler,
            events: Vec::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ExposureState {
        self.state
    }

    /// Configured exposure time.
    #[must_use]
    pub const fn exposure_time(&self) -> ExposureTime {
        self.exposure_time
    }

    /// Whether test-strip mode is enabled.
    #[must_use]
    pub const fn test_strip_mode(&self) -> bool {
        self.test_strip_mode
    }

    /// Strip counter snapshot, reported whether or not the mode is on.
    #[must_use]
    pub const fn strip_progress(&self) -> StripProgress {
        self.strips.progress(self.test_strip_mode)
    }

    /// Token of the live timer, if one is armed.
    #[must_use]
    pub fn armed_timer(&self) -> Option<TimerToken> {
        self.timer.map(|armed| armed.token)
    }

    /// The scheduler timers are armed on.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Mutable access to the scheduler, for hosts that drive it.
    pub const fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Take the events queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<SequencerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Manual trigger: move to the next state in the cycle.
    ///
    /// Always accepted. A pending timer is cancelled first, so a manual
    /// trigger during a timed exposure wins and the timer never fires.
    pub fn advance(&mut self) -> ExposureState {
        let next = self.state.next();
        self.enter(next);
        next
    }

    /// Set the exposure time used on the next entry to `Expose`.
    pub fn set_exposure_time(&mut self, time: ExposureTime) {
        if time != self.exposure_time {
            tracing::debug!(%time, "exposure time set");
        }
        self.exposure_time = time;
    }

    /// Enable or disable test-strip mode.
    ///
    /// Takes effect on the next entry to `Expose`; a timer already armed
    /// keeps its behaviour. Disabling the mode resets the strip counter,
    /// and a strip run in progress finishes at its armed length without
    /// counting further strips.
    pub fn set_test_strip_mode(&mut self, enabled: bool) {
        if enabled == self.test_strip_mode {
            return;
        }
        self.test_strip_mode = enabled;
        if !enabled {
            self.strips.reset();
        }
        tracing::debug!(enabled, "test-strip mode changed");
        self.events
            .push(SequencerEvent::StripChanged(self.strip_progress()));
    }

    /// Cancel any live timer without changing state.
    ///
    /// A fire for the cancelled timer that is already queued on the host
    /// is ignored when it arrives.
    pub fn teardown(&mut self) {
        self.cancel_timer();
    }

    /// Return to `Setup` with no timer armed and the counter at 0.
    pub fn reset(&mut self) {
        self.cancel_timer();
        if self.state != ExposureState::Setup {
            self.enter(ExposureState::Setup);
        }
    }

    /// Handle a timer fire delivered by the host.
    ///
    /// Returns `false` and does nothing if `token` is not the live timer.
    pub fn on_timer_fired(&mut self, token: TimerToken) -> bool {
        let Some(armed) = self.timer.filter(|armed| armed.token == token) else {
            tracing::debug!(%token, "ignoring stale timer fire");
            return false;
        };
        self.timer = None;
        tracing::debug!(%token, kind = ?armed.kind, "timer fired");

        match armed.kind {
            TimerKind::Exposure => self.enter(ExposureState::Blank),
            TimerKind::Strip { remaining } if remaining <= 1 => {
                tracing::debug!(total = self.strips.total(), "test strips complete");
                self.enter(ExposureState::Blank);
            }
            TimerKind::Strip { remaining } => {
                if self.test_strip_mode
                    && let StripStep::Next(current) = self.strips.advance()
                {
                    tracing::debug!(current, total = self.strips.total(), "next test strip");
                    self.events
                        .push(SequencerEvent::StripChanged(self.strip_progress()));
                }
                self.arm(TimerKind::Strip {
                    remaining: remaining - 1,
                });
            }
        }
        true
    }

    /// Run the transition into `state`.
    fn enter(&mut self, state: ExposureState) {
        self.cancel_timer();
        let previous = self.state;
        self.state = state;
        tracing::info!(from = previous.slug(), to = state.slug(), "exposure state changed");
        self.events.push(SequencerEvent::StateChanged(state));

        match state {
            ExposureState::Setup | ExposureState::Blank => {
                if self.strips.reset() {
                    self.events
                        .push(SequencerEvent::StripChanged(self.strip_progress()));
                }
            }
            ExposureState::Expose => {
                let kind = if self.test_strip_mode {
                    TimerKind::Strip {
                        remaining: self.strips.total() - self.strips.current(),
                    }
                } else {
                    TimerKind::Exposure
                };
                self.arm(kind);
            }
            ExposureState::Align | ExposureState::Hidden => {}
        }
    }

    /// Arm a timer of `kind` for the exposure time, unless timing is
    /// manual.
    fn arm(&mut self, kind: TimerKind) {
        self.cancel_timer();
        let Some(delay) = self.exposure_time.duration() else {
            tracing::debug!("manual exposure, no timer armed");
            return;
        };
        self.generation += 1;
        let token = TimerToken::new(self.generation);
        self.scheduler.schedule(token, delay);
        self.timer = Some(ArmedTimer { token, kind });
        tracing::debug!(%token, ?kind, delay_s = delay.as_secs_f64(), "timer armed");
    }

    fn cancel_timer(&mut self) {
        if let Some(armed) = self.timer.take() {
            self.scheduler.cancel(armed.token);
            tracing::debug!(token = %armed.token, "timer cancelled");
        }
    }
}

impl<S: Scheduler> Drop for Sequencer<S> {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
