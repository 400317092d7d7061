//! enlarger-session: Exposure sequencing and the embeddable enlarger engine.
//!
//! Drives the five-state printing cycle
//! (Setup -> Align -> Hidden -> Expose -> Blank -> Setup ...) with
//! optional timed exposures and test-strip runs, and recomposes the
//! projected frame through `enlarger-pipeline` whenever an input changes.
//!
//! The crate never sleeps or spawns. Timers are delegated to a host
//! [`Scheduler`]; [`VirtualScheduler`] provides a simulated clock for
//! tests and offline previews.

pub mod config;
pub mod error;
pub mod observer;
pub mod sequencer;
pub mod session;
pub mod strip;
pub mod timer;

pub use config::SessionConfig;
pub use error::SessionError;
pub use observer::{FnObserver, SessionEvent, SessionObserver, SubscriptionId};
pub use sequencer::{Sequencer, SequencerEvent};
pub use session::EnlargerSession;
pub use strip::{DEFAULT_TOTAL_STRIPS, StripCounter};
pub use timer::{ExposureTime, Scheduler, TimerToken, VirtualScheduler};
