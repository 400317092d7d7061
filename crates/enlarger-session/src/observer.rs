//! Observer subscriptions.
//!
//! Display collaborators subscribe to a session and are told about every
//! state transition, strip counter change and recomposed frame. Events
//! are delivered synchronously, in subscription order, before the call
//! that caused them returns.

use std::fmt;

use enlarger_pipeline::{Dimensions, ExposureState, RenderedFrame, StripProgress};

/// Handle returned by [`ObserverRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription#{}", self.0)
    }
}

/// Something that happened in a session.
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent<'a> {
    /// The exposure state changed.
    StateChanged(ExposureState),
    /// The strip counter or test-strip mode changed.
    StripChanged(StripProgress),
    /// A frame was recomposed for the current viewport.
    Rendered(&'a RenderedFrame),
}

impl SessionEvent<'_> {
    /// Short event name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "state",
            Self::StripChanged(_) => "strip",
            Self::Rendered(_) => "render",
        }
    }
}

/// Receives session events. Every method defaults to doing nothing.
pub trait SessionObserver {
    /// Called on every state transition.
    fn on_state_change(&mut self, _state: ExposureState) {}

    /// Called whenever the strip counter or test-strip mode changes.
    fn on_strip_change(&mut self, _progress: StripProgress) {}

    /// Called with each recomposed frame and the viewport it was sized
    /// for.
    fn on_render(&mut self, _frame: &RenderedFrame, _viewport: Dimensions) {}
}

/// Adapts a closure taking [`SessionEvent`] into a [`SessionObserver`].
pub struct FnObserver<F>(F);

impl<F: FnMut(&SessionEvent<'_>)> FnObserver<F> {
    /// Wrap `f`.
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: FnMut(&SessionEvent<'_>)> SessionObserver for FnObserver<F> {
    fn on_state_change(&mut self, state: ExposureState) {
        (self.0)(&SessionEvent::StateChanged(state));
    }

    fn on_strip_change(&mut self, progress: StripProgress) {
        (self.0)(&SessionEvent::StripChanged(progress));
    }

    fn on_render(&mut self, frame: &RenderedFrame, _viewport: Dimensions) {
        (self.0)(&SessionEvent::Rendered(frame));
    }
}

/// Ordered set of subscribed observers.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(SubscriptionId, Box<dyn SessionObserver>)>,
}

impl ObserverRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. It receives events from the next emission on.
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        tracing::debug!(%id, "observer subscribed");
        id
    }

    /// Remove an observer. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        let removed = self.observers.len() != before;
        if removed {
            tracing::debug!(%id, "observer unsubscribed");
        }
        removed
    }

    /// Number of subscribed observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `event` to every observer in subscription order.
    pub fn emit(&mut self, event: &SessionEvent<'_>) {
        for (_, observer) in &mut self.observers {
            match *event {
                SessionEvent::StateChanged(state) => observer.on_state_change(state),
                SessionEvent::StripChanged(progress) => observer.on_strip_change(progress),
                SessionEvent::Rendered(frame) => observer.on_render(frame, frame.dimensions()),
            }
        }
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("next_id", &self.next_id)
            .field("observers", &self.observers.len())
            .finish()
    }
}
