//! The embeddable enlarger engine.
//!
//! [`EnlargerSession`] ties the sequencer to the compositor. Every input
//! runs to completion before it returns: the sequencer updates, queued
//! state and strip events go out to observers, and if anything that
//! affects the picture changed a fresh frame is composed and delivered.
//!
//! ```text
//! trigger / timer fire / setter
//!        -> Sequencer (state, strip counter, timer)
//!        -> observers: on_state_change, on_strip_change
//!        -> compose -> observers: on_render
//! ```

use std::time::Duration;

use enlarger_pipeline::{
    ContrastGrade, Dimensions, ExposureState, FrameRequest, ProcessingParams, RenderedFrame,
    SourceImage, StripProgress, compose,
};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::observer::{FnObserver, ObserverRegistry, SessionEvent, SessionObserver, SubscriptionId};
use crate::sequencer::{Sequencer, SequencerEvent};
use crate::timer::{ExposureTime, Scheduler, TimerToken, VirtualScheduler};

/// One printing session: a loaded image, its parameters and the exposure
/// cycle, driven by a host through a [`Scheduler`].
#[derive(Debug)]
pub struct EnlargerSession<S: Scheduler> {
    sequencer: Sequencer<S>,
    params: ProcessingParams,
    source: Option<SourceImage>,
    viewport: Dimensions,
    observers: ObserverRegistry,
}

impl<S: Scheduler> EnlargerSession<S> {
    /// Start a session in `Setup` from `config`, arming timers on
    /// `scheduler`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] if `config` fails
    /// [`SessionConfig::validate`].
    pub fn new(config: &SessionConfig, scheduler: S) -> Result<Self, SessionError> {
        config.validate()?;
        let mut sequencer = Sequencer::new(scheduler, config.total_strips);
        sequencer.set_exposure_time(config.exposure_time());
        sequencer.set_test_strip_mode(config.test_strip_mode);
        // Nobody is subscribed yet.
        sequencer.drain_events();
        tracing::debug!(
            viewport = %config.viewport,
            exposure_time = %config.exposure_time(),
            test_strip_mode = config.test_strip_mode,
            total_strips = config.total_strips,
            "session created"
        );
        Ok(Self {
            sequencer,
            params: config.params.clone(),
            source: None,
            viewport: config.viewport,
            observers: ObserverRegistry::new(),
        })
    }

    // ───────────────────────────── inputs ─────────────────────────────

    /// Replace the source image and recompose.
    pub fn load_image(&mut self, source: SourceImage) {
        tracing::info!(
            dimensions = %source.dimensions(),
            rotated = source.rotated(),
            "image loaded"
        );
        self.source = Some(source);
        self.publish(true);
    }

    /// Decode encoded image bytes (PNG, JPEG, BMP, WebP) and load them.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pipeline`] if the bytes are empty or cannot
    /// be decoded. The previously loaded image is kept.
    pub fn load_image_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let source = SourceImage::decode(bytes)?;
        self.load_image(source);
        Ok(())
    }

    /// Load a raw RGBA8 bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pipeline`] if `raw` does not hold exactly
    /// `width * height` pixels. The previously loaded image is kept.
    pub fn load_raw(&mut self, width: u32, height: u32, raw: Vec<u8>) -> Result<(), SessionError> {
        let source = SourceImage::from_raw(width, height, raw)?;
        self.load_image(source);
        Ok(())
    }

    /// Manual trigger: advance the cycle by one state.
    pub fn trigger(&mut self) -> ExposureState {
        let state = self.sequencer.advance();
        self.publish(false);
        state
    }

    /// Deliver a timer fire from the host.
    ///
    /// Returns `false` if the token is stale (cancelled, replaced, or
    /// already fired); the session is then unchanged.
    pub fn fire_timer(&mut self, token: TimerToken) -> bool {
        let live = self.sequencer.on_timer_fired(token);
        self.publish(false);
        live
    }

    /// Replace all processing parameters and recompose.
    pub fn set_params(&mut self, params: ProcessingParams) {
        self.params = params;
        self.publish(true);
    }

    /// Select the contrast grade.
    pub fn set_contrast_grade(&mut self, grade: ContrastGrade) {
        self.params.contrast_grade = grade;
        self.publish(true);
    }

    /// Set brightness in percent, `[50, 150]`.
    pub fn set_brightness(&mut self, brightness: f64) {
        self.params.brightness = brightness;
        self.publish(true);
    }

    /// Enable or disable tonal inversion.
    pub fn set_invert(&mut self, invert: bool) {
        self.params.invert = invert;
        self.publish(true);
    }

    /// Set the share of the viewport the image occupies, `[0, 100]`.
    pub fn set_scale_percent(&mut self, scale_percent: f64) {
        self.params.scale_percent = scale_percent;
        self.publish(true);
    }

    /// Show or hide the alignment grid.
    pub fn set_show_grid(&mut self, show_grid: bool) {
        self.params.show_grid = show_grid;
        self.publish(true);
    }

    /// Set the exposure time used on the next entry to `Expose`.
    ///
    /// Does not recompose: the picture does not depend on it.
    pub fn set_exposure_time(&mut self, time: ExposureTime) {
        self.sequencer.set_exposure_time(time);
        self.publish(false);
    }

    /// Set the exposure time from operator input. Unusable input means
    /// manual timing.
    pub fn set_exposure_time_input(&mut self, input: &str) {
        self.set_exposure_time(ExposureTime::parse(input));
    }

    /// Enable or disable test-strip mode.
    pub fn set_test_strip_mode(&mut self, enabled: bool) {
        self.sequencer.set_test_strip_mode(enabled);
        self.publish(false);
    }

    /// Resize the display surface and recompose.
    pub fn set_viewport(&mut self, viewport: Dimensions) {
        if viewport == self.viewport {
            return;
        }
        tracing::debug!(%viewport, "viewport changed");
        self.viewport = viewport;
        self.publish(true);
    }

    /// Leave the printing workflow: cancel any timer and return to
    /// `Setup` with the strip counter at 0.
    pub fn exit_workflow(&mut self) {
        tracing::info!("exiting print workflow");
        self.sequencer.reset();
        self.publish(false);
    }

    /// Cancel any live timer without leaving the current state.
    ///
    /// A fire for that timer arriving later, even in the same event turn,
    /// is ignored.
    pub fn teardown(&mut self) {
        self.sequencer.teardown();
    }

    // ─────────────────────────── observers ────────────────────────────

    /// Subscribe an observer to all session events.
    pub fn subscribe<O: SessionObserver + 'static>(&mut self, observer: O) -> SubscriptionId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Subscribe a closure to all session events.
    pub fn subscribe_fn<F>(&mut self, f: F) -> SubscriptionId
    where
        F: FnMut(&SessionEvent<'_>) + 'static,
    {
        self.subscribe(FnObserver::new(f))
    }

    /// Remove a subscription. Returns `false` if it was not active.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ──────────────────────────── queries ─────────────────────────────

    /// Current exposure state.
    #[must_use]
    pub const fn state(&self) -> ExposureState {
        self.sequencer.state()
    }

    /// Strip counter and test-strip mode.
    #[must_use]
    pub const fn strip_progress(&self) -> StripProgress {
        self.sequencer.strip_progress()
    }

    /// Current processing parameters.
    #[must_use]
    pub const fn params(&self) -> &ProcessingParams {
        &self.params
    }

    /// Current viewport.
    #[must_use]
    pub const fn viewport(&self) -> Dimensions {
        self.viewport
    }

    /// The loaded image, if any.
    #[must_use]
    pub const fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    /// Configured exposure time.
    #[must_use]
    pub const fn exposure_time(&self) -> ExposureTime {
        self.sequencer.exposure_time()
    }

    /// Whether test-strip mode is enabled.
    #[must_use]
    pub const fn test_strip_mode(&self) -> bool {
        self.sequencer.test_strip_mode()
    }

    /// Token of the live timer, if one is armed.
    #[must_use]
    pub fn armed_timer(&self) -> Option<TimerToken> {
        self.sequencer.armed_timer()
    }

    /// The scheduler timers are armed on.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        self.sequencer.scheduler()
    }

    /// Compose the frame for the current inputs.
    ///
    /// Returns `None` until an image is loaded.
    #[must_use]
    pub fn compose_frame(&self) -> Option<RenderedFrame> {
        let source = self.source.as_ref()?;
        let strip = self
            .sequencer
            .test_strip_mode()
            .then(|| self.sequencer.strip_progress());
        Some(compose(&FrameRequest {
            source,
            params: &self.params,
            state: self.sequencer.state(),
            strip,
            viewport: self.viewport,
        }))
    }

    // ──────────────────────────── internals ───────────────────────────

    /// Forward queued sequencer events, then recompose if the picture may
    /// have changed.
    fn publish(&mut self, mut invalidated: bool) {
        for event in self.sequencer.drain_events() {
            invalidated = true;
            match event {
                SequencerEvent::StateChanged(state) => {
                    self.observers.emit(&SessionEvent::StateChanged(state));
                }
                SequencerEvent::StripChanged(progress) => {
                    self.observers.emit(&SessionEvent::StripChanged(progress));
                }
            }
        }
        if invalidated {
            self.render();
        }
    }

    fn render(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let Some(frame) = self.compose_frame() else {
            tracing::debug!("no image loaded, nothing to render");
            return;
        };
        self.observers.emit(&SessionEvent::Rendered(&frame));
    }
}

impl EnlargerSession<VirtualScheduler> {
    /// A session on a simulated clock starting at zero.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] if `config` fails
    /// [`SessionConfig::validate`].
    pub fn simulated(config: &SessionConfig) -> Result<Self, SessionError> {
        Self::new(config, VirtualScheduler::new())
    }

    /// Simulated time since the session was created.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.sequencer.scheduler().now()
    }

    /// Deadline of the next pending timer on the simulated clock.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.sequencer.scheduler().next_deadline()
    }

    /// Move the simulated clock forward by `by`, firing every timer that
    /// falls due on the way, including timers armed by earlier fires.
    ///
    /// Returns the number of timers fired.
    pub fn advance_clock(&mut self, by: Duration) -> usize {
        let until = self.now().saturating_add(by);
        let mut fired = 0;
        while let Some(token) = self.sequencer.scheduler_mut().pop_due(until) {
            if self.fire_timer(token) {
                fired += 1;
            }
        }
        self.sequencer.scheduler_mut().set_clock(until);
        fired
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use enlarger_pipeline::RgbaImage;
    use image::Rgba;

    use super::*;

    fn session() -> EnlargerSession<VirtualScheduler> {
        EnlargerSession::simulated(&SessionConfig {
            viewport: Dimensions::new(16, 9),
            ..SessionConfig::default()
        })
        .unwrap()
    }

    fn white() -> SourceImage {
        SourceImage::new(RgbaImage::from_pixel(16, 9, Rgba([255, 255, 255, 255])))
    }

    fn render_count(session: &mut EnlargerSession<VirtualScheduler>) -> Rc<RefCell<usize>> {
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        session.subscribe_fn(move |event| {
            if matches!(event, SessionEvent::Rendered(_)) {
                *sink.borrow_mut() += 1;
            }
        });
        count
    }

    #[test]
    fn zero_strips_rejected_at_construction() {
        let result = EnlargerSession::simulated(&SessionConfig {
            total_strips: 0,
            ..SessionConfig::default()
        });
        assert!(matches!(result, Err(SessionError::InvalidConfig(_))));
    }

    #[test]
    fn config_is_applied() {
        let session = EnlargerSession::simulated(&SessionConfig {
            exposure_time_seconds: Some(4.0),
            test_strip_mode: true,
            total_strips: 3,
            ..SessionConfig::default()
        })
        .unwrap();
        assert_eq!(session.state(), ExposureState::Setup);
        assert_eq!(session.exposure_time(), ExposureTime::Timed(Duration::from_secs(4)));
        assert!(session.test_strip_mode());
        assert_eq!(session.strip_progress().total, 3);
    }

    #[test]
    fn no_image_means_no_frame() {
        let mut session = session();
        let renders = render_count(&mut session);
        assert!(session.compose_frame().is_none());
        session.trigger();
        session.set_brightness(120.0);
        assert_eq!(*renders.borrow(), 0);
    }

    #[test]
    fn loading_an_image_renders() {
        let mut session = session();
        let renders = render_count(&mut session);
        session.load_image(white());
        assert_eq!(*renders.borrow(), 1);
        assert!(session.compose_frame().unwrap().is_painted());
    }

    #[test]
    fn setters_recompose_but_exposure_time_does_not() {
        let mut session = session();
        session.load_image(white());
        let renders = render_count(&mut session);
        session.set_contrast_grade(ContrastGrade::GRADE_5);
        session.set_invert(false);
        session.set_scale_percent(50.0);
        session.set_show_grid(true);
        assert_eq!(*renders.borrow(), 4);
        session.set_exposure_time_input("8");
        assert_eq!(*renders.borrow(), 4);
        assert_eq!(session.exposure_time(), ExposureTime::Timed(Duration::from_secs(8)));
    }

    #[test]
    fn unchanged_viewport_does_not_recompose() {
        let mut session = session();
        session.load_image(white());
        let renders = render_count(&mut session);
        session.set_viewport(Dimensions::new(16, 9));
        assert_eq!(*renders.borrow(), 0);
        session.set_viewport(Dimensions::new(32, 18));
        assert_eq!(*renders.borrow(), 1);
        assert_eq!(session.compose_frame().unwrap().dimensions(), Dimensions::new(32, 18));
    }

    #[test]
    fn bad_bytes_keep_previous_image() {
        let mut session = session();
        session.load_image(white());
        assert!(session.load_image_bytes(&[1, 2, 3]).is_err());
        assert!(session.load_image_bytes(&[]).is_err());
        assert_eq!(session.source().unwrap().dimensions(), Dimensions::new(16, 9));
    }

    #[test]
    fn load_raw_checks_buffer() {
        let mut session = session();
        assert!(session.load_raw(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            session.load_raw(2, 2, vec![0; 3]),
            Err(SessionError::Pipeline(_))
        ));
    }

    #[test]
    fn advance_clock_reports_fires() {
        let mut session = session();
        session.set_exposure_time(ExposureTime::Timed(Duration::from_secs(2)));
        session.set_test_strip_mode(true);
        for _ in 0..3 {
            session.trigger();
        }
        assert_eq!(session.next_deadline(), Some(Duration::from_secs(2)));
        assert_eq!(session.advance_clock(Duration::from_secs(10)), 5);
        assert_eq!(session.now(), Duration::from_secs(10));
        assert_eq!(session.state(), ExposureState::Blank);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn stale_fire_is_reported() {
        let mut session = session();
        session.set_exposure_time(ExposureTime::Timed(Duration::from_secs(2)));
        for _ in 0..3 {
            session.trigger();
        }
        let token = session.armed_timer().unwrap();
        session.teardown();
        assert!(!session.fire_timer(token));
        assert_eq!(session.state(), ExposureState::Expose);
    }

    #[test]
    fn exit_workflow_returns_to_setup() {
        let mut session = session();
        session.set_exposure_time(ExposureTime::Timed(Duration::from_secs(2)));
        for _ in 0..3 {
            session.trigger();
        }
        session.exit_workflow();
        assert_eq!(session.state(), ExposureState::Setup);
        assert!(session.armed_timer().is_none());
        assert_eq!(session.advance_clock(Duration::from_secs(5)), 0);
        assert_eq!(session.state(), ExposureState::Setup);
    }
}
