//! Integration test: drive whole printing cycles through a session on a
//! simulated clock and check what observers see.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use enlarger_pipeline::{
    ContrastGrade, Dimensions, ExposureState, ProcessingParams, RenderedFrame, ResampleFilter,
    SourceImage, StripProgress,
};
use enlarger_session::{
    EnlargerSession, ExposureTime, SessionConfig, SessionEvent, SessionObserver, VirtualScheduler,
};
use image::{Rgba, RgbaImage};

const VIEWPORT: Dimensions = Dimensions::new(100, 50);

/// Everything observers were told, in order.
#[derive(Debug, Clone)]
enum Seen {
    State(ExposureState),
    Strip(StripProgress),
    Frame(Option<RgbaImage>),
}

#[derive(Default)]
struct Recorder {
    seen: Rc<RefCell<Vec<Seen>>>,
}

impl SessionObserver for Recorder {
    fn on_state_change(&mut self, state: ExposureState) {
        self.seen.borrow_mut().push(Seen::State(state));
    }

    fn on_strip_change(&mut self, progress: StripProgress) {
        self.seen.borrow_mut().push(Seen::Strip(progress));
    }

    fn on_render(&mut self, frame: &RenderedFrame, viewport: Dimensions) {
        assert_eq!(viewport, frame.dimensions());
        self.seen
            .borrow_mut()
            .push(Seen::Frame(frame.image().cloned()));
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        params: ProcessingParams {
            invert: false,
            resample: ResampleFilter::Nearest,
            ..ProcessingParams::default()
        },
        viewport: VIEWPORT,
        ..SessionConfig::default()
    }
}

fn white_session(config: &SessionConfig) -> (EnlargerSession<VirtualScheduler>, Rc<RefCell<Vec<Seen>>>) {
    let mut session = EnlargerSession::simulated(config).unwrap();
    session.load_image(SourceImage::new(RgbaImage::from_pixel(
        100,
        50,
        Rgba([255, 255, 255, 255]),
    )));
    let recorder = Recorder::default();
    let seen = Rc::clone(&recorder.seen);
    session.subscribe(recorder);
    (session, seen)
}

fn states(seen: &[Seen]) -> Vec<ExposureState> {
    seen.iter()
        .filter_map(|s| match s {
            Seen::State(state) => Some(*state),
            _ => None,
        })
        .collect()
}

fn strips(seen: &[Seen]) -> Vec<u32> {
    seen.iter()
        .filter_map(|s| match s {
            Seen::Strip(progress) => Some(progress.current),
            _ => None,
        })
        .collect()
}

fn last_frame(seen: &[Seen]) -> Option<RgbaImage> {
    seen.iter().rev().find_map(|s| match s {
        Seen::Frame(frame) => Some(frame.clone()),
        _ => None,
    })?
}

fn lit_columns(frame: &RgbaImage) -> usize {
    (0..frame.width())
        .filter(|&x| frame.get_pixel(x, 0).0 != [0, 0, 0, 255])
        .count()
}

const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn n_triggers_land_on_n_mod_5() {
    let (mut session, seen) = white_session(&config());
    for n in 1..=17 {
        let state = session.trigger();
        assert_eq!(state, ExposureState::ALL[n % 5]);
    }
    let expected: Vec<_> = (1..=17).map(|n| ExposureState::ALL[n % 5]).collect();
    assert_eq!(states(&seen.borrow()), expected);
}

#[test]
fn timed_exposure_blanks_after_exactly_t() {
    let (mut session, seen) = white_session(&SessionConfig {
        exposure_time_seconds: Some(6.0),
        ..config()
    });
    for _ in 0..3 {
        session.trigger();
    }
    assert_eq!(session.state(), ExposureState::Expose);

    session.advance_clock(ms(5999));
    assert_eq!(session.state(), ExposureState::Expose);
    session.advance_clock(ms(1));
    assert_eq!(session.state(), ExposureState::Blank);

    let observed = states(&seen.borrow());
    assert_eq!(observed.last(), Some(&ExposureState::Blank));
    assert_eq!(observed.len(), 4, "Blank reached without a manual trigger");
}

#[test]
fn test_strips_count_then_blank_after_five_t() {
    let t = 3000;
    let (mut session, seen) = white_session(&SessionConfig {
        exposure_time_seconds: Some(3.0),
        test_strip_mode: true,
        total_strips: 5,
        ..config()
    });
    for _ in 0..3 {
        session.trigger();
    }
    let eps = 10;
    for k in 0..5u32 {
        let target = ms(u64::from(k) * t + eps);
        session.advance_clock(target - session.now());
        assert_eq!(session.strip_progress().current, k, "at {target:?}");
        assert_eq!(session.state(), ExposureState::Expose);
    }
    session.advance_clock(ms(5 * t) - session.now());
    assert_eq!(session.state(), ExposureState::Blank);
    assert_eq!(session.strip_progress().current, 0);
    // The terminal value 5 is never reported.
    assert_eq!(strips(&seen.borrow()), [1, 2, 3, 4, 0]);
}

#[test]
fn strip_mode_off_mid_run_blanks_on_schedule() {
    let (mut session, seen) = white_session(&SessionConfig {
        exposure_time_seconds: Some(1.0),
        test_strip_mode: true,
        ..config()
    });
    for _ in 0..3 {
        session.trigger();
    }
    session.advance_clock(ms(3500));
    session.set_test_strip_mode(false);

    session.advance_clock(ms(1499));
    assert_eq!(session.state(), ExposureState::Expose);
    session.advance_clock(ms(1));
    assert_eq!(session.state(), ExposureState::Blank);
    assert_eq!(session.now(), ms(5000));

    let reported: Vec<(u32, bool)> = seen
        .borrow()
        .iter()
        .filter_map(|s| match s {
            Seen::Strip(p) => Some((p.current, p.test_strip_mode)),
            _ => None,
        })
        .collect();
    assert_eq!(reported, [(1, true), (2, true), (3, true), (0, false)]);
}

#[test]
fn test_strips_reveal_cumulatively() {
    let (mut session, seen) = white_session(&SessionConfig {
        exposure_time_seconds: Some(1.0),
        test_strip_mode: true,
        ..config()
    });
    for _ in 0..3 {
        session.trigger();
    }
    let mut widths = vec![lit_columns(&last_frame(&seen.borrow()).unwrap())];
    for _ in 0..4 {
        session.advance_clock(ms(1000));
        widths.push(lit_columns(&last_frame(&seen.borrow()).unwrap()));
    }
    assert_eq!(widths, [20, 40, 60, 80, 100]);
}

#[test]
fn white_pixel_through_grade_2_is_exact() {
    let (session, _) = white_session(&config());
    let frame = session.compose_frame().unwrap();
    let image = frame.image().unwrap();
    assert!(image.pixels().all(|p| p.0 == [150, 180, 150, 255]));
}

#[test]
fn recomposition_is_byte_identical() {
    let (mut session, seen) = white_session(&config());
    session.set_show_grid(true);
    let first = last_frame(&seen.borrow()).unwrap();
    session.set_show_grid(false);
    session.set_show_grid(true);
    let second = last_frame(&seen.borrow()).unwrap();
    assert_eq!(first.as_raw(), second.as_raw());
}

#[test]
fn align_is_red_at_every_grade() {
    let (mut session, seen) = white_session(&config());
    session.trigger();
    assert_eq!(session.state(), ExposureState::Align);
    for grade in [ContrastGrade::GRADE_0, ContrastGrade::GRADE_2, ContrastGrade::GRADE_5] {
        session.set_contrast_grade(grade);
        let frame = last_frame(&seen.borrow()).unwrap();
        assert!(
            frame.pixels().all(|p| p.0 == [50, 0, 0, 255]),
            "grade {grade} leaked into the alignment view"
        );
    }
}

#[test]
fn hidden_and_blank_render_nothing() {
    let (mut session, seen) = white_session(&config());
    session.trigger();
    session.trigger();
    assert_eq!(session.state(), ExposureState::Hidden);
    assert!(last_frame(&seen.borrow()).is_none());
    session.trigger();
    assert!(last_frame(&seen.borrow()).is_some());
    session.trigger();
    assert_eq!(session.state(), ExposureState::Blank);
    assert!(last_frame(&seen.borrow()).is_none());
}

#[test]
fn manual_trigger_cancels_pending_timer() {
    let (mut session, seen) = white_session(&SessionConfig {
        exposure_time_seconds: Some(4.0),
        ..config()
    });
    for _ in 0..3 {
        session.trigger();
    }
    session.advance_clock(ms(1000));
    session.trigger();
    session.trigger();
    assert_eq!(session.state(), ExposureState::Setup);

    session.advance_clock(ms(60_000));
    assert_eq!(session.state(), ExposureState::Setup);
    assert_eq!(
        states(&seen.borrow()),
        [
            ExposureState::Align,
            ExposureState::Hidden,
            ExposureState::Expose,
            ExposureState::Blank,
            ExposureState::Setup,
        ],
        "no ghost transition from the cancelled timer"
    );
}

#[test]
fn malformed_exposure_time_means_manual() {
    let (mut session, _) = white_session(&config());
    session.set_exposure_time_input("soon");
    assert_eq!(session.exposure_time(), ExposureTime::Manual);
    for _ in 0..3 {
        session.trigger();
    }
    session.advance_clock(ms(3_600_000));
    assert_eq!(session.state(), ExposureState::Expose);
    session.trigger();
    assert_eq!(session.state(), ExposureState::Blank);
}

#[test]
fn exit_workflow_mid_run_resets_everything() {
    let (mut session, seen) = white_session(&SessionConfig {
        exposure_time_seconds: Some(2.0),
        test_strip_mode: true,
        ..config()
    });
    for _ in 0..3 {
        session.trigger();
    }
    session.advance_clock(ms(4500));
    assert_eq!(session.strip_progress().current, 2);

    session.exit_workflow();
    assert_eq!(session.state(), ExposureState::Setup);
    assert_eq!(session.strip_progress().current, 0);
    assert_eq!(session.advance_clock(ms(30_000)), 0);

    let seen = seen.borrow();
    assert_eq!(states(&seen).last(), Some(&ExposureState::Setup));
    assert_eq!(strips(&seen), [1, 2, 0]);
}

#[test]
fn unsubscribed_observer_stops_hearing() {
    let mut session = EnlargerSession::simulated(&config()).unwrap();
    let count = Rc::new(RefCell::new(0_usize));
    let sink = Rc::clone(&count);
    let id = session.subscribe_fn(move |event| {
        if let SessionEvent::StateChanged(_) = event {
            *sink.borrow_mut() += 1;
        }
    });
    session.trigger();
    assert!(session.unsubscribe(id));
    session.trigger();
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn portrait_image_is_drawn_landscape() {
    let mut session = EnlargerSession::simulated(&config()).unwrap();
    let recorder = Recorder::default();
    let seen = Rc::clone(&recorder.seen);
    session.subscribe(recorder);
    session.load_image(SourceImage::new(RgbaImage::from_pixel(
        50,
        100,
        Rgba([255, 255, 255, 255]),
    )));
    assert!(session.source().unwrap().rotated());
    let frame = last_frame(&seen.borrow()).unwrap();
    // Rotated to 100x50, which fills the 100x50 viewport exactly.
    assert!(frame.pixels().all(|p| p.0 == [150, 180, 150, 255]));
}
