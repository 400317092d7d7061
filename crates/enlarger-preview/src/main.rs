//! enlarger-preview: run one printing cycle on an image and save every frame.
//!
//! Loads an image into an enlarger session, walks it through
//! Setup -> Align -> Hidden -> Expose -> Blank -> Setup, and writes each
//! frame the session renders as `NNN-<state>.png`. Timed exposures and
//! test strips run on a simulated clock by default, so a 60 second
//! exposure finishes instantly; `--realtime` sleeps through them instead.
//!
//! Useful for:
//!
//! - Checking grade tints and brightness on a real negative
//! - Inspecting test-strip crops strip by strip
//! - Watching the event order observers receive
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin enlarger-preview -- [OPTIONS] --output-dir <DIR> <IMAGE_PATH>
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use enlarger_pipeline::{
    ContrastGrade, Dimensions, ExposureState, ProcessingParams, RenderedFrame, ResampleFilter,
    StripProgress,
};
use enlarger_session::{EnlargerSession, ExposureTime, SessionConfig, SessionObserver, VirtualScheduler};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Preview a darkroom printing cycle.
///
/// Runs one full exposure cycle on an image and writes every rendered
/// frame to the output directory.
#[derive(Parser)]
#[command(name = "enlarger-preview", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Directory the rendered frames are written to. Created if missing.
    #[arg(long)]
    output_dir: PathBuf,

    /// Viewport size as WIDTHxHEIGHT.
    #[arg(long, default_value_t = SessionConfig::DEFAULT_VIEWPORT, value_parser = parse_viewport)]
    viewport: Dimensions,

    /// Contrast grade, 0 to 5 in steps of 0.5.
    #[arg(long, default_value_t = ProcessingParams::DEFAULT_CONTRAST_GRADE.value())]
    grade: f64,

    /// Brightness in percent (50-150).
    #[arg(long, default_value_t = ProcessingParams::DEFAULT_BRIGHTNESS)]
    brightness: f64,

    /// Print the image as-is instead of inverting it.
    #[arg(long)]
    no_invert: bool,

    /// Share of the viewport the image fills, in percent (0-100).
    #[arg(long, default_value_t = ProcessingParams::DEFAULT_SCALE_PERCENT)]
    scale: f64,

    /// Draw the alignment grid in Setup and Align.
    #[arg(long)]
    grid: bool,

    /// Exposure time in seconds. Omitted, zero, or unparsable means the
    /// exposure is ended by a manual trigger.
    #[arg(long)]
    exposure_time: Option<String>,

    /// Enable test-strip mode with this many strips.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    test_strips: Option<u32>,

    /// Resampling filter (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Full session config as a JSON string.
    ///
    /// When provided, all other session flags are ignored. The JSON must
    /// be a valid `SessionConfig` serialization; missing fields take
    /// their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Sleep through timed exposures instead of simulating the clock.
    #[arg(long)]
    realtime: bool,

    /// Print the event log as JSON on stdout.
    #[arg(long)]
    json: bool,
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

/// Maps a [`ResampleFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: ResampleFilter) -> Filter {
    match f {
        ResampleFilter::Nearest => Filter::Nearest,
        ResampleFilter::Triangle => Filter::Triangle,
        ResampleFilter::CatmullRom => Filter::CatmullRom,
        ResampleFilter::Gaussian => Filter::Gaussian,
        ResampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from
/// [`ProcessingParams::DEFAULT_RESAMPLE`] so the two cannot silently
/// diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(ProcessingParams::DEFAULT_RESAMPLE);

/// Parse `WIDTHxHEIGHT`.
fn parse_viewport(s: &str) -> Result<Dimensions, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: u32 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height: u32 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("viewport must not be empty, got {width}x{height}"));
    }
    Ok(Dimensions::new(width, height))
}

/// Build a [`SessionConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual session flags are ignored. Otherwise, a config is assembled
/// from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<SessionConfig, String> {
    if let Some(ref json) = cli.config_json {
        return SessionConfig::from_json(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let contrast_grade = ContrastGrade::try_from(cli.grade)?;
    let exposure_time = cli
        .exposure_time
        .as_deref()
        .map_or(ExposureTime::Manual, ExposureTime::parse);

    Ok(SessionConfig {
        params: ProcessingParams {
            contrast_grade,
            brightness: cli.brightness,
            invert: !cli.no_invert,
            scale_percent: cli.scale,
            show_grid: cli.grid,
            resample: match cli.filter {
                Filter::Nearest => ResampleFilter::Nearest,
                Filter::Triangle => ResampleFilter::Triangle,
                Filter::CatmullRom => ResampleFilter::CatmullRom,
                Filter::Gaussian => ResampleFilter::Gaussian,
                Filter::Lanczos3 => ResampleFilter::Lanczos3,
            },
            ..ProcessingParams::default()
        },
        exposure_time_seconds: exposure_time.duration().map(|d| d.as_secs_f64()),
        test_strip_mode: cli.test_strips.is_some(),
        total_strips: cli.test_strips.unwrap_or(SessionConfig::DEFAULT_TOTAL_STRIPS),
        viewport: cli.viewport,
    })
}

// ───────────────────────────── event log ─────────────────────────────────

/// One logged session event.
#[derive(Serialize)]
struct LogEntry {
    /// Session clock when the event was observed, in seconds.
    at_seconds: f64,
    #[serde(flatten)]
    event: LoggedEvent,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum LoggedEvent {
    State {
        state: ExposureState,
        label: &'static str,
    },
    Strip(StripProgress),
    Frame {
        file: String,
        painted: bool,
    },
}

/// Captured but not yet written or timestamped.
enum Captured {
    State(ExposureState),
    Strip(StripProgress),
    Frame(RenderedFrame),
}

/// Observer that queues everything the session reports.
struct Capture {
    queue: Rc<RefCell<Vec<Captured>>>,
}

impl SessionObserver for Capture {
    fn on_state_change(&mut self, state: ExposureState) {
        self.queue.borrow_mut().push(Captured::State(state));
    }

    fn on_strip_change(&mut self, progress: StripProgress) {
        self.queue.borrow_mut().push(Captured::Strip(progress));
    }

    fn on_render(&mut self, frame: &RenderedFrame, _viewport: Dimensions) {
        self.queue.borrow_mut().push(Captured::Frame(frame.clone()));
    }
}

/// Writes captured frames and builds the event log.
struct Recorder {
    output_dir: PathBuf,
    queue: Rc<RefCell<Vec<Captured>>>,
    state: ExposureState,
    frames_written: usize,
    log: Vec<LogEntry>,
}

impl Recorder {
    fn new(output_dir: &Path, queue: Rc<RefCell<Vec<Captured>>>) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            queue,
            state: ExposureState::Setup,
            frames_written: 0,
            log: Vec::new(),
        }
    }

    /// Write out everything captured since the last flush, stamped with
    /// `now`.
    fn flush(&mut self, now: Duration) -> Result<(), String> {
        let captured = std::mem::take(&mut *self.queue.borrow_mut());
        for item in captured {
            let event = match item {
                Captured::State(state) => {
                    self.state = state;
                    tracing::info!(at_s = now.as_secs_f64(), "{state}: {}", state.description());
                    LoggedEvent::State {
                        state,
                        label: state.label(),
                    }
                }
                Captured::Strip(progress) => {
                    tracing::info!(
                        at_s = now.as_secs_f64(),
                        current = progress.current,
                        total = progress.total,
                        test_strip_mode = progress.test_strip_mode,
                        "strip"
                    );
                    LoggedEvent::Strip(progress)
                }
                Captured::Frame(frame) => self.write_frame(&frame)?,
            };
            self.log.push(LogEntry {
                at_seconds: now.as_secs_f64(),
                event,
            });
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &RenderedFrame) -> Result<LoggedEvent, String> {
        let file = format!("{:03}-{}.png", self.frames_written, self.state.slug());
        let path = self.output_dir.join(&file);
        frame
            .to_rgba()
            .save(&path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        self.frames_written += 1;
        tracing::info!(file = %file, painted = frame.is_painted(), "frame written");
        Ok(LoggedEvent::Frame {
            file,
            painted: frame.is_painted(),
        })
    }
}

// ───────────────────────────── main ──────────────────────────────────────

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Fire pending timers until none are left, sleeping in between when
/// `realtime` is set.
fn run_timers(
    session: &mut EnlargerSession<VirtualScheduler>,
    recorder: &mut Recorder,
    realtime: bool,
) -> Result<(), String> {
    while let Some(deadline) = session.next_deadline() {
        let wait = deadline.saturating_sub(session.now());
        if realtime {
            tracing::info!(wait_s = wait.as_secs_f64(), "waiting for timer");
            std::thread::sleep(wait);
        }
        session.advance_clock(wait);
        recorder.flush(session.now())?;
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<Vec<LogEntry>, String> {
    let config = config_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
    std::fs::create_dir_all(&cli.output_dir)
        .map_err(|e| format!("Error creating {}: {e}", cli.output_dir.display()))?;

    tracing::info!(
        image = %cli.image_path.display(),
        bytes = image_bytes.len(),
        viewport = %config.viewport,
        grade = %config.params.contrast_grade,
        exposure_time = %config.exposure_time(),
        test_strip_mode = config.test_strip_mode,
        total_strips = config.total_strips,
        "starting preview"
    );

    let queue = Rc::new(RefCell::new(Vec::new()));
    let mut recorder = Recorder::new(&cli.output_dir, Rc::clone(&queue));
    let mut session = EnlargerSession::simulated(&config)
        .map_err(|e| format!("Invalid configuration: {e}"))?;
    session.subscribe(Capture { queue });

    session
        .load_image_bytes(&image_bytes)
        .map_err(|e| format!("Error loading {}: {e}", cli.image_path.display()))?;
    recorder.flush(session.now())?;

    // Setup -> Align -> Hidden -> Expose.
    for _ in 0..3 {
        session.trigger();
        recorder.flush(session.now())?;
    }

    if session.armed_timer().is_some() {
        run_timers(&mut session, &mut recorder, cli.realtime)?;
    } else {
        tracing::info!("manual exposure, triggering Blank");
        session.trigger();
        recorder.flush(session.now())?;
    }

    // Blank -> Setup.
    if session.state() == ExposureState::Blank {
        session.trigger();
        recorder.flush(session.now())?;
    }

    tracing::info!(
        frames = recorder.frames_written,
        elapsed_s = session.now().as_secs_f64(),
        output_dir = %cli.output_dir.display(),
        "cycle complete"
    );
    Ok(recorder.log)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let log = match run(&cli) {
        Ok(log) => log,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&log) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing event log: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["enlarger-preview", "photo.png", "--output-dir", "out"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn viewport_parses() {
        assert_eq!(parse_viewport("800x600").unwrap(), Dimensions::new(800, 600));
        assert_eq!(parse_viewport("64X32").unwrap(), Dimensions::new(64, 32));
        assert!(parse_viewport("800").is_err());
        assert!(parse_viewport("0x600").is_err());
        assert!(parse_viewport("axb").is_err());
    }

    #[test]
    fn defaults_match_library_defaults() {
        let config = config_from_cli(&cli(&[])).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn flags_build_config() {
        let config = config_from_cli(&cli(&[
            "--grade",
            "4.5",
            "--no-invert",
            "--grid",
            "--exposure-time",
            "12",
            "--test-strips",
            "7",
            "--filter",
            "nearest",
            "--viewport",
            "320x200",
        ]))
        .unwrap();
        assert_eq!(config.params.contrast_grade, ContrastGrade::from_grade(4.5).unwrap());
        assert!(!config.params.invert);
        assert!(config.params.show_grid);
        assert_eq!(config.params.resample, ResampleFilter::Nearest);
        assert_eq!(config.exposure_time(), ExposureTime::Timed(Duration::from_secs(12)));
        assert!(config.test_strip_mode);
        assert_eq!(config.total_strips, 7);
        assert_eq!(config.viewport, Dimensions::new(320, 200));
    }

    #[test]
    fn bad_exposure_time_means_manual() {
        let config = config_from_cli(&cli(&["--exposure-time", "later"])).unwrap();
        assert_eq!(config.exposure_time(), ExposureTime::Manual);
    }

    #[test]
    fn off_table_grade_is_rejected() {
        assert!(config_from_cli(&cli(&["--grade", "2.2"])).is_err());
    }

    #[test]
    fn config_json_overrides_flags() {
        let config = config_from_cli(&cli(&[
            "--grade",
            "5",
            "--config-json",
            r#"{"total_strips": 3}"#,
        ]))
        .unwrap();
        assert_eq!(config.total_strips, 3);
        assert_eq!(config.params.contrast_grade, ContrastGrade::GRADE_2);
    }

    #[test]
    fn zero_test_strips_rejected_by_parser() {
        let argv = ["enlarger-preview", "p.png", "--output-dir", "o", "--test-strips", "0"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn default_filter_matches_pipeline() {
        assert!(matches!(CLI_DEFAULT_FILTER, Filter::Triangle));
    }
}
