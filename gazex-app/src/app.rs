use crate::args::Args;
use crate::sim::SimulatedTracker;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use gazex_core::{Display, DisplayError, EyeAvailability, Rgb, ScreenRect};
use gazex_render::{FrameSink, NullSink, PngSequence, SkiaDisplay};
use gazex_session::{SessionConfig, SessionController, TerminationReport};
use gazex_timing::{HighPrecisionTimer, Timer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tiny_skia::Pixmap;

const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
const TEXT_PX: f32 = 25.0;
const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);
const TRACK_BACKGROUND: Rgb = Rgb(128, 128, 128);
const MARKER_COLOR: Rgb = Rgb(255, 0, 0);
const MARKER_PX: f32 = 20.0;

/// Where presented frames end up.
pub enum AppSink {
    Null(NullSink),
    Png(PngSequence),
}

impl FrameSink for AppSink {
    fn present(&mut self, frame: &Pixmap) -> Result<(), DisplayError> {
        match self {
            AppSink::Null(sink) => sink.present(frame),
            AppSink::Png(sink) => sink.present(frame),
        }
    }
}

type Session = SessionController<SimulatedTracker, SkiaDisplay<AppSink>, HighPrecisionTimer>;

pub struct App {
    session: Session,
    track_ticks: u32,
    frame_timer: HighPrecisionTimer,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let config = session_config(&args, Local::now())?;
        let display = open_display(&args)?;
        let screen = ScreenRect::new(args.width, args.height);
        let seed = args.seed.unwrap_or_else(rand::random);
        log::info!("simulated tracker seed {}", seed);

        let tracker = SimulatedTracker::new(
            screen,
            args.generation,
            args.version_string.clone(),
            EyeAvailability::from(args.eye),
            seed,
        );
        let session = SessionController::open(tracker, display, HighPrecisionTimer::new(), config)
            .context("opening tracker session")?;

        Ok(Self {
            session,
            track_ticks: args.track_ticks,
            frame_timer: HighPrecisionTimer::new(),
        })
    }

    pub fn run(mut self) -> Result<TerminationReport> {
        println!("=== GAZE RECORDING SESSION ===");
        println!("Platform: {}", std::env::consts::OS);
        println!("Subject trace: {}", self.session.trace_files().remote_name());
        println!(
            "Tracker profile: generation {}, software {}\n",
            self.session.profile().generation,
            self.session.profile().software_version
        );

        // A failed block still gets a clean shutdown so the trace is saved.
        if let Err(e) = self.record_blocks() {
            log::error!("session block aborted: {:#}", e);
        }
        if let Err(e) = self.session.stop_recording() {
            log::error!("stopping recording: {}", e);
        }
        let report = self.session.terminate()?;

        println!("\nSession terminated.");
        for (step, error) in &report.failures {
            println!("  {:?} failed: {}", step, error);
        }
        match &report.conversion {
            Some(Ok(path)) => println!("  Converted trace: {}", path.display()),
            Some(Err(e)) => println!("  Conversion failed: {}", e),
            None => println!("  No trace reached the host."),
        }
        println!(
            "  Frames presented: {}",
            self.session.display_mut().frames_presented()
        );
        Ok(report)
    }

    fn record_blocks(&mut self) -> Result<()> {
        self.session.start_recording()?;
        self.track_gaze()?;

        self.session.calibrate()?;
        self.session.resume_recording()?;
        self.track_gaze()?;

        if let Some(gaze) = self.session.wait_for_fixation_start()? {
            log::info!("fixation started at ({:.1}, {:.1})", gaze.x, gaze.y);
        }
        if let Some(gaze) = self.session.wait_for_fixation_end()? {
            log::info!("fixation ended at ({:.1}, {:.1})", gaze.x, gaze.y);
        }

        let outcome = self.session.check_up()?;
        log::info!("drift check: {:?}", outcome);
        self.session.send_message("BLOCK_END")?;
        Ok(())
    }

    /// Draws a cursor at the tracked gaze for one block of display ticks.
    fn track_gaze(&mut self) -> Result<()> {
        for _ in 0..self.track_ticks {
            let tick_start = self.frame_timer.now();
            let gaze = self.session.gaze_position();

            let display = self.session.display_mut();
            display.fill(TRACK_BACKGROUND);
            if let Some(gaze) = gaze {
                display.draw_marker(gaze.position(), MARKER_PX, MARKER_COLOR);
            }
            display.present()?;

            let spent = self.frame_timer.elapsed(tick_start);
            self.frame_timer.sleep(FRAME_INTERVAL.saturating_sub(spent));
        }
        Ok(())
    }
}

/// Session subject id when none is given: day of month and time of day.
pub fn default_subject_id(now: DateTime<Local>) -> String {
    now.format("%d%H%M%S").to_string()
}

/// Config file first, then command-line overrides.
fn session_config(args: &Args, now: DateTime<Local>) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(subject) = &args.subject {
        config.subject_id = subject.clone();
    } else if config.subject_id.is_empty() {
        config.subject_id = default_subject_id(now);
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(program) = &args.converter {
        config.converter.program = program.clone();
    }
    Ok(config)
}

fn open_display(args: &Args) -> Result<SkiaDisplay<AppSink>> {
    let sink = match &args.frames_dir {
        Some(dir) => AppSink::Png(PngSequence::new(dir).context("creating frames directory")?),
        None => AppSink::Null(NullSink),
    };
    let display = SkiaDisplay::new(args.width, args.height, sink)?;

    let candidates = [args.font.clone(), PathBuf::from(SYSTEM_FONT)];
    match candidates.iter().find_map(|p| read_font(p).map(|bytes| (p, bytes))) {
        Some((path, bytes)) => {
            log::info!("message font: {}", path.display());
            display
                .with_font_bytes(bytes, TEXT_PX)
                .with_context(|| format!("loading font {}", path.display()))
        }
        None => {
            log::warn!("no usable font found; operator messages will be blank");
            Ok(display)
        }
    }
}

fn read_font(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::debug!("font {} unavailable: {}", path.display(), e);
            None
        }
    }
}
