//! Session state machine.
//!
//! All device calls block the calling thread. The fixation waits in
//! particular spin on the event queue and do not return to the caller's
//! render loop until the matching event arrives, so nothing is drawn while
//! they wait.

use crate::config::SessionConfig;
use crate::datafile::TraceFiles;
use crate::error::{DataFileError, Result, SessionError};
use crate::profile::{SetupStep, TrackerProfile, geometry_steps};
use gazex_core::{
    Display, DriftResponse, EventKind, Eye, GazeSample, RecordingFlags, ScreenRect, SessionState,
    Tracker, TransportError,
};
use gazex_timing::Timer;
use std::path::PathBuf;
use std::time::Duration;

/// Real-time window held after recording starts.
pub const REALTIME_WINDOW: Duration = Duration::from_millis(100);
/// Extra recording kept after the trial to catch trailing events.
pub const STOP_FLUSH: Duration = Duration::from_millis(100);
/// Settle time between going offline and closing the trace.
pub const OFFLINE_SETTLE: Duration = Duration::from_millis(500);
/// How long an operator message stays up.
pub const MESSAGE_PAUSE: Duration = Duration::from_millis(2000);
/// Largest drift error accepted without recalibrating, in device units.
pub const DRIFT_ACCEPT_THRESHOLD: u32 = 27;

const SETUP_MESSAGE: &str = "Starting the eye tracker setup...";
const DRIFT_MESSAGE: &str = "Starting drift correction. Press ESC to enter the eye tracker setup.";
const RESUME_MESSAGE: &str = "Resuming the experiment...";
const RECORDING_MESSAGE: &str = "Recording started.";
const ERROR_MESSAGE: &str = "Error occurred.";
const DISCONNECT_MESSAGE: &str = "Eye tracker disconnected.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftOutcome {
    Accepted { error: u32 },
    Rejected { error: u32 },
    /// Operator escaped the probe into the setup screen.
    Aborted,
}

impl DriftOutcome {
    pub fn from_response(response: DriftResponse) -> Self {
        match response {
            DriftResponse::Measured(error) if error <= DRIFT_ACCEPT_THRESHOLD => {
                DriftOutcome::Accepted { error }
            }
            DriftResponse::Measured(error) => DriftOutcome::Rejected { error },
            DriftResponse::Aborted => DriftOutcome::Aborted,
        }
    }

    pub fn needs_recalibration(&self) -> bool {
        !matches!(self, DriftOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStep {
    StopRecording,
    SetOffline,
    CloseDataFile,
    Transfer,
    CloseLink,
    CloseGraphics,
}

/// What happened during shutdown. Steps keep running after a failure, so
/// several may be listed.
#[derive(Debug, Default)]
pub struct TerminationReport {
    pub failures: Vec<(TerminationStep, SessionError)>,
    /// `None` when conversion was skipped because no trace reached the host.
    pub conversion: Option<std::result::Result<PathBuf, DataFileError>>,
}

impl TerminationReport {
    fn fail(&mut self, step: TerminationStep, error: SessionError) {
        log::error!("termination step {:?} failed: {}", step, error);
        self.failures.push((step, error));
    }

    pub fn failed(&self, step: TerminationStep) -> bool {
        self.failures.iter().any(|(s, _)| *s == step)
    }

    pub fn converted_path(&self) -> Option<&PathBuf> {
        self.conversion.as_ref().and_then(|c| c.as_ref().ok())
    }

    /// Every step succeeded and the trace was converted.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.converted_path().is_some()
    }
}

/// Owns the tracker link, the display handle and the trace files of one
/// subject's session, from configuration to termination.
pub struct SessionController<T: Tracker, D: Display, C: Timer> {
    tracker: T,
    display: D,
    timer: C,
    config: SessionConfig,
    files: TraceFiles,
    profile: TrackerProfile,
    state: SessionState,
    active_eye: Option<Eye>,
}

impl<T: Tracker, D: Display, C: Timer> SessionController<T, D, C> {
    /// Brings the tracker online: opens graphics, pushes the configuration
    /// profile for the detected hardware and opens a fresh trace file.
    pub fn open(mut tracker: T, display: D, timer: C, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let files = TraceFiles::new(&config)?;
        let screen = display.rect();

        log::info!(
            "opening session for subject {} on {}x{} display",
            config.subject_id,
            screen.width,
            screen.height
        );
        tracker
            .open_graphics()
            .map_err(SessionError::Configuration)?;

        let profile = match Self::configure(&mut tracker, screen, files.remote_name()) {
            Ok(profile) => profile,
            Err(e) => {
                log::error!("tracker configuration failed: {}", e);
                if let Err(close_err) = tracker.close() {
                    log::debug!("closing link after failed setup: {}", close_err);
                }
                if let Err(close_err) = tracker.close_graphics() {
                    log::warn!("closing graphics after failed setup: {}", close_err);
                }
                return Err(SessionError::Configuration(e));
            }
        };

        let mut controller = Self {
            tracker,
            display,
            timer,
            config,
            files,
            profile,
            state: SessionState::Uninitialized,
            active_eye: None,
        };
        controller.transition(SessionState::Configured);
        Ok(controller)
    }

    fn configure(
        tracker: &mut T,
        screen: ScreenRect,
        remote_name: &str,
    ) -> std::result::Result<TrackerProfile, TransportError> {
        for step in &geometry_steps(screen) {
            push_step(tracker, step)?;
        }

        let generation = tracker.tracker_version()?;
        let version_string = if generation == 3 {
            Some(tracker.tracker_version_string()?)
        } else {
            None
        };
        let profile = TrackerProfile::resolve(generation, version_string.as_deref(), screen);
        log::info!(
            "tracker generation {} software {} ({} setup steps)",
            profile.generation,
            profile.software_version,
            profile.steps.len()
        );
        for step in &profile.steps {
            push_step(tracker, step)?;
        }

        let look = &profile.appearance;
        tracker.set_calibration_colors(look.foreground, look.background)?;
        tracker.set_target_size(look.target_outer, look.target_inner)?;
        tracker.set_calibration_sounds(&look.calibration_sounds)?;
        tracker.set_drift_correct_sounds(&look.drift_sounds)?;

        tracker.flush_key_queue();
        tracker.set_offline_mode()?;
        tracker.open_data_file(remote_name)?;
        Ok(profile)
    }

    /// Runs the interactive setup screen and re-reads which eye is tracked.
    /// Recording is not resumed here.
    pub fn calibrate(&mut self) -> Result<()> {
        self.require_live("calibrate")?;
        if self.state.is_recording() {
            log::info!("halting recording for calibration");
            self.halt_recording()?;
        }
        self.transition(SessionState::Calibrating);
        self.display_message(SETUP_MESSAGE);
        self.tracker.do_tracker_setup()?;
        self.resolve_eye()?;
        Ok(())
    }

    /// Drift check between trials: a single-point probe first, the full
    /// setup only when the probe is rejected or aborted. Recording is
    /// resumed exactly once afterwards.
    pub fn check_up(&mut self) -> Result<DriftOutcome> {
        self.require_live("run a drift check")?;
        if self.state.is_recording() {
            log::info!("halting recording for calibration");
            self.halt_recording()?;
        }
        self.transition(SessionState::Calibrating);
        self.display_message(DRIFT_MESSAGE);

        let (x, y) = self.display.rect().center_px();
        let response = self.tracker.do_drift_correct(x, y, true, true)?;
        let outcome = DriftOutcome::from_response(response);
        match outcome {
            DriftOutcome::Accepted { error } => {
                log::info!("drift check accepted (error {})", error)
            }
            DriftOutcome::Rejected { error } => log::warn!(
                "drift error {} above {}, recalibrating",
                error,
                DRIFT_ACCEPT_THRESHOLD
            ),
            DriftOutcome::Aborted => log::warn!("drift check aborted by operator, recalibrating"),
        }

        if outcome.needs_recalibration() {
            self.calibrate()?;
        }
        self.resume_recording()?;
        self.display_message(RESUME_MESSAGE);
        Ok(outcome)
    }

    /// Starts device recording of samples and events on both file and link.
    ///
    /// A nonzero device status is shown to the operator and returned as
    /// [`SessionError::RecordingStart`]; whether to recalibrate and retry is
    /// up to the caller.
    pub fn resume_recording(&mut self) -> Result<()> {
        self.require_live("start recording")?;
        if self.state.is_recording() {
            return Err(SessionError::AlreadyRecording);
        }

        let code = self.tracker.start_recording(RecordingFlags::ALL)?;
        if code != 0 {
            log::error!("tracker failed to start recording: status {}", code);
            self.display_message(ERROR_MESSAGE);
            return Err(SessionError::RecordingStart { code });
        }

        self.transition(SessionState::Recording);
        self.tracker.begin_realtime_mode(REALTIME_WINDOW)?;
        Ok(())
    }

    /// Calibrates, starts recording and logs the tracked eye into the trace.
    pub fn start_recording(&mut self) -> Result<()> {
        self.calibrate()?;
        self.resume_recording()?;
        self.display_message(RECORDING_MESSAGE);

        if let Some(eye) = self.resolve_eye()? {
            let (code, label) = eye.trace_label();
            self.tracker
                .send_message(&format!("EYE_USED {} {}", code, label))?;
        }
        Ok(())
    }

    pub fn stop_recording(&mut self) -> Result<()> {
        if self.state.is_terminated() {
            return Err(SessionError::Terminated);
        }
        if !self.state.is_recording() {
            log::warn!("stop requested while {}; nothing to stop", self.state);
            return Ok(());
        }

        self.halt_recording()
    }

    /// Shuts the session down and brings the trace to the host.
    ///
    /// Every step is attempted even if an earlier one failed; failures are
    /// collected in the report. The graphics context is always closed.
    pub fn terminate(&mut self) -> Result<TerminationReport> {
        if self.state.is_terminated() {
            return Err(SessionError::Terminated);
        }
        let mut report = TerminationReport::default();

        if self.state.is_recording() {
            if let Err(e) = self.stop_recording() {
                report.fail(TerminationStep::StopRecording, e);
            }
        }

        if let Err(e) = self.tracker.set_offline_mode() {
            report.fail(TerminationStep::SetOffline, e.into());
        }
        self.tracker.msec_delay(OFFLINE_SETTLE);

        if let Err(e) = self.tracker.close_data_file() {
            report.fail(TerminationStep::CloseDataFile, e.into());
        }
        let transferred = match self.files.transfer(&mut self.tracker) {
            Ok(()) => true,
            Err(e) => {
                report.fail(TerminationStep::Transfer, e.into());
                false
            }
        };
        if let Err(e) = self.tracker.close() {
            report.fail(TerminationStep::CloseLink, e.into());
        }

        self.display_message(DISCONNECT_MESSAGE);

        if let Err(e) = self.tracker.close_graphics() {
            report.fail(TerminationStep::CloseGraphics, e.into());
        }
        self.transition(SessionState::Terminated);

        report.conversion = if transferred {
            let result = self.files.convert();
            if let Err(e) = &result {
                log::error!("trace conversion failed: {}", e);
            }
            Some(result)
        } else {
            log::warn!("no trace on host; skipping conversion");
            None
        };
        Ok(report)
    }

    /// Newest gaze position of the active eye, or `None` when there is no
    /// sample, the sample lacks that eye, or no eye is resolved yet.
    /// Never blocks.
    pub fn gaze_position(&mut self) -> Option<GazeSample> {
        let eye = self.active_eye?;
        let sample = self.tracker.newest_sample()?;
        sample.gaze(eye).map(|(x, y)| GazeSample { eye, x, y })
    }

    /// Blocks until the next fixation start and returns the gaze at that
    /// moment, taken from the newest sample rather than the event.
    pub fn wait_for_fixation_start(&mut self) -> Result<Option<GazeSample>> {
        self.wait_for(EventKind::FixationStart)
    }

    /// Blocks until the next fixation end. See [`Self::wait_for_fixation_start`].
    pub fn wait_for_fixation_end(&mut self) -> Result<Option<GazeSample>> {
        self.wait_for(EventKind::FixationEnd)
    }

    fn wait_for(&mut self, kind: EventKind) -> Result<Option<GazeSample>> {
        if !self.state.is_recording() {
            return Err(SessionError::InvalidState {
                operation: "wait for fixation events",
                state: self.state,
            });
        }
        loop {
            match self.tracker.next_event()? {
                Some(event) if event.kind == kind => {
                    log::debug!("{:?} at {} ms", kind, event.timestamp_ms);
                    return Ok(self.gaze_position());
                }
                Some(_) => {}
                None => std::hint::spin_loop(),
            }
        }
    }

    /// Writes a timestamped message into the trace.
    pub fn send_message(&mut self, message: &str) -> Result<()> {
        self.require_live("send a trace message")?;
        self.tracker.send_message(message)?;
        Ok(())
    }

    /// Shows `text` centred on the display and holds it for
    /// [`MESSAGE_PAUSE`]. Drawing failures are logged, the pause is kept.
    pub fn display_message(&mut self, text: &str) {
        log::info!("operator message: {}", text);
        let center = self.display.rect().center();
        self.display.fill(self.config.message_background);
        if let Err(e) = self
            .display
            .draw_text(text, center, self.config.message_foreground)
        {
            log::warn!("cannot draw operator message: {}", e);
        }
        if let Err(e) = self.display.present() {
            log::warn!("cannot present operator message: {}", e);
        }
        self.timer.sleep(MESSAGE_PAUSE);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_eye(&self) -> Option<Eye> {
        self.active_eye
    }

    pub fn trace_files(&self) -> &TraceFiles {
        &self.files
    }

    pub fn profile(&self) -> &TrackerProfile {
        &self.profile
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    fn resolve_eye(&mut self) -> Result<Option<Eye>> {
        let availability = self.tracker.eye_available()?;
        self.active_eye = availability.active_eye();
        match self.active_eye {
            Some(eye) => log::info!("tracking {:?} eye ({:?} available)", eye, availability),
            None => log::warn!("tracker reports no usable eye"),
        }
        Ok(self.active_eye)
    }

    /// Leaves the realtime window, flushes trailing events, stops the device
    /// and drains stale keys. Every step runs; the first failure is returned.
    fn halt_recording(&mut self) -> Result<()> {
        let realtime = self.tracker.end_realtime_mode();
        if let Err(e) = &realtime {
            log::error!("leaving realtime window failed: {}", e);
        }
        self.tracker.pump_delay(STOP_FLUSH);
        let stopped = self.tracker.stop_recording();
        match &stopped {
            Ok(()) => self.transition(SessionState::Stopped),
            Err(e) => log::error!("device did not stop recording: {}", e),
        }
        self.drain_keys();
        realtime?;
        stopped?;
        Ok(())
    }

    fn drain_keys(&mut self) {
        let mut drained = 0usize;
        while self.tracker.get_key().is_some() {
            drained += 1;
        }
        if drained > 0 {
            log::debug!("discarded {} pending key presses", drained);
        }
    }

    fn require_live(&self, operation: &'static str) -> Result<()> {
        match self.state {
            SessionState::Terminated => Err(SessionError::Terminated),
            state if !state.is_live() => Err(SessionError::InvalidState { operation, state }),
            _ => Ok(()),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            log::info!(
                "session {}: {} -> {}",
                self.config.subject_id,
                self.state,
                next
            );
            self.state = next;
        }
    }
}

impl<T: Tracker, D: Display, C: Timer> Drop for SessionController<T, D, C> {
    fn drop(&mut self) {
        if self.state.is_terminated() {
            return;
        }
        log::warn!(
            "session {} dropped while {}; closing tracker without transfer",
            self.config.subject_id,
            self.state
        );
        if self.state.is_recording() {
            if let Err(e) = self.tracker.end_realtime_mode() {
                log::warn!("leaving realtime window: {}", e);
            }
            if let Err(e) = self.tracker.stop_recording() {
                log::warn!("stopping recording: {}", e);
            }
        }
        if let Err(e) = self.tracker.close() {
            log::warn!("closing tracker link: {}", e);
        }
        if let Err(e) = self.tracker.close_graphics() {
            log::warn!("closing graphics: {}", e);
        }
    }
}

fn push_step<T: Tracker>(
    tracker: &mut T,
    step: &SetupStep,
) -> std::result::Result<(), TransportError> {
    match step {
        SetupStep::Command(command) => {
            log::debug!("tracker command: {}", command);
            tracker.send_command(command)
        }
        SetupStep::Message(message) => {
            log::debug!("tracker message: {}", message);
            tracker.send_message(message)
        }
    }
}
