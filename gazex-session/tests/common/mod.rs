#![allow(dead_code)]

use gazex_core::{
    Display, DisplayError, DriftResponse, EventKind, EyeAvailability, RawSample, RecordingFlags,
    Rgb, ScreenRect, TargetSounds, Tracker, TrackerEvent, TransportError,
};
use gazex_session::{SessionConfig, SessionController, SessionError};
use gazex_timing::Timer;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub const SUBJECT: &str = "0101120000";
pub const SCREEN: ScreenRect = ScreenRect {
    width: 1280,
    height: 1024,
};

/// Empty polls tolerated before the fake reports a dead link, so a wait
/// that never matches fails instead of hanging the test run.
const IDLE_POLL_LIMIT: usize = 10_000;

pub struct Script {
    pub generation: u32,
    pub version_string: String,
    pub eye: EyeAvailability,
    pub drift: VecDeque<Result<DriftResponse, String>>,
    pub start_codes: VecDeque<i32>,
    pub sample: Option<RawSample>,
    /// Each event may replace the newest sample at the moment it is pulled.
    pub events: VecDeque<(TrackerEvent, Option<RawSample>)>,
    pub keys: VecDeque<u16>,
    pub fail: HashSet<&'static str>,
    pub trace_contents: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            generation: 3,
            version_string: "EYELINK CL 4.56".to_string(),
            eye: EyeAvailability::Right,
            drift: VecDeque::new(),
            start_codes: VecDeque::new(),
            sample: None,
            events: VecDeque::new(),
            keys: VecDeque::new(),
            fail: HashSet::new(),
            trace_contents: "** TRACE\n".to_string(),
        }
    }
}

#[derive(Default)]
pub struct Shared {
    pub calls: Vec<String>,
    pub script: Script,
    idle_polls: usize,
}

impl Shared {
    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    pub fn messages(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| c.strip_prefix("display:").map(str::to_string))
            .collect()
    }
}

pub type Journal = Rc<RefCell<Shared>>;

pub struct FakeTracker(pub Journal);

impl FakeTracker {
    fn record(&self, call: impl Into<String>) {
        self.0.borrow_mut().calls.push(call.into());
    }

    /// Records the call and fails it when the script says so.
    fn op(&self, name: &'static str) -> Result<(), TransportError> {
        self.record(name);
        if self.0.borrow().script.fail.contains(name) {
            return Err(TransportError::Device(format!("{name} failed")));
        }
        Ok(())
    }
}

impl Tracker for FakeTracker {
    fn open_graphics(&mut self) -> Result<(), TransportError> {
        self.op("open_graphics")
    }
    fn close_graphics(&mut self) -> Result<(), TransportError> {
        self.op("close_graphics")
    }
    fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        self.record(format!("command:{command}"));
        if self.0.borrow().script.fail.contains("send_command") {
            return Err(TransportError::CommandRejected {
                command: command.to_string(),
                code: -1,
            });
        }
        Ok(())
    }
    fn send_message(&mut self, message: &str) -> Result<(), TransportError> {
        self.record(format!("message:{message}"));
        Ok(())
    }
    fn tracker_version(&mut self) -> Result<u32, TransportError> {
        self.op("tracker_version")?;
        Ok(self.0.borrow().script.generation)
    }
    fn tracker_version_string(&mut self) -> Result<String, TransportError> {
        self.op("tracker_version_string")?;
        Ok(self.0.borrow().script.version_string.clone())
    }
    fn set_offline_mode(&mut self) -> Result<(), TransportError> {
        self.op("set_offline_mode")
    }
    fn open_data_file(&mut self, name: &str) -> Result<(), TransportError> {
        self.record(format!("open_data_file:{name}"));
        Ok(())
    }
    fn close_data_file(&mut self) -> Result<(), TransportError> {
        self.op("close_data_file")
    }
    fn receive_data_file(&mut self, remote: &str, local: &Path) -> Result<(), TransportError> {
        self.record(format!("receive_data_file:{remote}"));
        if self.0.borrow().script.fail.contains("receive_data_file") {
            return Err(TransportError::Disconnected);
        }
        std::fs::write(local, &self.0.borrow().script.trace_contents)?;
        Ok(())
    }
    fn set_calibration_colors(
        &mut self,
        foreground: Rgb,
        background: Rgb,
    ) -> Result<(), TransportError> {
        self.record(format!("calibration_colors:{foreground:?}/{background:?}"));
        Ok(())
    }
    fn set_target_size(&mut self, outer: u32, inner: u32) -> Result<(), TransportError> {
        self.record(format!("target_size:{outer}/{inner}"));
        Ok(())
    }
    fn set_calibration_sounds(&mut self, _sounds: &TargetSounds) -> Result<(), TransportError> {
        self.op("calibration_sounds")
    }
    fn set_drift_correct_sounds(&mut self, _sounds: &TargetSounds) -> Result<(), TransportError> {
        self.op("drift_sounds")
    }
    fn do_tracker_setup(&mut self) -> Result<(), TransportError> {
        self.op("do_tracker_setup")
    }
    fn do_drift_correct(
        &mut self,
        x: i32,
        y: i32,
        draw_target: bool,
        allow_setup: bool,
    ) -> Result<DriftResponse, TransportError> {
        self.record(format!("drift_correct:{x},{y},{draw_target},{allow_setup}"));
        match self.0.borrow_mut().script.drift.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(TransportError::Device(reason)),
            None => Ok(DriftResponse::Measured(0)),
        }
    }
    fn eye_available(&mut self) -> Result<EyeAvailability, TransportError> {
        self.op("eye_available")?;
        Ok(self.0.borrow().script.eye)
    }
    fn start_recording(&mut self, flags: RecordingFlags) -> Result<i32, TransportError> {
        assert_eq!(flags, RecordingFlags::ALL);
        self.op("start_recording")?;
        Ok(self.0.borrow_mut().script.start_codes.pop_front().unwrap_or(0))
    }
    fn stop_recording(&mut self) -> Result<(), TransportError> {
        self.op("stop_recording")
    }
    fn begin_realtime_mode(&mut self, window: Duration) -> Result<(), TransportError> {
        self.record(format!("begin_realtime:{}", window.as_millis()));
        Ok(())
    }
    fn end_realtime_mode(&mut self) -> Result<(), TransportError> {
        self.op("end_realtime")
    }
    fn pump_delay(&mut self, duration: Duration) {
        self.record(format!("pump_delay:{}", duration.as_millis()));
    }
    fn msec_delay(&mut self, duration: Duration) {
        self.record(format!("msec_delay:{}", duration.as_millis()));
    }
    fn newest_sample(&mut self) -> Option<RawSample> {
        self.0.borrow().script.sample
    }
    fn next_event(&mut self) -> Result<Option<TrackerEvent>, TransportError> {
        let mut shared = self.0.borrow_mut();
        match shared.script.events.pop_front() {
            Some((event, sample)) => {
                if let Some(sample) = sample {
                    shared.script.sample = Some(sample);
                }
                Ok(Some(event))
            }
            None => {
                shared.idle_polls += 1;
                if shared.idle_polls > IDLE_POLL_LIMIT {
                    return Err(TransportError::Disconnected);
                }
                Ok(None)
            }
        }
    }
    fn get_key(&mut self) -> Option<u16> {
        let key = self.0.borrow_mut().script.keys.pop_front();
        if key.is_some() {
            self.record("get_key");
        }
        key
    }
    fn flush_key_queue(&mut self) {
        self.record("flush_key_queue");
    }
    fn close(&mut self) -> Result<(), TransportError> {
        self.op("close")
    }
}

pub struct FakeDisplay(pub Journal);

impl Display for FakeDisplay {
    fn rect(&self) -> ScreenRect {
        SCREEN
    }
    fn fill(&mut self, _color: Rgb) {}
    fn draw_text(
        &mut self,
        text: &str,
        center: (f32, f32),
        _color: Rgb,
    ) -> Result<(), DisplayError> {
        assert_eq!(center, SCREEN.center());
        self.0.borrow_mut().calls.push(format!("display:{text}"));
        Ok(())
    }
    fn present(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

pub struct FakeTimer(pub Journal);

impl Timer for FakeTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        0
    }
    fn elapsed(&self, _ts: u64) -> Duration {
        Duration::ZERO
    }
    fn sleep(&self, d: Duration) {
        self.0
            .borrow_mut()
            .calls
            .push(format!("sleep:{}", d.as_millis()));
    }
}

pub type FakeSession = SessionController<FakeTracker, FakeDisplay, FakeTimer>;

pub fn config(data_dir: &Path) -> SessionConfig {
    let mut config = SessionConfig::new(SUBJECT, data_dir);
    // Stand-in for the vendor converter: writes the .asc sibling.
    config.converter.program = "sh".to_string();
    config.converter.args = vec![
        "-c".to_string(),
        r#"cp "$0" "${0%.*}.asc""#.to_string(),
    ];
    config
}

pub fn open_with(
    script: Script,
    config: SessionConfig,
) -> (Result<FakeSession, SessionError>, Journal) {
    let journal: Journal = Rc::new(RefCell::new(Shared {
        script,
        ..Shared::default()
    }));
    let session = SessionController::open(
        FakeTracker(journal.clone()),
        FakeDisplay(journal.clone()),
        FakeTimer(journal.clone()),
        config,
    );
    (session, journal)
}

/// Opened session with the construction calls cleared from the journal.
pub fn open(script: Script, data_dir: &Path) -> (FakeSession, Journal) {
    let (session, journal) = open_with(script, config(data_dir));
    let session = session.expect("session opens");
    journal.borrow_mut().calls.clear();
    (session, journal)
}

pub fn sample_right(x: f32, y: f32) -> RawSample {
    RawSample {
        timestamp_ms: 0,
        left: None,
        right: Some((x, y)),
    }
}

pub fn sample_left(x: f32, y: f32) -> RawSample {
    RawSample {
        timestamp_ms: 0,
        left: Some((x, y)),
        right: None,
    }
}

pub fn event(kind: EventKind) -> TrackerEvent {
    TrackerEvent::new(kind, 0)
}
