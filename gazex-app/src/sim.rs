//! A stand-in tracker that fakes gaze and fixation events in software, so
//! the session can be exercised on a machine without tracker hardware.

use gazex_core::{
    DriftResponse, EventKind, EyeAvailability, RawSample, RecordingFlags, Rgb, ScreenRect,
    TargetSounds, Tracker, TrackerEvent, TransportError,
};
use gazex_timing::{HighPrecisionTimer, RealtimePriority, Timer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::{Duration, Instant};

const FIXATION_MS: (u64, u64) = (200, 600);
const SACCADE_MS: (u64, u64) = (30, 60);
const JITTER_PX: f32 = 2.0;
/// Probability an operator escapes a drift probe into setup.
const DRIFT_ABORT_P: f64 = 0.1;

#[derive(Debug)]
struct GazeModel {
    from: (f32, f32),
    to: (f32, f32),
    fixating: bool,
    phase_start: Instant,
    phase_len: Duration,
}

impl GazeModel {
    fn new(center: (f32, f32), now: Instant) -> Self {
        Self {
            from: center,
            to: center,
            fixating: true,
            phase_start: now,
            phase_len: Duration::from_millis(FIXATION_MS.0),
        }
    }

    /// Moves through fixation/saccade phases up to `now`, returning the
    /// boundary events crossed on the way.
    fn advance(&mut self, now: Instant, screen: ScreenRect, rng: &mut StdRng) -> Vec<EventKind> {
        let mut crossed = Vec::new();
        while now.duration_since(self.phase_start) >= self.phase_len {
            self.phase_start += self.phase_len;
            if self.fixating {
                self.from = self.to;
                self.to = (
                    rng.random_range(0.1f32..0.9) * screen.width as f32,
                    rng.random_range(0.1f32..0.9) * screen.height as f32,
                );
                self.phase_len =
                    Duration::from_millis(rng.random_range(SACCADE_MS.0..=SACCADE_MS.1));
                crossed.push(EventKind::FixationEnd);
                crossed.push(EventKind::Other);
            } else {
                self.from = self.to;
                self.phase_len =
                    Duration::from_millis(rng.random_range(FIXATION_MS.0..=FIXATION_MS.1));
                crossed.push(EventKind::FixationStart);
            }
            self.fixating = !self.fixating;
        }
        crossed
    }

    fn position(&self, now: Instant, rng: &mut StdRng) -> (f32, f32) {
        let (x, y) = if self.fixating {
            self.to
        } else {
            let t = (now.duration_since(self.phase_start).as_secs_f32()
                / self.phase_len.as_secs_f32())
            .clamp(0.0, 1.0);
            (
                self.from.0 + (self.to.0 - self.from.0) * t,
                self.from.1 + (self.to.1 - self.from.1) * t,
            )
        };
        (
            x + rng.random_range(-JITTER_PX..=JITTER_PX),
            y + rng.random_range(-JITTER_PX..=JITTER_PX),
        )
    }
}

pub struct SimulatedTracker {
    rng: StdRng,
    screen: ScreenRect,
    generation: u32,
    version_string: String,
    eye: EyeAvailability,
    start: Instant,
    timer: HighPrecisionTimer,
    realtime: RealtimePriority,

    connected: bool,
    graphics_open: bool,
    recording: Option<RecordingFlags>,
    open_trace: Option<(String, Vec<String>)>,
    storage: HashMap<String, Vec<String>>,

    gaze: GazeModel,
    events: VecDeque<TrackerEvent>,
    keys: VecDeque<u16>,
}

impl SimulatedTracker {
    pub fn new(
        screen: ScreenRect,
        generation: u32,
        version_string: String,
        eye: EyeAvailability,
        seed: u64,
    ) -> Self {
        let start = Instant::now();
        Self {
            rng: StdRng::seed_from_u64(seed),
            screen,
            generation,
            version_string,
            eye,
            start,
            timer: HighPrecisionTimer::new(),
            realtime: RealtimePriority::new(),
            connected: true,
            graphics_open: false,
            recording: None,
            open_trace: None,
            storage: HashMap::new(),
            gaze: GazeModel::new(screen.center(), start),
            events: VecDeque::new(),
            keys: VecDeque::new(),
        }
    }

    fn timestamp_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    fn link(&self) -> Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }

    fn write_trace(&mut self, line: String) {
        if let Some((_, lines)) = self.open_trace.as_mut() {
            lines.push(line);
        }
    }

    /// Runs the gaze model forward and queues the events it produced.
    fn service(&mut self) {
        let Some(flags) = self.recording else {
            return;
        };
        let now = Instant::now();
        let ts = self.timestamp_ms();
        let crossed = self.gaze.advance(now, self.screen, &mut self.rng);
        for kind in crossed {
            let (x, y) = self.gaze.to;
            if flags.file_events {
                let tag = match kind {
                    EventKind::FixationStart => "SFIX",
                    EventKind::FixationEnd => "EFIX",
                    EventKind::Other => "SSACC",
                };
                self.write_trace(format!("{}\t{}\t{:.1}\t{:.1}", tag, ts, x, y));
            }
            if flags.link_events {
                self.events.push_back(TrackerEvent {
                    kind,
                    timestamp_ms: ts,
                    // Real trackers report this in a different frame.
                    embedded_gaze: Some((-x, -y)),
                });
            }
        }
    }
}

impl Tracker for SimulatedTracker {
    fn open_graphics(&mut self) -> Result<(), TransportError> {
        self.link()?;
        self.graphics_open = true;
        Ok(())
    }

    fn close_graphics(&mut self) -> Result<(), TransportError> {
        if !self.graphics_open {
            return Err(TransportError::Device("graphics not open".into()));
        }
        self.graphics_open = false;
        Ok(())
    }

    fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        self.link()?;
        if command.trim().is_empty() {
            return Err(TransportError::CommandRejected {
                command: command.to_string(),
                code: 1,
            });
        }
        log::trace!("sim command: {}", command);
        Ok(())
    }

    fn send_message(&mut self, message: &str) -> Result<(), TransportError> {
        self.link()?;
        let ts = self.timestamp_ms();
        self.write_trace(format!("MSG\t{} {}", ts, message));
        Ok(())
    }

    fn tracker_version(&mut self) -> Result<u32, TransportError> {
        self.link()?;
        Ok(self.generation)
    }

    fn tracker_version_string(&mut self) -> Result<String, TransportError> {
        self.link()?;
        Ok(self.version_string.clone())
    }

    fn set_offline_mode(&mut self) -> Result<(), TransportError> {
        self.link()?;
        self.recording = None;
        Ok(())
    }

    fn open_data_file(&mut self, name: &str) -> Result<(), TransportError> {
        self.link()?;
        self.open_trace = Some((name.to_string(), vec![format!("** TRACE {}", name)]));
        Ok(())
    }

    fn close_data_file(&mut self) -> Result<(), TransportError> {
        self.link()?;
        let (name, lines) = self
            .open_trace
            .take()
            .ok_or_else(|| TransportError::Device("no trace file open".into()))?;
        self.storage.insert(name, lines);
        Ok(())
    }

    fn receive_data_file(&mut self, remote: &str, local: &Path) -> Result<(), TransportError> {
        self.link()?;
        let lines = self
            .storage
            .get(remote)
            .ok_or_else(|| TransportError::Device(format!("no closed trace named {}", remote)))?;
        let mut contents = lines.join("\n");
        contents.push('\n');
        std::fs::write(local, contents)?;
        Ok(())
    }

    fn set_calibration_colors(
        &mut self,
        foreground: Rgb,
        background: Rgb,
    ) -> Result<(), TransportError> {
        log::trace!("sim calibration colors {:?} on {:?}", foreground, background);
        self.link()
    }

    fn set_target_size(&mut self, outer: u32, inner: u32) -> Result<(), TransportError> {
        log::trace!("sim target size {}/{}", outer, inner);
        self.link()
    }

    fn set_calibration_sounds(&mut self, _sounds: &TargetSounds) -> Result<(), TransportError> {
        self.link()
    }

    fn set_drift_correct_sounds(&mut self, _sounds: &TargetSounds) -> Result<(), TransportError> {
        self.link()
    }

    fn do_tracker_setup(&mut self) -> Result<(), TransportError> {
        self.link()?;
        log::info!("sim: operator runs camera setup and calibration");
        self.timer.sleep(Duration::from_millis(50));
        // Keys the operator pressed on the setup screen.
        self.keys.extend([13, 27]);
        Ok(())
    }

    fn do_drift_correct(
        &mut self,
        x: i32,
        y: i32,
        _draw_target: bool,
        allow_setup: bool,
    ) -> Result<DriftResponse, TransportError> {
        self.link()?;
        if allow_setup && self.rng.random_bool(DRIFT_ABORT_P) {
            return Ok(DriftResponse::Aborted);
        }
        let error: u32 = self.rng.random_range(0..60);
        log::debug!("sim drift probe at ({}, {}): error {}", x, y, error);
        Ok(DriftResponse::Measured(error))
    }

    fn eye_available(&mut self) -> Result<EyeAvailability, TransportError> {
        self.link()?;
        Ok(self.eye)
    }

    fn start_recording(&mut self, flags: RecordingFlags) -> Result<i32, TransportError> {
        self.link()?;
        if self.open_trace.is_none() && (flags.file_samples || flags.file_events) {
            // No file to record into.
            return Ok(1);
        }
        self.gaze = GazeModel::new(self.screen.center(), Instant::now());
        self.events.clear();
        self.recording = Some(flags);
        let ts = self.timestamp_ms();
        self.write_trace(format!("START\t{}", ts));
        Ok(0)
    }

    fn stop_recording(&mut self) -> Result<(), TransportError> {
        self.link()?;
        let ts = self.timestamp_ms();
        self.write_trace(format!("END\t{}", ts));
        self.recording = None;
        Ok(())
    }

    fn begin_realtime_mode(&mut self, window: Duration) -> Result<(), TransportError> {
        self.realtime.begin(window);
        Ok(())
    }

    fn end_realtime_mode(&mut self) -> Result<(), TransportError> {
        self.realtime.end();
        Ok(())
    }

    fn pump_delay(&mut self, duration: Duration) {
        let t0 = self.timer.now();
        while self.timer.elapsed(t0) < duration {
            self.service();
            self.timer.sleep(Duration::from_millis(1));
        }
    }

    fn msec_delay(&mut self, duration: Duration) {
        self.timer.sleep(duration);
    }

    fn newest_sample(&mut self) -> Option<RawSample> {
        let flags = self.recording?;
        if !flags.link_samples {
            return None;
        }
        self.service();
        let gaze = self.gaze.position(Instant::now(), &mut self.rng);
        let (left, right) = match self.eye {
            EyeAvailability::Left => (Some(gaze), None),
            EyeAvailability::Right => (None, Some(gaze)),
            EyeAvailability::Binocular => (Some(gaze), Some(gaze)),
            EyeAvailability::Unavailable => (None, None),
        };
        Some(RawSample {
            timestamp_ms: self.timestamp_ms(),
            left,
            right,
        })
    }

    fn next_event(&mut self) -> Result<Option<TrackerEvent>, TransportError> {
        self.link()?;
        self.service();
        Ok(self.events.pop_front())
    }

    fn get_key(&mut self) -> Option<u16> {
        self.keys.pop_front()
    }

    fn flush_key_queue(&mut self) {
        self.keys.clear();
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.link()?;
        self.recording = None;
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> SimulatedTracker {
        SimulatedTracker::new(
            ScreenRect::new(800, 600),
            3,
            "EYELINK CL 4.56".into(),
            EyeAvailability::Right,
            7,
        )
    }

    #[test]
    fn no_samples_until_recording() {
        let mut t = tracker();
        assert_eq!(t.newest_sample(), None);
        assert_eq!(t.next_event().unwrap(), None);
    }

    #[test]
    fn recording_without_file_fails_with_status() {
        let mut t = tracker();
        assert_eq!(t.start_recording(RecordingFlags::ALL).unwrap(), 1);
        t.open_data_file("s.edf").unwrap();
        assert_eq!(t.start_recording(RecordingFlags::ALL).unwrap(), 0);
    }

    #[test]
    fn right_eye_samples_only_carry_right() {
        let mut t = tracker();
        t.open_data_file("s.edf").unwrap();
        t.start_recording(RecordingFlags::ALL).unwrap();
        let s = t.newest_sample().unwrap();
        assert!(s.is_right_sample());
        assert!(!s.is_left_sample());
    }

    #[test]
    fn fixations_alternate() {
        let mut t = tracker();
        t.open_data_file("s.edf").unwrap();
        t.start_recording(RecordingFlags::ALL).unwrap();
        t.pump_delay(Duration::from_millis(1500));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| t.next_event().unwrap())
            .map(|e| e.kind)
            .filter(|k| *k != EventKind::Other)
            .collect();
        assert!(kinds.len() >= 2, "{kinds:?}");
        for pair in kinds.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(kinds[0], EventKind::FixationEnd);
    }

    #[test]
    fn transfer_requires_closed_trace() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("s.edf");
        let mut t = tracker();
        t.open_data_file("s.edf").unwrap();
        t.send_message("TRIALID 1").unwrap();
        assert!(t.receive_data_file("s.edf", &local).is_err());

        t.close_data_file().unwrap();
        t.receive_data_file("s.edf", &local).unwrap();
        let text = std::fs::read_to_string(&local).unwrap();
        assert!(text.starts_with("** TRACE s.edf"));
        assert!(text.contains("TRIALID 1"));
    }

    #[test]
    fn closed_link_rejects_calls() {
        let mut t = tracker();
        t.close().unwrap();
        assert!(matches!(
            t.send_command("select_parser_configuration 0"),
            Err(TransportError::Disconnected)
        ));
    }
}
