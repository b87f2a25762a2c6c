use crate::display::Rgb;
use crate::error::TransportError;
use crate::event::TrackerEvent;
use crate::sample::{EyeAvailability, RawSample};
use std::path::Path;
use std::time::Duration;

/// Which data streams a recording writes to the trace file and sends over
/// the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingFlags {
    pub file_samples: bool,
    pub file_events: bool,
    pub link_samples: bool,
    pub link_events: bool,
}

impl RecordingFlags {
    pub const ALL: RecordingFlags = RecordingFlags {
        file_samples: true,
        file_events: true,
        link_samples: true,
        link_events: true,
    };
}

/// Feedback sounds for target display, accept and failure. `None` is silent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSounds {
    pub target: Option<String>,
    pub good: Option<String>,
    pub error: Option<String>,
}

impl TargetSounds {
    pub fn off() -> Self {
        Self::default()
    }
}

/// Result of a drift-correction probe that reached the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftResponse {
    /// The probe completed and measured this error magnitude.
    Measured(u32),
    /// The operator left the probe for the setup screen.
    Aborted,
}

/// The physical link to the eye tracker.
///
/// Every call is synchronous and blocks until the device answers. Methods
/// mirror the vendor SDK one-to-one; sequencing lives in the session.
pub trait Tracker {
    fn open_graphics(&mut self) -> Result<(), TransportError>;
    fn close_graphics(&mut self) -> Result<(), TransportError>;

    fn send_command(&mut self, command: &str) -> Result<(), TransportError>;
    /// Writes a timestamped message into the trace.
    fn send_message(&mut self, message: &str) -> Result<(), TransportError>;

    /// Hardware generation (1, 2, 3 for the current desktop line).
    fn tracker_version(&mut self) -> Result<u32, TransportError>;
    fn tracker_version_string(&mut self) -> Result<String, TransportError>;

    fn set_offline_mode(&mut self) -> Result<(), TransportError>;
    fn open_data_file(&mut self, name: &str) -> Result<(), TransportError>;
    fn close_data_file(&mut self) -> Result<(), TransportError>;
    fn receive_data_file(&mut self, remote: &str, local: &Path) -> Result<(), TransportError>;

    fn set_calibration_colors(
        &mut self,
        foreground: Rgb,
        background: Rgb,
    ) -> Result<(), TransportError>;
    fn set_target_size(&mut self, outer: u32, inner: u32) -> Result<(), TransportError>;
    fn set_calibration_sounds(&mut self, sounds: &TargetSounds) -> Result<(), TransportError>;
    fn set_drift_correct_sounds(&mut self, sounds: &TargetSounds) -> Result<(), TransportError>;

    /// Runs the interactive setup and calibration screen until the operator
    /// leaves it.
    fn do_tracker_setup(&mut self) -> Result<(), TransportError>;
    fn do_drift_correct(
        &mut self,
        x: i32,
        y: i32,
        draw_target: bool,
        allow_setup: bool,
    ) -> Result<DriftResponse, TransportError>;
    fn eye_available(&mut self) -> Result<EyeAvailability, TransportError>;

    /// Returns the device status code; zero is success.
    fn start_recording(&mut self, flags: RecordingFlags) -> Result<i32, TransportError>;
    fn stop_recording(&mut self) -> Result<(), TransportError>;

    /// Raises host priority and holds it for `window` before returning.
    fn begin_realtime_mode(&mut self, window: Duration) -> Result<(), TransportError>;
    fn end_realtime_mode(&mut self) -> Result<(), TransportError>;
    /// Waits while still servicing the link.
    fn pump_delay(&mut self, duration: Duration);
    fn msec_delay(&mut self, duration: Duration);

    fn newest_sample(&mut self) -> Option<RawSample>;
    fn next_event(&mut self) -> Result<Option<TrackerEvent>, TransportError>;
    fn get_key(&mut self) -> Option<u16>;
    fn flush_key_queue(&mut self);

    fn close(&mut self) -> Result<(), TransportError>;
}
