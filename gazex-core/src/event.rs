use serde::{Deserialize, Serialize};

/// Kind of a queued link event. Only fixation boundaries are distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    FixationStart,
    FixationEnd,
    Other,
}

/// A discrete occurrence pulled from the device's event queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerEvent {
    pub kind: EventKind,
    pub timestamp_ms: u32,
    /// Gaze the device attaches to the event. Known to carry wrong signs and
    /// scale on real hardware; session code re-polls the newest sample instead.
    pub embedded_gaze: Option<(f32, f32)>,
}

impl TrackerEvent {
    pub fn new(kind: EventKind, timestamp_ms: u32) -> Self {
        Self {
            kind,
            timestamp_ms,
            embedded_gaze: None,
        }
    }
}
