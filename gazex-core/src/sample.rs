use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Numeric code and label the tracker uses in `EYE_USED` trace messages.
    pub fn trace_label(&self) -> (u8, &'static str) {
        match self {
            Eye::Left => (0, "LEFT"),
            Eye::Right => (1, "RIGHT"),
        }
    }
}

/// What the device reports as trackable after setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeAvailability {
    Left,
    Right,
    Binocular,
    /// The device could not report an eye (camera not set up, no lock).
    Unavailable,
}

impl EyeAvailability {
    /// Collapses availability to the single eye a session follows.
    /// Binocular tracking follows the left eye.
    pub fn active_eye(&self) -> Option<Eye> {
        match self {
            EyeAvailability::Left | EyeAvailability::Binocular => Some(Eye::Left),
            EyeAvailability::Right => Some(Eye::Right),
            EyeAvailability::Unavailable => None,
        }
    }
}

/// Newest sample as delivered over the link. Each eye is present only when
/// the sample carries data for it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    pub timestamp_ms: u32,
    pub left: Option<(f32, f32)>,
    pub right: Option<(f32, f32)>,
}

impl RawSample {
    pub fn is_left_sample(&self) -> bool {
        self.left.is_some()
    }

    pub fn is_right_sample(&self) -> bool {
        self.right.is_some()
    }

    /// Gaze for `eye`, or `None` when the sample is not tagged for it.
    pub fn gaze(&self, eye: Eye) -> Option<(f32, f32)> {
        match eye {
            Eye::Left => self.left,
            Eye::Right => self.right,
        }
    }
}

/// A screen-space gaze position taken from one eye.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub eye: Eye,
    pub x: f32,
    pub y: f32,
}

impl GazeSample {
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}
