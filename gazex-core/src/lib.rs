pub mod display;
pub mod error;
pub mod event;
pub mod sample;
pub mod state;
pub mod tracker;

pub use display::{Display, Rgb, ScreenRect};
pub use error::{DisplayError, TransportError};
pub use event::{EventKind, TrackerEvent};
pub use sample::{Eye, EyeAvailability, GazeSample, RawSample};
pub use state::SessionState;
pub use tracker::{DriftResponse, RecordingFlags, TargetSounds, Tracker};
