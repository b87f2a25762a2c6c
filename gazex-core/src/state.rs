use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one recording session.
///
/// `Terminated` is final: no operation moves a session out of it.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Configured,
    Calibrating,
    Recording,
    Stopped,
    Terminated,
}

impl SessionState {
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// States from which calibration, drift checks and recording control
    /// may be driven. Everything except the two ends of the lifecycle.
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Terminated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Configured => "configured",
            Self::Calibrating => "calibrating",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
