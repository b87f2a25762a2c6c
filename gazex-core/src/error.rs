use thiserror::Error;

/// Failures reported by the device link.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("tracker link is not connected")]
    Disconnected,

    #[error("tracker rejected command `{command}` (code {code})")]
    CommandRejected { command: String, code: i32 },

    #[error("tracker error: {0}")]
    Device(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the drawable surface.
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("no font loaded for text rendering")]
    NoFont,

    #[error("invalid font: {0}")]
    Font(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
