use gazex_core::{SessionState, TransportError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The device could not be brought online; the session cannot proceed.
    #[error("tracker configuration failed: {0}")]
    Configuration(#[source] TransportError),

    #[error("tracker transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("tracker refused to start recording (status {code})")]
    RecordingStart { code: i32 },

    #[error("recording already started; stop it before starting again")]
    AlreadyRecording,

    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("session already terminated")]
    Terminated,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    DataFile(#[from] DataFileError),
}

#[derive(Error, Debug)]
pub enum DataFileError {
    #[error("invalid subject id `{0}`")]
    InvalidSubject(String),

    #[error("trace {0} already transferred")]
    AlreadyTransferred(String),

    #[error("transfer of {remote} to {} failed: {source}", .local.display())]
    Transfer {
        remote: String,
        local: PathBuf,
        #[source]
        source: TransportError,
    },

    #[error("failed to launch converter `{program}`: {source}")]
    ConverterLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("converter `{program}` exited with {status}")]
    ConverterFailed { program: String, status: String },

    #[error("converter finished but {} was not produced", .0.display())]
    ConvertedMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("subject id must be set")]
    MissingSubject,
}

pub type Result<T> = std::result::Result<T, SessionError>;
