pub mod config;
pub mod controller;
pub mod datafile;
pub mod error;
pub mod profile;

pub use config::{ConverterConfig, SessionConfig};
pub use controller::{DriftOutcome, SessionController, TerminationReport, TerminationStep};
pub use datafile::TraceFiles;
pub use error::{ConfigError, DataFileError, Result, SessionError};
pub use profile::{SetupStep, TrackerProfile};
