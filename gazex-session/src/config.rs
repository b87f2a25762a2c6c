use crate::error::ConfigError;
use gazex_core::Rgb;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// External tool that turns the binary trace into its text form. The local
/// trace path is appended after `args`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "edf2asc".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub subject_id: String,
    pub data_dir: PathBuf,
    pub trace_extension: String,
    pub converter: ConverterConfig,
    pub message_background: Rgb,
    pub message_foreground: Rgb,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            subject_id: String::new(),
            data_dir: PathBuf::from("data"),
            trace_extension: "edf".to_string(),
            converter: ConverterConfig::default(),
            message_background: Rgb::WHITE,
            message_foreground: Rgb::BLACK,
        }
    }
}

impl SessionConfig {
    pub fn new(subject_id: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            subject_id: subject_id.into(),
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded session config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subject_id.trim().is_empty() {
            return Err(ConfigError::MissingSubject);
        }
        Ok(())
    }
}
