use crate::config::{ConverterConfig, SessionConfig};
use crate::error::DataFileError;
use gazex_core::Tracker;
use std::path::{Path, PathBuf};
use std::process::Command;

const CONVERTED_EXTENSION: &str = "asc";

/// Names of one session's trace: the file on the tracker and its copy on
/// this host. Both are fixed when the session is built.
#[derive(Debug, Clone)]
pub struct TraceFiles {
    remote_name: String,
    local_path: PathBuf,
    converter: ConverterConfig,
    transferred: bool,
}

impl TraceFiles {
    pub fn new(config: &SessionConfig) -> Result<Self, DataFileError> {
        let subject = config.subject_id.trim();
        if subject.is_empty() || subject.contains(['/', '\\', '.']) {
            return Err(DataFileError::InvalidSubject(config.subject_id.clone()));
        }

        let remote_name = format!("{}.{}", subject, config.trace_extension);
        let local_path = config.data_dir.join(&remote_name);

        Ok(Self {
            remote_name,
            local_path,
            converter: config.converter.clone(),
            transferred: false,
        })
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn converted_path(&self) -> PathBuf {
        self.local_path.with_extension(CONVERTED_EXTENSION)
    }

    pub fn is_transferred(&self) -> bool {
        self.transferred
    }

    /// Copies the trace off the device. Allowed once per session.
    pub fn transfer<T: Tracker>(&mut self, tracker: &mut T) -> Result<(), DataFileError> {
        if self.transferred {
            return Err(DataFileError::AlreadyTransferred(self.remote_name.clone()));
        }
        if let Some(dir) = self.local_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        log::info!(
            "transferring {} to {}",
            self.remote_name,
            self.local_path.display()
        );
        tracker
            .receive_data_file(&self.remote_name, &self.local_path)
            .map_err(|source| DataFileError::Transfer {
                remote: self.remote_name.clone(),
                local: self.local_path.clone(),
                source,
            })?;
        self.transferred = true;
        Ok(())
    }

    /// Runs the external converter on the local trace and returns the text
    /// file it produced.
    pub fn convert(&self) -> Result<PathBuf, DataFileError> {
        let program = &self.converter.program;
        let mut command = Command::new(program);
        command.args(&self.converter.args).arg(&self.local_path);

        log::info!("converting trace: {:?}", command);
        let status = command
            .status()
            .map_err(|source| DataFileError::ConverterLaunch {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            log::error!("converter {} failed with status: {}", program, status);
            return Err(DataFileError::ConverterFailed {
                program: program.clone(),
                status: status.to_string(),
            });
        }

        let converted = self.converted_path();
        if !converted.exists() {
            return Err(DataFileError::ConvertedMissing(converted));
        }
        log::info!("converted trace written to {}", converted.display());
        Ok(converted)
    }
}
