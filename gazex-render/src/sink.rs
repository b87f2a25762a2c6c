use gazex_core::DisplayError;
use std::path::{Path, PathBuf};
use tiny_skia::Pixmap;

/// Destination of presented frames.
pub trait FrameSink {
    fn present(&mut self, frame: &Pixmap) -> Result<(), DisplayError>;
}

/// Discards frames. Headless runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &Pixmap) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Writes every presented frame as `frame_000001.png`, `frame_000002.png`, ...
#[derive(Debug)]
pub struct PngSequence {
    dir: PathBuf,
    next: u64,
}

impl PngSequence {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, DisplayError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, next: 1 })
    }

    pub fn frames_written(&self) -> u64 {
        self.next - 1
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", index))
    }
}

impl FrameSink for PngSequence {
    fn present(&mut self, frame: &Pixmap) -> Result<(), DisplayError> {
        let path = self.frame_path(self.next);
        frame
            .save_png(&path)
            .map_err(|e| DisplayError::Surface(format!("{}: {}", path.display(), e)))?;
        log::trace!("frame written to {}", path.display());
        self.next += 1;
        Ok(())
    }
}
