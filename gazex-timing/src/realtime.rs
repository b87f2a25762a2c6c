//! Host-side real-time window.
//!
//! Raising the process priority needs privileges most lab machines grant to
//! the experiment account only. Without them the window still holds for its
//! duration, just at normal priority.

use crate::timer::{HighPrecisionTimer, Timer};
use std::time::Duration;

#[cfg(any(target_os = "linux", target_os = "macos"))]
const REALTIME_NICE: i32 = -20;

#[derive(Debug, Default)]
pub struct RealtimePriority {
    saved_nice: Option<i32>,
    timer: HighPrecisionTimer,
}

impl RealtimePriority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.saved_nice.is_some()
    }

    /// Raises priority and holds it for `window`. Calling `begin` while a
    /// window is already open only waits.
    pub fn begin(&mut self, window: Duration) {
        if self.saved_nice.is_none() {
            self.saved_nice = Some(raise_priority());
        }
        self.timer.sleep(window);
    }

    pub fn end(&mut self) {
        if let Some(nice) = self.saved_nice.take() {
            restore_priority(nice);
        }
    }
}

impl Drop for RealtimePriority {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn raise_priority() -> i32 {
    unsafe {
        let current = libc::getpriority(libc::PRIO_PROCESS, 0);
        if libc::setpriority(libc::PRIO_PROCESS, 0, REALTIME_NICE) != 0 {
            log::warn!(
                "could not raise process priority: {}",
                std::io::Error::last_os_error()
            );
        } else {
            log::debug!("process priority raised from {} to {}", current, REALTIME_NICE);
        }
        current
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn restore_priority(nice: i32) {
    unsafe {
        if libc::setpriority(libc::PRIO_PROCESS, 0, nice) != 0 {
            log::warn!(
                "could not restore process priority {}: {}",
                nice,
                std::io::Error::last_os_error()
            );
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn raise_priority() -> i32 {
    log::debug!("process priority control unsupported on this platform");
    0
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn restore_priority(_nice: i32) {}
