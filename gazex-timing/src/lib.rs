pub mod realtime;
pub mod timer;

pub use realtime::RealtimePriority;
pub use timer::{HighPrecisionTimer, Timer};
