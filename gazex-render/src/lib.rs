pub mod sink;
pub mod surface;
pub mod text;

pub use sink::{FrameSink, NullSink, PngSequence};
pub use surface::SkiaDisplay;
pub use text::{TextCache, render_text_pixmap};
