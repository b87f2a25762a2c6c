use crate::error::DisplayError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

/// Pixel rectangle of the drawable target, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// Integer midpoint, as handed to the device for drift probes.
    pub fn center_px(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

/// The on-screen surface a session writes operator feedback to.
pub trait Display {
    fn rect(&self) -> ScreenRect;
    fn fill(&mut self, color: Rgb);
    /// Renders `text` centred on `center`.
    fn draw_text(&mut self, text: &str, center: (f32, f32), color: Rgb) -> Result<(), DisplayError>;
    fn present(&mut self) -> Result<(), DisplayError>;
}
