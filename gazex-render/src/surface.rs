use crate::sink::{FrameSink, NullSink};
use crate::text::TextCache;
use ab_glyph::FontVec;
use gazex_core::{Display, DisplayError, Rgb, ScreenRect};
use std::path::Path;
use tiny_skia::{Color, Paint, Pixmap, PixmapPaint, Rect, Transform};

const DEFAULT_TEXT_PX: f32 = 25.0;

/// Software-rendered display surface backed by a tiny-skia canvas.
pub struct SkiaDisplay<S: FrameSink = NullSink> {
    width: u32,
    height: u32,
    canvas: Pixmap,
    text_cache: Option<TextCache>,
    sink: S,
    frames_presented: u64,
}

impl SkiaDisplay<NullSink> {
    pub fn headless(width: u32, height: u32) -> Result<Self, DisplayError> {
        Self::new(width, height, NullSink)
    }
}

impl<S: FrameSink> SkiaDisplay<S> {
    pub fn new(width: u32, height: u32, sink: S) -> Result<Self, DisplayError> {
        let mut canvas = Pixmap::new(width, height).ok_or_else(|| {
            DisplayError::Surface(format!("cannot allocate {}x{} canvas", width, height))
        })?;
        canvas.fill(Color::from_rgba8(0, 0, 0, 255));

        Ok(Self {
            width,
            height,
            canvas,
            text_cache: None,
            sink,
            frames_presented: 0,
        })
    }

    pub fn with_font_file<P: AsRef<Path>>(self, path: P) -> Result<Self, DisplayError> {
        let bytes = std::fs::read(path.as_ref())?;
        self.with_font_bytes(bytes, DEFAULT_TEXT_PX)
    }

    pub fn with_font_bytes(mut self, bytes: Vec<u8>, size_px: f32) -> Result<Self, DisplayError> {
        let font = FontVec::try_from_vec(bytes).map_err(|e| DisplayError::Font(e.to_string()))?;
        self.text_cache = Some(TextCache::new(font, size_px));
        Ok(self)
    }

    pub fn has_font(&self) -> bool {
        self.text_cache.is_some()
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Draws a small cross, the gaze cursor used while tracking.
    pub fn draw_marker(&mut self, center: (f32, f32), size: f32, color: Rgb) {
        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color(to_color(color));

        let half = size * 0.5;
        let bars = [
            Rect::from_xywh(center.0 - half, center.1 - 1.0, size, 2.0),
            Rect::from_xywh(center.0 - 1.0, center.1 - half, 2.0, size),
        ];
        for bar in bars.into_iter().flatten() {
            self.canvas
                .fill_rect(bar, &paint, Transform::identity(), None);
        }
    }
}

impl<S: FrameSink> Display for SkiaDisplay<S> {
    fn rect(&self) -> ScreenRect {
        ScreenRect::new(self.width, self.height)
    }

    fn fill(&mut self, color: Rgb) {
        self.canvas.fill(to_color(color));
    }

    fn draw_text(
        &mut self,
        text: &str,
        center: (f32, f32),
        color: Rgb,
    ) -> Result<(), DisplayError> {
        let cache = self.text_cache.as_mut().ok_or(DisplayError::NoFont)?;
        let Some(pm) = cache.get_or_render(text, color) else {
            return Ok(());
        };
        let x = (center.0 - pm.width() as f32 / 2.0).round() as i32;
        let y = (center.1 - pm.height() as f32 / 2.0).round() as i32;
        self.canvas.draw_pixmap(
            x,
            y,
            (*pm).as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        self.sink.present(&self.canvas)?;
        self.frames_presented += 1;
        Ok(())
    }
}

fn to_color(Rgb(r, g, b): Rgb) -> Color {
    Color::from_rgba8(r, g, b, 255)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink(Vec<[u8; 4]>);

    impl FrameSink for CountingSink {
        fn present(&mut self, frame: &Pixmap) -> Result<(), DisplayError> {
            let p = frame.pixel(0, 0).unwrap();
            self.0.push([p.red(), p.green(), p.blue(), p.alpha()]);
            Ok(())
        }
    }

    #[test]
    fn fill_then_present_reaches_sink() {
        let mut display = SkiaDisplay::new(64, 48, CountingSink(Vec::new())).unwrap();
        assert_eq!(display.rect(), ScreenRect::new(64, 48));

        display.fill(Rgb::WHITE);
        display.present().unwrap();
        display.fill(Rgb(10, 20, 30));
        display.present().unwrap();

        assert_eq!(display.frames_presented(), 2);
        assert_eq!(display.sink().0, vec![[255, 255, 255, 255], [10, 20, 30, 255]]);
    }

    #[test]
    fn text_without_font_is_an_error() {
        let mut display = SkiaDisplay::headless(32, 32).unwrap();
        assert!(!display.has_font());
        let err = display.draw_text("hello", (16.0, 16.0), Rgb::BLACK);
        assert!(matches!(err, Err(DisplayError::NoFont)));
    }

    #[test]
    fn garbage_font_is_rejected() {
        let display = SkiaDisplay::headless(32, 32).unwrap();
        let err = display.with_font_bytes(vec![0u8; 16], 20.0);
        assert!(matches!(err, Err(DisplayError::Font(_))));
    }

    #[test]
    fn marker_paints_center_pixel() {
        let mut display = SkiaDisplay::headless(40, 40).unwrap();
        display.fill(Rgb::WHITE);
        display.draw_marker((20.0, 20.0), 10.0, Rgb::BLACK);
        let p = display.canvas().pixel(20, 20).unwrap();
        assert_eq!((p.red(), p.green(), p.blue()), (0, 0, 0));
        let corner = display.canvas().pixel(0, 0).unwrap();
        assert_eq!(corner.red(), 255);
    }
}
