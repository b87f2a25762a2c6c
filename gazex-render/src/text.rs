use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use gazex_core::Rgb;
use std::collections::HashMap;
use std::sync::Arc;
use string_cache::DefaultAtom as Atom;
use tiny_skia::{Pixmap, PremultipliedColorU8};

/// Rendered message pixmaps keyed by text. Operator messages repeat across a
/// session, so each string is rasterised once.
pub struct TextCache {
    font: FontVec,
    size_px: f32,
    map: HashMap<(Atom, Rgb), Option<Arc<Pixmap>>>,
}

impl TextCache {
    pub fn new(font: FontVec, size_px: f32) -> Self {
        Self {
            font,
            size_px,
            map: HashMap::new(),
        }
    }

    /// `None` when the text has no visible glyphs.
    pub fn get_or_render(&mut self, text: &str, color: Rgb) -> Option<Arc<Pixmap>> {
        let key = (Atom::from(text), color);
        if let Some(p) = self.map.get(&key) {
            return p.clone();
        }
        let pm = render_text_pixmap(text, self.size_px, &self.font, color).map(Arc::new);
        self.map.insert(key, pm.clone());
        pm
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Rgb,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }

    if min_x == f32::INFINITY {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;

    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    let Rgb(cr, cg, cb) = color;

    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            out.draw(|x, y, cov| {
                if cov <= f32::EPSILON {
                    return;
                }
                let ix = (x as f32 + b.min.x - min_x).floor() as i32;
                let iy = (y as f32 + b.min.y - min_y).floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;
                if i >= dst.len() {
                    return;
                }

                // Porter-Duff over in premultiplied space
                let a = cov.clamp(0.0, 1.0);
                let sa = (a * 255.0) as u8;
                let inv = 1.0 - a;
                let bg = dst[i];
                let r = ((cr as f32 * a) as u8).saturating_add((bg.red() as f32 * inv) as u8);
                let g = ((cg as f32 * a) as u8).saturating_add((bg.green() as f32 * inv) as u8);
                let bl = ((cb as f32 * a) as u8).saturating_add((bg.blue() as f32 * inv) as u8);
                let al = sa.saturating_add((bg.alpha() as f32 * inv) as u8);

                if let Some(px) =
                    PremultipliedColorU8::from_rgba(r.min(al), g.min(al), bl.min(al), al)
                {
                    dst[i] = px;
                }
            });
        }
    }

    Some(pm)
}
