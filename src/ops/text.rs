use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use std::path::Path;

use crate::canvas::{Color, PixelBuffer};
use crate::error::EditError;

/// Default text height in pixels.
pub const DEFAULT_FONT_SIZE: f32 = 20.0;

/// Parse a TrueType / OpenType font from owned bytes.
pub fn load_font(bytes: Vec<u8>) -> Result<FontArc, EditError> {
    Ok(FontArc::try_from_vec(bytes)?)
}

pub fn load_font_file(path: &Path) -> Result<FontArc, EditError> {
    let bytes = std::fs::read(path)?;
    load_font(bytes)
}

/// Lay out one line of text left-aligned at x = 0 on the baseline y = 0.
/// Returns `(glyphs, total_width)` where each glyph is `(id, x, y)`.
pub fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x, 0.0));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Draw `text` into `buffer` with its first baseline starting at
/// `(origin_x, origin_y)`. `'\n'` starts a new line one line-height lower.
/// Glyph coverage scales the color's alpha; everything outside the buffer is
/// clipped. Returns the number of pixels touched.
pub fn stamp_text(
    buffer: &mut PixelBuffer,
    font: &FontArc,
    text: &str,
    font_size: f32,
    origin_x: f32,
    origin_y: f32,
    color: Color,
) -> usize {
    if buffer.is_empty() || text.is_empty() || !(font_size > 0.0) {
        return 0;
    }
    let line_height = font.as_scaled(font_size).height();
    let w = buffer.width() as i64;
    let h = buffer.height() as i64;
    let mut touched = 0usize;

    for (line_idx, line) in text.split('\n').enumerate() {
        let baseline = origin_y + line_idx as f32 * line_height;
        let (glyphs, _) = layout_line(font, line, font_size);

        for (glyph_id, gx, gy) in glyphs {
            let glyph = glyph_id.with_scale_and_position(font_size, point(origin_x + gx, baseline + gy));
            let Some(outlined) = font.outline_glyph(glyph) else { continue };
            let bounds = outlined.px_bounds();
            let bx = bounds.min.x as i64;
            let by = bounds.min.y as i64;

            outlined.draw(|px, py, coverage| {
                let x = bx + px as i64;
                let y = by + py as i64;
                if x < 0 || y < 0 || x >= w || y >= h || coverage <= 0.0 {
                    return;
                }
                buffer.blend_pixel(x as u32, y as u32, color, coverage);
                touched += 1;
            });
        }
    }

    touched
}
