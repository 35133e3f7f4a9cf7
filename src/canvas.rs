use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Straight (non-premultiplied) RGBA8 color.
pub type Color = Rgba<u8>;

/// Fully transparent black, the state of a fresh or erased pixel.
pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);

/// Largest canvas side accepted from settings, the CLI, scripts and resize.
pub const MAX_CANVAS_SIDE: u32 = 16_384;

/// Whether `width × height` is a canvas size the editor will allocate.
pub fn is_valid_size(width: u32, height: u32) -> bool {
    (1..=MAX_CANVAS_SIDE).contains(&width) && (1..=MAX_CANVAS_SIDE).contains(&height)
}

// ============================================================================
// PIXEL BUFFER – flat row-major RGBA8 grid
// ============================================================================

/// The editable pixel grid of one editor session.
///
/// Zero-sized buffers are allowed: every read returns `None` and every write
/// is ignored, so editing operations on them degrade to no-ops.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    pixels: RgbaImage,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn new_filled(width: u32, height: u32, color: Color) -> Self {
        let mut buf = Self::new(width, height);
        buf.fill(color);
        buf
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        Self { pixels: image }
    }

    // ---- geometry -----------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Signed bounds test so callers can pass raw pointer coordinates.
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64
    }

    // ---- pixel access -------------------------------------------------------

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width() && y < self.height() {
            Some(*self.pixels.get_pixel(x, y))
        } else {
            None
        }
    }

    /// Overwrite one pixel. Returns `false` (and writes nothing) out of bounds.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) -> bool {
        if x < self.width() && y < self.height() {
            self.pixels.put_pixel(x, y, color);
            true
        } else {
            false
        }
    }

    /// Source-over composite `color` onto one pixel, scaling its alpha by
    /// `coverage` (0.0..=1.0). Fully opaque, full-coverage writes replace the
    /// pixel exactly.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Color, coverage: f32) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        let coverage = coverage.clamp(0.0, 1.0);
        let src_a = color[3] as f32 / 255.0 * coverage;
        if src_a <= 0.0 {
            return;
        }
        let dst = self.pixels.get_pixel_mut(x, y);
        if src_a >= 1.0 {
            *dst = color;
            return;
        }
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        for c in 0..3 {
            let s = color[c] as f32;
            let d = dst[c] as f32;
            let v = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    /// Clear one pixel to transparent.
    pub fn erase_pixel(&mut self, x: u32, y: u32) {
        self.put_pixel(x, y, TRANSPARENT);
    }

    // ---- bulk operations ----------------------------------------------------

    /// Set every pixel to `color`.
    pub fn fill(&mut self, color: Color) {
        let rgba = color.0;
        self.pixels
            .par_chunks_exact_mut(4)
            .for_each(|px| px.copy_from_slice(&rgba));
    }

    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    /// Replace size and contents with a copy of `data`.
    /// `data` must hold `width * height * 4` bytes; anything else is ignored.
    pub fn copy_from_raw(&mut self, width: u32, height: u32, data: &[u8]) -> bool {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            crate::log_err!(
                "PixelBuffer::copy_from_raw: {} bytes for {}×{} (expected {})",
                data.len(),
                width,
                height,
                expected
            );
            return false;
        }
        if self.width() == width && self.height() == height {
            self.pixels.copy_from_slice(data);
        } else {
            // Size differs: allocate fresh storage holding a copy.
            match RgbaImage::from_raw(width, height, data.to_vec()) {
                Some(img) => self.pixels = img,
                None => return false,
            }
        }
        true
    }

    /// New buffer of `width × height` holding this buffer's content anchored at
    /// the top-left corner. Uncovered area is transparent; overflow is cropped.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        let copy_w = self.width().min(width) as usize;
        let copy_h = self.height().min(height);
        if copy_w == 0 {
            return out;
        }
        let src_stride = self.width() as usize * 4;
        let dst_stride = width as usize * 4;
        let src = self.pixels.as_raw();
        let dst: &mut [u8] = &mut out.pixels;
        for y in 0..copy_h as usize {
            let s = y * src_stride;
            let d = y * dst_stride;
            dst[d..d + copy_w * 4].copy_from_slice(&src[s..s + copy_w * 4]);
        }
        out
    }

    // ---- raw views ----------------------------------------------------------

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Mutable row-major RGBA bytes, `width * height * 4` long.
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Rgba([255, 0, 0, 255]);

    #[test]
    fn new_buffer_is_transparent() {
        let buf = PixelBuffer::new(3, 2);
        assert_eq!(buf.as_raw().len(), 3 * 2 * 4);
        assert!(buf.as_raw().iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_sized_buffer_ignores_writes() {
        let mut buf = PixelBuffer::new(0, 5);
        assert!(buf.is_empty());
        assert!(!buf.put_pixel(0, 0, RED));
        assert_eq!(buf.get_pixel(0, 0), None);
        buf.fill(RED);
        assert!(buf.as_raw().is_empty());
    }

    #[test]
    fn size_limits() {
        assert!(is_valid_size(1, 1));
        assert!(is_valid_size(MAX_CANVAS_SIDE, 10));
        assert!(!is_valid_size(0, 10));
        assert!(!is_valid_size(10, MAX_CANVAS_SIDE + 1));
        assert!(!is_valid_size(4_000_000_000, 4_000_000_000));
    }

    #[test]
    fn signed_bounds() {
        let buf = PixelBuffer::new(4, 4);
        assert!(buf.in_bounds(0, 0));
        assert!(buf.in_bounds(3, 3));
        assert!(!buf.in_bounds(-1, 0));
        assert!(!buf.in_bounds(4, 0));
        assert!(!buf.in_bounds(0, 4));
    }

    #[test]
    fn opaque_blend_replaces_exactly() {
        let mut buf = PixelBuffer::new_filled(1, 1, Rgba([10, 20, 30, 255]));
        buf.blend_pixel(0, 0, RED, 1.0);
        assert_eq!(buf.get_pixel(0, 0), Some(RED));
    }

    #[test]
    fn half_coverage_over_transparent_keeps_color() {
        let mut buf = PixelBuffer::new(1, 1);
        buf.blend_pixel(0, 0, RED, 0.5);
        let px = buf.get_pixel(0, 0).unwrap();
        assert_eq!(&px.0[..3], &[255, 0, 0]);
        assert_eq!(px[3], 128);
    }

    #[test]
    fn resize_keeps_top_left() {
        let mut buf = PixelBuffer::new(2, 2);
        buf.put_pixel(0, 0, RED);
        buf.put_pixel(1, 1, RED);

        let grown = buf.resized(3, 3);
        assert_eq!(grown.get_pixel(0, 0), Some(RED));
        assert_eq!(grown.get_pixel(1, 1), Some(RED));
        assert_eq!(grown.get_pixel(2, 2), Some(TRANSPARENT));

        let shrunk = buf.resized(1, 1);
        assert_eq!(shrunk.width(), 1);
        assert_eq!(shrunk.get_pixel(0, 0), Some(RED));
    }

    #[test]
    fn copy_from_raw_rejects_wrong_length() {
        let mut buf = PixelBuffer::new(2, 2);
        assert!(!buf.copy_from_raw(2, 2, &[0u8; 3]));
        assert!(buf.copy_from_raw(1, 1, &[1, 2, 3, 4]));
        assert_eq!(buf.width(), 1);
        assert_eq!(buf.get_pixel(0, 0), Some(Rgba([1, 2, 3, 4])));
    }
}
