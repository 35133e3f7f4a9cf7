// ============================================================================
// STROKE RASTERIZATION – round discs stamped along each segment
// ============================================================================
//
// A segment is drawn by stamping discs of the stroke diameter at 1px steps
// from start to end. Overlapping discs give round caps and round joins for
// free. Coverage is binary: a pixel is inside a disc when its centre is.
//
// Stamps overlap roughly `width` times, so every write goes through a
// `CoverageMask` that lets each pixel be composited once per stroke.
// Otherwise a translucent color would build up towards opaque.

use crate::canvas::{Color, PixelBuffer};
use crate::components::tools::CompositeMode;

/// Smallest radius used for stamping; keeps hairline strokes visible.
const MIN_RADIUS: f32 = 0.5;

/// Pixels already composited by the stroke in progress.
pub struct CoverageMask {
    width: u32,
    height: u32,
    claimed: Vec<bool>,
}

impl CoverageMask {
    /// Empty mask matching `buffer`'s dimensions.
    pub fn for_buffer(buffer: &PixelBuffer) -> Self {
        let (width, height) = (buffer.width(), buffer.height());
        Self {
            width,
            height,
            claimed: vec![false; width as usize * height as usize],
        }
    }

    /// Mark `(x, y)` as covered. `true` only the first time, and never for
    /// pixels outside the mask.
    fn claim(&mut self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.width as usize + x as usize;
        !std::mem::replace(&mut self.claimed[idx], true)
    }

    #[cfg(test)]
    fn covered(&self) -> usize {
        self.claimed.iter().filter(|&&c| c).count()
    }
}

/// Draw one segment from `start` to `end` (pointer coordinates, pixel
/// centres at `.5`). `start == end` stamps a single dot. Pixels already in
/// `mask` are left alone.
pub fn draw_segment(
    buffer: &mut PixelBuffer,
    mask: &mut CoverageMask,
    start: (f32, f32),
    end: (f32, f32),
    width: f32,
    color: Color,
    mode: CompositeMode,
) {
    if buffer.is_empty() || !width.is_finite() || width <= 0.0 {
        return;
    }
    if ![start.0, start.1, end.0, end.1].iter().all(|v| v.is_finite()) {
        return;
    }
    let radius = (width / 2.0).max(MIN_RADIUS);

    // Only the part of the segment whose discs can reach a pixel centre
    // matters; this also bounds the step count for far-away endpoints.
    let min = (-radius, -radius);
    let max = (buffer.width() as f32 + radius, buffer.height() as f32 + radius);
    let Some((start, end)) = clip_segment(start, end, min, max) else { return };

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < 0.1 {
        stamp_disc(buffer, mask, start, radius, color, mode);
        return;
    }

    let steps = distance.ceil() as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp_disc(buffer, mask, (start.0 + dx * t, start.1 + dy * t), radius, color, mode);
    }
}

/// Liang–Barsky clip of `start..end` against the rectangle `min..max`.
/// `None` when the segment misses it entirely.
///
/// Runs in `f64`, and an endpoint moved onto an edge takes that edge's
/// coordinate exactly, so endpoints near `f32::MAX` do not collapse.
fn clip_segment(
    start: (f32, f32),
    end: (f32, f32),
    min: (f32, f32),
    max: (f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    let (sx, sy) = (start.0 as f64, start.1 as f64);
    let dx = end.0 as f64 - sx;
    let dy = end.1 as f64 - sy;
    let (min_x, min_y) = (min.0 as f64, min.1 as f64);
    let (max_x, max_y) = (max.0 as f64, max.1 as f64);

    // (p, q, axis, edge): axis 0 = x, 1 = y
    let edges = [
        (-dx, sx - min_x, 0, min_x),
        (dx, max_x - sx, 0, max_x),
        (-dy, sy - min_y, 1, min_y),
        (dy, max_y - sy, 1, max_y),
    ];

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    let mut enter: Option<(usize, f64)> = None;
    let mut exit: Option<(usize, f64)> = None;

    for (p, q, axis, edge) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            if r > t0 {
                t0 = r;
                enter = Some((axis, edge));
            }
        } else {
            if r < t0 {
                return None;
            }
            if r < t1 {
                t1 = r;
                exit = Some((axis, edge));
            }
        }
    }

    let point = |t: f64, snap: Option<(usize, f64)>| {
        let mut pt = [sx + dx * t, sy + dy * t];
        if let Some((axis, edge)) = snap {
            pt[axis] = edge;
        }
        (
            pt[0].clamp(min_x, max_x) as f32,
            pt[1].clamp(min_y, max_y) as f32,
        )
    };
    Some((point(t0, enter), point(t1, exit)))
}

/// Stamp a filled disc centred at `center`. Parts outside the buffer are
/// clipped.
fn stamp_disc(
    buffer: &mut PixelBuffer,
    mask: &mut CoverageMask,
    center: (f32, f32),
    radius: f32,
    color: Color,
    mode: CompositeMode,
) {
    let (cx, cy) = center;
    let w = buffer.width() as i64;
    let h = buffer.height() as i64;

    let min_x = ((cx - radius).floor() as i64).max(0);
    let max_x = ((cx + radius).ceil() as i64).min(w - 1);
    let min_y = ((cy - radius).floor() as i64).max(0);
    let max_y = ((cy + radius).ceil() as i64).min(h - 1);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let radius_sq = radius * radius;
    for y in min_y..=max_y {
        let py = y as f32 + 0.5 - cy;
        for x in min_x..=max_x {
            let px = x as f32 + 0.5 - cx;
            if px * px + py * py > radius_sq || !mask.claim(x as u32, y as u32) {
                continue;
            }
            match mode {
                CompositeMode::Paint => buffer.blend_pixel(x as u32, y as u32, color, 1.0),
                CompositeMode::Erase => buffer.erase_pixel(x as u32, y as u32),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;
    use image::Rgba;

    const BLUE: Color = Rgba([0, 0, 255, 255]);

    fn painted(buf: &PixelBuffer) -> usize {
        buf.as_raw().chunks_exact(4).filter(|p| p[3] != 0).count()
    }

    fn segment(buf: &mut PixelBuffer, start: (f32, f32), end: (f32, f32), width: f32, color: Color, mode: CompositeMode) {
        let mut mask = CoverageMask::for_buffer(buf);
        draw_segment(buf, &mut mask, start, end, width, color, mode);
    }

    #[test]
    fn horizontal_segment_covers_its_row() {
        let mut buf = PixelBuffer::new(10, 5);
        segment(&mut buf, (1.5, 2.5), (8.5, 2.5), 1.0, BLUE, CompositeMode::Paint);
        for x in 1..=8 {
            assert_eq!(buf.get_pixel(x, 2), Some(BLUE), "x = {}", x);
        }
        assert_eq!(buf.get_pixel(1, 1), Some(TRANSPARENT));
        assert_eq!(buf.get_pixel(9, 2), Some(TRANSPARENT));
    }

    #[test]
    fn wide_dot_is_round() {
        let mut buf = PixelBuffer::new(11, 11);
        segment(&mut buf, (5.5, 5.5), (5.5, 5.5), 9.0, BLUE, CompositeMode::Paint);
        assert_eq!(buf.get_pixel(5, 5), Some(BLUE));
        assert_eq!(buf.get_pixel(5, 1), Some(BLUE));
        // Corners of the bounding square lie outside the disc.
        assert_eq!(buf.get_pixel(1, 1), Some(TRANSPARENT));
        assert_eq!(buf.get_pixel(9, 9), Some(TRANSPARENT));
    }

    #[test]
    fn erase_clears_to_transparent() {
        let mut buf = PixelBuffer::new_filled(6, 6, BLUE);
        segment(&mut buf, (0.5, 0.5), (5.5, 0.5), 1.0, BLUE, CompositeMode::Erase);
        for x in 0..6 {
            assert_eq!(buf.get_pixel(x, 0), Some(TRANSPARENT));
            assert_eq!(buf.get_pixel(x, 1), Some(BLUE));
        }
    }

    #[test]
    fn clips_at_edges() {
        let mut buf = PixelBuffer::new(4, 4);
        segment(&mut buf, (-10.0, -10.0), (20.0, 20.0), 3.0, BLUE, CompositeMode::Paint);
        assert_eq!(buf.get_pixel(0, 0), Some(BLUE));
        assert_eq!(buf.get_pixel(3, 3), Some(BLUE));
        assert!(painted(&buf) < 16);
    }

    #[test]
    fn far_endpoint_is_clipped_not_walked() {
        let mut buf = PixelBuffer::new(8, 8);
        segment(&mut buf, (0.5, 0.5), (2e8, 0.5), 1.0, BLUE, CompositeMode::Paint);
        for x in 0..8 {
            assert_eq!(buf.get_pixel(x, 0), Some(BLUE), "x = {}", x);
        }
        assert_eq!(painted(&buf), 8);

        let mut buf = PixelBuffer::new(8, 8);
        segment(&mut buf, (-1e30, 4.5), (1e30, 4.5), 1.0, BLUE, CompositeMode::Paint);
        assert_eq!(painted(&buf), 8);
        assert_eq!(buf.get_pixel(3, 4), Some(BLUE));
    }

    #[test]
    fn segment_missing_canvas_draws_nothing() {
        let mut buf = PixelBuffer::new(8, 8);
        segment(&mut buf, (-50.0, -50.0), (-50.0, 1e9), 4.0, BLUE, CompositeMode::Paint);
        segment(&mut buf, (100.0, 100.0), (200.0, 300.0), 4.0, BLUE, CompositeMode::Paint);
        assert_eq!(painted(&buf), 0);
    }

    #[test]
    fn translucent_stroke_is_uniform() {
        let half_red = Rgba([255, 0, 0, 128]);
        let mut buf = PixelBuffer::new(40, 12);
        let mut mask = CoverageMask::for_buffer(&buf);
        // Two segments meeting at a joint: overlap must not darken it.
        draw_segment(&mut buf, &mut mask, (5.5, 6.5), (20.5, 6.5), 5.0, half_red, CompositeMode::Paint);
        draw_segment(&mut buf, &mut mask, (20.5, 6.5), (35.5, 6.5), 5.0, half_red, CompositeMode::Paint);

        let alphas: Vec<u8> = buf
            .as_raw()
            .chunks_exact(4)
            .map(|p| p[3])
            .filter(|&a| a != 0)
            .collect();
        assert_eq!(alphas.len(), mask.covered());
        assert!(!alphas.is_empty());
        assert!(alphas.iter().all(|&a| a == 128));
        assert_eq!(buf.get_pixel(20, 6), Some(half_red));
    }

    #[test]
    fn degenerate_input_is_ignored() {
        let mut buf = PixelBuffer::new(4, 4);
        segment(&mut buf, (1.0, 1.0), (2.0, 2.0), 0.0, BLUE, CompositeMode::Paint);
        segment(&mut buf, (f32::NAN, 1.0), (2.0, 2.0), 2.0, BLUE, CompositeMode::Paint);
        segment(&mut buf, (1.0, 1.0), (f32::INFINITY, 2.0), 2.0, BLUE, CompositeMode::Paint);
        assert_eq!(painted(&buf), 0);

        let mut empty = PixelBuffer::new(0, 0);
        segment(&mut empty, (0.0, 0.0), (1.0, 1.0), 2.0, BLUE, CompositeMode::Paint);
    }
}
