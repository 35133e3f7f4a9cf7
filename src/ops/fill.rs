use crate::canvas::{Color, PixelBuffer};
use crate::error::EditError;

/// Paint-bucket fill: recolor the 4-connected region of pixels exactly equal
/// to the seed pixel's color.
///
/// Returns the number of pixels changed. `Ok(0)` when the buffer is empty or
/// the seed already has `new_color`. Out-of-bounds seeds are rejected
/// without touching the buffer.
///
/// Matching is exact on all four channels. Anti-aliased edges therefore stop
/// the fill and keep a thin rim of their own color.
pub fn flood_fill(
    buffer: &mut PixelBuffer,
    x: i64,
    y: i64,
    new_color: Color,
) -> Result<usize, EditError> {
    if buffer.is_empty() {
        return Ok(0);
    }
    if !buffer.in_bounds(x, y) {
        return Err(EditError::OutOfBounds {
            x,
            y,
            width: buffer.width(),
            height: buffer.height(),
        });
    }

    let w = buffer.width() as usize;
    let h = buffer.height() as usize;
    let target = match buffer.get_pixel(x as u32, y as u32) {
        Some(c) => c.0,
        None => return Ok(0),
    };
    let fill = new_color.0;
    if target == fill {
        return Ok(0);
    }

    let data = buffer.as_raw_mut();

    #[inline(always)]
    fn matches(data: &[u8], idx: usize, target: [u8; 4]) -> bool {
        let o = idx * 4;
        data[o..o + 4] == target
    }

    #[inline(always)]
    fn paint(data: &mut [u8], idx: usize, fill: [u8; 4]) {
        let o = idx * 4;
        data[o..o + 4].copy_from_slice(&fill);
    }

    // Pixels are recolored when pushed. A recolored pixel no longer matches
    // `target`, so each index enters the stack at most once.
    let seed = y as usize * w + x as usize;
    let mut stack: Vec<usize> = Vec::with_capacity(4096);
    paint(data, seed, fill);
    stack.push(seed);
    let mut filled = 1usize;

    while let Some(idx) = stack.pop() {
        let px = idx % w;
        let py = idx / w;

        let left = (px > 0).then(|| idx - 1);
        let right = (px + 1 < w).then(|| idx + 1);
        let up = (py > 0).then(|| idx - w);
        let down = (py + 1 < h).then(|| idx + w);

        for ni in [left, right, up, down].into_iter().flatten() {
            if matches(data, ni, target) {
                paint(data, ni, fill);
                stack.push(ni);
                filled += 1;
            }
        }
    }

    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const WHITE: Color = Rgba([255, 255, 255, 255]);
    const BLACK: Color = Rgba([0, 0, 0, 255]);
    const RED: Color = Rgba([255, 0, 0, 255]);

    fn all_equal(buf: &PixelBuffer, color: Color) -> bool {
        buf.as_raw().chunks_exact(4).all(|p| p == color.0)
    }

    #[test]
    fn uniform_buffer_fills_completely() {
        let mut buf = PixelBuffer::new_filled(4, 4, WHITE);
        assert_eq!(flood_fill(&mut buf, 0, 0, BLACK).unwrap(), 16);
        assert!(all_equal(&buf, BLACK));
    }

    #[test]
    fn same_color_is_byte_identical_noop() {
        let mut buf = PixelBuffer::new_filled(5, 3, WHITE);
        buf.put_pixel(2, 1, RED);
        let before = buf.clone();
        assert_eq!(flood_fill(&mut buf, 2, 1, RED).unwrap(), 0);
        assert_eq!(flood_fill(&mut buf, 0, 0, WHITE).unwrap(), 0);
        assert_eq!(buf, before);
    }

    #[test]
    fn out_of_bounds_is_rejected_without_change() {
        let mut buf = PixelBuffer::new_filled(3, 3, WHITE);
        let before = buf.clone();
        for (x, y) in [(-1, 0), (0, -1), (3, 0), (0, 3), (100, 100)] {
            assert!(matches!(
                flood_fill(&mut buf, x, y, BLACK),
                Err(EditError::OutOfBounds { width: 3, height: 3, .. })
            ));
        }
        assert_eq!(buf, before);
    }

    #[test]
    fn empty_buffer_is_noop() {
        let mut buf = PixelBuffer::new(0, 0);
        assert_eq!(flood_fill(&mut buf, 0, 0, BLACK).unwrap(), 0);
    }

    #[test]
    fn enclosed_region_does_not_leak() {
        // 5x5 white with a black ring around the centre pixel.
        let mut buf = PixelBuffer::new_filled(5, 5, WHITE);
        for i in 1..=3 {
            buf.put_pixel(i, 1, BLACK);
            buf.put_pixel(i, 3, BLACK);
            buf.put_pixel(1, i, BLACK);
            buf.put_pixel(3, i, BLACK);
        }
        assert_eq!(flood_fill(&mut buf, 2, 2, RED).unwrap(), 1);
        assert_eq!(buf.get_pixel(2, 2), Some(RED));
        assert_eq!(buf.get_pixel(0, 0), Some(WHITE));

        // Filling outside leaves the inside alone.
        assert_eq!(flood_fill(&mut buf, 0, 0, RED).unwrap(), 16);
        assert_eq!(buf.get_pixel(1, 1), Some(BLACK));
    }

    #[test]
    fn l_shaped_region_fills_only_connected_pixels() {
        // W = white, B = black
        // W B B B
        // W B W W
        // W W W B
        // B B B B
        let rows = ["WBBB", "WBWW", "WWWB", "BBBB"];
        let mut buf = PixelBuffer::new(4, 4);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let c = if ch == 'W' { WHITE } else { BLACK };
                buf.put_pixel(x as u32, y as u32, c);
            }
        }
        assert_eq!(flood_fill(&mut buf, 0, 0, RED).unwrap(), 7);
        assert_eq!(buf.get_pixel(3, 1), Some(RED));
        assert_eq!(buf.get_pixel(1, 0), Some(BLACK));
        assert_eq!(buf.get_pixel(3, 2), Some(BLACK));
    }

    #[test]
    fn checkerboard_changes_only_seed_cell() {
        let mut buf = PixelBuffer::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                let c = if (x + y) % 2 == 0 { WHITE } else { BLACK };
                buf.put_pixel(x, y, c);
            }
        }
        let before = buf.clone();
        assert_eq!(flood_fill(&mut buf, 2, 2, RED).unwrap(), 1);
        for y in 0..6 {
            for x in 0..6 {
                let expected = if (x, y) == (2, 2) { RED } else { before.get_pixel(x, y).unwrap() };
                assert_eq!(buf.get_pixel(x, y), Some(expected));
            }
        }
    }

    #[test]
    fn large_region_does_not_recurse() {
        let mut buf = PixelBuffer::new(1024, 1024);
        assert_eq!(flood_fill(&mut buf, 512, 512, RED).unwrap(), 1024 * 1024);
        assert!(all_equal(&buf, RED));
    }

    #[test]
    fn fill_stops_at_near_miss_colors() {
        let mut buf = PixelBuffer::new_filled(3, 1, WHITE);
        buf.put_pixel(1, 0, Rgba([254, 255, 255, 255]));
        assert_eq!(flood_fill(&mut buf, 0, 0, RED).unwrap(), 1);
        assert_eq!(buf.get_pixel(2, 0), Some(WHITE));
    }
}
