//! Clipped raster primitives over an RGBA8 frame buffer.

pub(crate) fn clear(frame: &mut [u8], color: [u8; 4]) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color);
    }
}

pub(crate) fn write_pixel_rgba_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    color: [u8; 4],
) {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(width as usize)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

fn fill_span(frame: &mut [u8], width: u32, height: u32, y: i32, x0: i32, x1: i32, color: [u8; 4]) {
    if y < 0 || y >= height as i32 {
        return;
    }
    let start = x0.max(0);
    let end = x1.min(width as i32 - 1);
    for x in start..=end {
        write_pixel_rgba_clipped(frame, width, height, x, y, color);
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn fill_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let end_y = (y + rect_height).min(height as i32);
    for py in y.max(0)..end_y {
        fill_span(frame, width, height, py, x, x + rect_width - 1, color);
    }
}

pub(crate) fn draw_line_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    from: (i32, i32),
    to: (i32, i32),
    color: [u8; 4],
) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let step_x = if x < to.0 { 1 } else { -1 };
    let step_y = if y < to.1 { 1 } else { -1 };
    let mut error = dx + dy;
    // Long off-screen segments are bounded by their own length.
    let max_steps = dx - dy + 1;
    for _ in 0..max_steps {
        write_pixel_rgba_clipped(frame, width, height, x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x += step_x;
        }
        if doubled <= dx {
            error += dx;
            y += step_y;
        }
    }
}

pub(crate) fn fill_circle(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 4],
) {
    let radius = radius.max(1);
    for dy in -radius..=radius {
        let half = ((radius * radius - dy * dy) as f32).sqrt().round() as i32;
        fill_span(
            frame,
            width,
            height,
            center.1 + dy,
            center.0 - half,
            center.0 + half,
            color,
        );
    }
}

pub(crate) fn draw_circle_outline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 4],
) {
    let (mut x, mut y) = (radius.max(1), 0);
    let mut error = 1 - x;
    while x >= y {
        for (px, py) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            write_pixel_rgba_clipped(frame, width, height, center.0 + px, center.1 + py, color);
        }
        y += 1;
        if error < 0 {
            error += 2 * y + 1;
        } else {
            x -= 1;
            error += 2 * (y - x) + 1;
        }
    }
}

/// Even-odd scanline fill, so concave outlines render as drawn.
pub(crate) fn fill_polygon(
    frame: &mut [u8],
    width: u32,
    height: u32,
    points: &[(i32, i32)],
    color: [u8; 4],
) {
    if points.len() < 3 {
        return;
    }
    let min_y = points.iter().map(|point| point.1).min().unwrap_or(0).max(0);
    let max_y = points
        .iter()
        .map(|point| point.1)
        .max()
        .unwrap_or(0)
        .min(height as i32 - 1);
    let mut crossings = Vec::with_capacity(points.len());
    for y in min_y..=max_y {
        let scan_y = y as f32 + 0.5;
        crossings.clear();
        for (index, a) in points.iter().enumerate() {
            let b = points[(index + 1) % points.len()];
            let (ay, by) = (a.1 as f32, b.1 as f32);
            if (ay <= scan_y) != (by <= scan_y) {
                let t = (scan_y - ay) / (by - ay);
                crossings.push(a.0 as f32 + t * (b.0 - a.0) as f32);
            }
        }
        crossings.sort_by(f32::total_cmp);
        for pair in crossings.chunks_exact(2) {
            fill_span(
                frame,
                width,
                height,
                y,
                pair[0].round() as i32,
                pair[1].round() as i32 - 1,
                color,
            );
        }
    }
}

pub(crate) fn draw_polygon_outline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    points: &[(i32, i32)],
    color: [u8; 4],
) {
    for (index, from) in points.iter().enumerate() {
        let to = points[(index + 1) % points.len()];
        draw_line_clipped(frame, width, height, *from, to, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn pixel(frame: &[u8], width: u32, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * width as usize + x) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        write_pixel_rgba_clipped(&mut frame, 4, 4, -1, 0, WHITE);
        write_pixel_rgba_clipped(&mut frame, 4, 4, 4, 0, WHITE);
        write_pixel_rgba_clipped(&mut frame, 4, 4, 0, 9, WHITE);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn fill_rect_is_clipped_to_frame() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        fill_rect(&mut frame, 4, 4, -2, -2, 4, 4, WHITE);
        assert_eq!(pixel(&frame, 4, 0, 0), WHITE);
        assert_eq!(pixel(&frame, 4, 1, 1), WHITE);
        assert_eq!(pixel(&frame, 4, 2, 2), [0; 4]);
    }

    #[test]
    fn line_reaches_both_endpoints() {
        let mut frame = vec![0u8; 8 * 8 * 4];
        draw_line_clipped(&mut frame, 8, 8, (1, 1), (6, 4), WHITE);
        assert_eq!(pixel(&frame, 8, 1, 1), WHITE);
        assert_eq!(pixel(&frame, 8, 6, 4), WHITE);
    }

    #[test]
    fn filled_circle_covers_center_not_corners() {
        let mut frame = vec![0u8; 9 * 9 * 4];
        fill_circle(&mut frame, 9, 9, (4, 4), 3, WHITE);
        assert_eq!(pixel(&frame, 9, 4, 4), WHITE);
        assert_eq!(pixel(&frame, 9, 0, 0), [0; 4]);
    }

    #[test]
    fn filled_triangle_covers_interior() {
        let mut frame = vec![0u8; 10 * 10 * 4];
        fill_polygon(&mut frame, 10, 10, &[(1, 8), (8, 8), (4, 1)], WHITE);
        assert_eq!(pixel(&frame, 10, 4, 6), WHITE);
        assert_eq!(pixel(&frame, 10, 0, 0), [0; 4]);
        assert_eq!(pixel(&frame, 10, 9, 1), [0; 4]);
    }
}
