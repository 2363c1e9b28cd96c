use crate::world::{Camera2D, Vec2};

/// Far off-screen geometry is pinned here so raster loops stay bounded.
const SCREEN_COORD_LIMIT: f32 = 100_000.0;

pub fn world_to_screen_px(camera: &Camera2D, world: Vec2) -> (i32, i32) {
    let screen = camera.world_to_screen(world);
    (to_pixel(screen.x), to_pixel(screen.y))
}

pub fn screen_to_world_px(camera: &Camera2D, screen_px: Vec2) -> Vec2 {
    camera.screen_to_world(screen_px)
}

pub(crate) fn world_length_to_px(camera: &Camera2D, length: f32) -> i32 {
    to_pixel(length * camera.effective_zoom())
}

fn to_pixel(value: f32) -> i32 {
    if value.is_finite() {
        value.clamp(-SCREEN_COORD_LIMIT, SCREEN_COORD_LIMIT).round() as i32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_center_maps_to_viewport_center() {
        let camera = Camera2D {
            center: Vec2::new(1000.0, 500.0),
            ..Camera2D::default()
        };
        assert_eq!(world_to_screen_px(&camera, Vec2::new(1000.0, 500.0)), (640, 360));
    }

    #[test]
    fn zoom_scales_offsets_and_lengths() {
        let mut camera = Camera2D::default();
        camera.set_zoom_clamped(2.0);
        assert_eq!(world_to_screen_px(&camera, Vec2::new(10.0, -5.0)), (660, 350));
        assert_eq!(world_length_to_px(&camera, 15.0), 30);
    }

    #[test]
    fn distant_points_are_pinned() {
        let camera = Camera2D::default();
        let (x, _) = world_to_screen_px(&camera, Vec2::new(1.0e12, 0.0));
        assert_eq!(x, SCREEN_COORD_LIMIT as i32);
    }

    #[test]
    fn screen_cursor_maps_back_to_world() {
        let camera = Camera2D {
            center: Vec2::new(300.0, 200.0),
            ..Camera2D::default()
        };
        let world = screen_to_world_px(&camera, Vec2::new(640.0, 360.0));
        assert_eq!(world, Vec2::new(300.0, 200.0));
    }
}
