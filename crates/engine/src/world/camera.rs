use serde::Serialize;

use super::Vec2;

pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;
pub const CAMERA_ZOOM_MIN: f32 = 0.25;
pub const CAMERA_ZOOM_MAX: f32 = 2.0;
pub const CAMERA_ZOOM_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// View onto the level. `center` is in world units, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera2D {
    pub center: Vec2,
    pub zoom: f32,
    pub viewport: Viewport,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            zoom: CAMERA_ZOOM_DEFAULT,
            viewport: Viewport::default(),
        }
    }
}

impl Camera2D {
    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32) {
        self.zoom = clamp_camera_zoom(zoom);
    }

    pub fn apply_zoom_steps(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        let target_zoom = self.zoom + steps as f32 * CAMERA_ZOOM_STEP;
        self.set_zoom_clamped(target_zoom);
    }

    pub fn pan(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.center = self.center + delta;
        }
    }

    /// Centers on `target`, keeping the visible area inside the map where the map is larger.
    pub fn follow(&mut self, target: Vec2, map_size: Vec2) {
        let zoom = self.effective_zoom();
        let half_w = self.viewport.width as f32 * 0.5 / zoom;
        let half_h = self.viewport.height as f32 * 0.5 / zoom;
        self.center = Vec2::new(
            clamp_axis(target.x, half_w, map_size.x),
            clamp_axis(target.y, half_h, map_size.y),
        );
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let zoom = self.effective_zoom();
        Vec2::new(
            (world.x - self.center.x) * zoom + self.viewport.width as f32 * 0.5,
            (world.y - self.center.y) * zoom + self.viewport.height as f32 * 0.5,
        )
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let zoom = self.effective_zoom();
        Vec2::new(
            (screen.x - self.viewport.width as f32 * 0.5) / zoom + self.center.x,
            (screen.y - self.viewport.height as f32 * 0.5) / zoom + self.center.y,
        )
    }
}

fn clamp_axis(target: f32, half_extent: f32, map_extent: f32) -> f32 {
    if map_extent <= half_extent * 2.0 {
        map_extent * 0.5
    } else {
        target.clamp(half_extent, map_extent - half_extent)
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_maps_to_viewport_middle() {
        let camera = Camera2D {
            center: Vec2::new(500.0, 300.0),
            ..Camera2D::default()
        };
        let screen = camera.world_to_screen(Vec2::new(500.0, 300.0));
        assert_eq!(screen, Vec2::new(640.0, 360.0));
    }

    #[test]
    fn screen_to_world_inverts_world_to_screen() {
        let mut camera = Camera2D {
            center: Vec2::new(120.0, -40.0),
            ..Camera2D::default()
        };
        camera.set_zoom_clamped(1.5);
        let world = Vec2::new(33.0, 71.0);
        let back = camera.screen_to_world(camera.world_to_screen(world));
        assert!((back.x - world.x).abs() < 0.001);
        assert!((back.y - world.y).abs() < 0.001);
    }

    #[test]
    fn follow_clamps_to_map_edges() {
        let mut camera = Camera2D::default();
        camera.follow(Vec2::new(0.0, 0.0), Vec2::new(2000.0, 1000.0));
        assert_eq!(camera.center, Vec2::new(640.0, 360.0));

        camera.follow(Vec2::new(1990.0, 990.0), Vec2::new(2000.0, 1000.0));
        assert_eq!(camera.center, Vec2::new(1360.0, 640.0));
    }

    #[test]
    fn follow_centers_small_maps() {
        let mut camera = Camera2D::default();
        camera.follow(Vec2::new(10.0, 10.0), Vec2::new(400.0, 300.0));
        assert_eq!(camera.center, Vec2::new(200.0, 150.0));
    }

    #[test]
    fn zoom_steps_are_clamped() {
        let mut camera = Camera2D::default();
        camera.apply_zoom_steps(100);
        assert_eq!(camera.zoom, CAMERA_ZOOM_MAX);
        camera.set_zoom_clamped(f32::NAN);
        assert_eq!(camera.zoom, CAMERA_ZOOM_DEFAULT);
    }
}
