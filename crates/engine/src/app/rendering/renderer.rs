use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::draw::{
    clear, draw_circle_outline, draw_line_clipped, draw_polygon_outline, fill_circle, fill_polygon,
    fill_rect,
};
use super::text::{draw_text_clipped, text_width, LINE_HEIGHT};
use super::transform::{world_length_to_px, world_to_screen_px};
use crate::mode::{Frame, FrameSink};
use crate::world::{
    BodyCategory, Camera2D, Facing, Geometry, Mode, ObjectView, PlayerView, Vec2, Viewport,
};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const OUTSIDE_MAP_COLOR: [u8; 4] = [12, 13, 17, 255];
const MAP_BORDER_COLOR: [u8; 4] = [70, 78, 96, 255];
const STATIC_COLOR: [u8; 4] = [120, 128, 146, 255];
const DYNAMIC_COLOR: [u8; 4] = [86, 156, 214, 255];
const DANGER_COLOR: [u8; 4] = [214, 64, 64, 255];
const STICKY_COLOR: [u8; 4] = [196, 150, 60, 255];
const SPINNING_OUTLINE_COLOR: [u8; 4] = [240, 240, 255, 255];
const PLAYER_COLOR: [u8; 4] = [120, 220, 110, 255];
const PLAYER_INVINCIBLE_COLOR: [u8; 4] = [200, 255, 190, 255];
const PLAYER_EYE_COLOR: [u8; 4] = [20, 30, 20, 255];
const SPAWN_MARKER_COLOR: [u8; 4] = [255, 210, 70, 255];
const GOAL_COLOR: [u8; 4] = [250, 220, 80, 255];
const CHECKPOINT_COLOR: [u8; 4] = [110, 120, 200, 255];
const CHECKPOINT_ACTIVE_COLOR: [u8; 4] = [150, 230, 255, 255];
const STATUS_PLATE_COLOR: [u8; 4] = [0, 0, 0, 200];
const STATUS_TEXT_COLOR: [u8; 4] = [230, 230, 230, 255];
const STATUS_MARGIN_PX: i32 = 6;
const MARKER_HALF_SIZE_PX: i32 = 6;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }
}

impl FrameSink for Renderer {
    type Error = Error;

    fn present(&mut self, frame: &Frame) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        let Viewport { width, height } = self.viewport;
        draw_frame(self.pixels.frame_mut(), width, height, frame);
        self.pixels.render()
    }
}

/// Rasterizes one frame into an RGBA8 buffer of `width` x `height` pixels.
pub(crate) fn draw_frame(buffer: &mut [u8], width: u32, height: u32, frame: &Frame) {
    let snapshot = &frame.snapshot;
    let camera = Camera2D {
        viewport: Viewport { width, height },
        ..snapshot.camera
    };

    clear(buffer, OUTSIDE_MAP_COLOR);
    draw_map(buffer, width, height, &camera, snapshot.map_size);

    for object in &snapshot.objects {
        draw_object(buffer, width, height, &camera, object);
    }
    for checkpoint in &snapshot.checkpoints {
        let color = if checkpoint.active {
            CHECKPOINT_ACTIVE_COLOR
        } else {
            CHECKPOINT_COLOR
        };
        draw_flag(buffer, width, height, &camera, checkpoint.position, color);
    }
    if let Some(goal) = snapshot.goal {
        let center = world_to_screen_px(&camera, goal);
        let radius = world_length_to_px(&camera, crate::world::GOAL_RADIUS);
        fill_circle(buffer, width, height, center, radius, GOAL_COLOR);
        draw_circle_outline(buffer, width, height, center, radius + 2, GOAL_COLOR);
    }
    draw_player(buffer, width, height, &camera, &snapshot.player);
    if frame.mode == Mode::Editing {
        draw_spawn_marker(
            buffer,
            width,
            height,
            world_to_screen_px(&camera, snapshot.player.position),
        );
    }
    draw_status(buffer, width, height, &frame.status);
}

fn draw_map(buffer: &mut [u8], width: u32, height: u32, camera: &Camera2D, map_size: Vec2) {
    let (left, top) = world_to_screen_px(camera, Vec2::ZERO);
    let (right, bottom) = world_to_screen_px(camera, map_size);
    fill_rect(
        buffer,
        width,
        height,
        left,
        top,
        right - left,
        bottom - top,
        CLEAR_COLOR,
    );
    draw_polygon_outline(
        buffer,
        width,
        height,
        &[(left, top), (right, top), (right, bottom), (left, bottom)],
        MAP_BORDER_COLOR,
    );
}

fn object_color(object: &ObjectView) -> [u8; 4] {
    if object.properties.danger {
        DANGER_COLOR
    } else if object.properties.sticky {
        STICKY_COLOR
    } else {
        match object.category {
            BodyCategory::Static => STATIC_COLOR,
            BodyCategory::Dynamic => DYNAMIC_COLOR,
        }
    }
}

fn draw_object(buffer: &mut [u8], width: u32, height: u32, camera: &Camera2D, object: &ObjectView) {
    let color = object_color(object);
    let to_screen = |local: Vec2| {
        world_to_screen_px(camera, object.position + local.rotated(object.angle))
    };

    let outline = match &object.geometry {
        Geometry::Circle { radius } => {
            let center = world_to_screen_px(camera, object.position);
            let radius_px = world_length_to_px(camera, *radius);
            fill_circle(buffer, width, height, center, radius_px, color);
            // Radius line so rotation stays visible on circles.
            let rim = to_screen(Vec2::new(*radius, 0.0));
            draw_line_clipped(buffer, width, height, center, rim, CLEAR_COLOR);
            if object.properties.spinning {
                draw_circle_outline(
                    buffer,
                    width,
                    height,
                    center,
                    radius_px,
                    SPINNING_OUTLINE_COLOR,
                );
            }
            return;
        }
        Geometry::Rect {
            width: rect_width,
            height: rect_height,
        } => {
            let (hw, hh) = (rect_width * 0.5, rect_height * 0.5);
            [
                Vec2::new(-hw, -hh),
                Vec2::new(hw, -hh),
                Vec2::new(hw, hh),
                Vec2::new(-hw, hh),
            ]
            .into_iter()
            .map(to_screen)
            .collect::<Vec<_>>()
        }
        Geometry::Polygon { points } => points.iter().copied().map(to_screen).collect(),
    };

    fill_polygon(buffer, width, height, &outline, color);
    if object.properties.spinning {
        draw_polygon_outline(buffer, width, height, &outline, SPINNING_OUTLINE_COLOR);
    }
}

fn draw_player(buffer: &mut [u8], width: u32, height: u32, camera: &Camera2D, player: &PlayerView) {
    let center = world_to_screen_px(camera, player.position);
    let radius = world_length_to_px(camera, player.radius);
    let color = if player.invincible {
        PLAYER_INVINCIBLE_COLOR
    } else {
        PLAYER_COLOR
    };
    fill_circle(buffer, width, height, center, radius, color);

    let eye_offset = match player.facing {
        Facing::Left => -radius / 2,
        Facing::Right => radius / 2,
    };
    let eye_size = (radius / 4).max(1);
    fill_rect(
        buffer,
        width,
        height,
        center.0 + eye_offset - eye_size / 2,
        center.1 - radius / 3,
        eye_size,
        eye_size,
        PLAYER_EYE_COLOR,
    );
}

fn draw_spawn_marker(buffer: &mut [u8], width: u32, height: u32, center: (i32, i32)) {
    let half = MARKER_HALF_SIZE_PX;
    draw_line_clipped(
        buffer,
        width,
        height,
        (center.0 - half, center.1 - half),
        (center.0 + half, center.1 + half),
        SPAWN_MARKER_COLOR,
    );
    draw_line_clipped(
        buffer,
        width,
        height,
        (center.0 - half, center.1 + half),
        (center.0 + half, center.1 - half),
        SPAWN_MARKER_COLOR,
    );
}

fn draw_flag(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    camera: &Camera2D,
    position: Vec2,
    color: [u8; 4],
) {
    let base = world_to_screen_px(camera, position);
    let radius = world_length_to_px(camera, crate::world::CHECKPOINT_RADIUS);
    draw_circle_outline(buffer, width, height, base, radius, color);
    let top = (base.0, base.1 - radius);
    draw_line_clipped(buffer, width, height, base, top, color);
    fill_polygon(
        buffer,
        width,
        height,
        &[top, (top.0 + radius, top.1 + radius / 3), (top.0, top.1 + 2 * radius / 3)],
        color,
    );
}

fn draw_status(buffer: &mut [u8], width: u32, height: u32, status: &str) {
    if status.is_empty() {
        return;
    }
    let plate_width = text_width(status) + STATUS_MARGIN_PX * 2;
    let plate_height = LINE_HEIGHT + STATUS_MARGIN_PX * 2;
    fill_rect(
        buffer,
        width,
        height,
        0,
        0,
        plate_width,
        plate_height,
        STATUS_PLATE_COLOR,
    );
    draw_text_clipped(
        buffer,
        width,
        height,
        STATUS_MARGIN_PX,
        STATUS_MARGIN_PX,
        status,
        STATUS_TEXT_COLOR,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{GameWorld, ShapeDesc, ShapeProperty};

    const WIDTH: u32 = 320;
    const HEIGHT: u32 = 180;

    fn pixel(buffer: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * WIDTH + x) * 4) as usize;
        [
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ]
    }

    fn render(world: &GameWorld, mode: Mode, status: &str) -> Vec<u8> {
        let frame = Frame {
            mode,
            snapshot: world.query_snapshot(),
            status: status.to_string(),
        };
        let mut buffer = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
        draw_frame(&mut buffer, WIDTH, HEIGHT, &frame);
        buffer
    }

    fn centered_world() -> GameWorld {
        let mut world = GameWorld::default();
        world.camera_mut().center = Vec2::new(1000.0, 500.0);
        world.move_player(Vec2::new(1100.0, 500.0)).expect("player");
        world
    }

    #[test]
    fn shape_under_camera_center_is_filled() {
        let mut world = centered_world();
        world
            .add_shape(ShapeDesc::rect(Vec2::new(1000.0, 500.0), 40.0, 40.0))
            .expect("rect");
        let buffer = render(&world, Mode::Editing, "");
        assert_eq!(pixel(&buffer, WIDTH / 2, HEIGHT / 2), STATIC_COLOR);
    }

    #[test]
    fn danger_overrides_category_color() {
        let mut world = centered_world();
        let id = world
            .add_shape(ShapeDesc::circle(Vec2::new(1000.0, 500.0), 20.0))
            .expect("circle");
        world
            .set_shape_property(id, ShapeProperty::Danger, true)
            .expect("danger");
        let buffer = render(&world, Mode::Editing, "");
        assert_eq!(pixel(&buffer, WIDTH / 2, HEIGHT / 2 + 5), DANGER_COLOR);
    }

    #[test]
    fn player_is_drawn_at_its_position() {
        let world = centered_world();
        let buffer = render(&world, Mode::Playing, "");
        assert_eq!(pixel(&buffer, WIDTH / 2 + 100, HEIGHT / 2 + 10), PLAYER_COLOR);
    }

    #[test]
    fn area_outside_the_map_uses_its_own_color() {
        let mut world = GameWorld::default();
        world.camera_mut().center = Vec2::ZERO;
        let buffer = render(&world, Mode::Editing, "");
        assert_eq!(pixel(&buffer, 10, HEIGHT - 10), OUTSIDE_MAP_COLOR);
        assert_eq!(pixel(&buffer, WIDTH - 10, HEIGHT - 10), CLEAR_COLOR);
    }

    #[test]
    fn status_line_gets_a_plate() {
        let world = centered_world();
        let buffer = render(&world, Mode::Editing, "EDIT");
        assert_eq!(pixel(&buffer, 1, 1), STATUS_PLATE_COLOR);
    }
}
