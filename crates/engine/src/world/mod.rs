//! Authoritative scene model: shapes, the player, and the physics space that
//! exists only while the world is being played.

mod camera;
mod error;
mod game_world;
mod math;
mod physics;
mod player;
mod shape;
mod snapshot;

use std::fmt;

use serde::Serialize;

pub use camera::{Camera2D, Viewport, CAMERA_ZOOM_MAX, CAMERA_ZOOM_MIN, CAMERA_ZOOM_STEP};
pub use error::WorldError;
pub use game_world::{
    DeathCause, GameWorld, PlayOutcome, StepReport, WorldConfig, CHECKPOINT_RADIUS, GOAL_RADIUS,
};
pub use math::Vec2;
pub use physics::BodyLink;
pub use player::{
    ControlState, Facing, HorizontalDirection, Player, PlayerAnimation, PlayerIntent,
    JUMP_IMPULSE, MAX_HORIZONTAL_SPEED, PLAYER_MAX_HEALTH, PLAYER_RADIUS,
};
pub use shape::{
    BodyCategory, Geometry, Material, ObjectRef, Shape, ShapeDesc, ShapeId, ShapeIdAllocator,
    ShapeKind, ShapeProperties, ShapeProperty, DEFAULT_FRICTION, DEFAULT_RESTITUTION,
    DEFAULT_SHAPE_SIZE,
};
pub use snapshot::{CheckpointView, ObjectView, PlayerView, WorldSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Editing,
    Playing,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Editing => "editing",
            Mode::Playing => "playing",
        })
    }
}
