use serde::Serialize;

use super::{
    BodyCategory, Camera2D, Facing, Geometry, Mode, PlayerAnimation, ShapeId, ShapeKind,
    ShapeProperties, Vec2,
};

/// Read-only picture of the world for drawing. Carries no physics handles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub mode: Mode,
    pub camera: Camera2D,
    pub map_size: Vec2,
    pub player: PlayerView,
    pub objects: Vec<ObjectView>,
    pub goal: Option<Vec2>,
    pub checkpoints: Vec<CheckpointView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectView {
    pub draw_index: usize,
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub position: Vec2,
    pub angle: f32,
    pub geometry: Geometry,
    pub category: BodyCategory,
    pub properties: ShapeProperties,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerView {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub facing: Facing,
    pub grounded: bool,
    pub animation: PlayerAnimation,
    pub health: u32,
    pub invincible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CheckpointView {
    pub position: Vec2,
    pub active: bool,
}

impl WorldSnapshot {
    pub fn object(&self, id: ShapeId) -> Option<&ObjectView> {
        self.objects.iter().find(|object| object.id == id)
    }
}
