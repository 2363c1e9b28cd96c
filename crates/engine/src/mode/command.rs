use std::path::PathBuf;

use thiserror::Error;

use crate::level::LevelError;
use crate::world::{
    BodyCategory, Geometry, ObjectRef, PlayerIntent, ShapeId, ShapeProperty, Vec2, WorldError,
};

/// Discrete intents produced by the toolbar, the mouse, or a script.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    PlaceShape {
        geometry: Geometry,
        position: Vec2,
        category: BodyCategory,
    },
    MoveObject {
        target: ObjectRef,
        position: Vec2,
    },
    DeleteShape(ShapeId),
    ResizeShape {
        id: ShapeId,
        geometry: Geometry,
    },
    SetProperty {
        id: ShapeId,
        property: ShapeProperty,
        enabled: bool,
    },
    SetGoal(Option<Vec2>),
    AddCheckpoint(Vec2),
    RemoveCheckpoint(usize),
    ToggleMode,
    Save(PathBuf),
    Load(PathBuf),
    PlayerInput(PlayerIntent),
}

impl EditorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EditorCommand::PlaceShape { .. } => "place_shape",
            EditorCommand::MoveObject { .. } => "move_object",
            EditorCommand::DeleteShape(_) => "delete_shape",
            EditorCommand::ResizeShape { .. } => "resize_shape",
            EditorCommand::SetProperty { .. } => "set_property",
            EditorCommand::SetGoal(_) => "set_goal",
            EditorCommand::AddCheckpoint(_) => "add_checkpoint",
            EditorCommand::RemoveCheckpoint(_) => "remove_checkpoint",
            EditorCommand::ToggleMode => "toggle_mode",
            EditorCommand::Save(_) => "save",
            EditorCommand::Load(_) => "load",
            EditorCommand::PlayerInput(_) => "player_input",
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Level(#[from] LevelError),
}
