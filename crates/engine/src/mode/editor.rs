use tracing::debug;

use super::{EditorCommand, ModeCommand, ModeState};
use crate::level::{load_level, save_level};
use crate::mode::CommandError;
use crate::world::{GameWorld, Mode, ObjectRef, ShapeDesc, WorldError};

/// Free placement. Mutates records directly and never steps physics.
#[derive(Debug, Default)]
pub struct EditorState {
    last_message: Option<String>,
}

impl EditorState {
    pub(crate) fn set_message(&mut self, message: impl Into<String>) {
        self.last_message = Some(message.into());
    }

    fn apply(
        &mut self,
        command: EditorCommand,
        world: &mut GameWorld,
    ) -> Result<ModeCommand, CommandError> {
        match command {
            EditorCommand::PlaceShape {
                geometry,
                position,
                category,
            } => {
                let desc = ShapeDesc::from_geometry(geometry, position).with_category(category);
                let id = world.add_shape(desc)?;
                self.last_message = Some(format!("placed shape {id}"));
            }
            EditorCommand::MoveObject { target, position } => match target {
                ObjectRef::Player => world.move_player(position)?,
                ObjectRef::Shape(id) => world.move_shape(id, position)?,
            },
            EditorCommand::DeleteShape(id) => {
                world.remove_shape(id)?;
                self.last_message = Some(format!("deleted shape {id}"));
            }
            EditorCommand::ResizeShape { id, geometry } => world.resize_shape(id, geometry)?,
            EditorCommand::SetProperty {
                id,
                property,
                enabled,
            } => world.set_shape_property(id, property, enabled)?,
            EditorCommand::SetGoal(goal) => world.set_goal(goal)?,
            EditorCommand::AddCheckpoint(position) => {
                world.add_checkpoint(position)?;
            }
            EditorCommand::RemoveCheckpoint(index) => {
                world.remove_checkpoint(index)?;
            }
            EditorCommand::ToggleMode => return Ok(ModeCommand::SwitchTo(Mode::Playing)),
            EditorCommand::Save(path) => {
                save_level(world, &path)?;
                self.last_message = Some(format!("saved {}", path.display()));
            }
            EditorCommand::Load(path) => {
                load_level(world, &path)?;
                self.last_message = Some(format!("loaded {}", path.display()));
            }
            EditorCommand::PlayerInput(_) => {
                debug!("player_input_ignored_while_editing");
            }
        }
        Ok(ModeCommand::None)
    }
}

impl ModeState for EditorState {
    fn mode(&self) -> Mode {
        Mode::Editing
    }

    fn enter(&mut self, world: &mut GameWorld) -> Result<(), WorldError> {
        world.exit_play_mode();
        Ok(())
    }

    fn exit(&mut self, _world: &mut GameWorld) {}

    fn handle_input(
        &mut self,
        command: EditorCommand,
        world: &mut GameWorld,
    ) -> Result<ModeCommand, CommandError> {
        let name = command.name();
        let result = self.apply(command, world);
        if let Err(error) = &result {
            self.last_message = Some(format!("{name} failed: {error}"));
        }
        result
    }

    fn update(&mut self, _dt: f32, _world: &mut GameWorld) -> Result<ModeCommand, WorldError> {
        Ok(ModeCommand::None)
    }

    fn status(&self, world: &GameWorld) -> String {
        let mut status = format!("EDIT  SHAPES {}", world.shape_count());
        if let Some(message) = &self.last_message {
            status.push_str("  ");
            status.push_str(message);
        }
        status
    }
}
