use tracing::{info, warn};

use super::{CommandError, EditorCommand, ModeCommand, ModeState};
use crate::world::{GameWorld, Mode, PlayOutcome, Vec2, WorldError};

/// Live simulation. Only player input and the mode toggle are accepted.
#[derive(Debug, Default)]
pub struct PlayingState {
    spawn: Option<Vec2>,
    outcome: Option<PlayOutcome>,
    last_message: Option<String>,
}

impl PlayingState {
    /// Outcome of the most recent session, kept until the next one starts.
    pub fn last_outcome(&self) -> Option<PlayOutcome> {
        self.outcome
    }
}

impl ModeState for PlayingState {
    fn mode(&self) -> Mode {
        Mode::Playing
    }

    fn enter(&mut self, world: &mut GameWorld) -> Result<(), WorldError> {
        world.enter_play_mode()?;
        self.spawn = world.play_spawn();
        self.outcome = None;
        self.last_message = None;
        Ok(())
    }

    fn exit(&mut self, world: &mut GameWorld) {
        world.exit_play_mode();
        let spawn = self.spawn.take();
        if let (Some(PlayOutcome::Died { cause }), Some(spawn)) = (self.outcome, spawn) {
            match world.move_player(spawn) {
                Ok(()) => info!(cause = ?cause, x = spawn.x, y = spawn.y, "player_reset_to_spawn"),
                Err(error) => warn!(error = %error, "player_reset_failed"),
            }
        }
    }

    fn handle_input(
        &mut self,
        command: EditorCommand,
        world: &mut GameWorld,
    ) -> Result<ModeCommand, CommandError> {
        match command {
            EditorCommand::PlayerInput(intent) => {
                world.set_player_intent(intent)?;
                Ok(ModeCommand::None)
            }
            EditorCommand::ToggleMode => Ok(ModeCommand::SwitchTo(Mode::Editing)),
            other => {
                let name = other.name();
                let error = WorldError::InvalidState {
                    operation: name,
                    mode: Mode::Playing,
                };
                self.last_message = Some(format!("{name} failed: {error}"));
                Err(error.into())
            }
        }
    }

    fn update(&mut self, dt: f32, world: &mut GameWorld) -> Result<ModeCommand, WorldError> {
        let report = world.step(dt)?;
        world.follow_player();
        match report.outcome {
            Some(outcome) => {
                self.outcome = Some(outcome);
                Ok(ModeCommand::SwitchTo(Mode::Editing))
            }
            None => Ok(ModeCommand::None),
        }
    }

    fn status(&self, world: &GameWorld) -> String {
        let player = world.player();
        let mut status = format!("PLAY  HEALTH {}", player.health());
        if player.control().grounded {
            status.push_str("  GROUNDED");
        }
        if let Some(message) = &self.last_message {
            status.push_str("  ");
            status.push_str(message);
        }
        status
    }
}
