//! Editing/playing state machine driven by a single owned [`GameWorld`].

mod command;
mod editor;
mod playing;

use serde::Serialize;
use tracing::{info, warn};

pub use command::{CommandError, EditorCommand};
pub use editor::EditorState;
pub use playing::PlayingState;

use crate::world::{DeathCause, GameWorld, Mode, PlayOutcome, WorldError, WorldSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCommand {
    None,
    SwitchTo(Mode),
}

/// What one mode draws: the world snapshot plus a one-line status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub mode: Mode,
    pub snapshot: WorldSnapshot,
    pub status: String,
}

/// Receives finished frames, typically the renderer.
pub trait FrameSink {
    type Error;

    fn present(&mut self, frame: &Frame) -> Result<(), Self::Error>;
}

pub trait ModeState {
    fn mode(&self) -> Mode;
    fn enter(&mut self, world: &mut GameWorld) -> Result<(), WorldError>;
    fn exit(&mut self, world: &mut GameWorld);
    fn handle_input(
        &mut self,
        command: EditorCommand,
        world: &mut GameWorld,
    ) -> Result<ModeCommand, CommandError>;
    fn update(&mut self, dt: f32, world: &mut GameWorld) -> Result<ModeCommand, WorldError>;
    fn status(&self, world: &GameWorld) -> String;

    fn frame(&self, world: &GameWorld) -> Frame {
        Frame {
            mode: self.mode(),
            snapshot: world.query_snapshot(),
            status: self.status(world),
        }
    }
}

pub struct ModeMachine {
    editing: EditorState,
    playing: PlayingState,
    active: Mode,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeMachine {
    pub fn new() -> Self {
        Self {
            editing: EditorState::default(),
            playing: PlayingState::default(),
            active: Mode::Editing,
        }
    }

    pub fn mode(&self) -> Mode {
        self.active
    }

    pub fn last_outcome(&self) -> Option<PlayOutcome> {
        self.playing.last_outcome()
    }

    pub fn dispatch(
        &mut self,
        command: EditorCommand,
        world: &mut GameWorld,
    ) -> Result<(), CommandError> {
        let name = command.name();
        let next = match self.state_mut(self.active).handle_input(command, world) {
            Ok(next) => next,
            Err(error) => {
                warn!(command = name, mode = %self.active, error = %error, "command_rejected");
                return Err(error);
            }
        };
        self.apply(next, world)?;
        Ok(())
    }

    /// Advances the active mode by `dt` seconds and reports a finished play session.
    pub fn update(
        &mut self,
        dt: f32,
        world: &mut GameWorld,
    ) -> Result<Option<PlayOutcome>, WorldError> {
        let next = self.state_mut(self.active).update(dt, world)?;
        let switched = self.apply(next, world)?;
        if !switched {
            return Ok(None);
        }
        let outcome = self.playing.last_outcome();
        if let Some(outcome) = outcome {
            self.editing.set_message(match outcome {
                PlayOutcome::Won => "level complete",
                PlayOutcome::Died {
                    cause: DeathCause::Fell,
                } => "fell out of the level",
                PlayOutcome::Died {
                    cause: DeathCause::OutOfHealth,
                } => "out of health",
            });
        }
        Ok(outcome)
    }

    pub fn frame(&self, world: &GameWorld) -> Frame {
        self.state_ref(self.active).frame(world)
    }

    pub fn present<S: FrameSink>(
        &self,
        world: &GameWorld,
        sink: &mut S,
    ) -> Result<(), S::Error> {
        sink.present(&self.frame(world))
    }

    /// Exits the current mode and enters `next`. A failed entry keeps the current mode.
    pub fn switch_to(&mut self, next: Mode, world: &mut GameWorld) -> Result<bool, WorldError> {
        if self.active == next {
            return Ok(false);
        }

        let previous = self.active;
        self.state_mut(previous).exit(world);
        if let Err(error) = self.state_mut(next).enter(world) {
            warn!(from = %previous, to = %next, error = %error, "mode_switch_failed");
            if let Err(restore) = self.state_mut(previous).enter(world) {
                warn!(mode = %previous, error = %restore, "mode_restore_failed");
            }
            return Err(error);
        }

        self.active = next;
        info!(
            from = %previous,
            to = %next,
            body_count = world.body_count(),
            "mode_switched"
        );
        Ok(true)
    }

    fn apply(&mut self, command: ModeCommand, world: &mut GameWorld) -> Result<bool, WorldError> {
        match command {
            ModeCommand::None => Ok(false),
            ModeCommand::SwitchTo(next) => self.switch_to(next, world),
        }
    }

    fn state_mut(&mut self, mode: Mode) -> &mut dyn ModeState {
        match mode {
            Mode::Editing => &mut self.editing,
            Mode::Playing => &mut self.playing,
        }
    }

    fn state_ref(&self, mode: Mode) -> &dyn ModeState {
        match mode {
            Mode::Editing => &self.editing,
            Mode::Playing => &self.playing,
        }
    }
}
