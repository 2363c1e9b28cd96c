use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub mod app;
mod atomic_io;
pub mod level;
pub mod mode;
mod timestep;
pub mod world;

pub use app::{
    run_app, screen_to_world_px, world_to_screen_px, AppError, EditorControls, InputAction,
    InputEdge, InputSnapshot, LoopConfig, PlacementTool, Renderer, DEFAULT_LEVEL_PATH,
};
pub use level::{load_level, save_level, LevelData, LevelError, LEVEL_SCHEMA_VERSION};
pub use mode::{
    CommandError, EditorCommand, Frame, FrameSink, ModeCommand, ModeMachine, ModeState,
};
pub use world::{
    BodyCategory, Camera2D, DeathCause, GameWorld, Geometry, HorizontalDirection, Mode, ObjectRef,
    PlayOutcome, PlayerIntent, ShapeDesc, ShapeId, ShapeKind, ShapeProperty, StepReport, Vec2,
    WorldConfig, WorldError, WorldSnapshot,
};

pub const LEVEL_ENV_VAR: &str = "LEVEL_BUILDER_LEVEL";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("{var} is set but empty")]
    EmptyLevelPath { var: &'static str },
}

/// Level file to edit: the explicit path if given, else `LEVEL_BUILDER_LEVEL`,
/// else `level.json` in the working directory.
pub fn resolve_level_path(explicit: Option<PathBuf>) -> Result<PathBuf, StartupError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    level_path_from_env(env::var(LEVEL_ENV_VAR))
}

fn level_path_from_env(value: Result<String, env::VarError>) -> Result<PathBuf, StartupError> {
    match value {
        Ok(raw) if raw.trim().is_empty() => {
            Err(StartupError::EmptyLevelPath { var: LEVEL_ENV_VAR })
        }
        Ok(raw) => Ok(PathBuf::from(raw.trim())),
        Err(env::VarError::NotPresent) => Ok(PathBuf::from(DEFAULT_LEVEL_PATH)),
        Err(source) => Err(StartupError::EnvVar {
            var: LEVEL_ENV_VAR,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_level_path(Some(PathBuf::from("custom.json"))).expect("path");
        assert_eq!(path, PathBuf::from("custom.json"));
    }

    #[test]
    fn missing_env_var_uses_default_file() {
        let path = level_path_from_env(Err(env::VarError::NotPresent)).expect("path");
        assert_eq!(path, PathBuf::from(DEFAULT_LEVEL_PATH));
    }

    #[test]
    fn env_value_is_trimmed() {
        let path = level_path_from_env(Ok("  levels/one.json ".to_string())).expect("path");
        assert_eq!(path, PathBuf::from("levels/one.json"));
    }

    #[test]
    fn blank_env_value_is_rejected() {
        assert!(matches!(
            level_path_from_env(Ok("   ".to_string())),
            Err(StartupError::EmptyLevelPath { .. })
        ));
    }
}
