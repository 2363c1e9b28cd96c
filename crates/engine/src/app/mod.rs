mod controls;
mod input;
mod loop_runner;
mod rendering;

pub use controls::{EditorControls, PlacementTool, DEFAULT_CAMERA_PAN_SPEED};
pub use input::{InputAction, InputEdge, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig, DEFAULT_LEVEL_PATH};
pub use rendering::{screen_to_world_px, world_to_screen_px, Renderer};
