use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::controls::{EditorControls, DEFAULT_CAMERA_PAN_SPEED};
use super::input::{ActionStates, EdgeStates, InputAction, InputEdge, InputSnapshot};
use super::Renderer;
use crate::level::{load_level, LevelError};
use crate::mode::ModeMachine;
use crate::timestep::plan_sim_steps;
use crate::world::{GameWorld, Mode, Vec2};

pub const DEFAULT_LEVEL_PATH: &str = "level.json";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub level_path: PathBuf,
    pub camera_pan_speed: f32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Level Builder".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            level_path: PathBuf::from(DEFAULT_LEVEL_PATH),
            camera_pan_speed: DEFAULT_CAMERA_PAN_SPEED,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to load startup level: {0}")]
    Level(#[from] LevelError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the editor window and runs until it is closed.
///
/// An existing file at `config.level_path` is loaded into `world` first.
pub fn run_app(config: LoopConfig, mut world: GameWorld) -> Result<(), AppError> {
    if config.level_path.is_file() {
        load_level(&mut world, &config.level_path)?;
    } else {
        info!(path = %config.level_path.display(), "level_file_absent_starting_empty");
    }
    let mut machine = ModeMachine::new();
    let mut controls = EditorControls::new(config.level_path.clone(), config.camera_pan_speed);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(title_for_mode(&config.window_title, Mode::Editing))
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;
    let initial_viewport = renderer.viewport();
    let (spawn, map_size) = (world.player().position(), world.config().map_size());
    let camera = world.camera_mut();
    camera.viewport = initial_viewport;
    camera.follow(spawn, map_size);

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let mut input_collector =
        InputCollector::new(initial_viewport.width, initial_viewport.height);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        level_path = %config.level_path.display(),
        shape_count = world.shape_count(),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_title_mode = Mode::Editing;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor_position_px(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => input_collector.clear_cursor_position(),
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    input_collector.handle_mouse_wheel(delta);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_physical_key(event.physical_key, event.state);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input = input_collector.snapshot_for_tick();
                        let commands = controls.commands_for_tick(
                            &input,
                            machine.mode(),
                            &mut world,
                            fixed_dt_seconds,
                        );
                        for command in commands {
                            // Rejections are logged by the machine and shown in the status line.
                            let _ = machine.dispatch(command, &mut world);
                        }
                        match machine.update(fixed_dt_seconds, &mut world) {
                            Ok(Some(outcome)) => info!(outcome = ?outcome, "play_session_ended"),
                            Ok(None) => {}
                            Err(error) => {
                                warn!(error = %error, "simulation_step_failed");
                                if let Err(switch_error) =
                                    machine.switch_to(Mode::Editing, &mut world)
                                {
                                    warn!(error = %switch_error, "return_to_editing_failed");
                                }
                            }
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    if let Err(error) = machine.present(&world, &mut renderer) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }

                    if machine.mode() != last_title_mode {
                        last_title_mode = machine.mode();
                        window.set_title(&title_for_mode(&config.window_title, last_title_mode));
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => info!(mode = %machine.mode(), "shutdown"),
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn title_for_mode(base: &str, mode: Mode) -> String {
    match mode {
        Mode::Editing => format!("{base} - editing"),
        Mode::Playing => format!("{base} - playing"),
    }
}

/// Press/release tracking for one key that reports a single edge per press.
#[derive(Debug, Clone, Copy, Default)]
struct EdgeKey {
    is_down: bool,
}

impl EdgeKey {
    fn update(&mut self, state: ElementState) -> bool {
        let pressed = state == ElementState::Pressed && !self.is_down;
        self.is_down = state == ElementState::Pressed;
        pressed
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    pending_edges: EdgeStates,
    edge_keys: Vec<(KeyCode, EdgeKey)>,
    left_mouse: EdgeKey,
    right_mouse: EdgeKey,
    pending_zoom_steps: i32,
    cursor_position_px: Option<Vec2>,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let is_pressed = state == ElementState::Pressed;
        if let Some(action) = action_for_key(code) {
            self.action_states.set(action, is_pressed);
            if action == InputAction::Quit && is_pressed {
                self.quit_requested = true;
            }
        }

        let edge = edge_for_key(code);
        if edge == Some(InputEdge::Jump) {
            self.action_states.set(InputAction::JumpHeld, is_pressed);
        }
        let zoom = zoom_steps_for_key(code);
        if edge.is_none() && zoom == 0 {
            return;
        }
        if !self.key_edge(code, state) {
            return;
        }
        if let Some(edge) = edge {
            self.pending_edges.mark(edge);
        }
        self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(zoom);
    }

    fn key_edge(&mut self, code: KeyCode, state: ElementState) -> bool {
        match self.edge_keys.iter_mut().find(|(key, _)| *key == code) {
            Some((_, edge_key)) => edge_key.update(state),
            None => {
                let mut edge_key = EdgeKey::default();
                let pressed = edge_key.update(state);
                self.edge_keys.push((code, edge_key));
                pressed
            }
        }
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        match button {
            MouseButton::Left => {
                if self.left_mouse.update(state) {
                    self.pending_edges.mark(InputEdge::PrimaryClick);
                }
                self.action_states
                    .set(InputAction::PrimaryHeld, self.left_mouse.is_down);
            }
            MouseButton::Right => {
                if self.right_mouse.update(state) {
                    self.pending_edges.mark(InputEdge::SecondaryClick);
                }
            }
            _ => {}
        }
    }

    fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = zoom_steps_from_scroll_delta(delta);
        self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(steps);
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn set_cursor_position_px(&mut self, x: f32, y: f32) {
        self.cursor_position_px = Some(Vec2 { x, y });
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.pending_edges,
            self.cursor_position_px,
            self.pending_zoom_steps,
            (self.window_width, self.window_height),
        );
        self.pending_edges = EdgeStates::default();
        self.pending_zoom_steps = 0;
        snapshot
    }
}

fn action_for_key(code: KeyCode) -> Option<InputAction> {
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::MoveUp),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(InputAction::MoveDown),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

fn edge_for_key(code: KeyCode) -> Option<InputEdge> {
    match code {
        KeyCode::Tab => Some(InputEdge::ToggleMode),
        KeyCode::F5 => Some(InputEdge::Save),
        KeyCode::F9 => Some(InputEdge::Load),
        KeyCode::Space | KeyCode::KeyW | KeyCode::ArrowUp => Some(InputEdge::Jump),
        KeyCode::Digit1 => Some(InputEdge::SelectRect),
        KeyCode::Digit2 => Some(InputEdge::SelectCircle),
        KeyCode::Digit3 => Some(InputEdge::SelectTriangle),
        KeyCode::KeyC => Some(InputEdge::CycleCategory),
        KeyCode::KeyG => Some(InputEdge::SetGoal),
        KeyCode::KeyK => Some(InputEdge::AddCheckpoint),
        KeyCode::KeyZ => Some(InputEdge::ToggleDanger),
        KeyCode::KeyX => Some(InputEdge::ToggleSticky),
        KeyCode::KeyV => Some(InputEdge::ToggleSpinning),
        _ => None,
    }
}

fn zoom_steps_for_key(code: KeyCode) -> i32 {
    match code {
        KeyCode::Equal | KeyCode::NumpadAdd => 1,
        KeyCode::Minus | KeyCode::NumpadSubtract => -1,
        _ => 0,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn zoom_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(position) => {
            if position.y > 0.0 {
                1
            } else if position.y < 0.0 {
                -1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputCollector, code: KeyCode) {
        input.handle_physical_key(PhysicalKey::Code(code), ElementState::Pressed);
    }

    fn release(input: &mut InputCollector, code: KeyCode) {
        input.handle_physical_key(PhysicalKey::Code(code), ElementState::Released);
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn zero_durations_fall_back() {
        let fallback = Duration::from_millis(250);
        assert_eq!(normalize_non_zero_duration(Duration::ZERO, fallback), fallback);
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), fallback),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn held_tab_does_not_spam_toggle_edges() {
        let mut input = InputCollector::default();

        press(&mut input, KeyCode::Tab);
        let first = input.snapshot_for_tick();
        press(&mut input, KeyCode::Tab);
        let second = input.snapshot_for_tick();
        release(&mut input, KeyCode::Tab);
        press(&mut input, KeyCode::Tab);
        let third = input.snapshot_for_tick();

        assert!(first.was_pressed(InputEdge::ToggleMode));
        assert!(!second.was_pressed(InputEdge::ToggleMode));
        assert!(third.was_pressed(InputEdge::ToggleMode));
    }

    #[test]
    fn edge_keys_are_tracked_independently() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::F5);
        press(&mut input, KeyCode::F9);
        let first = input.snapshot_for_tick();
        press(&mut input, KeyCode::F5);
        let second = input.snapshot_for_tick();

        assert!(first.was_pressed(InputEdge::Save));
        assert!(first.was_pressed(InputEdge::Load));
        assert!(!second.was_pressed(InputEdge::Save));
    }

    #[test]
    fn up_key_moves_and_jumps() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::ArrowUp);
        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.is_down(InputAction::MoveUp));
        assert!(first.was_pressed(InputEdge::Jump));
        assert!(second.is_down(InputAction::MoveUp));
        assert!(!second.was_pressed(InputEdge::Jump));
    }

    #[test]
    fn key_release_clears_action_state() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyD);
        release(&mut input, KeyCode::KeyD);
        assert!(!input.snapshot_for_tick().is_down(InputAction::MoveRight));
    }

    #[test]
    fn jump_key_is_both_an_edge_and_a_level() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Space);
        let first = input.snapshot_for_tick();
        assert!(first.was_pressed(InputEdge::Jump));
        assert!(first.is_down(InputAction::JumpHeld));

        let second = input.snapshot_for_tick();
        assert!(!second.was_pressed(InputEdge::Jump));
        assert!(second.is_down(InputAction::JumpHeld));

        release(&mut input, KeyCode::Space);
        assert!(!input.snapshot_for_tick().is_down(InputAction::JumpHeld));
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Escape);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn left_click_is_an_edge_and_a_level() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let first = input.snapshot_for_tick();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let second = input.snapshot_for_tick();
        input.handle_mouse_input(MouseButton::Left, ElementState::Released);
        let third = input.snapshot_for_tick();

        assert!(first.was_pressed(InputEdge::PrimaryClick));
        assert!(first.is_down(InputAction::PrimaryHeld));
        assert!(!second.was_pressed(InputEdge::PrimaryClick));
        assert!(second.is_down(InputAction::PrimaryHeld));
        assert!(!third.is_down(InputAction::PrimaryHeld));
    }

    #[test]
    fn right_click_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.was_pressed(InputEdge::SecondaryClick));
        assert!(!second.was_pressed(InputEdge::SecondaryClick));
    }

    #[test]
    fn snapshot_carries_cursor_and_window_size() {
        let mut input = InputCollector::new(1280, 720);
        input.set_cursor_position_px(100.0, 200.0);
        let snapshot = input.snapshot_for_tick();

        assert_eq!(snapshot.window_size(), (1280, 720));
        assert_eq!(snapshot.cursor_position_px(), Some(Vec2::new(100.0, 200.0)));

        input.clear_cursor_position();
        assert_eq!(input.snapshot_for_tick().cursor_position_px(), None);
    }

    #[test]
    fn zoom_keys_are_edge_triggered_only() {
        let mut input = InputCollector::new(1280, 720);

        press(&mut input, KeyCode::Equal);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), 1);
        press(&mut input, KeyCode::Equal);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), 0);
        release(&mut input, KeyCode::Equal);
        press(&mut input, KeyCode::Equal);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), 1);

        press(&mut input, KeyCode::Minus);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), -1);
    }

    #[test]
    fn mouse_wheel_adds_zoom_steps_and_snapshot_resets_pending() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_wheel(MouseScrollDelta::LineDelta(0.0, 1.0));
        input.handle_mouse_wheel(MouseScrollDelta::LineDelta(0.0, -2.0));

        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), -1);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), 0);
    }

    #[test]
    fn pixel_wheel_delta_maps_to_single_discrete_step_direction() {
        let step = |y: f64| {
            zoom_steps_from_scroll_delta(MouseScrollDelta::PixelDelta(
                winit::dpi::PhysicalPosition::new(0.0, y),
            ))
        };
        assert_eq!(step(3.0), 1);
        assert_eq!(step(-5.0), -1);
        assert_eq!(step(0.0), 0);
    }

    #[test]
    fn window_title_names_the_mode() {
        assert_eq!(
            title_for_mode("Level Builder", Mode::Playing),
            "Level Builder - playing"
        );
    }
}
