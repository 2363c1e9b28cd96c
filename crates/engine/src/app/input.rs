use crate::world::Vec2;

/// Held inputs, sampled as levels every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PrimaryHeld,
    JumpHeld,
    Quit,
}

const ACTION_COUNT: usize = 7;

/// Presses reported for exactly one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEdge {
    ToggleMode,
    Save,
    Load,
    Jump,
    PrimaryClick,
    SecondaryClick,
    CycleCategory,
    SetGoal,
    AddCheckpoint,
    ToggleDanger,
    ToggleSticky,
    ToggleSpinning,
    SelectRect,
    SelectCircle,
    SelectTriangle,
}

const EDGE_COUNT: usize = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EdgeStates {
    pressed: [bool; EDGE_COUNT],
}

impl EdgeStates {
    pub(crate) fn mark(&mut self, edge: InputEdge) {
        self.pressed[edge.index()] = true;
    }

    pub(crate) fn set(&mut self, edge: InputEdge, pressed: bool) {
        self.pressed[edge.index()] = pressed;
    }

    pub(crate) fn was_pressed(&self, edge: InputEdge) -> bool {
        self.pressed[edge.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::PrimaryHeld => 4,
            InputAction::JumpHeld => 5,
            InputAction::Quit => 6,
        }
    }
}

impl InputEdge {
    const fn index(self) -> usize {
        match self {
            InputEdge::ToggleMode => 0,
            InputEdge::Save => 1,
            InputEdge::Load => 2,
            InputEdge::Jump => 3,
            InputEdge::PrimaryClick => 4,
            InputEdge::SecondaryClick => 5,
            InputEdge::CycleCategory => 6,
            InputEdge::SetGoal => 7,
            InputEdge::AddCheckpoint => 8,
            InputEdge::ToggleDanger => 9,
            InputEdge::ToggleSticky => 10,
            InputEdge::ToggleSpinning => 11,
            InputEdge::SelectRect => 12,
            InputEdge::SelectCircle => 13,
            InputEdge::SelectTriangle => 14,
        }
    }
}

/// Everything the editor controls see for one fixed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    edges: EdgeStates,
    cursor_position_px: Option<Vec2>,
    zoom_delta_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        edges: EdgeStates,
        cursor_position_px: Option<Vec2>,
        zoom_delta_steps: i32,
        window_size: (u32, u32),
    ) -> Self {
        Self {
            quit_requested,
            actions,
            edges,
            cursor_position_px,
            zoom_delta_steps,
            window_width: window_size.0,
            window_height: window_size.1,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn was_pressed(&self, edge: InputEdge) -> bool {
        self.edges.was_pressed(edge)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_pressed(mut self, edge: InputEdge, pressed: bool) -> Self {
        self.edges.set(edge, pressed);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_zoom_delta_steps(mut self, zoom_delta_steps: i32) -> Self {
        self.zoom_delta_steps = zoom_delta_steps;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn zoom_delta_steps(&self) -> i32 {
        self.zoom_delta_steps
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}
