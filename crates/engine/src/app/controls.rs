//! Maps per-tick input onto editor commands. Camera motion is view state and
//! is applied to the world directly.

use std::path::PathBuf;

use tracing::debug;

use super::input::{InputAction, InputEdge, InputSnapshot};
use super::rendering::screen_to_world_px;
use crate::mode::EditorCommand;
use crate::world::{
    BodyCategory, GameWorld, Geometry, HorizontalDirection, Mode, ObjectRef, PlayerIntent,
    ShapeProperty, Vec2, Viewport, DEFAULT_SHAPE_SIZE,
};

pub const DEFAULT_CAMERA_PAN_SPEED: f32 = 600.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlacementTool {
    #[default]
    Rect,
    Circle,
    Triangle,
}

impl PlacementTool {
    pub fn geometry(self) -> Geometry {
        match self {
            PlacementTool::Rect => Geometry::Rect {
                width: DEFAULT_SHAPE_SIZE,
                height: DEFAULT_SHAPE_SIZE,
            },
            PlacementTool::Circle => Geometry::Circle {
                radius: DEFAULT_SHAPE_SIZE * 0.5,
            },
            PlacementTool::Triangle => Geometry::default_triangle(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    target: ObjectRef,
    grab_offset: Vec2,
    last_position: Vec2,
}

#[derive(Debug, Clone)]
pub struct EditorControls {
    tool: PlacementTool,
    category: BodyCategory,
    drag: Option<DragState>,
    level_path: PathBuf,
    pan_speed: f32,
}

impl EditorControls {
    pub fn new(level_path: PathBuf, pan_speed: f32) -> Self {
        Self {
            tool: PlacementTool::default(),
            category: BodyCategory::default(),
            drag: None,
            level_path,
            pan_speed,
        }
    }

    pub fn tool(&self) -> PlacementTool {
        self.tool
    }

    pub fn category(&self) -> BodyCategory {
        self.category
    }

    pub fn level_path(&self) -> &PathBuf {
        &self.level_path
    }

    pub fn commands_for_tick(
        &mut self,
        input: &InputSnapshot,
        mode: Mode,
        world: &mut GameWorld,
        dt: f32,
    ) -> Vec<EditorCommand> {
        let (width, height) = input.window_size();
        if width > 0 && height > 0 {
            world.camera_mut().viewport = Viewport { width, height };
        }
        world
            .camera_mut()
            .apply_zoom_steps(input.zoom_delta_steps());

        let mut commands = Vec::new();
        match mode {
            Mode::Editing => self.editing_commands(input, world, dt, &mut commands),
            Mode::Playing => {
                self.drag = None;
                commands.push(EditorCommand::PlayerInput(PlayerIntent {
                    direction: HorizontalDirection::from_axis(
                        input.is_down(InputAction::MoveLeft),
                        input.is_down(InputAction::MoveRight),
                    ),
                    jump_pressed: input.was_pressed(InputEdge::Jump),
                    jump_held: input.is_down(InputAction::JumpHeld),
                }));
            }
        }
        if input.was_pressed(InputEdge::ToggleMode) {
            self.drag = None;
            commands.push(EditorCommand::ToggleMode);
        }
        commands
    }

    fn editing_commands(
        &mut self,
        input: &InputSnapshot,
        world: &mut GameWorld,
        dt: f32,
        commands: &mut Vec<EditorCommand>,
    ) {
        for (edge, tool) in [
            (InputEdge::SelectRect, PlacementTool::Rect),
            (InputEdge::SelectCircle, PlacementTool::Circle),
            (InputEdge::SelectTriangle, PlacementTool::Triangle),
        ] {
            if input.was_pressed(edge) {
                self.tool = tool;
                debug!(tool = ?tool, "placement_tool_selected");
            }
        }
        if input.was_pressed(InputEdge::CycleCategory) {
            self.category = match self.category {
                BodyCategory::Static => BodyCategory::Dynamic,
                BodyCategory::Dynamic => BodyCategory::Static,
            };
            debug!(category = ?self.category, "placement_category_changed");
        }

        self.pan_camera(input, world, dt);

        if input.was_pressed(InputEdge::Save) {
            commands.push(EditorCommand::Save(self.level_path.clone()));
        }
        if input.was_pressed(InputEdge::Load) {
            self.drag = None;
            commands.push(EditorCommand::Load(self.level_path.clone()));
        }

        let Some(cursor_px) = input.cursor_position_px() else {
            self.drag = None;
            return;
        };
        let cursor = screen_to_world_px(world.camera(), cursor_px);

        if input.was_pressed(InputEdge::PrimaryClick) {
            match world.pick_at(cursor) {
                Some(target) => {
                    let origin = object_position(world, target).unwrap_or(cursor);
                    self.drag = Some(DragState {
                        target,
                        grab_offset: origin - cursor,
                        last_position: origin,
                    });
                }
                None => commands.push(EditorCommand::PlaceShape {
                    geometry: self.tool.geometry(),
                    position: cursor,
                    category: self.category,
                }),
            }
        } else if input.is_down(InputAction::PrimaryHeld) {
            if let Some(drag) = &mut self.drag {
                let position = cursor + drag.grab_offset;
                if position != drag.last_position {
                    drag.last_position = position;
                    commands.push(EditorCommand::MoveObject {
                        target: drag.target,
                        position,
                    });
                }
            }
        } else {
            self.drag = None;
        }

        if input.was_pressed(InputEdge::SecondaryClick) {
            if let Some(ObjectRef::Shape(id)) = world.pick_at(cursor) {
                commands.push(EditorCommand::DeleteShape(id));
            }
        }
        if input.was_pressed(InputEdge::SetGoal) {
            commands.push(EditorCommand::SetGoal(Some(cursor)));
        }
        if input.was_pressed(InputEdge::AddCheckpoint) {
            commands.push(EditorCommand::AddCheckpoint(cursor));
        }
        for (edge, property) in [
            (InputEdge::ToggleDanger, ShapeProperty::Danger),
            (InputEdge::ToggleSticky, ShapeProperty::Sticky),
            (InputEdge::ToggleSpinning, ShapeProperty::Spinning),
        ] {
            if !input.was_pressed(edge) {
                continue;
            }
            let Some(ObjectRef::Shape(id)) = world.pick_at(cursor) else {
                continue;
            };
            let enabled = world
                .shape(id)
                .is_some_and(|shape| !shape.properties().get(property));
            commands.push(EditorCommand::SetProperty {
                id,
                property,
                enabled,
            });
        }
    }

    fn pan_camera(&self, input: &InputSnapshot, world: &mut GameWorld, dt: f32) {
        let axis = |negative: InputAction, positive: InputAction| {
            input.is_down(positive) as i32 as f32 - input.is_down(negative) as i32 as f32
        };
        let direction = Vec2::new(
            axis(InputAction::MoveLeft, InputAction::MoveRight),
            axis(InputAction::MoveUp, InputAction::MoveDown),
        );
        if direction == Vec2::ZERO {
            return;
        }
        let camera = world.camera_mut();
        let distance = self.pan_speed * dt / camera.effective_zoom();
        camera.pan(direction * distance);
    }
}

fn object_position(world: &GameWorld, target: ObjectRef) -> Option<Vec2> {
    match target {
        ObjectRef::Player => Some(world.player().position()),
        ObjectRef::Shape(id) => world.shape(id).map(|shape| shape.position()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ShapeDesc, CAMERA_ZOOM_STEP};

    const DT: f32 = 1.0 / 60.0;

    fn identity_world() -> GameWorld {
        let mut world = GameWorld::default();
        world.camera_mut().center = Vec2::new(640.0, 360.0);
        world.move_player(Vec2::new(1200.0, 700.0)).expect("player");
        world
    }

    fn controls() -> EditorControls {
        EditorControls::new(PathBuf::from("level.json"), DEFAULT_CAMERA_PAN_SPEED)
    }

    fn at(x: f32, y: f32) -> InputSnapshot {
        InputSnapshot::empty()
            .with_window_size((1280, 720))
            .with_cursor_position_px(Some(Vec2::new(x, y)))
    }

    #[test]
    fn click_on_empty_space_places_current_tool() {
        let mut world = identity_world();
        let mut controls = controls();
        let select = at(100.0, 100.0).with_pressed(InputEdge::SelectCircle, true);
        controls.commands_for_tick(&select, Mode::Editing, &mut world, DT);

        let click = at(100.0, 100.0).with_pressed(InputEdge::PrimaryClick, true);
        let commands = controls.commands_for_tick(&click, Mode::Editing, &mut world, DT);

        assert_eq!(
            commands,
            vec![EditorCommand::PlaceShape {
                geometry: Geometry::Circle { radius: 40.0 },
                position: Vec2::new(100.0, 100.0),
                category: BodyCategory::Static,
            }]
        );
    }

    #[test]
    fn category_toggle_switches_to_dynamic() {
        let mut world = identity_world();
        let mut controls = controls();
        let toggle = InputSnapshot::empty().with_pressed(InputEdge::CycleCategory, true);
        controls.commands_for_tick(&toggle, Mode::Editing, &mut world, DT);
        assert_eq!(controls.category(), BodyCategory::Dynamic);
    }

    #[test]
    fn grabbing_a_shape_drags_it_with_its_offset() {
        let mut world = identity_world();
        let id = world
            .add_shape(ShapeDesc::rect(Vec2::new(300.0, 300.0), 80.0, 80.0))
            .expect("rect");
        let mut controls = controls();

        let grab = at(310.0, 300.0)
            .with_pressed(InputEdge::PrimaryClick, true)
            .with_action_down(InputAction::PrimaryHeld, true);
        assert!(controls
            .commands_for_tick(&grab, Mode::Editing, &mut world, DT)
            .is_empty());

        let hold = at(410.0, 350.0).with_action_down(InputAction::PrimaryHeld, true);
        let commands = controls.commands_for_tick(&hold, Mode::Editing, &mut world, DT);
        assert_eq!(
            commands,
            vec![EditorCommand::MoveObject {
                target: ObjectRef::Shape(id),
                position: Vec2::new(400.0, 350.0),
            }]
        );

        let still = controls.commands_for_tick(&hold, Mode::Editing, &mut world, DT);
        assert!(still.is_empty());

        let release = at(500.0, 500.0);
        controls.commands_for_tick(&release, Mode::Editing, &mut world, DT);
        let after = controls.commands_for_tick(
            &at(520.0, 500.0).with_action_down(InputAction::PrimaryHeld, true),
            Mode::Editing,
            &mut world,
            DT,
        );
        assert!(after.is_empty());
    }

    #[test]
    fn right_click_deletes_shapes_but_not_the_player() {
        let mut world = identity_world();
        let id = world
            .add_shape(ShapeDesc::circle(Vec2::new(200.0, 200.0), 30.0))
            .expect("circle");
        let mut controls = controls();

        let on_shape = at(200.0, 200.0).with_pressed(InputEdge::SecondaryClick, true);
        assert_eq!(
            controls.commands_for_tick(&on_shape, Mode::Editing, &mut world, DT),
            vec![EditorCommand::DeleteShape(id)]
        );

        let on_player = at(1200.0, 700.0).with_pressed(InputEdge::SecondaryClick, true);
        assert!(controls
            .commands_for_tick(&on_player, Mode::Editing, &mut world, DT)
            .is_empty());
    }

    #[test]
    fn property_keys_toggle_the_hovered_shape() {
        let mut world = identity_world();
        let id = world
            .add_shape(ShapeDesc::rect(Vec2::new(500.0, 500.0), 60.0, 60.0))
            .expect("rect");
        world
            .set_shape_property(id, ShapeProperty::Sticky, true)
            .expect("sticky");
        let mut controls = controls();

        let input = at(500.0, 500.0)
            .with_pressed(InputEdge::ToggleDanger, true)
            .with_pressed(InputEdge::ToggleSticky, true);
        let commands = controls.commands_for_tick(&input, Mode::Editing, &mut world, DT);

        assert_eq!(
            commands,
            vec![
                EditorCommand::SetProperty {
                    id,
                    property: ShapeProperty::Danger,
                    enabled: true,
                },
                EditorCommand::SetProperty {
                    id,
                    property: ShapeProperty::Sticky,
                    enabled: false,
                },
            ]
        );
    }

    #[test]
    fn markers_and_files_map_to_commands() {
        let mut world = identity_world();
        let mut controls = controls();
        let input = at(50.0, 60.0)
            .with_pressed(InputEdge::SetGoal, true)
            .with_pressed(InputEdge::AddCheckpoint, true)
            .with_pressed(InputEdge::Save, true);
        let commands = controls.commands_for_tick(&input, Mode::Editing, &mut world, DT);

        assert_eq!(
            commands,
            vec![
                EditorCommand::Save(PathBuf::from("level.json")),
                EditorCommand::SetGoal(Some(Vec2::new(50.0, 60.0))),
                EditorCommand::AddCheckpoint(Vec2::new(50.0, 60.0)),
            ]
        );
    }

    #[test]
    fn playing_sends_player_intent_every_tick() {
        let mut world = identity_world();
        let mut controls = controls();
        let input = at(10.0, 10.0)
            .with_action_down(InputAction::MoveLeft, true)
            .with_pressed(InputEdge::Jump, true)
            .with_action_down(InputAction::JumpHeld, true)
            .with_pressed(InputEdge::PrimaryClick, true);
        let commands = controls.commands_for_tick(&input, Mode::Playing, &mut world, DT);
        assert_eq!(
            commands,
            vec![EditorCommand::PlayerInput(PlayerIntent {
                direction: HorizontalDirection::Left,
                jump_pressed: true,
                jump_held: true,
            })]
        );

        let idle =
            controls.commands_for_tick(&InputSnapshot::empty(), Mode::Playing, &mut world, DT);
        assert_eq!(
            idle,
            vec![EditorCommand::PlayerInput(PlayerIntent::default())]
        );
    }

    #[test]
    fn toggle_is_emitted_in_both_modes() {
        let mut world = identity_world();
        let mut controls = controls();
        let input = InputSnapshot::empty().with_pressed(InputEdge::ToggleMode, true);
        assert_eq!(
            controls.commands_for_tick(&input, Mode::Editing, &mut world, DT),
            vec![EditorCommand::ToggleMode]
        );
        assert_eq!(
            controls
                .commands_for_tick(&input, Mode::Playing, &mut world, DT)
                .last(),
            Some(&EditorCommand::ToggleMode)
        );
    }

    #[test]
    fn movement_keys_pan_camera_only_while_editing() {
        let mut world = identity_world();
        let mut controls = controls();
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);

        controls.commands_for_tick(&input, Mode::Editing, &mut world, 0.5);
        assert_eq!(world.camera().center, Vec2::new(940.0, 360.0));

        controls.commands_for_tick(&input, Mode::Playing, &mut world, 0.5);
        assert_eq!(world.camera().center, Vec2::new(940.0, 360.0));
    }

    #[test]
    fn zoom_steps_apply_to_camera() {
        let mut world = identity_world();
        let mut controls = controls();
        let input = InputSnapshot::empty().with_zoom_delta_steps(2);
        controls.commands_for_tick(&input, Mode::Editing, &mut world, DT);
        assert!((world.camera().zoom - (1.0 + 2.0 * CAMERA_ZOOM_STEP)).abs() < 0.0001);
    }
}
