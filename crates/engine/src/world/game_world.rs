use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::physics::{ColliderTag, Contact, PhysicsSpace};
use super::player::{is_ground_normal, GroundContact};
use super::{
    BodyCategory, Camera2D, CheckpointView, Geometry, Mode, ObjectRef, ObjectView, Player,
    PlayerIntent, PlayerView, Shape, ShapeDesc, ShapeId, ShapeIdAllocator, ShapeProperty, Vec2,
    WorldError, WorldSnapshot, PLAYER_RADIUS,
};
use crate::timestep::{duration_from_secs, plan_sim_steps};

pub const CHECKPOINT_RADIUS: f32 = 18.0;
pub const GOAL_RADIUS: f32 = 15.0;
/// How far below the map floor, in player radii, counts as having fallen out.
const FALL_MARGIN_RADII: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub map_width: f32,
    pub map_height: f32,
    pub boundary_thickness: f32,
    pub boundary_friction: f32,
    pub boundary_restitution: f32,
    pub gravity: Vec2,
    pub fixed_step: f32,
    pub max_substeps: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map_width: 2000.0,
            map_height: 1000.0,
            boundary_thickness: 10.0,
            boundary_friction: 1.0,
            boundary_restitution: 0.1,
            gravity: Vec2::new(0.0, 980.0),
            fixed_step: 1.0 / 120.0,
            max_substeps: 8,
        }
    }
}

impl WorldConfig {
    fn normalized(self) -> Self {
        let fallback = Self::default();
        Self {
            fixed_step: if self.fixed_step.is_finite() && self.fixed_step > 0.0 {
                self.fixed_step
            } else {
                fallback.fixed_step
            },
            max_substeps: self.max_substeps.max(1),
            ..self
        }
    }

    pub fn map_size(&self) -> Vec2 {
        Vec2::new(self.map_width, self.map_height)
    }

    pub fn default_spawn(&self) -> Vec2 {
        Vec2::new(self.map_width * 0.5, self.map_height * 0.5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Fell,
    OutOfHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PlayOutcome {
    Died { cause: DeathCause },
    Won,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    pub substeps: u32,
    pub dropped_backlog: f32,
    pub outcome: Option<PlayOutcome>,
}

/// Live state that only exists between `enter_play_mode` and `exit_play_mode`.
struct Simulation {
    space: PhysicsSpace,
    accumulator: Duration,
    spawn: Vec2,
    active_checkpoint: Option<usize>,
    outcome: Option<PlayOutcome>,
}

/// Owns the shapes, the player, and (while playing) the physics space.
///
/// Shape order is draw order. While editing the records are authoritative and
/// no bodies exist; while playing every shape and the player is linked to one body
/// and the records are refreshed from the simulation after each sub-step.
pub struct GameWorld {
    config: WorldConfig,
    ids: ShapeIdAllocator,
    shapes: Vec<Shape>,
    player: Player,
    goal: Option<Vec2>,
    checkpoints: Vec<Vec2>,
    camera: Camera2D,
    simulation: Option<Simulation>,
}

impl Default for GameWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl GameWorld {
    pub fn new(config: WorldConfig) -> Self {
        let config = config.normalized();
        let mut camera = Camera2D::default();
        camera.follow(config.default_spawn(), config.map_size());
        Self {
            config,
            ids: ShapeIdAllocator::default(),
            shapes: Vec::new(),
            player: Player::new(config.default_spawn()),
            goal: None,
            checkpoints: Vec::new(),
            camera,
            simulation: None,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        if self.simulation.is_some() {
            Mode::Playing
        } else {
            Mode::Editing
        }
    }

    pub fn is_playing(&self) -> bool {
        self.simulation.is_some()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|shape| shape.id() == id)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn goal(&self) -> Option<Vec2> {
        self.goal
    }

    pub fn checkpoints(&self) -> &[Vec2] {
        &self.checkpoints
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    /// Live rigid bodies in the physics space. Boundary walls are not bodies.
    pub fn body_count(&self) -> usize {
        self.simulation
            .as_ref()
            .map_or(0, |simulation| simulation.space.body_count())
    }

    pub fn add_shape(&mut self, desc: ShapeDesc) -> Result<ShapeId, WorldError> {
        let id = self
            .ids
            .allocate()
            .ok_or(WorldError::IdsExhausted { kind: "shape" })?;
        self.insert_shape(desc, id, None)
    }

    pub(crate) fn insert_shape(
        &mut self,
        desc: ShapeDesc,
        id: ShapeId,
        label: Option<String>,
    ) -> Result<ShapeId, WorldError> {
        let mut shape = desc.into_shape(id, label)?;
        if let Some(simulation) = self.simulation.as_mut() {
            let link = simulation
                .space
                .create_body(&shape.body_spec())
                .map_err(|reason| WorldError::PhysicsEngineFailure {
                    object: ObjectRef::Shape(id),
                    reason,
                })?;
            shape.body = Some(link);
        }
        self.ids.reserve_through(id);
        debug!(
            shape_id = id.0,
            kind = %shape.kind(),
            draw_index = self.shapes.len(),
            "shape_added"
        );
        self.shapes.push(shape);
        Ok(id)
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> Result<(), WorldError> {
        let index = self.shape_index(id)?;
        let shape = self.shapes.remove(index);
        if let (Some(link), Some(simulation)) = (shape.body, self.simulation.as_mut()) {
            simulation.space.remove_body(link);
        }
        debug!(shape_id = id.0, "shape_removed");
        Ok(())
    }

    pub fn move_player(&mut self, position: Vec2) -> Result<(), WorldError> {
        self.require_editing("move_player")?;
        if !position.is_finite() {
            return Err(WorldError::geometry("player", "position", "must be finite"));
        }
        self.player.set_position(position);
        Ok(())
    }

    pub fn move_shape(&mut self, id: ShapeId, position: Vec2) -> Result<(), WorldError> {
        self.require_editing("move_shape")?;
        let index = self.shape_index(id)?;
        if !position.is_finite() {
            return Err(WorldError::geometry(
                format!("shape {id}"),
                "position",
                "must be finite",
            ));
        }
        let angle = self.shapes[index].angle();
        self.shapes[index].set_pose(position, angle);
        Ok(())
    }

    /// Replaces a shape's dimensions; the new geometry may be of a different kind.
    pub fn resize_shape(&mut self, id: ShapeId, geometry: Geometry) -> Result<(), WorldError> {
        self.require_editing("resize_shape")?;
        let index = self.shape_index(id)?;
        geometry.validate(&format!("shape {id}"))?;
        self.shapes[index].set_geometry(geometry);
        Ok(())
    }

    pub fn set_shape_property(
        &mut self,
        id: ShapeId,
        property: ShapeProperty,
        enabled: bool,
    ) -> Result<(), WorldError> {
        self.require_editing("set_shape_property")?;
        let index = self.shape_index(id)?;
        self.shapes[index].set_property(property, enabled);
        Ok(())
    }

    pub fn set_goal(&mut self, goal: Option<Vec2>) -> Result<(), WorldError> {
        self.require_editing("set_goal")?;
        if goal.is_some_and(|position| !position.is_finite()) {
            return Err(WorldError::geometry("goal", "position", "must be finite"));
        }
        self.goal = goal;
        Ok(())
    }

    pub fn add_checkpoint(&mut self, position: Vec2) -> Result<usize, WorldError> {
        self.require_editing("add_checkpoint")?;
        if !position.is_finite() {
            return Err(WorldError::geometry(
                "checkpoint",
                "position",
                "must be finite",
            ));
        }
        self.checkpoints.push(position);
        Ok(self.checkpoints.len() - 1)
    }

    pub fn remove_checkpoint(&mut self, index: usize) -> Result<Vec2, WorldError> {
        self.require_editing("remove_checkpoint")?;
        if index >= self.checkpoints.len() {
            return Err(WorldError::NotFound {
                kind: "checkpoint",
                id: index as u64,
            });
        }
        Ok(self.checkpoints.remove(index))
    }

    /// Empties the level and puts the player back at the default spawn.
    pub fn clear(&mut self) -> Result<(), WorldError> {
        self.require_editing("clear")?;
        self.shapes.clear();
        self.goal = None;
        self.checkpoints.clear();
        self.player = Player::new(self.config.default_spawn());
        Ok(())
    }

    pub fn set_player_intent(&mut self, intent: PlayerIntent) -> Result<(), WorldError> {
        if self.simulation.is_none() {
            return Err(WorldError::InvalidState {
                operation: "set_player_intent",
                mode: Mode::Editing,
            });
        }
        self.player.set_intent(intent);
        Ok(())
    }

    /// Topmost object under `point`; the player is drawn above every shape.
    pub fn pick_at(&self, point: Vec2) -> Option<ObjectRef> {
        if self.player.position().distance(point) <= PLAYER_RADIUS {
            return Some(ObjectRef::Player);
        }
        self.shapes
            .iter()
            .rev()
            .find(|shape| shape.contains_point(point))
            .map(|shape| ObjectRef::Shape(shape.id()))
    }

    pub fn enter_play_mode(&mut self) -> Result<(), WorldError> {
        if self.simulation.is_some() {
            debug!("enter_play_mode_already_playing");
            return Ok(());
        }

        // Bodies go into a fresh space that is only installed once every body exists,
        // so a failure part way through leaves nothing behind.
        let mut space = PhysicsSpace::new(self.config.gravity, self.config.fixed_step);
        let mut links = Vec::with_capacity(self.shapes.len());
        for shape in &self.shapes {
            let link = space.create_body(&shape.body_spec()).map_err(|reason| {
                warn!(shape_id = shape.id().0, reason = %reason, "play_mode_rejected");
                WorldError::PhysicsEngineFailure {
                    object: ObjectRef::Shape(shape.id()),
                    reason,
                }
            })?;
            links.push(link);
        }
        let player_link = space
            .create_body(&self.player.body_spec())
            .map_err(|reason| WorldError::PhysicsEngineFailure {
                object: ObjectRef::Player,
                reason,
            })?;
        self.add_boundaries(&mut space);

        for (shape, link) in self.shapes.iter_mut().zip(links) {
            shape.body = Some(link);
        }
        self.player.body = Some(player_link);
        self.player.reset_session();
        let spawn = self.player.position();
        self.simulation = Some(Simulation {
            space,
            accumulator: Duration::ZERO,
            spawn,
            active_checkpoint: None,
            outcome: None,
        });
        self.camera.follow(spawn, self.config.map_size());
        info!(
            shape_count = self.shapes.len(),
            body_count = self.body_count(),
            "play_mode_entered"
        );
        Ok(())
    }

    /// Copies every simulated pose back into its record, then drops the physics space.
    pub fn exit_play_mode(&mut self) {
        let Some(simulation) = self.simulation.take() else {
            return;
        };

        for shape in &mut self.shapes {
            if let Some(link) = shape.body.take() {
                if let Some((position, angle)) = simulation.space.pose(link) {
                    shape.set_pose(position, angle);
                }
            }
        }
        if let Some(link) = self.player.body.take() {
            if let Some((position, _)) = simulation.space.pose(link) {
                self.player.set_position(position);
            }
        }
        self.player.reset_session();
        info!(
            shape_count = self.shapes.len(),
            player_x = self.player.position().x,
            player_y = self.player.position().y,
            "play_mode_exited"
        );
    }

    /// Spawn point recorded when the current play session began.
    pub fn play_spawn(&self) -> Option<Vec2> {
        self.simulation.as_ref().map(|simulation| simulation.spawn)
    }

    pub fn step(&mut self, dt: f32) -> Result<StepReport, WorldError> {
        let fixed_step = self.config.fixed_step;
        let max_substeps = self.config.max_substeps;
        let Some(simulation) = self.simulation.as_mut() else {
            return Err(WorldError::InvalidState {
                operation: "step",
                mode: Mode::Editing,
            });
        };
        if simulation.outcome.is_some() {
            return Ok(StepReport {
                outcome: simulation.outcome,
                ..StepReport::default()
            });
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Ok(StepReport::default());
        }

        let accumulator = simulation.accumulator.saturating_add(duration_from_secs(dt));
        let plan = plan_sim_steps(accumulator, duration_from_secs(fixed_step), max_substeps);
        simulation.accumulator = plan.remaining_accumulator;
        if plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                max_substeps, "physics_backlog_dropped"
            );
        }

        let mut report = StepReport {
            substeps: 0,
            dropped_backlog: plan.dropped_backlog.as_secs_f32(),
            outcome: None,
        };
        for _ in 0..plan.ticks_to_run {
            report.substeps += 1;
            if let Some(outcome) = self.run_substep(fixed_step) {
                info!(outcome = ?outcome, "play_outcome");
                if let Some(simulation) = self.simulation.as_mut() {
                    simulation.outcome = Some(outcome);
                    simulation.accumulator = Duration::ZERO;
                }
                report.outcome = Some(outcome);
                break;
            }
        }
        Ok(report)
    }

    fn run_substep(&mut self, dt: f32) -> Option<PlayOutcome> {
        let simulation = self.simulation.as_mut()?;
        self.player.apply_controls(&mut simulation.space, dt);
        simulation.space.step();

        for shape in &mut self.shapes {
            if let Some(link) = shape.body {
                if let Some((position, angle)) = simulation.space.pose(link) {
                    shape.set_pose(position, angle);
                }
            }
        }

        let contacts = self
            .player
            .body
            .map(|link| simulation.space.contacts(link))
            .unwrap_or_default();
        let ground = ground_contact(&contacts, &self.shapes);
        self.player.sync_from_body(&simulation.space, ground);

        if touches_danger(&contacts, &self.shapes) && self.player.take_damage() {
            if self.player.health() == 0 {
                return Some(PlayOutcome::Died {
                    cause: DeathCause::OutOfHealth,
                });
            }
            let respawn = simulation
                .active_checkpoint
                .and_then(|index| self.checkpoints.get(index).copied())
                .unwrap_or(simulation.spawn);
            let respawn = clamp_inside_map(respawn, &self.config);
            self.player.teleport(&mut simulation.space, respawn);
            info!(
                health = self.player.health(),
                x = respawn.x,
                y = respawn.y,
                "player_respawned"
            );
        }

        let position = self.player.position();
        if position.y > self.config.map_height + PLAYER_RADIUS * FALL_MARGIN_RADII {
            return Some(PlayOutcome::Died {
                cause: DeathCause::Fell,
            });
        }
        if self
            .goal
            .is_some_and(|goal| goal.distance(position) < PLAYER_RADIUS + GOAL_RADIUS)
        {
            return Some(PlayOutcome::Won);
        }

        let touched = self
            .checkpoints
            .iter()
            .enumerate()
            .map(|(index, checkpoint)| (index, checkpoint.distance(position)))
            .filter(|(_, distance)| *distance < PLAYER_RADIUS + CHECKPOINT_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index);
        if touched.is_some() && touched != simulation.active_checkpoint {
            simulation.active_checkpoint = touched;
            debug!(checkpoint = ?touched, "checkpoint_activated");
        }
        None
    }

    pub fn follow_player(&mut self) {
        let target = self.player.position();
        self.camera.follow(target, self.config.map_size());
    }

    pub fn query_snapshot(&self) -> WorldSnapshot {
        let active_checkpoint = self
            .simulation
            .as_ref()
            .and_then(|simulation| simulation.active_checkpoint);
        let control = self.player.control();
        WorldSnapshot {
            mode: self.mode(),
            camera: self.camera,
            map_size: self.config.map_size(),
            player: PlayerView {
                position: self.player.position(),
                velocity: self.player.velocity(),
                radius: PLAYER_RADIUS,
                facing: control.facing,
                grounded: control.grounded,
                animation: self.player.animation(),
                health: self.player.health(),
                invincible: self.player.is_invincible(),
            },
            objects: self
                .shapes
                .iter()
                .enumerate()
                .map(|(draw_index, shape)| ObjectView {
                    draw_index,
                    id: shape.id(),
                    kind: shape.kind(),
                    position: shape.position(),
                    angle: shape.angle(),
                    geometry: shape.geometry().clone(),
                    category: shape.category(),
                    properties: shape.properties(),
                })
                .collect(),
            goal: self.goal,
            checkpoints: self
                .checkpoints
                .iter()
                .enumerate()
                .map(|(index, position)| CheckpointView {
                    position: *position,
                    active: active_checkpoint == Some(index),
                })
                .collect(),
        }
    }

    /// Swaps in a fully validated level. Only called once every record is built.
    pub(crate) fn replace_contents(
        &mut self,
        shapes: Vec<Shape>,
        ids: ShapeIdAllocator,
        player: Vec2,
        goal: Option<Vec2>,
        checkpoints: Vec<Vec2>,
    ) {
        self.shapes = shapes;
        self.ids = ids;
        self.player = Player::new(player);
        self.goal = goal;
        self.checkpoints = checkpoints;
        self.camera.follow(player, self.config.map_size());
    }

    pub(crate) fn require_editing(&self, operation: &'static str) -> Result<(), WorldError> {
        if self.simulation.is_some() {
            Err(WorldError::InvalidState {
                operation,
                mode: Mode::Playing,
            })
        } else {
            Ok(())
        }
    }

    fn shape_index(&self, id: ShapeId) -> Result<usize, WorldError> {
        self.shapes
            .iter()
            .position(|shape| shape.id() == id)
            .ok_or_else(|| WorldError::shape_not_found(id))
    }

    fn add_boundaries(&self, space: &mut PhysicsSpace) {
        let WorldConfig {
            map_width: width,
            map_height: height,
            boundary_thickness: thickness,
            boundary_friction: friction,
            boundary_restitution: restitution,
            ..
        } = self.config;
        let half = thickness * 0.5;
        let horizontal = Vec2::new(width * 0.5 + thickness, half);
        let vertical = Vec2::new(half, height * 0.5 + thickness);
        space.add_wall(Vec2::new(width * 0.5, 0.0), horizontal, friction, restitution);
        space.add_wall(Vec2::new(width * 0.5, height), horizontal, friction, restitution);
        space.add_wall(Vec2::new(0.0, height * 0.5), vertical, friction, restitution);
        space.add_wall(Vec2::new(width, height * 0.5), vertical, friction, restitution);
    }
}

fn shape_by_tag<'a>(shapes: &'a [Shape], tag: ColliderTag) -> Option<&'a Shape> {
    match tag {
        ColliderTag::Shape(id) => shapes.iter().find(|shape| shape.id() == id),
        ColliderTag::Boundary | ColliderTag::Player => None,
    }
}

/// Only immovable footing counts: walls, static or spinning shapes, and danger shapes.
fn ground_contact(contacts: &[Contact], shapes: &[Shape]) -> GroundContact {
    let mut ground = GroundContact::default();
    for contact in contacts.iter().filter(|contact| is_ground_normal(contact.normal)) {
        let footing = match contact.other {
            ColliderTag::Boundary => true,
            ColliderTag::Player => false,
            ColliderTag::Shape(_) => shape_by_tag(shapes, contact.other).is_some_and(|shape| {
                let properties = shape.properties();
                shape.category() == BodyCategory::Static
                    || properties.spinning
                    || properties.danger
            }),
        };
        if !footing {
            continue;
        }
        ground.grounded = true;
        if shape_by_tag(shapes, contact.other).is_some_and(|shape| shape.properties().sticky) {
            ground.sticky = true;
        }
    }
    ground
}

fn touches_danger(contacts: &[Contact], shapes: &[Shape]) -> bool {
    contacts.iter().any(|contact| {
        shape_by_tag(shapes, contact.other).is_some_and(|shape| shape.properties().danger)
    })
}

fn clamp_inside_map(position: Vec2, config: &WorldConfig) -> Vec2 {
    let margin = PLAYER_RADIUS + config.boundary_thickness;
    let clamp = |value: f32, extent: f32| {
        if extent > margin * 2.0 {
            value.clamp(margin, extent - margin)
        } else {
            extent * 0.5
        }
    };
    Vec2::new(
        clamp(position.x, config.map_width),
        clamp(position.y, config.map_height),
    )
}
