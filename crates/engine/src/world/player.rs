use serde::Serialize;

use super::physics::{BodyKind, BodyLink, BodySpec, ColliderTag, PhysicsSpace};
use super::{Geometry, Vec2};

pub const PLAYER_RADIUS: f32 = 15.0;
pub const PLAYER_MASS: f32 = 1.0;
pub const PLAYER_FRICTION: f32 = 0.6;
pub const PLAYER_RESTITUTION: f32 = 0.0;
pub const PLAYER_MAX_HEALTH: u32 = 3;
pub const INVINCIBILITY_SECONDS: f32 = 1.0;

pub const MOVE_ACCELERATION: f32 = 3500.0;
pub const MAX_HORIZONTAL_SPEED: f32 = 300.0;
pub const GROUND_DAMPING: f32 = 0.65;
pub const STICKY_GROUND_DAMPING: f32 = 0.4;
pub const AIR_DAMPING: f32 = 0.95;
pub const AIR_CONTROL_FACTOR: f32 = 0.6;
pub const STICKY_MOVE_FACTOR: f32 = 0.3;
pub const STICKY_JUMP_FACTOR: f32 = 0.5;
pub const JUMP_IMPULSE: f32 = 600.0;
pub const JUMP_BUFFER_SECONDS: f32 = 0.1;
/// Grace period after leaving the ground during which a jump still fires.
pub const COYOTE_SECONDS: f32 = 0.1;
/// How long a held jump keeps softening gravity on the way up.
pub const VARIABLE_JUMP_SECONDS: f32 = 0.3;
/// Share of gravity still felt while a held jump is rising.
pub const VARIABLE_JUMP_GRAVITY_SCALE: f32 = 0.4;
pub const STUCK_SPEED: f32 = 5.0;
pub const STUCK_SECONDS: f32 = 0.2;
pub const NUDGE_IMPULSE: f32 = 100.0;

/// Damping factors above are tuned per 60 Hz frame.
const DAMPING_REFERENCE_HZ: f32 = 60.0;
/// Contact normals steeper than this count as standing on something.
const GROUND_NORMAL_MIN_Y: f32 = 0.7;
/// Ground contact while rising faster than this is the tail of a jump and does
/// not restart the coyote window.
const COYOTE_MAX_RISE_SPEED: f32 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalDirection {
    Left,
    #[default]
    None,
    Right,
}

impl HorizontalDirection {
    pub fn from_axis(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, false) => HorizontalDirection::Left,
            (false, true) => HorizontalDirection::Right,
            _ => HorizontalDirection::None,
        }
    }

    fn sign(self) -> f32 {
        match self {
            HorizontalDirection::Left => -1.0,
            HorizontalDirection::None => 0.0,
            HorizontalDirection::Right => 1.0,
        }
    }
}

/// `jump_pressed` is the edge that requests a jump; `jump_held` is the button
/// state that stretches it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerIntent {
    pub direction: HorizontalDirection,
    pub jump_pressed: bool,
    pub jump_held: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerAnimation {
    #[default]
    Idle,
    Run,
    Jump,
    Fall,
}

impl PlayerAnimation {
    pub fn key(self) -> &'static str {
        match self {
            PlayerAnimation::Idle => "player/idle",
            PlayerAnimation::Run => "player/run",
            PlayerAnimation::Jump => "player/jump",
            PlayerAnimation::Fall => "player/fall",
        }
    }
}

/// What the player stood on during the last physics step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GroundContact {
    pub(crate) grounded: bool,
    pub(crate) sticky: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub grounded: bool,
    pub on_sticky_ground: bool,
    pub facing: Facing,
    pub intent: PlayerIntent,
    jump_buffer: f32,
    coyote_time: f32,
    variable_jump_time: f32,
    stuck_time: f32,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            grounded: false,
            on_sticky_ground: false,
            facing: Facing::Right,
            intent: PlayerIntent::default(),
            jump_buffer: 0.0,
            coyote_time: 0.0,
            variable_jump_time: 0.0,
            stuck_time: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    position: Vec2,
    velocity: Vec2,
    control: ControlState,
    animation: PlayerAnimation,
    health: u32,
    invincible_for: f32,
    pub(crate) body: Option<BodyLink>,
}

impl Player {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            control: ControlState::default(),
            animation: PlayerAnimation::Idle,
            health: PLAYER_MAX_HEALTH,
            invincible_for: 0.0,
            body: None,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub fn animation(&self) -> PlayerAnimation {
        self.animation
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_for > 0.0
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn body_spec(&self) -> BodySpec {
        BodySpec {
            kind: BodyKind::Dynamic,
            position: self.position,
            angle: 0.0,
            geometry: Geometry::Circle {
                radius: PLAYER_RADIUS,
            },
            friction: PLAYER_FRICTION,
            restitution: PLAYER_RESTITUTION,
            mass: Some(PLAYER_MASS),
            lock_rotations: true,
            angular_velocity: 0.0,
            tag: ColliderTag::Player,
        }
    }

    /// Clears session state at the start of a play session.
    pub(crate) fn reset_session(&mut self) {
        self.velocity = Vec2::ZERO;
        self.control = ControlState::default();
        self.animation = PlayerAnimation::Idle;
        self.health = PLAYER_MAX_HEALTH;
        self.invincible_for = 0.0;
    }

    pub(crate) fn set_intent(&mut self, intent: PlayerIntent) {
        self.control.intent.direction = intent.direction;
        if intent.jump_pressed {
            self.control.jump_buffer = JUMP_BUFFER_SECONDS;
        }
        self.control.intent.jump_pressed = intent.jump_pressed;
        self.control.intent.jump_held = intent.jump_held;
    }

    /// Turns the held intent into force, damping, speed cap and jump for one sub-step.
    pub(crate) fn apply_controls(&mut self, space: &mut PhysicsSpace, dt: f32) {
        let Some(link) = self.body else {
            return;
        };
        let direction = self.control.intent.direction;
        match direction {
            HorizontalDirection::Left => self.control.facing = Facing::Left,
            HorizontalDirection::Right => self.control.facing = Facing::Right,
            HorizontalDirection::None => {}
        }

        let mut velocity = space.velocity(link).unwrap_or(self.velocity);
        let mass = space.mass(link).unwrap_or(PLAYER_MASS);

        let control_factor = if !self.control.grounded {
            AIR_CONTROL_FACTOR
        } else if self.control.on_sticky_ground {
            STICKY_MOVE_FACTOR
        } else {
            1.0
        };
        let force_x = direction.sign() * MOVE_ACCELERATION * PLAYER_MASS * control_factor;
        let force_y = self.variable_jump_force(space.gravity(), mass, velocity, dt);
        space.set_force(link, Vec2::new(force_x, force_y));

        if direction == HorizontalDirection::None {
            let damping = if !self.control.grounded {
                AIR_DAMPING
            } else if self.control.on_sticky_ground {
                STICKY_GROUND_DAMPING
            } else {
                GROUND_DAMPING
            };
            velocity.x *= damping.powf(dt * DAMPING_REFERENCE_HZ);
        }
        velocity.x = velocity.x.clamp(-MAX_HORIZONTAL_SPEED, MAX_HORIZONTAL_SPEED);
        space.set_velocity(link, velocity);

        let can_jump = self.control.grounded || self.control.coyote_time > 0.0;
        if self.control.jump_buffer > 0.0 && can_jump {
            let jump = if self.control.on_sticky_ground {
                JUMP_IMPULSE * STICKY_JUMP_FACTOR
            } else {
                JUMP_IMPULSE
            };
            space.set_velocity(link, Vec2::new(velocity.x, 0.0));
            space.apply_impulse(link, Vec2::new(0.0, -jump * mass));
            self.control.jump_buffer = 0.0;
            self.control.coyote_time = 0.0;
            self.control.stuck_time = 0.0;
            self.control.variable_jump_time = if self.control.intent.jump_held {
                VARIABLE_JUMP_SECONDS
            } else {
                0.0
            };
            self.control.grounded = false;
        } else {
            self.control.jump_buffer = (self.control.jump_buffer - dt).max(0.0);
            if !self.control.grounded {
                self.control.coyote_time = (self.control.coyote_time - dt).max(0.0);
            }
            self.nudge_if_stuck(space, link, velocity, mass, dt);
        }
        self.invincible_for = (self.invincible_for - dt).max(0.0);
    }

    /// Upward force cancelling part of gravity while a held jump is still rising.
    fn variable_jump_force(&mut self, gravity: Vec2, mass: f32, velocity: Vec2, dt: f32) -> f32 {
        let extending = self.control.variable_jump_time > 0.0
            && self.control.intent.jump_held
            && velocity.y < 0.0
            && gravity.y > 0.0;
        if !extending {
            self.control.variable_jump_time = 0.0;
            return 0.0;
        }
        self.control.variable_jump_time = (self.control.variable_jump_time - dt).max(0.0);
        -gravity.y * mass * (1.0 - VARIABLE_JUMP_GRAVITY_SCALE)
    }

    /// Pops the player upward after pushing against something without moving for a while.
    fn nudge_if_stuck(
        &mut self,
        space: &mut PhysicsSpace,
        link: BodyLink,
        velocity: Vec2,
        mass: f32,
        dt: f32,
    ) {
        let pushing =
            self.control.grounded && self.control.intent.direction != HorizontalDirection::None;
        if !pushing || velocity.length() >= STUCK_SPEED {
            self.control.stuck_time = 0.0;
            return;
        }
        self.control.stuck_time += dt;
        if self.control.stuck_time >= STUCK_SECONDS {
            space.apply_impulse(link, Vec2::new(0.0, -NUDGE_IMPULSE * mass));
            self.control.stuck_time = 0.0;
        }
    }

    /// Pulls position and velocity back from the simulation after a step.
    pub(crate) fn sync_from_body(&mut self, space: &PhysicsSpace, ground: GroundContact) {
        let Some(link) = self.body else {
            return;
        };
        if let Some((position, _)) = space.pose(link) {
            self.position = position;
        }
        if let Some(velocity) = space.velocity(link) {
            self.velocity = velocity;
        }
        self.control.grounded = ground.grounded;
        self.control.on_sticky_ground = ground.grounded && ground.sticky;
        if ground.grounded && self.velocity.y > -COYOTE_MAX_RISE_SPEED {
            self.control.coyote_time = COYOTE_SECONDS;
        }
        self.animation = animation_for(self.velocity, ground.grounded);
    }

    /// Returns true when the hit was absorbed (player was not invincible).
    pub(crate) fn take_damage(&mut self) -> bool {
        if self.is_invincible() || self.health == 0 {
            return false;
        }
        self.health -= 1;
        self.invincible_for = INVINCIBILITY_SECONDS;
        true
    }

    pub(crate) fn teleport(&mut self, space: &mut PhysicsSpace, position: Vec2) {
        if let Some(link) = self.body {
            space.teleport(link, position);
        }
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.control.grounded = false;
        self.control.jump_buffer = 0.0;
        self.control.coyote_time = 0.0;
        self.control.variable_jump_time = 0.0;
        self.control.stuck_time = 0.0;
    }
}

pub(crate) fn is_ground_normal(normal: Vec2) -> bool {
    normal.y > GROUND_NORMAL_MIN_Y
}

fn animation_for(velocity: Vec2, grounded: bool) -> PlayerAnimation {
    if !grounded {
        if velocity.y < 0.0 {
            PlayerAnimation::Jump
        } else {
            PlayerAnimation::Fall
        }
    } else if velocity.x.abs() > 10.0 {
        PlayerAnimation::Run
    } else {
        PlayerAnimation::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_in(space: &mut PhysicsSpace, position: Vec2) -> Player {
        let mut player = Player::new(position);
        player.body = Some(space.create_body(&player.body_spec()).expect("player body"));
        player
    }

    #[test]
    fn direction_from_axis_cancels_when_both_held() {
        assert_eq!(HorizontalDirection::from_axis(true, true), HorizontalDirection::None);
        assert_eq!(HorizontalDirection::from_axis(true, false), HorizontalDirection::Left);
        assert_eq!(HorizontalDirection::from_axis(false, true), HorizontalDirection::Right);
    }

    #[test]
    fn horizontal_speed_is_capped() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 120.0);
        let mut player = spawn_in(&mut space, Vec2::ZERO);
        player.set_intent(PlayerIntent {
            direction: HorizontalDirection::Right,
            jump_pressed: false,
            jump_held: false,
        });

        for _ in 0..240 {
            player.apply_controls(&mut space, 1.0 / 120.0);
            space.step();
            player.sync_from_body(&space, GroundContact::default());
            assert!(player.velocity().x <= MAX_HORIZONTAL_SPEED + 30.0);
        }
        assert!(player.velocity().x > 100.0);
        assert_eq!(player.control().facing, Facing::Right);
    }

    #[test]
    fn airborne_player_cannot_jump() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 120.0);
        let mut player = spawn_in(&mut space, Vec2::ZERO);
        player.set_intent(PlayerIntent {
            direction: HorizontalDirection::None,
            jump_pressed: true,
            jump_held: false,
        });

        player.apply_controls(&mut space, 1.0 / 120.0);
        space.step();
        player.sync_from_body(&space, GroundContact::default());

        assert!(player.velocity().y.abs() < 0.001);
    }

    #[test]
    fn grounded_player_jumps_upward() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 120.0);
        let mut player = spawn_in(&mut space, Vec2::ZERO);
        player.control.grounded = true;
        player.set_intent(PlayerIntent {
            direction: HorizontalDirection::None,
            jump_pressed: true,
            jump_held: false,
        });

        player.apply_controls(&mut space, 1.0 / 120.0);
        let velocity = space.velocity(player.body.expect("link")).expect("velocity");

        assert!((velocity.y + JUMP_IMPULSE).abs() < 1.0);
        assert!(!player.control().grounded);
    }

    #[test]
    fn buffered_jump_fires_on_landing_within_window() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 120.0);
        let mut player = spawn_in(&mut space, Vec2::ZERO);
        player.set_intent(PlayerIntent {
            direction: HorizontalDirection::None,
            jump_pressed: true,
            jump_held: false,
        });
        player.apply_controls(&mut space, 1.0 / 120.0);

        player.control.grounded = true;
        player.apply_controls(&mut space, 1.0 / 120.0);
        let velocity = space.velocity(player.body.expect("link")).expect("velocity");
        assert!(velocity.y < -100.0);
    }

    fn jump_press() -> PlayerIntent {
        PlayerIntent {
            direction: HorizontalDirection::None,
            jump_pressed: true,
            jump_held: false,
        }
    }

    fn walk_off_ledge(space: &mut PhysicsSpace) -> Player {
        let mut player = spawn_in(space, Vec2::ZERO);
        let standing = GroundContact {
            grounded: true,
            sticky: false,
        };
        player.sync_from_body(space, standing);
        player.sync_from_body(space, GroundContact::default());
        assert!(!player.control().grounded);
        player
    }

    #[test]
    fn jump_still_fires_just_after_leaving_the_ground() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 120.0);
        let mut player = walk_off_ledge(&mut space);
        for _ in 0..6 {
            player.apply_controls(&mut space, 1.0 / 120.0);
        }

        player.set_intent(jump_press());
        player.apply_controls(&mut space, 1.0 / 120.0);

        let velocity = space.velocity(player.body.expect("link")).expect("velocity");
        assert!((velocity.y + JUMP_IMPULSE).abs() < 1.0);
    }

    #[test]
    fn coyote_window_closes() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 120.0);
        let mut player = walk_off_ledge(&mut space);
        for _ in 0..15 {
            player.apply_controls(&mut space, 1.0 / 120.0);
        }

        player.set_intent(jump_press());
        player.apply_controls(&mut space, 1.0 / 120.0);

        let velocity = space.velocity(player.body.expect("link")).expect("velocity");
        assert!(velocity.y.abs() < 0.001);
    }

    #[test]
    fn pushing_without_moving_earns_a_nudge() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 120.0);
        let mut player = spawn_in(&mut space, Vec2::ZERO);
        let link = player.body.expect("link");
        player.control.grounded = true;
        player.set_intent(PlayerIntent {
            direction: HorizontalDirection::Right,
            jump_pressed: false,
            jump_held: false,
        });

        // Forces are never integrated here, so the body stays pinned in place.
        for _ in 0..20 {
            player.apply_controls(&mut space, 1.0 / 120.0);
        }
        assert!(space.velocity(link).expect("velocity").y.abs() < 0.001);

        for _ in 0..10 {
            player.apply_controls(&mut space, 1.0 / 120.0);
        }
        let velocity = space.velocity(link).expect("velocity");
        assert!((velocity.y + NUDGE_IMPULSE).abs() < 1.0);
    }

    #[test]
    fn sticky_ground_brakes_harder() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 60.0);
        let mut plain = spawn_in(&mut space, Vec2::ZERO);
        let mut sticky = spawn_in(&mut space, Vec2::new(100.0, 0.0));
        plain.control.grounded = true;
        sticky.control.grounded = true;
        sticky.control.on_sticky_ground = true;

        for player in [&mut plain, &mut sticky] {
            let link = player.body.expect("link");
            space.set_velocity(link, Vec2::new(100.0, 0.0));
            player.apply_controls(&mut space, 1.0 / 60.0);
        }

        let plain_vx = space.velocity(plain.body.expect("link")).expect("velocity").x;
        let sticky_vx = space.velocity(sticky.body.expect("link")).expect("velocity").x;
        assert!((plain_vx - 100.0 * GROUND_DAMPING).abs() < 0.01);
        assert!((sticky_vx - 100.0 * STICKY_GROUND_DAMPING).abs() < 0.01);
    }

    #[test]
    fn damage_grants_invincibility() {
        let mut player = Player::new(Vec2::ZERO);
        assert!(player.take_damage());
        assert_eq!(player.health(), PLAYER_MAX_HEALTH - 1);
        assert!(player.is_invincible());
        assert!(!player.take_damage());
        assert_eq!(player.health(), PLAYER_MAX_HEALTH - 1);
    }

    #[test]
    fn animation_follows_motion() {
        assert_eq!(animation_for(Vec2::new(0.0, -5.0), false), PlayerAnimation::Jump);
        assert_eq!(animation_for(Vec2::new(0.0, 5.0), false), PlayerAnimation::Fall);
        assert_eq!(animation_for(Vec2::new(50.0, 0.0), true), PlayerAnimation::Run);
        assert_eq!(animation_for(Vec2::ZERO, true), PlayerAnimation::Idle);
    }
}
