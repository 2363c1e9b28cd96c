use rapier2d::prelude::*;

use super::{Geometry, ShapeId, Vec2};

/// Velocity-space length scale for the solver; world units are pixels.
const LENGTH_UNIT: Real = 100.0;
const MIN_POLYGON_AREA: Real = 1.0e-3;

/// Non-owning link from an editable record to its simulated body.
///
/// Handles stay valid only as long as the [`PhysicsSpace`] that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLink {
    pub(crate) body: RigidBodyHandle,
    pub(crate) collider: ColliderHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyKind {
    Fixed,
    Dynamic,
    Kinematic,
}

/// Identifies the owner of a collider inside contact queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColliderTag {
    Boundary,
    Player,
    Shape(ShapeId),
}

impl ColliderTag {
    fn encode(self) -> u128 {
        match self {
            ColliderTag::Boundary => 0,
            ColliderTag::Player => 1,
            ColliderTag::Shape(id) => u128::from(id.0) + 2,
        }
    }

    fn decode(raw: u128) -> Self {
        match raw {
            0 => ColliderTag::Boundary,
            1 => ColliderTag::Player,
            other => ColliderTag::Shape(ShapeId((other - 2) as u64)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BodySpec {
    pub(crate) kind: BodyKind,
    pub(crate) position: Vec2,
    pub(crate) angle: f32,
    pub(crate) geometry: Geometry,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) mass: Option<f32>,
    pub(crate) lock_rotations: bool,
    pub(crate) angular_velocity: f32,
    pub(crate) tag: ColliderTag,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Contact {
    pub(crate) other: ColliderTag,
    /// Unit normal pointing away from the queried collider, toward `other`.
    pub(crate) normal: Vec2,
}

pub(crate) struct PhysicsSpace {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsSpace {
    pub(crate) fn new(gravity: Vec2, fixed_step: f32) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = fixed_step;
        integration_parameters.length_unit = LENGTH_UNIT;
        Self {
            gravity: vector![gravity.x, gravity.y],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub(crate) fn body_count(&self) -> usize {
        self.bodies.len()
    }

    #[cfg(test)]
    pub(crate) fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Inserts a body and its collider, or returns the engine's reason for refusing the geometry.
    pub(crate) fn create_body(&mut self, spec: &BodySpec) -> Result<BodyLink, String> {
        let collider = collider_builder(&spec.geometry)?
            .friction(spec.friction)
            .restitution(spec.restitution)
            .user_data(spec.tag.encode());
        let collider = match spec.mass {
            Some(mass) => collider.mass(mass),
            None => collider,
        };

        let mut body = match spec.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic().ccd_enabled(true),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_velocity_based(),
        }
        .translation(vector![spec.position.x, spec.position.y])
        .rotation(spec.angle)
        .angvel(spec.angular_velocity);
        if spec.lock_rotations {
            body = body.lock_rotations();
        }

        let body = self.bodies.insert(body);
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        Ok(BodyLink { body, collider })
    }

    /// Parentless wall collider; it does not count as a body.
    pub(crate) fn add_wall(
        &mut self,
        center: Vec2,
        half_extents: Vec2,
        friction: f32,
        restitution: f32,
    ) {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .translation(vector![center.x, center.y])
            .friction(friction)
            .restitution(restitution)
            .user_data(ColliderTag::Boundary.encode());
        self.colliders.insert(collider);
    }

    pub(crate) fn remove_body(&mut self, link: BodyLink) {
        self.bodies.remove(
            link.body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub(crate) fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    pub(crate) fn pose(&self, link: BodyLink) -> Option<(Vec2, f32)> {
        self.bodies.get(link.body).map(|body| {
            let translation = body.translation();
            (
                Vec2::new(translation.x, translation.y),
                body.rotation().angle(),
            )
        })
    }

    pub(crate) fn velocity(&self, link: BodyLink) -> Option<Vec2> {
        self.bodies
            .get(link.body)
            .map(|body| Vec2::new(body.linvel().x, body.linvel().y))
    }

    pub(crate) fn gravity(&self) -> Vec2 {
        Vec2::new(self.gravity.x, self.gravity.y)
    }

    pub(crate) fn mass(&self, link: BodyLink) -> Option<f32> {
        self.bodies.get(link.body).map(|body| body.mass())
    }

    pub(crate) fn set_velocity(&mut self, link: BodyLink, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(link.body) {
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    /// Replaces the persistent force on the body with `force`.
    pub(crate) fn set_force(&mut self, link: BodyLink, force: Vec2) {
        if let Some(body) = self.bodies.get_mut(link.body) {
            body.reset_forces(true);
            body.add_force(vector![force.x, force.y], true);
        }
    }

    pub(crate) fn apply_impulse(&mut self, link: BodyLink, impulse: Vec2) {
        if let Some(body) = self.bodies.get_mut(link.body) {
            body.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    pub(crate) fn teleport(&mut self, link: BodyLink, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(link.body) {
            body.set_translation(vector![position.x, position.y], true);
            body.set_linvel(vector![0.0, 0.0], true);
            body.reset_forces(true);
        }
    }

    /// Active contacts of the linked collider as they stand after the last step.
    pub(crate) fn contacts(&self, link: BodyLink) -> Vec<Contact> {
        let mut contacts = Vec::new();
        for pair in self.narrow_phase.contact_pairs_with(link.collider) {
            if !pair.has_any_active_contact {
                continue;
            }
            let (other, sign) = if pair.collider1 == link.collider {
                (pair.collider2, 1.0)
            } else {
                (pair.collider1, -1.0)
            };
            let Some(other_collider) = self.colliders.get(other) else {
                continue;
            };
            let tag = ColliderTag::decode(other_collider.user_data);
            for manifold in &pair.manifolds {
                if manifold.points.is_empty() {
                    continue;
                }
                let normal = manifold.data.normal;
                contacts.push(Contact {
                    other: tag,
                    normal: Vec2::new(normal.x * sign, normal.y * sign),
                });
            }
        }
        contacts
    }
}

fn collider_builder(geometry: &Geometry) -> Result<ColliderBuilder, String> {
    match geometry {
        Geometry::Rect { width, height } => Ok(ColliderBuilder::cuboid(width * 0.5, height * 0.5)),
        Geometry::Circle { radius } => Ok(ColliderBuilder::ball(*radius)),
        Geometry::Polygon { points } => {
            let points = points
                .iter()
                .map(|point| point![point.x, point.y])
                .collect::<Vec<_>>();
            let hull = rapier2d::parry::transformation::convex_hull(&points);
            if hull.len() < 3 || hull_area(&hull) <= MIN_POLYGON_AREA {
                return Err("polygon points do not span a convex area".to_string());
            }
            ColliderBuilder::convex_polyline(hull)
                .ok_or_else(|| "polygon hull was rejected by the collision backend".to_string())
        }
    }
}

fn hull_area(hull: &[Point<Real>]) -> Real {
    let mut twice_area = 0.0;
    for (index, a) in hull.iter().enumerate() {
        let b = hull[(index + 1) % hull.len()];
        twice_area += a.x * b.y - b.x * a.y;
    }
    (twice_area * 0.5).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_box(position: Vec2, tag: ColliderTag) -> BodySpec {
        BodySpec {
            kind: BodyKind::Fixed,
            position,
            angle: 0.0,
            geometry: Geometry::Rect {
                width: 400.0,
                height: 20.0,
            },
            friction: 1.0,
            restitution: 0.0,
            mass: None,
            lock_rotations: false,
            angular_velocity: 0.0,
            tag,
        }
    }

    fn ball(position: Vec2) -> BodySpec {
        BodySpec {
            kind: BodyKind::Dynamic,
            position,
            angle: 0.0,
            geometry: Geometry::Circle { radius: 10.0 },
            friction: 0.5,
            restitution: 0.0,
            mass: Some(1.0),
            lock_rotations: true,
            angular_velocity: 0.0,
            tag: ColliderTag::Player,
        }
    }

    #[test]
    fn tags_survive_user_data_encoding() {
        for tag in [
            ColliderTag::Boundary,
            ColliderTag::Player,
            ColliderTag::Shape(ShapeId(0)),
            ColliderTag::Shape(ShapeId(41)),
        ] {
            assert_eq!(ColliderTag::decode(tag.encode()), tag);
        }
    }

    #[test]
    fn collinear_polygon_is_refused() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 60.0);
        let mut spec = fixed_box(Vec2::ZERO, ColliderTag::Shape(ShapeId(0)));
        spec.geometry = Geometry::Polygon {
            points: vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)],
        };

        assert!(space.create_body(&spec).is_err());
        assert_eq!(space.body_count(), 0);
    }

    #[test]
    fn walls_are_colliders_not_bodies() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 60.0);
        space.add_wall(Vec2::ZERO, Vec2::new(5.0, 5.0), 1.0, 0.0);
        assert_eq!(space.body_count(), 0);
        assert_eq!(space.collider_count(), 1);
    }

    #[test]
    fn removing_a_body_removes_its_collider() {
        let mut space = PhysicsSpace::new(Vec2::ZERO, 1.0 / 60.0);
        let link = space.create_body(&ball(Vec2::ZERO)).expect("body");
        assert_eq!(space.collider_count(), 1);

        space.remove_body(link);
        assert_eq!(space.body_count(), 0);
        assert_eq!(space.collider_count(), 0);
        assert!(space.pose(link).is_none());
    }

    #[test]
    fn gravity_pulls_dynamic_bodies_down() {
        let mut space = PhysicsSpace::new(Vec2::new(0.0, 980.0), 1.0 / 60.0);
        let link = space.create_body(&ball(Vec2::new(0.0, 0.0))).expect("body");
        for _ in 0..10 {
            space.step();
        }
        let (position, _) = space.pose(link).expect("pose");
        assert!(position.y > 1.0);
    }

    #[test]
    fn resting_ball_reports_floor_contact_below_it() {
        let mut space = PhysicsSpace::new(Vec2::new(0.0, 980.0), 1.0 / 60.0);
        space
            .create_body(&fixed_box(Vec2::new(0.0, 100.0), ColliderTag::Shape(ShapeId(7))))
            .expect("floor");
        let link = space.create_body(&ball(Vec2::new(0.0, 80.0))).expect("ball");
        for _ in 0..60 {
            space.step();
        }

        let contacts = space.contacts(link);
        assert!(contacts
            .iter()
            .any(|contact| {
                contact.other == ColliderTag::Shape(ShapeId(7)) && contact.normal.y > 0.7
            }));
    }
}
