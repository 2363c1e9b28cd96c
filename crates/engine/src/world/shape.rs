use std::fmt;

use serde::{Deserialize, Serialize};

use super::physics::{BodyKind, BodyLink, BodySpec, ColliderTag};
use super::{Vec2, WorldError};

pub const DEFAULT_FRICTION: f32 = 1.0;
pub const DEFAULT_RESTITUTION: f32 = 0.1;
pub const SPIN_RADIANS_PER_SECOND: f32 = 1.0;
pub const DEFAULT_SHAPE_SIZE: f32 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShapeId(pub u64);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out shape ids for one world. Ids are never reused, even after removal.
///
/// `u64::MAX` is never handed out; once `next` reaches it the allocator is spent.
#[derive(Debug, Default)]
pub struct ShapeIdAllocator {
    next: u64,
}

impl ShapeIdAllocator {
    pub const LAST_ID: ShapeId = ShapeId(u64::MAX - 1);

    /// Returns `None` once every id up to [`Self::LAST_ID`] has been used.
    pub fn allocate(&mut self) -> Option<ShapeId> {
        if self.next == u64::MAX {
            return None;
        }
        let id = ShapeId(self.next);
        self.next += 1;
        Some(id)
    }

    pub(crate) fn reserve_through(&mut self, id: ShapeId) {
        self.next = self.next.max(id.0.saturating_add(1));
    }
}

/// Anything the editor can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Player,
    Shape(ShapeId),
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Player => f.write_str("player"),
            ObjectRef::Shape(id) => write!(f, "shape {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Circle,
    Polygon,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Circle => "circle",
            ShapeKind::Polygon => "polygon",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyCategory {
    #[default]
    Static,
    Dynamic,
}

/// Validated dimensions. Polygon points are local to the shape position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Geometry {
    Rect { width: f32, height: f32 },
    Circle { radius: f32 },
    Polygon { points: Vec<Vec2> },
}

impl Geometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Rect { .. } => ShapeKind::Rect,
            Geometry::Circle { .. } => ShapeKind::Circle,
            Geometry::Polygon { .. } => ShapeKind::Polygon,
        }
    }

    /// Triangle used by the editor's third placement tool, scaled from the default size.
    pub fn default_triangle(scale: f32) -> Geometry {
        let s = DEFAULT_SHAPE_SIZE * scale;
        Geometry::Polygon {
            points: vec![
                Vec2::new(-s / 2.0, s / 3.0),
                Vec2::new(s / 2.0, s / 3.0),
                Vec2::new(0.0, -2.0 * s / 3.0),
            ],
        }
    }

    pub(crate) fn validate(&self, subject: &str) -> Result<(), WorldError> {
        match self {
            Geometry::Rect { width, height } => {
                require_positive(subject, "width", *width)?;
                require_positive(subject, "height", *height)
            }
            Geometry::Circle { radius } => require_positive(subject, "radius", *radius),
            Geometry::Polygon { points } => {
                if points.len() < 3 {
                    return Err(WorldError::geometry(
                        subject,
                        "points",
                        format!("needs at least 3 points, got {}", points.len()),
                    ));
                }
                for (index, point) in points.iter().enumerate() {
                    if !point.is_finite() {
                        return Err(WorldError::geometry(
                            subject,
                            format!("points[{index}]"),
                            "must be finite",
                        ));
                    }
                }
                Ok(())
            }
        }
    }

    pub fn bounding_radius(&self) -> f32 {
        match self {
            Geometry::Rect { width, height } => Vec2::new(width * 0.5, height * 0.5).length(),
            Geometry::Circle { radius } => *radius,
            Geometry::Polygon { points } => points
                .iter()
                .map(|point| point.length())
                .fold(0.0, f32::max),
        }
    }

    /// Point test in the shape's local frame.
    pub fn contains_local(&self, point: Vec2) -> bool {
        match self {
            Geometry::Rect { width, height } => {
                point.x.abs() <= width * 0.5 && point.y.abs() <= height * 0.5
            }
            Geometry::Circle { radius } => point.length() <= *radius,
            Geometry::Polygon { points } => polygon_contains(points, point),
        }
    }
}

fn polygon_contains(points: &[Vec2], point: Vec2) -> bool {
    let mut inside = false;
    let mut previous = points.len().wrapping_sub(1);
    for current in 0..points.len() {
        let a = points[current];
        let b = points[previous];
        if (a.y > point.y) != (b.y > point.y)
            && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        previous = current;
    }
    inside
}

fn require_positive(subject: &str, field: &str, value: f32) -> Result<(), WorldError> {
    if !value.is_finite() {
        return Err(WorldError::geometry(subject, field, "must be finite"));
    }
    if value <= 0.0 {
        return Err(WorldError::geometry(
            subject,
            field,
            format!("must be greater than zero, got {value}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            restitution: DEFAULT_RESTITUTION,
        }
    }
}

impl Material {
    fn validate(&self, subject: &str) -> Result<(), WorldError> {
        for (field, value) in [("friction", self.friction), ("restitution", self.restitution)] {
            if !value.is_finite() || value < 0.0 {
                return Err(WorldError::geometry(
                    subject,
                    field,
                    format!("must be a finite non-negative number, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShapeProperties {
    pub danger: bool,
    pub sticky: bool,
    pub spinning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeProperty {
    Danger,
    Sticky,
    Spinning,
}

impl ShapeProperties {
    pub fn set(&mut self, property: ShapeProperty, enabled: bool) {
        match property {
            ShapeProperty::Danger => self.danger = enabled,
            ShapeProperty::Sticky => self.sticky = enabled,
            ShapeProperty::Spinning => self.spinning = enabled,
        }
    }

    pub fn get(&self, property: ShapeProperty) -> bool {
        match property {
            ShapeProperty::Danger => self.danger,
            ShapeProperty::Sticky => self.sticky,
            ShapeProperty::Spinning => self.spinning,
        }
    }
}

/// Unvalidated shape description as it arrives from the editor or a level file.
///
/// Dimension fields are optional so that a descriptor can be checked for
/// consistency with its `kind` before it becomes a [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDesc {
    pub kind: ShapeKind,
    pub position: Vec2,
    pub angle: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub radius: Option<f32>,
    pub points: Option<Vec<Vec2>>,
    pub category: BodyCategory,
    pub material: Option<Material>,
    pub properties: ShapeProperties,
}

impl ShapeDesc {
    pub fn new(kind: ShapeKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            angle: 0.0,
            width: None,
            height: None,
            radius: None,
            points: None,
            category: BodyCategory::Static,
            material: None,
            properties: ShapeProperties::default(),
        }
    }

    pub fn rect(position: Vec2, width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::new(ShapeKind::Rect, position)
        }
    }

    pub fn circle(position: Vec2, radius: f32) -> Self {
        Self {
            radius: Some(radius),
            ..Self::new(ShapeKind::Circle, position)
        }
    }

    pub fn polygon(position: Vec2, points: Vec<Vec2>) -> Self {
        Self {
            points: Some(points),
            ..Self::new(ShapeKind::Polygon, position)
        }
    }

    pub fn from_geometry(geometry: Geometry, position: Vec2) -> Self {
        match geometry {
            Geometry::Rect { width, height } => Self::rect(position, width, height),
            Geometry::Circle { radius } => Self::circle(position, radius),
            Geometry::Polygon { points } => Self::polygon(position, points),
        }
    }

    pub fn with_category(mut self, category: BodyCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_properties(mut self, properties: ShapeProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Resolves the dimension fields against `kind`. A field that belongs to a
    /// different kind is rejected rather than ignored.
    pub fn geometry(&self) -> Result<Geometry, WorldError> {
        let subject = format!("{} shape", self.kind);
        let geometry = match self.kind {
            ShapeKind::Rect => {
                reject_field(&subject, "radius", self.radius.is_some())?;
                reject_field(&subject, "points", self.points.is_some())?;
                Geometry::Rect {
                    width: require_field(&subject, "width", self.width)?,
                    height: require_field(&subject, "height", self.height)?,
                }
            }
            ShapeKind::Circle => {
                reject_field(&subject, "width", self.width.is_some())?;
                reject_field(&subject, "height", self.height.is_some())?;
                reject_field(&subject, "points", self.points.is_some())?;
                Geometry::Circle {
                    radius: require_field(&subject, "radius", self.radius)?,
                }
            }
            ShapeKind::Polygon => {
                reject_field(&subject, "width", self.width.is_some())?;
                reject_field(&subject, "height", self.height.is_some())?;
                reject_field(&subject, "radius", self.radius.is_some())?;
                Geometry::Polygon {
                    points: require_field(&subject, "points", self.points.clone())?,
                }
            }
        };
        geometry.validate(&subject)?;
        Ok(geometry)
    }

    pub(crate) fn into_shape(
        self,
        id: ShapeId,
        label: Option<String>,
    ) -> Result<Shape, WorldError> {
        let geometry = self.geometry()?;
        let subject = format!("{} shape", self.kind);
        if !self.position.is_finite() {
            return Err(WorldError::geometry(&subject, "position", "must be finite"));
        }
        if !self.angle.is_finite() {
            return Err(WorldError::geometry(&subject, "angle", "must be finite"));
        }
        let material = self.material.unwrap_or_default();
        material.validate(&subject)?;
        Ok(Shape {
            id,
            label,
            geometry,
            position: self.position,
            angle: self.angle,
            category: self.category,
            material,
            properties: self.properties,
            body: None,
        })
    }
}

fn require_field<T>(subject: &str, field: &str, value: Option<T>) -> Result<T, WorldError> {
    value.ok_or_else(|| WorldError::geometry(subject, field, "is required"))
}

fn reject_field(subject: &str, field: &str, present: bool) -> Result<(), WorldError> {
    if present {
        Err(WorldError::geometry(
            subject,
            field,
            "does not apply to this kind",
        ))
    } else {
        Ok(())
    }
}

/// An editable shape record. The body link is only populated while playing.
#[derive(Debug, Clone)]
pub struct Shape {
    id: ShapeId,
    label: Option<String>,
    geometry: Geometry,
    position: Vec2,
    angle: f32,
    category: BodyCategory,
    material: Material,
    properties: ShapeProperties,
    pub(crate) body: Option<BodyLink>,
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn category(&self) -> BodyCategory {
        self.category
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn properties(&self) -> ShapeProperties {
        self.properties
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn contains_point(&self, world_point: Vec2) -> bool {
        let local = (world_point - self.position).rotated(-self.angle);
        self.geometry.contains_local(local)
    }

    pub(crate) fn set_pose(&mut self, position: Vec2, angle: f32) {
        self.position = position;
        self.angle = angle;
    }

    pub(crate) fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    pub(crate) fn set_property(&mut self, property: ShapeProperty, enabled: bool) {
        self.properties.set(property, enabled);
    }

    pub(crate) fn body_spec(&self) -> BodySpec {
        let kind = if self.properties.spinning {
            BodyKind::Kinematic
        } else {
            match self.category {
                BodyCategory::Static => BodyKind::Fixed,
                BodyCategory::Dynamic => BodyKind::Dynamic,
            }
        };
        BodySpec {
            kind,
            position: self.position,
            angle: self.angle,
            geometry: self.geometry.clone(),
            friction: self.material.friction,
            restitution: self.material.restitution,
            mass: None,
            lock_rotations: false,
            angular_velocity: if self.properties.spinning {
                SPIN_RADIANS_PER_SECOND
            } else {
                0.0
            },
            tag: ColliderTag::Shape(self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_without_radius_is_rejected() {
        let mut desc = ShapeDesc::new(ShapeKind::Circle, Vec2::new(0.0, 0.0));
        desc.width = Some(5.0);

        let error = desc.geometry().expect_err("mismatched circle");
        match error {
            WorldError::InvalidGeometry { field, .. } => assert_eq!(field, "width"),
            other => panic!("unexpected error: {other:?}"),
        }

        let missing = ShapeDesc::new(ShapeKind::Circle, Vec2::ZERO)
            .geometry()
            .expect_err("missing radius");
        assert!(matches!(
            missing,
            WorldError::InvalidGeometry { ref field, .. } if field == "radius"
        ));
    }

    #[test]
    fn rect_requires_positive_dimensions() {
        let error = ShapeDesc::rect(Vec2::ZERO, 10.0, 0.0)
            .geometry()
            .expect_err("zero height");
        assert!(error.to_string().contains("height"));

        let error = ShapeDesc::rect(Vec2::ZERO, f32::NAN, 4.0)
            .geometry()
            .expect_err("nan width");
        assert!(error.to_string().contains("finite"));
    }

    #[test]
    fn polygon_needs_three_finite_points() {
        let two = ShapeDesc::polygon(Vec2::ZERO, vec![Vec2::ZERO, Vec2::new(1.0, 0.0)]);
        assert!(two.geometry().is_err());

        let bad_point = ShapeDesc::polygon(
            Vec2::ZERO,
            vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(f32::INFINITY, 1.0)],
        );
        let error = bad_point.geometry().expect_err("infinite point");
        assert!(matches!(
            error,
            WorldError::InvalidGeometry { ref field, .. } if field == "points[2]"
        ));
    }

    #[test]
    fn missing_material_uses_defaults() {
        let shape = ShapeDesc::rect(Vec2::ZERO, 10.0, 10.0)
            .into_shape(ShapeId(3), None)
            .expect("shape");
        assert_eq!(shape.material(), Material::default());
        assert_eq!(shape.material().friction, DEFAULT_FRICTION);
        assert_eq!(shape.material().restitution, DEFAULT_RESTITUTION);
    }

    #[test]
    fn negative_friction_is_rejected() {
        let result = ShapeDesc::circle(Vec2::ZERO, 4.0)
            .with_material(Material {
                friction: -1.0,
                restitution: 0.0,
            })
            .into_shape(ShapeId(0), None);
        assert!(result.is_err());
    }

    #[test]
    fn spinning_shapes_become_kinematic_bodies() {
        let mut shape = ShapeDesc::rect(Vec2::ZERO, 10.0, 10.0)
            .with_category(BodyCategory::Dynamic)
            .into_shape(ShapeId(1), None)
            .expect("shape");
        assert_eq!(shape.body_spec().kind, BodyKind::Dynamic);

        shape.set_property(ShapeProperty::Spinning, true);
        let spec = shape.body_spec();
        assert_eq!(spec.kind, BodyKind::Kinematic);
        assert_eq!(spec.angular_velocity, SPIN_RADIANS_PER_SECOND);
    }

    #[test]
    fn point_containment_respects_rotation() {
        let shape = ShapeDesc::rect(Vec2::new(100.0, 100.0), 40.0, 10.0)
            .with_angle(std::f32::consts::FRAC_PI_2)
            .into_shape(ShapeId(0), None)
            .expect("shape");
        assert!(shape.contains_point(Vec2::new(100.0, 118.0)));
        assert!(!shape.contains_point(Vec2::new(118.0, 100.0)));
    }

    #[test]
    fn triangle_contains_its_centroid() {
        let triangle = Geometry::default_triangle(1.0);
        assert!(triangle.contains_local(Vec2::ZERO));
        assert!(!triangle.contains_local(Vec2::new(60.0, 0.0)));
    }

    #[test]
    fn allocator_skips_reserved_ids() {
        let mut allocator = ShapeIdAllocator::default();
        assert_eq!(allocator.allocate(), Some(ShapeId(0)));
        allocator.reserve_through(ShapeId(10));
        assert_eq!(allocator.allocate(), Some(ShapeId(11)));
        allocator.reserve_through(ShapeId(2));
        assert_eq!(allocator.allocate(), Some(ShapeId(12)));
    }

    #[test]
    fn allocator_is_spent_after_the_last_id() {
        let mut allocator = ShapeIdAllocator::default();
        allocator.reserve_through(ShapeId(ShapeIdAllocator::LAST_ID.0 - 1));
        assert_eq!(allocator.allocate(), Some(ShapeIdAllocator::LAST_ID));
        assert_eq!(allocator.allocate(), None);
        assert_eq!(allocator.allocate(), None);
    }
}
