//! Versioned JSON level format and its translation to and from [`GameWorld`].
//!
//! Parsing runs in two phases: the raw document is checked for a supported
//! `version` first, then decoded into [`LevelData`] through
//! `serde_path_to_error` so that every schema error names the JSON path it
//! came from (for example `shapes[3].radius`).

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::atomic_io::write_text_atomic;
use crate::world::{
    BodyCategory, GameWorld, Geometry, Material, ShapeDesc, ShapeId, ShapeIdAllocator, ShapeKind,
    ShapeProperties, Vec2, WorldError, DEFAULT_FRICTION, DEFAULT_RESTITUTION,
};

pub const LEVEL_SCHEMA_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level schema error at {path}: {message}")]
    Schema { path: String, message: String },
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write level file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode level: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    World(#[from] WorldError),
}

impl LevelError {
    fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointData {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for PointData {
    fn from(value: Vec2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }
}

impl From<PointData> for Vec2 {
    fn from(value: PointData) -> Self {
        Vec2::new(value.x, value.y)
    }
}

/// Shape ids in files are numeric, but hand-written levels may use names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeIdData {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ShapeIdData>,
    pub kind: ShapeKind,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub angle: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f32; 2]>>,
    #[serde(default)]
    pub category: BodyCategory,
    #[serde(default = "default_friction")]
    pub friction: f32,
    #[serde(default = "default_restitution")]
    pub restitution: f32,
    #[serde(default)]
    pub danger: bool,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub spinning: bool,
}

fn default_friction() -> f32 {
    DEFAULT_FRICTION
}

fn default_restitution() -> f32 {
    DEFAULT_RESTITUTION
}

impl ShapeData {
    fn to_desc(&self) -> ShapeDesc {
        ShapeDesc {
            kind: self.kind,
            position: Vec2::new(self.x, self.y),
            angle: self.angle,
            width: self.width,
            height: self.height,
            radius: self.radius,
            points: self
                .points
                .as_ref()
                .map(|points| points.iter().map(|[x, y]| Vec2::new(*x, *y)).collect()),
            category: self.category,
            material: Some(Material {
                friction: self.friction,
                restitution: self.restitution,
            }),
            properties: ShapeProperties {
                danger: self.danger,
                sticky: self.sticky,
                spinning: self.spinning,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub version: u64,
    pub player: PointData,
    #[serde(default)]
    pub shapes: Vec<ShapeData>,
    #[serde(default)]
    pub goal: Option<PointData>,
    #[serde(default)]
    pub checkpoints: Vec<PointData>,
}

impl LevelData {
    pub fn from_json_str(text: &str) -> Result<Self, LevelError> {
        let document: serde_json::Value = serde_json::from_str(text).map_err(|error| {
            LevelError::schema(
                format!("line {} column {}", error.line(), error.column()),
                error.to_string(),
            )
        })?;

        match document.get("version") {
            None => return Err(LevelError::schema("version", "is required")),
            Some(version) if version.as_u64() != Some(LEVEL_SCHEMA_VERSION) => {
                return Err(LevelError::schema(
                    "version",
                    format!(
                        "unsupported schema version {version}, expected {LEVEL_SCHEMA_VERSION}"
                    ),
                ));
            }
            Some(_) => {}
        }

        serde_path_to_error::deserialize(&document).map_err(|error| {
            let path = error.path().to_string();
            LevelError::schema(path, error.into_inner().to_string())
        })
    }

    pub fn to_json_string(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl GameWorld {
    /// Captures the current records. While playing these are the latest simulated poses.
    pub fn serialize(&self) -> LevelData {
        LevelData {
            version: LEVEL_SCHEMA_VERSION,
            player: self.player().position().into(),
            shapes: self.shapes().iter().map(shape_data).collect(),
            goal: self.goal().map(PointData::from),
            checkpoints: self
                .checkpoints()
                .iter()
                .copied()
                .map(PointData::from)
                .collect(),
        }
    }

    /// Replaces the whole level. Nothing changes unless every record validates.
    pub fn deserialize(&mut self, data: LevelData) -> Result<(), LevelError> {
        self.require_editing("deserialize")?;

        let player = finite_point(data.player, "player")?;
        let goal = data
            .goal
            .map(|goal| finite_point(goal, "goal"))
            .transpose()?;
        let checkpoints = data
            .checkpoints
            .iter()
            .enumerate()
            .map(|(index, point)| finite_point(*point, &format!("checkpoints[{index}]")))
            .collect::<Result<Vec<_>, _>>()?;

        let mut ids = ShapeIdAllocator::default();
        let mut numeric = HashSet::new();
        let mut named = HashSet::new();
        for (index, shape) in data.shapes.iter().enumerate() {
            let duplicate = match &shape.id {
                Some(ShapeIdData::Number(id)) => {
                    if *id > ShapeIdAllocator::LAST_ID.0 {
                        return Err(LevelError::schema(
                            format!("shapes[{index}].id"),
                            format!("must not exceed {}", ShapeIdAllocator::LAST_ID),
                        ));
                    }
                    ids.reserve_through(ShapeId(*id));
                    !numeric.insert(*id)
                }
                Some(ShapeIdData::Text(name)) => !named.insert(name.as_str()),
                None => false,
            };
            if duplicate {
                return Err(LevelError::schema(
                    format!("shapes[{index}].id"),
                    "duplicate shape id",
                ));
            }
        }

        let mut shapes = Vec::with_capacity(data.shapes.len());
        for (index, shape) in data.shapes.iter().enumerate() {
            let (id, label) = match &shape.id {
                Some(ShapeIdData::Number(id)) => (Some(ShapeId(*id)), None),
                Some(ShapeIdData::Text(name)) => (ids.allocate(), Some(name.clone())),
                None => (ids.allocate(), None),
            };
            let id = id.ok_or_else(|| {
                LevelError::schema(format!("shapes[{index}].id"), "no unused shape ids remain")
            })?;
            let record = shape
                .to_desc()
                .into_shape(id, label)
                .map_err(|error| match error {
                    WorldError::InvalidGeometry { field, reason, .. } => {
                        LevelError::schema(format!("shapes[{index}].{field}"), reason)
                    }
                    other => LevelError::schema(format!("shapes[{index}]"), other.to_string()),
                })?;
            shapes.push(record);
        }

        let shape_count = shapes.len();
        self.replace_contents(shapes, ids, player, goal, checkpoints);
        debug!(shape_count, "level_deserialized");
        Ok(())
    }
}

fn shape_data(shape: &crate::world::Shape) -> ShapeData {
    let (width, height, radius, points) = match shape.geometry() {
        Geometry::Rect { width, height } => (Some(*width), Some(*height), None, None),
        Geometry::Circle { radius } => (None, None, Some(*radius), None),
        Geometry::Polygon { points } => (
            None,
            None,
            None,
            Some(points.iter().map(|point| [point.x, point.y]).collect()),
        ),
    };
    let properties = shape.properties();
    let material = shape.material();
    ShapeData {
        id: Some(match shape.label() {
            Some(label) => ShapeIdData::Text(label.to_string()),
            None => ShapeIdData::Number(shape.id().0),
        }),
        kind: shape.kind(),
        x: shape.position().x,
        y: shape.position().y,
        angle: shape.angle(),
        width,
        height,
        radius,
        points,
        category: shape.category(),
        friction: material.friction,
        restitution: material.restitution,
        danger: properties.danger,
        sticky: properties.sticky,
        spinning: properties.spinning,
    }
}

fn finite_point(point: PointData, path: &str) -> Result<Vec2, LevelError> {
    let point = Vec2::from(point);
    if point.is_finite() {
        Ok(point)
    } else {
        Err(LevelError::schema(path, "coordinates must be finite"))
    }
}

pub fn save_level(world: &GameWorld, path: &Path) -> Result<(), LevelError> {
    let text = world.serialize().to_json_string()?;
    write_text_atomic(path, &text).map_err(|source| LevelError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        shape_count = world.shape_count(),
        "level_saved"
    );
    Ok(())
}

pub fn load_level(world: &mut GameWorld, path: &Path) -> Result<(), LevelError> {
    let text = fs::read_to_string(path).map_err(|source| LevelError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let data = LevelData::from_json_str(&text)?;
    world.deserialize(data)?;
    info!(
        path = %path.display(),
        shape_count = world.shape_count(),
        "level_loaded"
    );
    Ok(())
}
