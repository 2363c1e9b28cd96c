use thiserror::Error;

use super::{Mode, ObjectRef};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("invalid geometry for {subject}: `{field}` {reason}")]
    InvalidGeometry {
        subject: String,
        field: String,
        reason: String,
    },
    #[error("no {kind} with id {id}")]
    NotFound { kind: &'static str, id: u64 },
    #[error("{operation} is not allowed while {mode}")]
    InvalidState {
        operation: &'static str,
        mode: Mode,
    },
    #[error("physics engine rejected {object}: {reason}")]
    PhysicsEngineFailure { object: ObjectRef, reason: String },
    #[error("no unused {kind} ids remain")]
    IdsExhausted { kind: &'static str },
}

impl WorldError {
    pub(crate) fn geometry(
        subject: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidGeometry {
            subject: subject.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape_not_found(id: super::ShapeId) -> Self {
        Self::NotFound {
            kind: "shape",
            id: id.0,
        }
    }
}
