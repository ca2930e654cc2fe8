use thiserror::Error;

use crate::path::PathStep;
use crate::value::{NodeId, NodeKind};

pub type Result<T> = std::result::Result<T, Error>;

/// Failure while replaying a [`Path`](crate::Path) against a tree.
///
/// `depth` is the zero-based position of the failing step inside the path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("step {step} does not apply to {kind} at depth {depth}")]
    Incompatible {
        step: PathStep,
        kind: NodeKind,
        depth: usize,
    },

    #[error("step {step} is out of range for {kind} at depth {depth}")]
    OutOfRange {
        step: PathStep,
        kind: NodeKind,
        depth: usize,
    },
}

impl PathError {
    pub fn step(&self) -> &PathStep {
        match self {
            PathError::Incompatible { step, .. } | PathError::OutOfRange { step, .. } => step,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            PathError::Incompatible { depth, .. } | PathError::OutOfRange { depth, .. } => *depth,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Tree has no root node")]
    EmptyTree,

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {id} is a {kind}, not a container")]
    NotAContainer { id: NodeId, kind: NodeKind },

    #[error("Shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Duplicate record field: {0}")]
    DuplicateField(String),

    #[error("Duplicate table label: {0}")]
    DuplicateLabel(String),

    #[error("Invalid text pattern: {0}")]
    Pattern(String),

    #[error("No previous search to repeat")]
    NoPreviousSearch,

    #[error("JSON error: {0}")]
    Json(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}
