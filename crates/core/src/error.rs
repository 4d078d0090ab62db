use hearth_protocol::FrameKey;
use thiserror::Error;

use crate::model::NodeId;

/// Which weight of a node failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightField {
    Weight,
    CumulativeWeight,
}

impl std::fmt::Display for WeightField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weight => write!(f, "weight"),
            Self::CumulativeWeight => write!(f, "cumulative weight"),
        }
    }
}

/// Precondition violations. None of these are recoverable locally; they
/// point at malformed input from whoever built the tree or the view.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("call tree has no root node")]
    EmptyTree,
    #[error("node {0} does not belong to this tree")]
    UnknownNode(NodeId),
    #[error("frame {0} is not in the current layout")]
    UnknownFrame(FrameKey),
    #[error("node {node}: {field} must be finite and non-negative, got {value}")]
    InvalidWeight {
        node: NodeId,
        field: WeightField,
        value: f64,
    },
    #[error("cannot zoom to a frame with zero width")]
    ZeroWidthFrame,
    #[error("{what} must be finite and positive, got {value}")]
    InvalidExtent { what: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlameError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("no frame matched the focus predicate")]
    NoFocusFrame,
}

pub type Result<T, E = FlameError> = std::result::Result<T, E>;

/// Reject NaN, infinite and negative weights.
pub(crate) fn check_weight(node: NodeId, field: WeightField, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(InvalidInput::InvalidWeight { node, field, value }.into())
    }
}

/// Reject non-finite and non-positive pixel extents.
pub(crate) fn check_extent(what: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(InvalidInput::InvalidExtent { what, value }.into())
    }
}
