#![forbid(unsafe_code)]

//! Error taxonomy for mutating operations.
//!
//! Only mutating operations can fail, and they fail atomically: on error
//! the store is unchanged and the last-known-good rectangles remain
//! queryable. Queries return zero/sentinel values on bad input instead
//! of erroring, and `compute` is total.

use std::fmt;

use crate::store::NodeId;

/// Failure of a mutating store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// The store already holds its configured maximum number of nodes.
    CapacityExceeded { capacity: usize },
    /// The handle refers to a freed or never-allocated slot.
    InvalidNode { node: NodeId },
    /// The reparent would make a node an ancestor of itself.
    CycleDetected { node: NodeId, new_parent: NodeId },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { capacity } => {
                write!(f, "node store is full ({capacity} nodes)")
            }
            Self::InvalidNode { node } => write!(f, "node {node} is not live"),
            Self::CycleDetected { node, new_parent } => {
                write!(
                    f,
                    "reparenting {node} under {new_parent} would create a cycle"
                )
            }
        }
    }
}

impl std::error::Error for LayoutError {}
