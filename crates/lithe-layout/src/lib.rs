#![forbid(unsafe_code)]

//! Incremental flexbox layout core.
//!
//! The engine turns a tree of styled boxes plus a viewport into a flat
//! set of f32 rectangles, and does it incrementally: frames that touch a
//! few nodes re-solve a few nodes.
//!
//! # Architecture
//!
//! - A structure-of-arrays node store indexed by stable 32-bit
//!   [`NodeId`] handles, recycled after removal.
//! - A dirty queue with ancestor propagation, so a style edit costs
//!   O(depth) to record and the solver only ever walks dirty spines.
//! - A per-node result cache keyed by (available space, style version)
//!   that lets measurement skip clean subtrees wholesale.
//! - A two-phase solver — bottom-up measure, top-down place — with
//!   batched constraint clamping over each container's children.
//!
//! Text is sized through the [`lithe_core::TextMeasure`] seam; the
//! engine never touches fonts itself.
//!
//! # Entry points
//!
//! [`LayoutEngine`] is the handle-based retained API. The companion
//! `lithe` crate layers the immediate-mode reconciliation surface on
//! top of it.

pub mod debug;

mod cache;
mod dirty;
mod engine;
mod error;
mod solver;
mod store;

pub use cache::CacheStats;
pub use engine::{ComputeStats, DEFAULT_CAPACITY, LayoutEngine};
pub use error::LayoutError;
pub use store::NodeId;
