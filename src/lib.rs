//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`: owned tree arena with per-node annotation slots.
//! - `annotate`: the four annotation passes over a tree.
//! - `score`: aggregation of an annotated tree into BBLS/BLS values.
//! - `io`: reading trees and score tables, writing reports.
//! - `error`: crate-wide error type and process exit codes.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).
//!
//! Public API kept stable by re-exporting key items from the modules.

pub mod annotate;
pub mod error;
pub mod io;
pub mod score;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use error::{BblsError, BblsResult};
pub use score::{compute_scores, score_annotated, score_sites, unit_scores};
pub use tree::{MotifTree, Node, NodeId};
