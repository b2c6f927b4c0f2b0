//! Error kinds for the scoring pipeline.
//!
//! Every variant is fatal: this is a single-shot batch computation with no
//! partial-result mode and no retries. The binary maps each kind to its own
//! non-zero exit status.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BblsError {
    /// A motif score outside [0, 1].
    #[error("score out of range for '{identifier}': {score} (scores must lie in [0, 1])")]
    ScoreRange { identifier: String, score: f64 },

    /// Leaf identifier set and score-table key set differ.
    #[error("tree leaves and motif identifiers do not match ({0})")]
    TopologyMismatch(String),

    /// Malformed tree or score input.
    #[error("invalid input: {0}")]
    Format(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl BblsError {
    /// Process exit status used by the CLI, one code per failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            BblsError::Format(_) => 2,
            BblsError::ScoreRange { .. } => 3,
            BblsError::TopologyMismatch(_) => 4,
            BblsError::Io(_) => 5,
        }
    }
}

pub type BblsResult<T> = Result<T, BblsError>;
