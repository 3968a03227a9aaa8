//! Error types for voltlab-engine.
//!
//! Exactly three outcome kinds reach the host per tick: success, a
//! recoverable convergence failure, and the fatal topology / singular
//! conditions that require a circuit edit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("singular matrix")]
    SingularMatrix,

    #[error("convergence failed after {iterations} iterations")]
    ConvergenceFailed { iterations: usize },

    #[error("invalid matrix dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Topology(#[from] voltlab_core::Error),
}

impl Error {
    /// Fatal errors require editing the circuit; a convergence failure
    /// only asks the host to pause or slow the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ConvergenceFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
