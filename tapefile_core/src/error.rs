//! Error types for tapefile operations.
//!
//! Only host programming errors surface here. Bad data never errors: a
//! delta that doesn't carry the configured attribute, references unknown
//! entities, or holds null values is silently filtered during ingestion.

use thiserror::Error;

/// Precondition violations raised by tapefile operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TapefileError {
    /// An incoming delta's iteration did not advance past the last one
    /// accepted. The upstream engine guarantees strictly increasing
    /// iterations, so this indicates a host bug, not bad data.
    #[error("iteration {got} does not advance past last accepted iteration {last}")]
    OutOfOrderIteration {
        /// Last accepted iteration.
        last: i64,
        /// The offending iteration.
        got: i64,
    },

    /// `step_forward` was called with the cursor already at the last update.
    #[error("already at the last update (cursor {cursor})")]
    AtLastUpdate {
        /// Current cursor position.
        cursor: usize,
    },

    /// `step_backward` was called with the cursor already at the first update.
    #[error("already at the first update")]
    AtFirstUpdate,

    /// A backward step needed a rollback that was never computed.
    #[error("no rollback available for update at cursor {cursor}")]
    MissingRollback {
        /// Cursor position of the update missing its rollback.
        cursor: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TapefileError>;
