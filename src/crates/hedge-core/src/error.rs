//! Error types for the evaluation engine.
//!
//! All errors surfaced by the core are variants of [`EngineError`]. Worker
//! failures never cross a task boundary as panics: they are logged, reported
//! through the task's outcome channel, and the failed worker retires itself.

use thiserror::Error;

/// Convenience result type using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by graph construction, evaluation and the worker transport.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An operation was attempted over vertices owned by different graphs.
    ///
    /// Reported at construction time, before any state change.
    #[error("vertices '{left}' and '{right}' belong to different graphs")]
    CrossGraph {
        /// Label of the left operand.
        left: String,
        /// Label of the right operand.
        right: String,
    },

    /// The algebra's `sum` or `prod` reported a failure.
    ///
    /// The task that hit this reverts to pending and is retried by another
    /// worker; the worker that hit it is considered contaminated and retires.
    #[error("algebra operation failed: {0}")]
    Algebra(String),

    /// A vertex was dispatched whose operand carries no value.
    ///
    /// The evaluator only emits tasks whose operands are resolved, so this
    /// indicates a task was built outside the readiness loop.
    #[error("operand '{0}' has no value")]
    MissingOperand(String),

    /// The peer closed its stream at a frame boundary.
    ///
    /// Treated as a graceful worker departure rather than a fault: the proxy
    /// unregisters itself and the in-flight task re-enters the queue.
    #[error("peer closed the connection")]
    TransportEof,

    /// Any other stream I/O failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A value failed to encode or decode.
    #[error("value codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The peer sent a frame that violates the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl EngineError {
    /// True when the error means the peer went away cleanly rather than the
    /// operation itself failing.
    pub fn is_departure(&self) -> bool {
        matches!(self, Self::TransportEof)
    }
}
