/// Engine-level error taxonomy
///
/// Only two conditions abort a run: a definition with no trigger node, and a
/// node failure with no error-handle edge to route through. Expression
/// resolution misses and the step ceiling are fail-soft by design and never
/// surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The definition contains no trigger-typed node; nothing can start a run.
    #[error("no trigger node found in workflow definition")]
    NoTriggerFound,

    /// A node's effect failed and no `error` edge existed to recover locally.
    #[error("node '{node_id}' failed: {message}")]
    NodeFailed { node_id: String, message: String },
}

impl EngineError {
    /// The underlying failure message, without the engine's node wrapper
    ///
    /// Persisted as the execution record's `error` field so callers see the
    /// node's own message (e.g. "code execution failed: …").
    pub fn failure_message(&self) -> String {
        match self {
            EngineError::NoTriggerFound => self.to_string(),
            EngineError::NodeFailed { message, .. } => message.clone(),
        }
    }
}
