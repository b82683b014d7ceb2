use thiserror::Error;

/// Errors surfaced by the suggestion engine.
///
/// Permission, fetch and cache problems are absorbed into controller state;
/// only contract violations and use-after-shutdown reach the caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SuggestError {
    /// A collaborator returned a record that violates the ranking preconditions.
    #[error("invalid place record {place_id}: {reason}")]
    InvalidInput { place_id: String, reason: String },

    #[error("suggestion controller has been shut down")]
    ShutDown,
}
