//! Error taxonomy for coordination operations.

use thiserror::Error;

/// Errors surfaced to callers of the coordination layer.
///
/// Most failure paths inside background loops are logged and swallowed;
/// only conditions the caller can act on are raised as typed errors.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// An agent with this id is already registered and alive.
    #[error("agent '{0}' is already registered")]
    DuplicateAgent(String),

    /// The referenced agent id is not in the registry.
    #[error("agent '{0}' is not registered")]
    UnknownAgent(String),

    /// The coordinator has been shut down.
    #[error("coordinator is not running")]
    NotRunning,
}
