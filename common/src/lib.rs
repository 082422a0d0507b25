//! Shared types for the agent coordination platform.
//!
//! This crate defines the domain model used across the workspace:
//! - Coordination state and roles for registered agents
//! - Task descriptions and allocation strategies
//! - Trace events for the observability layer
//! - Serializable snapshots exported by the coordinator

pub mod error;
pub mod types;

pub use error::CoordinationError;
pub use types::{
    AgentRole, AgentSnapshot, CoordinationMetricsSnapshot, CoordinationSnapshot,
    CoordinationState, CoordinationStrategy, EventType, PendingTask, TaskSpec, TraceEvent,
};
