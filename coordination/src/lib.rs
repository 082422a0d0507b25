//! Distributed coordination layer.
//!
//! This crate provides the `DistributedCoordinator`:
//! - Agent registry tracking liveness, capabilities, and workload
//! - Bully-style leader election with priority tie-breaks
//! - Pluggable task-allocation strategies
//! - Heartbeat propagation and staleness-driven re-election
//! - A pending-task queue re-scanned by a background processor
//!
//! The whole layer is an in-process simulation: agents are registry entries
//! sharing one event loop, heartbeats propagate through shared state rather
//! than a transport, and nothing is persisted across restarts.

pub mod allocation;
pub mod config;
pub mod coordinator;
pub mod election;
pub mod registry;

pub use allocation::AllocationEngine;
pub use config::{load_config, save_config, CoordinatorConfig};
pub use coordinator::DistributedCoordinator;
pub use registry::AgentRegistry;

// Re-export common types for convenience
pub use common::{
    AgentRole, AgentSnapshot, CoordinationError, CoordinationSnapshot, CoordinationState,
    CoordinationStrategy, PendingTask, TaskSpec,
};
