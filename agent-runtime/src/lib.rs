//! Agent execution runtime.
//!
//! Defines the `Agent` trait implemented by task processors and the
//! `TaskExecutor` wrapper that times executions, records spans and per-agent
//! counters into the monitor, computes the synthetic reward, and reports
//! completion back to the coordinator. The experience log is bookkeeping
//! only; no policy update loop consumes it.

pub mod agent;
pub mod executor;
pub mod experience;

pub use agent::{Agent, TaskOutcome};
pub use executor::TaskExecutor;
pub use experience::{Experience, ExperienceLog};

// Re-export the task type agents consume
pub use common::TaskSpec;
