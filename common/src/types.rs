//! Core domain types shared by the coordinator, monitor, and agent runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Role an agent holds within the coordination protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Follower,
    Candidate,
    Leader,
}

/// Strategy used to pick an agent for an incoming task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationStrategy {
    /// Deterministic ring over eligible agents, sorted by agent id.
    RoundRobin,
    /// Lowest current workload wins, ties broken by agent id.
    LoadBased,
    /// Broadest capability set wins, ties broken by agent id.
    CapabilityBased,
    /// Sealed-bid auction: workload plus a surplus-capability penalty.
    AuctionBased,
}

impl Default for CoordinationStrategy {
    fn default() -> Self {
        CoordinationStrategy::LoadBased
    }
}

/// Per-agent coordination state tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationState {
    pub agent_id: String,
    pub role: AgentRole,
    /// Agent id this node currently believes is leader. A lookup, not an
    /// ownership relation.
    pub current_leader: Option<String>,
    /// Monotonic election generation counter.
    pub term: u64,
    /// Present in the model; unused by the simplified election.
    pub voted_for: Option<String>,
    pub last_heartbeat: DateTime<Utc>,
    pub is_alive: bool,
    /// Count of tasks currently assigned.
    pub workload: u32,
    pub capabilities: HashSet<String>,
    /// Sole election tie-break criterion ahead of agent id ordering.
    pub priority: i32,
}

impl CoordinationState {
    pub fn new(agent_id: impl Into<String>, capabilities: HashSet<String>, priority: i32) -> Self {
        Self {
            agent_id: agent_id.into(),
            role: AgentRole::Follower,
            current_leader: None,
            term: 0,
            voted_for: None,
            last_heartbeat: Utc::now(),
            is_alive: true,
            workload: 0,
            capabilities,
            priority,
        }
    }
}

/// A unit of work submitted to the coordinator for allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub required_capabilities: HashSet<String>,
}

impl TaskSpec {
    pub fn new(payload: serde_json::Value, required_capabilities: HashSet<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            required_capabilities,
        }
    }
}

/// A task waiting in the coordinator's queue for a capable agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTask {
    pub task: TaskSpec,
    pub submitted_at: DateTime<Utc>,
}

/// Category of a trace span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TaskStart,
    TaskComplete,
    Election,
    Heartbeat,
    Allocation,
    Custom,
}

/// One span within a trace.
///
/// Created on `start_span`, mutated exactly once on `end_span`, retained
/// until the retention window evicts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub trace_id: Uuid,
    pub span_id: Uuid,
    pub parent_span_id: Option<Uuid>,
    pub event_type: EventType,
    pub agent_id: String,
    pub started_at: DateTime<Utc>,
    /// Filled when the span is closed.
    pub duration_ms: Option<f64>,
    pub metadata: serde_json::Value,
    pub success: Option<bool>,
}

/// JSON-ready view of one agent's coordination state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub role: AgentRole,
    pub current_leader: Option<String>,
    pub term: u64,
    pub is_alive: bool,
    pub workload: u32,
    pub capabilities: Vec<String>,
    pub priority: i32,
    pub last_heartbeat: DateTime<Utc>,
}

impl From<&CoordinationState> for AgentSnapshot {
    fn from(state: &CoordinationState) -> Self {
        let mut capabilities: Vec<String> = state.capabilities.iter().cloned().collect();
        capabilities.sort();
        Self {
            agent_id: state.agent_id.clone(),
            role: state.role,
            current_leader: state.current_leader.clone(),
            term: state.term,
            is_alive: state.is_alive,
            workload: state.workload,
            capabilities,
            priority: state.priority,
            last_heartbeat: state.last_heartbeat,
        }
    }
}

/// Counters exported alongside the coordination snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinationMetricsSnapshot {
    pub elections_held: u64,
    pub tasks_submitted: u64,
    pub tasks_allocated: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    /// Agents that stopped responding or were reported failed.
    pub failed_agents: u64,
    /// Agents that unregistered gracefully.
    pub departed_agents: u64,
}

/// JSON-ready view of the whole coordination layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationSnapshot {
    pub current_leader: Option<String>,
    pub term: u64,
    pub strategy: CoordinationStrategy,
    pub agents: Vec<AgentSnapshot>,
    pub pending_tasks: usize,
    pub metrics: CoordinationMetricsSnapshot,
}
