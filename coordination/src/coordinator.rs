//! DistributedCoordinator - leader election, task allocation, heartbeats
//!
//! The coordinator owns the agent registry and the pending-task queue.
//! All interaction is in-process method calls; the exported surfaces are
//! `get_coordination_state` / `get_agent_state`, which return plain
//! serializable snapshots for an enclosing HTTP layer to expose.

use crate::allocation::AllocationEngine;
use crate::config::CoordinatorConfig;
use crate::election::run_election;
use crate::registry::AgentRegistry;
use chrono::Utc;
use common::{
    AgentSnapshot, CoordinationError, CoordinationMetricsSnapshot, CoordinationSnapshot,
    PendingTask, TaskSpec,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Lifetime counters, exported with the coordination snapshot.
#[derive(Debug, Default)]
struct Counters {
    elections_held: AtomicU64,
    tasks_submitted: AtomicU64,
    tasks_allocated: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    failed_agents: AtomicU64,
    departed_agents: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CoordinationMetricsSnapshot {
        CoordinationMetricsSnapshot {
            elections_held: self.elections_held.load(Ordering::Relaxed),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_allocated: self.tasks_allocated.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            failed_agents: self.failed_agents.load(Ordering::Relaxed),
            departed_agents: self.departed_agents.load(Ordering::Relaxed),
        }
    }
}

/// State guarded by one lock, so election, allocation, and heartbeat
/// propagation never interleave mid-operation.
struct Inner {
    registry: AgentRegistry,
    allocator: AllocationEngine,
    pending: Vec<PendingTask>,
}

/// In-process coordinator for a set of registered agents.
pub struct DistributedCoordinator {
    config: CoordinatorConfig,
    inner: Arc<RwLock<Inner>>,
    counters: Arc<Counters>,
    running: Arc<AtomicBool>,
}

impl DistributedCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let allocator = AllocationEngine::new(config.strategy);
        Self {
            config,
            inner: Arc::new(RwLock::new(Inner {
                registry: AgentRegistry::new(),
                allocator,
                pending: Vec::new(),
            })),
            counters: Arc::new(Counters::default()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Spawn the heartbeat, staleness-monitor, and queue-processor loops.
    /// Idempotent: a second call while running is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(strategy = ?self.config.strategy, "Coordinator started");

        tokio::spawn(Self::heartbeat_loop(
            self.inner.clone(),
            self.running.clone(),
            self.config.heartbeat_interval(),
        ));
        tokio::spawn(Self::monitor_loop(
            self.inner.clone(),
            self.counters.clone(),
            self.running.clone(),
            self.config.heartbeat_interval(),
            self.config.election_timeout(),
        ));
        tokio::spawn(Self::queue_loop(
            self.inner.clone(),
            self.counters.clone(),
            self.running.clone(),
            self.config.queue_poll_interval(),
        ));
    }

    /// Stop the background loops. Each loop exits on its next tick.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Coordinator shutting down");
        }
    }

    /// Register a new agent as a follower.
    ///
    /// If no alive leader exists afterwards, an election runs immediately.
    pub async fn register_agent(
        &self,
        agent_id: &str,
        capabilities: HashSet<String>,
        priority: i32,
    ) -> Result<(), CoordinationError> {
        let mut inner = self.inner.write().await;
        inner.registry.register(agent_id, capabilities, priority)?;
        info!(agent = %agent_id, priority, "Registered agent");

        if inner.registry.alive_leader().is_none() {
            self.elect(&mut inner);
        }
        Ok(())
    }

    /// Gracefully remove an agent.
    ///
    /// Counts as a departure, not a failure. If the agent held leadership, a
    /// new election runs before its entry is dropped.
    pub async fn unregister_agent(&self, agent_id: &str) -> Result<(), CoordinationError> {
        let mut inner = self.inner.write().await;
        let was_leader = inner.registry.mark_dead(agent_id)?;
        if was_leader {
            self.elect(&mut inner);
        }
        inner.registry.remove(agent_id);
        self.counters.departed_agents.fetch_add(1, Ordering::Relaxed);
        info!(agent = %agent_id, was_leader, "Unregistered agent");
        Ok(())
    }

    /// Report an agent as failed (crashed, unresponsive).
    ///
    /// Same removal path as `unregister_agent` but bumps the failure
    /// counter instead of the departure counter.
    pub async fn mark_failed(&self, agent_id: &str) -> Result<(), CoordinationError> {
        let mut inner = self.inner.write().await;
        let was_leader = inner.registry.mark_dead(agent_id)?;
        if was_leader {
            self.elect(&mut inner);
        }
        inner.registry.remove(agent_id);
        self.counters.failed_agents.fetch_add(1, Ordering::Relaxed);
        warn!(agent = %agent_id, was_leader, "Agent marked failed");
        Ok(())
    }

    /// Submit a task for allocation.
    ///
    /// Returns the chosen agent id, or `None` when no capable agent is
    /// available right now; the task then waits in the pending queue for the
    /// background processor.
    pub async fn submit_task(&self, task: TaskSpec) -> Option<String> {
        self.counters.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.write().await;
        let Inner {
            registry,
            allocator,
            pending,
        } = &mut *inner;

        match allocator.allocate(registry, &task) {
            Some(agent_id) => {
                self.counters.tasks_allocated.fetch_add(1, Ordering::Relaxed);
                Some(agent_id)
            }
            None => {
                debug!(task_id = %task.id, "No capable agent, queueing task");
                pending.push(PendingTask {
                    task,
                    submitted_at: Utc::now(),
                });
                None
            }
        }
    }

    /// Record completion of a previously allocated task, releasing one unit
    /// of the agent's workload (floored at zero).
    pub async fn report_task_completed(
        &self,
        agent_id: &str,
        success: bool,
    ) -> Result<(), CoordinationError> {
        let mut inner = self.inner.write().await;
        inner.registry.decrement_workload(agent_id)?;
        if success {
            self.counters.tasks_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.tasks_failed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Force an election now. Used by the staleness monitor and by tests.
    pub async fn trigger_election(&self) -> Option<String> {
        let mut inner = self.inner.write().await;
        self.elect(&mut inner)
    }

    /// Number of tasks waiting for a capable agent.
    pub async fn pending_task_count(&self) -> usize {
        self.inner.read().await.pending.len()
    }

    /// Snapshot of the whole coordination layer.
    pub async fn get_coordination_state(&self) -> CoordinationSnapshot {
        let inner = self.inner.read().await;
        CoordinationSnapshot {
            current_leader: inner.registry.alive_leader().map(|l| l.agent_id.clone()),
            term: inner.registry.max_term(),
            strategy: self.config.strategy,
            agents: inner.registry.snapshot_agents(),
            pending_tasks: inner.pending.len(),
            metrics: self.counters.snapshot(),
        }
    }

    /// Snapshot of one agent, or `None` if unknown.
    pub async fn get_agent_state(&self, agent_id: &str) -> Option<AgentSnapshot> {
        let inner = self.inner.read().await;
        inner.registry.get(agent_id).map(AgentSnapshot::from)
    }

    fn elect(&self, inner: &mut Inner) -> Option<String> {
        let leader = run_election(&mut inner.registry);
        if leader.is_some() {
            self.counters.elections_held.fetch_add(1, Ordering::Relaxed);
        }
        leader
    }

    /// Leader heartbeat tick: refresh the leader's timestamp and propagate
    /// to every alive follower through shared state.
    async fn heartbeat_loop(
        inner: Arc<RwLock<Inner>>,
        running: Arc<AtomicBool>,
        interval: Duration,
    ) {
        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(interval).await;
            let mut guard = inner.write().await;
            if let Some(leader_id) = guard.registry.propagate_heartbeats(Utc::now()) {
                debug!(leader = %leader_id, "Heartbeat tick");
            }
        }
    }

    /// Watch for a stale or missing leader and re-elect.
    async fn monitor_loop(
        inner: Arc<RwLock<Inner>>,
        counters: Arc<Counters>,
        running: Arc<AtomicBool>,
        interval: Duration,
        election_timeout: Duration,
    ) {
        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(interval).await;
            let mut guard = inner.write().await;

            if election_needed(&guard.registry, Utc::now(), election_timeout) {
                warn!("Leader missing or stale, triggering election");
                if run_election(&mut guard.registry).is_some() {
                    counters.elections_held.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Retry allocation of every pending task each tick, removing entries
    /// that find an agent.
    async fn queue_loop(
        inner: Arc<RwLock<Inner>>,
        counters: Arc<Counters>,
        running: Arc<AtomicBool>,
        interval: Duration,
    ) {
        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(interval).await;
            let mut guard = inner.write().await;
            let Inner {
                registry,
                allocator,
                pending,
            } = &mut *guard;

            pending.retain(|entry| match allocator.allocate(registry, &entry.task) {
                Some(agent_id) => {
                    counters.tasks_allocated.fetch_add(1, Ordering::Relaxed);
                    info!(task_id = %entry.task.id, agent = %agent_id, "Allocated queued task");
                    false
                }
                None => true,
            });
        }
    }
}

/// A leaderless registry with alive members, or a leader whose heartbeat is
/// older than the election timeout, warrants a new election.
fn election_needed(
    registry: &AgentRegistry,
    now: chrono::DateTime<Utc>,
    election_timeout: Duration,
) -> bool {
    match registry.alive_leader() {
        Some(leader) => {
            let age = now - leader.last_heartbeat;
            age.to_std().map(|a| a > election_timeout).unwrap_or(false)
        }
        None => registry.iter().any(|a| a.is_alive),
    }
}
