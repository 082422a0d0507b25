//! TaskExecutor - wraps agent execution with tracing and bookkeeping.

use crate::agent::{Agent, TaskOutcome};
use crate::experience::{Experience, ExperienceLog};
use chrono::Utc;
use common::{EventType, TaskSpec};
use coordination::DistributedCoordinator;
use monitoring::SystemMonitor;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Reward shaping constants. Cosmetic bookkeeping: nothing consumes the
/// reward to change agent behavior.
const REWARD_SUCCESS: f64 = 1.0;
const REWARD_FAILURE: f64 = -0.5;
const QUALITY_BONUS_WEIGHT: f64 = 0.5;
const FAST_COMPLETION_BONUS: f64 = 0.2;
const FAST_COMPLETION_MS: f64 = 1_000.0;

/// Executes tasks against agents, recording spans, experiences, and
/// completion reports.
pub struct TaskExecutor {
    monitor: Arc<SystemMonitor>,
    coordinator: Arc<DistributedCoordinator>,
    experiences: ExperienceLog,
}

impl TaskExecutor {
    pub fn new(monitor: Arc<SystemMonitor>, coordinator: Arc<DistributedCoordinator>) -> Self {
        Self {
            monitor,
            coordinator,
            experiences: ExperienceLog::new(),
        }
    }

    pub fn experiences(&self) -> &ExperienceLog {
        &self.experiences
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    /// Run one task on one agent.
    ///
    /// Opens a span for the execution, times the call, appends an experience
    /// record with the shaped reward, closes the span, and releases the
    /// agent's workload unit in the coordinator. Agent errors propagate
    /// after the bookkeeping is done.
    pub async fn execute(
        &self,
        agent: &dyn Agent,
        task: &TaskSpec,
    ) -> anyhow::Result<TaskOutcome> {
        let span = self.monitor.start_span(
            EventType::TaskStart,
            agent.id(),
            None,
            json!({"task_id": task.id}),
        );
        let started = Instant::now();

        let result = agent.process_task(task).await;

        let duration_ms = started.elapsed().as_secs_f64() * 1_000.0;
        let success = result.is_ok();
        let quality = result.as_ref().map(|o| o.quality).unwrap_or(0.0);
        let reward = shape_reward(success, quality, duration_ms);

        self.experiences.push(Experience {
            task_id: task.id,
            agent_id: agent.id().to_string(),
            reward,
            duration_ms,
            success,
            recorded_at: Utc::now(),
        });

        self.monitor.end_span(
            span.span_id,
            success,
            Some(json!({"reward": reward, "quality": quality})),
        );

        // The agent may be executing outside coordinator management, e.g.
        // in tests; an unknown id is not an execution failure.
        if let Err(e) = self
            .coordinator
            .report_task_completed(agent.id(), success)
            .await
        {
            debug!(agent = %agent.id(), error = %e, "Completion report skipped");
        }

        result
    }
}

/// Fixed base reward per outcome, plus bonuses for quality and fast
/// completion on success.
fn shape_reward(success: bool, quality: f64, duration_ms: f64) -> f64 {
    if !success {
        return REWARD_FAILURE;
    }
    let mut reward = REWARD_SUCCESS + QUALITY_BONUS_WEIGHT * quality.clamp(0.0, 1.0);
    if duration_ms < FAST_COMPLETION_MS {
        reward += FAST_COMPLETION_BONUS;
    }
    reward
}
