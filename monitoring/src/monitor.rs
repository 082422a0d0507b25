//! SystemMonitor - span traces and per-agent performance counters.

use crate::health::{HealthMonitor, HealthReport, HealthThresholds};
use crate::metrics::{MetricStats, MetricsRecorder};
use chrono::{DateTime, Duration, Utc};
use common::{EventType, TraceEvent};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies an open span. Pass back to `end_span`, or as the parent of a
/// child span to keep it in the same trace.
#[derive(Debug, Clone, Copy)]
pub struct SpanHandle {
    pub trace_id: Uuid,
    pub span_id: Uuid,
}

/// Running per-agent counters, updated when spans close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_id: String,
    pub task_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_duration_ms: f64,
    pub avg_duration_ms: f64,
    pub last_active: DateTime<Utc>,
}

impl AgentPerformance {
    fn new(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            task_count: 0,
            success_count: 0,
            failure_count: 0,
            total_duration_ms: 0.0,
            avg_duration_ms: 0.0,
            last_active: Utc::now(),
        }
    }
}

/// Aggregate view over all closed spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_tasks: u64,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
    pub active_agents: usize,
}

/// In-memory observability hub: traces, metrics, health.
pub struct SystemMonitor {
    traces: DashMap<Uuid, Vec<TraceEvent>>,
    /// Open span id -> owning trace id. Entries are consumed by `end_span`.
    open_spans: DashMap<Uuid, Uuid>,
    agent_metrics: DashMap<String, AgentPerformance>,
    metrics: MetricsRecorder,
    health: HealthMonitor,
    retention: Duration,
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(24)
    }
}

impl SystemMonitor {
    pub fn new(retention_hours: i64) -> Self {
        Self {
            traces: DashMap::new(),
            open_spans: DashMap::new(),
            agent_metrics: DashMap::new(),
            metrics: MetricsRecorder::new(),
            health: HealthMonitor::new(HealthThresholds::default()),
            retention: Duration::hours(retention_hours),
        }
    }

    pub fn with_thresholds(retention_hours: i64, thresholds: HealthThresholds) -> Self {
        Self {
            health: HealthMonitor::new(thresholds),
            ..Self::new(retention_hours)
        }
    }

    /// Open a span. With a parent handle, the span joins the parent's trace;
    /// otherwise it starts a new trace.
    pub fn start_span(
        &self,
        event_type: EventType,
        agent_id: &str,
        parent: Option<&SpanHandle>,
        metadata: serde_json::Value,
    ) -> SpanHandle {
        let span_id = Uuid::new_v4();
        let (trace_id, parent_span_id) = match parent {
            Some(p) => (p.trace_id, Some(p.span_id)),
            None => (Uuid::new_v4(), None),
        };

        let event = TraceEvent {
            trace_id,
            span_id,
            parent_span_id,
            event_type,
            agent_id: agent_id.to_string(),
            started_at: Utc::now(),
            duration_ms: None,
            metadata,
            success: None,
        };
        self.traces.entry(trace_id).or_default().push(event);
        self.open_spans.insert(span_id, trace_id);

        SpanHandle { trace_id, span_id }
    }

    /// Close a span, filling its duration and success flag and updating the
    /// owning agent's counters. Unknown or already-closed span ids are
    /// logged and ignored.
    pub fn end_span(&self, span_id: Uuid, success: bool, metadata: Option<serde_json::Value>) {
        let Some((_, trace_id)) = self.open_spans.remove(&span_id) else {
            tracing::warn!(%span_id, "end_span for unknown span, ignoring");
            return;
        };

        let now = Utc::now();
        let mut agent_update: Option<(String, f64)> = None;

        if let Some(mut events) = self.traces.get_mut(&trace_id) {
            if let Some(event) = events.iter_mut().find(|e| e.span_id == span_id) {
                let elapsed = (now - event.started_at)
                    .num_microseconds()
                    .unwrap_or(0)
                    .max(0) as f64
                    / 1_000.0;
                event.duration_ms = Some(elapsed);
                event.success = Some(success);
                if let Some(extra) = metadata {
                    merge_metadata(&mut event.metadata, extra);
                }
                agent_update = Some((event.agent_id.clone(), elapsed));
            }
        }

        if let Some((agent_id, duration_ms)) = agent_update {
            let mut perf = self
                .agent_metrics
                .entry(agent_id.clone())
                .or_insert_with(|| AgentPerformance::new(&agent_id));
            perf.task_count += 1;
            if success {
                perf.success_count += 1;
            } else {
                perf.failure_count += 1;
            }
            perf.total_duration_ms += duration_ms;
            perf.avg_duration_ms = perf.total_duration_ms / perf.task_count as f64;
            perf.last_active = now;
        }
    }

    /// All events of one trace, in creation order.
    pub fn get_trace(&self, trace_id: Uuid) -> Option<Vec<TraceEvent>> {
        self.traces.get(&trace_id).map(|events| events.clone())
    }

    /// Serializable export of one trace, or every trace.
    pub fn export_traces(&self, trace_id: Option<Uuid>) -> Vec<TraceEvent> {
        match trace_id {
            Some(id) => self.get_trace(id).unwrap_or_default(),
            None => self
                .traces
                .iter()
                .flat_map(|entry| entry.value().clone())
                .collect(),
        }
    }

    pub fn record_metric(&self, name: &str, value: f64, tags: HashMap<String, String>) {
        self.metrics.record(name, value, tags);
    }

    pub fn get_metric_stats(&self, name: &str, window_minutes: i64) -> Option<MetricStats> {
        self.metrics.stats(name, window_minutes)
    }

    pub fn get_agent_metrics(&self, agent_id: &str) -> Option<AgentPerformance> {
        self.agent_metrics.get(agent_id).map(|p| p.clone())
    }

    /// Aggregate success rate and duration across all agents.
    pub fn get_system_stats(&self) -> SystemStats {
        let mut total_tasks = 0u64;
        let mut success = 0u64;
        let mut total_duration = 0.0f64;
        for entry in self.agent_metrics.iter() {
            total_tasks += entry.task_count;
            success += entry.success_count;
            total_duration += entry.total_duration_ms;
        }
        SystemStats {
            total_tasks,
            success_rate: if total_tasks > 0 {
                success as f64 / total_tasks as f64
            } else {
                0.0
            },
            avg_duration_ms: if total_tasks > 0 {
                total_duration / total_tasks as f64
            } else {
                0.0
            },
            active_agents: self.agent_metrics.len(),
        }
    }

    pub fn register_health_check(
        &self,
        name: &str,
        check: impl Fn() -> anyhow::Result<bool> + Send + Sync + 'static,
    ) {
        self.health.register_check(name, check);
    }

    /// Run registered checks plus threshold comparisons over current stats.
    pub fn check_health(&self) -> HealthReport {
        self.health.evaluate(&self.get_system_stats())
    }

    pub fn alerts(&self) -> Vec<crate::health::Alert> {
        self.health.alerts()
    }

    /// Evict trace events and metric points older than the retention window.
    /// Open spans that aged out lose their index entries too.
    pub fn cleanup_old_data(&self) {
        let cutoff = Utc::now() - self.retention;

        for mut entry in self.traces.iter_mut() {
            let events = entry.value_mut();
            for event in events.iter() {
                if event.started_at < cutoff {
                    self.open_spans.remove(&event.span_id);
                }
            }
            events.retain(|e| e.started_at >= cutoff);
        }
        self.traces.retain(|_, events| !events.is_empty());

        self.metrics.cleanup(cutoff);
    }
}

/// Merge `extra` into `base` key-by-key when both are objects; otherwise
/// replace `base` entirely.
fn merge_metadata(base: &mut serde_json::Value, extra: serde_json::Value) {
    match (base.as_object_mut(), extra) {
        (Some(base_map), serde_json::Value::Object(extra_map)) => {
            for (k, v) in extra_map {
                base_map.insert(k, v);
            }
        }
        (_, extra) => *base = extra,
    }
}
