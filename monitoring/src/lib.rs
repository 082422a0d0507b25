//! Observability layer: span traces, metrics, and health checks.
//!
//! `SystemMonitor` tracks span-based traces and per-agent performance
//! counters, records named metrics into bounded ring buffers, evaluates
//! registered health checks against static thresholds, and evicts data past
//! a retention window. Everything lives in memory; alerts accumulate but are
//! not delivered anywhere.

pub mod health;
pub mod metrics;
pub mod monitor;

pub use health::{Alert, HealthMonitor, HealthReport, HealthThresholds};
pub use metrics::{MetricPoint, MetricStats, MetricsRecorder};
pub use monitor::{AgentPerformance, SpanHandle, SystemMonitor, SystemStats};

// Re-export common trace types for convenience
pub use common::{EventType, TraceEvent};
