//! Health checks and threshold alerts.
//!
//! Checks are caller-registered boolean callables. Breaches of the static
//! error-rate and duration thresholds append `Alert` records to an in-memory
//! list; there is no delivery sink.

use crate::monitor::SystemStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, RwLock};
use tracing::warn;

/// A registered health check. Errors are treated as an unhealthy result.
pub type HealthCheckFn = Box<dyn Fn() -> anyhow::Result<bool> + Send + Sync>;

/// Static thresholds compared against aggregate span statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthThresholds {
    pub max_error_rate: f64,
    pub max_avg_duration_ms: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_error_rate: 0.1,
            max_avg_duration_ms: 10_000.0,
        }
    }
}

/// A threshold breach or failed check, accumulated in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub name: String,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub raised_at: DateTime<Utc>,
}

/// Outcome of one registered check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

/// Result of a full health evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub checks: Vec<CheckResult>,
    pub error_rate: f64,
    pub avg_duration_ms: f64,
}

/// Runs registered checks and threshold comparisons.
#[derive(Default)]
pub struct HealthMonitor {
    checks: RwLock<Vec<(String, HealthCheckFn)>>,
    alerts: Mutex<Vec<Alert>>,
    thresholds: HealthThresholds,
}

impl HealthMonitor {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self {
            checks: RwLock::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            thresholds,
        }
    }

    pub fn register_check(
        &self,
        name: &str,
        check: impl Fn() -> anyhow::Result<bool> + Send + Sync + 'static,
    ) {
        self.checks
            .write()
            .expect("health check lock poisoned")
            .push((name.to_string(), Box::new(check)));
    }

    /// Run all checks and compare aggregate stats against thresholds.
    pub fn evaluate(&self, stats: &SystemStats) -> HealthReport {
        let mut results = Vec::new();
        let mut healthy = true;

        for (name, check) in self.checks.read().expect("health check lock poisoned").iter() {
            let passed = match check() {
                Ok(ok) => ok,
                Err(e) => {
                    warn!(check = %name, error = %e, "Health check raised, treating as unhealthy");
                    false
                }
            };
            if !passed {
                healthy = false;
                self.raise(name, &format!("Health check '{name}' failed"), 0.0, 0.0);
            }
            results.push(CheckResult {
                name: name.clone(),
                passed,
            });
        }

        let error_rate = 1.0 - stats.success_rate;
        if stats.total_tasks > 0 && error_rate > self.thresholds.max_error_rate {
            healthy = false;
            self.raise(
                "error_rate",
                &format!("Error rate {error_rate:.3} above threshold"),
                error_rate,
                self.thresholds.max_error_rate,
            );
        }
        if stats.total_tasks > 0 && stats.avg_duration_ms > self.thresholds.max_avg_duration_ms {
            healthy = false;
            self.raise(
                "avg_duration_ms",
                &format!("Average duration {:.1}ms above threshold", stats.avg_duration_ms),
                stats.avg_duration_ms,
                self.thresholds.max_avg_duration_ms,
            );
        }

        HealthReport {
            healthy,
            checks: results,
            error_rate,
            avg_duration_ms: stats.avg_duration_ms,
        }
    }

    /// All alerts accumulated so far.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().expect("alert lock poisoned").clone()
    }

    fn raise(&self, name: &str, message: &str, value: f64, threshold: f64) {
        warn!(alert = %name, %message, "Raising alert");
        self.alerts.lock().expect("alert lock poisoned").push(Alert {
            name: name.to_string(),
            message: message.to_string(),
            value,
            threshold,
            raised_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: u64, success_rate: f64, avg_ms: f64) -> SystemStats {
        SystemStats {
            total_tasks: total,
            success_rate,
            avg_duration_ms: avg_ms,
            active_agents: 1,
        }
    }

    #[test]
    fn test_healthy_when_all_pass() {
        let monitor = HealthMonitor::new(HealthThresholds::default());
        monitor.register_check("db", || Ok(true));
        let report = monitor.evaluate(&stats(100, 0.99, 50.0));
        assert!(report.healthy);
        assert!(monitor.alerts().is_empty());
    }

    #[test]
    fn test_failing_check_marks_unhealthy() {
        let monitor = HealthMonitor::new(HealthThresholds::default());
        monitor.register_check("queue", || Ok(false));
        let report = monitor.evaluate(&stats(0, 1.0, 0.0));
        assert!(!report.healthy);
        assert_eq!(monitor.alerts().len(), 1);
    }

    #[test]
    fn test_erroring_check_treated_as_unhealthy() {
        let monitor = HealthMonitor::new(HealthThresholds::default());
        monitor.register_check("flaky", || anyhow::bail!("connection refused"));
        let report = monitor.evaluate(&stats(0, 1.0, 0.0));
        assert!(!report.healthy);
        assert!(!report.checks[0].passed);
    }

    #[test]
    fn test_error_rate_threshold_alert() {
        let monitor = HealthMonitor::new(HealthThresholds::default());
        let report = monitor.evaluate(&stats(100, 0.8, 50.0));
        assert!(!report.healthy);
        let alerts = monitor.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].name, "error_rate");
        assert!((alerts[0].value - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_duration_threshold_alert() {
        let monitor = HealthMonitor::new(HealthThresholds::default());
        let report = monitor.evaluate(&stats(10, 1.0, 15_000.0));
        assert!(!report.healthy);
        assert_eq!(monitor.alerts()[0].name, "avg_duration_ms");
    }

    #[test]
    fn test_thresholds_skipped_without_tasks() {
        let monitor = HealthMonitor::new(HealthThresholds::default());
        // success_rate defaults to 0 with no data; must not alert
        let report = monitor.evaluate(&stats(0, 0.0, 0.0));
        assert!(report.healthy);
    }
}
