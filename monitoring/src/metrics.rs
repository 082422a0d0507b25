//! Named metric series with bounded retention and windowed statistics.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Distribution, Max, Min, OrderStatistics};
use std::collections::{HashMap, VecDeque};

/// Ring-buffer bound per metric name.
const MAX_POINTS_PER_METRIC: usize = 10_000;

/// One recorded observation of a named metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub tags: HashMap<String, String>,
}

/// Aggregate statistics over a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Bounded in-memory recorder for named metric series.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    series: DashMap<String, VecDeque<MetricPoint>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            series: DashMap::new(),
        }
    }

    /// Append an observation, evicting the oldest point once the per-name
    /// buffer is full.
    pub fn record(&self, name: &str, value: f64, tags: HashMap<String, String>) {
        let mut buffer = self.series.entry(name.to_string()).or_default();
        if buffer.len() >= MAX_POINTS_PER_METRIC {
            buffer.pop_front();
        }
        buffer.push_back(MetricPoint {
            value,
            recorded_at: Utc::now(),
            tags,
        });
    }

    /// Statistics over the points recorded within the last `window_minutes`.
    /// Returns `None` for unknown names or empty windows.
    pub fn stats(&self, name: &str, window_minutes: i64) -> Option<MetricStats> {
        let cutoff = Utc::now() - Duration::minutes(window_minutes);
        let values: Vec<f64> = self
            .series
            .get(name)?
            .iter()
            .filter(|p| p.recorded_at >= cutoff)
            .map(|p| p.value)
            .collect();

        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mut data = statrs::statistics::Data::new(values);
        Some(MetricStats {
            count,
            mean: data.mean().unwrap_or(0.0),
            median: data.median(),
            std_dev: data.std_dev().unwrap_or(0.0),
            min: data.min(),
            max: data.max(),
            p95: data.percentile(95),
            p99: data.percentile(99),
        })
    }

    /// Number of points currently buffered for a metric.
    pub fn len(&self, name: &str) -> usize {
        self.series.get(name).map(|b| b.len()).unwrap_or(0)
    }

    /// Drop every point recorded before the cutoff.
    pub fn cleanup(&self, cutoff: DateTime<Utc>) {
        for mut entry in self.series.iter_mut() {
            entry.value_mut().retain(|p| p.recorded_at >= cutoff);
        }
        self.series.retain(|_, buffer| !buffer.is_empty());
    }
}
