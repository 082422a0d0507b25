//! In-memory experience records produced by task executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// Bound on retained experience records.
const MAX_EXPERIENCES: usize = 10_000;

/// One execution's outcome, with its synthetic reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub task_id: Uuid,
    pub agent_id: String,
    pub reward: f64,
    pub duration_ms: f64,
    pub success: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Bounded log of experiences. An export surface, not a training loop.
#[derive(Debug, Default)]
pub struct ExperienceLog {
    entries: Mutex<VecDeque<Experience>>,
}

impl ExperienceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, experience: Experience) {
        let mut entries = self.entries.lock().expect("experience lock poisoned");
        if entries.len() >= MAX_EXPERIENCES {
            entries.pop_front();
        }
        entries.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("experience lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent `n` experiences, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Experience> {
        let entries = self.entries.lock().expect("experience lock poisoned");
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn total_reward(&self) -> f64 {
        self.entries
            .lock()
            .expect("experience lock poisoned")
            .iter()
            .map(|e| e.reward)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experience(reward: f64) -> Experience {
        Experience {
            task_id: Uuid::new_v4(),
            agent_id: "a".to_string(),
            reward,
            duration_ms: 1.0,
            success: reward > 0.0,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_push_and_totals() {
        let log = ExperienceLog::new();
        log.push(experience(1.0));
        log.push(experience(-0.5));
        assert_eq!(log.len(), 2);
        assert!((log.total_reward() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_recent_returns_tail() {
        let log = ExperienceLog::new();
        for i in 0..5 {
            log.push(experience(i as f64));
        }
        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].reward, 3.0);
        assert_eq!(recent[1].reward, 4.0);
    }

    #[test]
    fn test_bounded() {
        let log = ExperienceLog::new();
        for _ in 0..(MAX_EXPERIENCES + 10) {
            log.push(experience(0.1));
        }
        assert_eq!(log.len(), MAX_EXPERIENCES);
    }
}
