//! Agent trait - the contract between task processors and the runtime.

use async_trait::async_trait;
use common::TaskSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Result of processing one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub data: serde_json::Value,
    /// Self-reported quality score in [0, 1], feeds the reward bonus.
    pub quality: f64,
}

/// A task processor managed by the coordinator.
///
/// Implementations declare an id and a capability set; the coordinator uses
/// the capabilities to filter eligibility, the runtime uses the id to key
/// spans and experience records.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &str;

    fn capabilities(&self) -> HashSet<String>;

    /// Process a single task. Errors count as failed executions.
    async fn process_task(&self, task: &TaskSpec) -> anyhow::Result<TaskOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn id(&self) -> &str {
            "echo"
        }

        fn capabilities(&self) -> HashSet<String> {
            ["echo".to_string()].into_iter().collect()
        }

        async fn process_task(&self, task: &TaskSpec) -> anyhow::Result<TaskOutcome> {
            Ok(TaskOutcome {
                data: task.payload.clone(),
                quality: 1.0,
            })
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let agent: Box<dyn Agent> = Box::new(EchoAgent);
        let task = TaskSpec::new(serde_json::json!({"n": 1}), HashSet::new());
        let outcome = agent.process_task(&task).await.unwrap();
        assert_eq!(outcome.data["n"], 1);
    }
}
