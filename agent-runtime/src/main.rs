use agent_runtime::{Agent, TaskExecutor, TaskOutcome};
use anyhow::Result;
use async_trait::async_trait;
use common::TaskSpec;
use coordination::{load_config, CoordinatorConfig, DistributedCoordinator};
use monitoring::SystemMonitor;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt;

struct EchoAgent {
    id: String,
    capabilities: HashSet<String>,
}

#[async_trait]
impl Agent for EchoAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> HashSet<String> {
        self.capabilities.clone()
    }

    async fn process_task(&self, task: &TaskSpec) -> Result<TaskOutcome> {
        Ok(TaskOutcome {
            data: json!({"echo": task.payload}),
            quality: 0.9,
        })
    }
}

fn caps(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    fmt().with_max_level(Level::INFO).init();

    // Optional TOML config path as first argument
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => CoordinatorConfig::default(),
    };

    info!("Coordination System Example");
    info!("===========================");

    let coordinator = Arc::new(DistributedCoordinator::new(config));
    let monitor = Arc::new(SystemMonitor::new(24));
    coordinator.start();

    // Register a small fleet; the first registration elects a leader and
    // the higher-priority planner takes over on the explicit election.
    coordinator.register_agent("indexer", caps(&["index", "search"]), 2).await?;
    coordinator.register_agent("planner", caps(&["plan", "search"]), 5).await?;
    coordinator.register_agent("runner", caps(&["execute"]), 1).await?;
    coordinator.trigger_election().await;

    let executor = TaskExecutor::new(monitor.clone(), coordinator.clone());
    let agents: Vec<EchoAgent> = [
        ("indexer", caps(&["index", "search"])),
        ("planner", caps(&["plan", "search"])),
        ("runner", caps(&["execute"])),
    ]
    .into_iter()
    .map(|(id, capabilities)| EchoAgent {
        id: id.to_string(),
        capabilities,
    })
    .collect();

    // Submit a few tasks and execute them on whichever agent wins
    for required in [&["search"][..], &["execute"], &["plan", "search"]] {
        let task = TaskSpec::new(json!({"kind": "demo"}), caps(required));
        match coordinator.submit_task(task.clone()).await {
            Some(agent_id) => {
                info!(agent = %agent_id, task = %task.id, "Task allocated");
                let agent = agents
                    .iter()
                    .find(|a| a.id == agent_id)
                    .ok_or_else(|| anyhow::anyhow!("allocated to unknown agent {agent_id}"))?;
                let outcome = executor.execute(agent, &task).await?;
                info!(quality = outcome.quality, "Task finished");
            }
            None => info!(task = %task.id, "Task queued, no capable agent yet"),
        }
    }

    let state = coordinator.get_coordination_state().await;
    info!("Coordination state:\n{}", serde_json::to_string_pretty(&state)?);

    let health = monitor.check_health();
    info!(healthy = health.healthy, "Health check complete");
    info!(
        total_reward = executor.experiences().total_reward(),
        experiences = executor.experiences().len(),
        "Experience log"
    );

    coordinator.shutdown();
    Ok(())
}
