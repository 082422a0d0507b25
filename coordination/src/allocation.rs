//! Task allocation strategies
//!
//! All strategies share the same eligibility filter: the agent must be alive
//! and its capabilities must cover the task's requirements. Dispatch beyond
//! that point is strategy-specific. The winner's workload is incremented
//! before the engine returns, under the same lock the caller already holds.

use crate::registry::AgentRegistry;
use common::{CoordinationStrategy, TaskSpec};
use tracing::debug;

/// Weight applied per capability an agent holds beyond what the task needs.
/// Keeps auction bids distinct from pure load: a busy specialist can still
/// outbid an idle generalist when the load gap is small.
const SURPLUS_CAPABILITY_WEIGHT: f64 = 0.1;

/// Stateful strategy dispatcher. Holds the round-robin cursor.
#[derive(Debug)]
pub struct AllocationEngine {
    strategy: CoordinationStrategy,
    round_robin_cursor: usize,
}

impl AllocationEngine {
    pub fn new(strategy: CoordinationStrategy) -> Self {
        Self {
            strategy,
            round_robin_cursor: 0,
        }
    }

    pub fn strategy(&self) -> CoordinationStrategy {
        self.strategy
    }

    /// Pick an agent for the task, incrementing its workload on success.
    ///
    /// Returns `None` when no alive agent covers the required capabilities.
    pub fn allocate(&mut self, registry: &mut AgentRegistry, task: &TaskSpec) -> Option<String> {
        let winner = {
            let eligible = registry.eligible(&task.required_capabilities);
            if eligible.is_empty() {
                return None;
            }
            match self.strategy {
                CoordinationStrategy::RoundRobin => {
                    // Eligible list is sorted by id, so the cursor walks a
                    // deterministic ring.
                    let idx = self.round_robin_cursor % eligible.len();
                    self.round_robin_cursor = self.round_robin_cursor.wrapping_add(1);
                    eligible[idx].agent_id.clone()
                }
                CoordinationStrategy::LoadBased => eligible
                    .iter()
                    .min_by_key(|a| (a.workload, a.agent_id.as_str()))
                    .map(|a| a.agent_id.clone())?,
                CoordinationStrategy::CapabilityBased => eligible
                    .iter()
                    .max_by(|a, b| {
                        a.capabilities
                            .len()
                            .cmp(&b.capabilities.len())
                            // Prefer the lexicographically smaller id on ties
                            .then_with(|| b.agent_id.cmp(&a.agent_id))
                    })
                    .map(|a| a.agent_id.clone())?,
                CoordinationStrategy::AuctionBased => {
                    // Sealed-bid auction: each agent bids its workload plus a
                    // penalty for capabilities the task does not need. Lowest
                    // bid wins.
                    let mut best: Option<(f64, &str)> = None;
                    for agent in &eligible {
                        let surplus = agent
                            .capabilities
                            .difference(&task.required_capabilities)
                            .count();
                        let bid =
                            f64::from(agent.workload) + surplus as f64 * SURPLUS_CAPABILITY_WEIGHT;
                        let better = match best {
                            None => true,
                            Some((best_bid, best_id)) => {
                                bid < best_bid
                                    || (bid == best_bid && agent.agent_id.as_str() < best_id)
                            }
                        };
                        if better {
                            best = Some((bid, agent.agent_id.as_str()));
                        }
                    }
                    best.map(|(_, id)| id.to_string())?
                }
            }
        };

        registry.increment_workload(&winner);
        debug!(task_id = %task.id, agent = %winner, strategy = ?self.strategy, "Allocated task");
        Some(winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn caps(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn task(required: &[&str]) -> TaskSpec {
        TaskSpec::new(serde_json::json!({}), caps(required))
    }

    #[test]
    fn test_no_capable_agent_returns_none() {
        let mut registry = AgentRegistry::new();
        registry.register("a", caps(&["x"]), 0).unwrap();
        let mut engine = AllocationEngine::new(CoordinationStrategy::LoadBased);
        assert!(engine.allocate(&mut registry, &task(&["y"])).is_none());
    }

    #[test]
    fn test_capability_subset_enforced() {
        let mut registry = AgentRegistry::new();
        registry.register("narrow", caps(&["x"]), 0).unwrap();
        registry.register("wide", caps(&["x", "y"]), 0).unwrap();
        for strategy in [
            CoordinationStrategy::RoundRobin,
            CoordinationStrategy::LoadBased,
            CoordinationStrategy::CapabilityBased,
            CoordinationStrategy::AuctionBased,
        ] {
            let mut engine = AllocationEngine::new(strategy);
            let winner = engine.allocate(&mut registry, &task(&["x", "y"])).unwrap();
            assert_eq!(winner, "wide", "strategy {strategy:?}");
        }
    }

    #[test]
    fn test_round_robin_visits_each_agent_once() {
        let mut registry = AgentRegistry::new();
        for id in ["a", "b", "c"] {
            registry.register(id, caps(&["x"]), 0).unwrap();
        }
        let mut engine = AllocationEngine::new(CoordinationStrategy::RoundRobin);
        let mut winners = Vec::new();
        for _ in 0..3 {
            winners.push(engine.allocate(&mut registry, &task(&["x"])).unwrap());
        }
        winners.sort();
        assert_eq!(winners, vec!["a", "b", "c"]);
        for id in ["a", "b", "c"] {
            assert_eq!(registry.get(id).unwrap().workload, 1);
        }
    }

    #[test]
    fn test_load_based_picks_least_loaded() {
        let mut registry = AgentRegistry::new();
        registry.register("busy", caps(&["x"]), 0).unwrap();
        registry.register("idle", caps(&["x"]), 0).unwrap();
        registry.increment_workload("busy");
        registry.increment_workload("busy");

        let mut engine = AllocationEngine::new(CoordinationStrategy::LoadBased);
        assert_eq!(engine.allocate(&mut registry, &task(&["x"])).unwrap(), "idle");
    }

    #[test]
    fn test_capability_based_prefers_broadest() {
        let mut registry = AgentRegistry::new();
        registry.register("generalist", caps(&["x", "y", "z"]), 0).unwrap();
        registry.register("specialist", caps(&["x"]), 0).unwrap();

        let mut engine = AllocationEngine::new(CoordinationStrategy::CapabilityBased);
        assert_eq!(
            engine.allocate(&mut registry, &task(&["x"])).unwrap(),
            "generalist"
        );
    }

    #[test]
    fn test_auction_penalizes_surplus_capabilities() {
        let mut registry = AgentRegistry::new();
        registry.register("generalist", caps(&["x", "y", "z"]), 0).unwrap();
        registry.register("specialist", caps(&["x"]), 0).unwrap();

        // Load-based would tie here and fall to id ordering; the auction's
        // surplus penalty makes the specialist the strict winner.
        let mut engine = AllocationEngine::new(CoordinationStrategy::AuctionBased);
        assert_eq!(
            engine.allocate(&mut registry, &task(&["x"])).unwrap(),
            "specialist"
        );
    }

    #[test]
    fn test_auction_load_dominates_small_surplus() {
        let mut registry = AgentRegistry::new();
        registry.register("generalist", caps(&["x", "y"]), 0).unwrap();
        registry.register("specialist", caps(&["x"]), 0).unwrap();
        // specialist bid: 2 + 0.0 = 2.0; generalist bid: 0 + 0.1 = 0.1
        registry.increment_workload("specialist");
        registry.increment_workload("specialist");

        let mut engine = AllocationEngine::new(CoordinationStrategy::AuctionBased);
        assert_eq!(
            engine.allocate(&mut registry, &task(&["x"])).unwrap(),
            "generalist"
        );
    }

    #[test]
    fn test_workload_incremented_on_allocation() {
        let mut registry = AgentRegistry::new();
        registry.register("a", caps(&["x"]), 0).unwrap();
        let mut engine = AllocationEngine::new(CoordinationStrategy::LoadBased);
        for expected in 1..=3 {
            engine.allocate(&mut registry, &task(&["x"])).unwrap();
            assert_eq!(registry.get("a").unwrap().workload, expected);
        }
    }
}
