//! Agent registry - the owned aggregate behind all coordination state
//!
//! Every mutation of per-agent state goes through this type. The coordinator
//! wraps it in a single `RwLock`, so elections, allocation, and heartbeat
//! propagation are atomic with respect to each other.

use chrono::{DateTime, Utc};
use common::{AgentRole, AgentSnapshot, CoordinationError, CoordinationState};
use std::collections::{HashMap, HashSet};

/// Registry of all agents known to the coordinator.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, CoordinationState>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Insert a new agent as a follower.
    ///
    /// Duplicate ids are rejected rather than silently overwritten, so a
    /// re-registering agent cannot clobber live workload or role state.
    pub fn register(
        &mut self,
        agent_id: &str,
        capabilities: HashSet<String>,
        priority: i32,
    ) -> Result<(), CoordinationError> {
        if self.agents.contains_key(agent_id) {
            return Err(CoordinationError::DuplicateAgent(agent_id.to_string()));
        }
        self.agents.insert(
            agent_id.to_string(),
            CoordinationState::new(agent_id, capabilities, priority),
        );
        Ok(())
    }

    pub fn get(&self, agent_id: &str) -> Option<&CoordinationState> {
        self.agents.get(agent_id)
    }

    pub fn get_mut(&mut self, agent_id: &str) -> Option<&mut CoordinationState> {
        self.agents.get_mut(agent_id)
    }

    pub fn remove(&mut self, agent_id: &str) -> Option<CoordinationState> {
        self.agents.remove(agent_id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoordinationState> {
        self.agents.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CoordinationState> {
        self.agents.values_mut()
    }

    /// Mark an agent dead. Returns whether it was the current leader.
    pub fn mark_dead(&mut self, agent_id: &str) -> Result<bool, CoordinationError> {
        let state = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| CoordinationError::UnknownAgent(agent_id.to_string()))?;
        state.is_alive = false;
        Ok(state.role == AgentRole::Leader)
    }

    /// The agent currently holding leadership, if it is still alive.
    pub fn alive_leader(&self) -> Option<&CoordinationState> {
        self.agents
            .values()
            .find(|a| a.role == AgentRole::Leader && a.is_alive)
    }

    /// Alive agents whose capabilities cover the requirement, sorted by id
    /// so strategy dispatch is deterministic.
    pub fn eligible(&self, required: &HashSet<String>) -> Vec<&CoordinationState> {
        let mut agents: Vec<&CoordinationState> = self
            .agents
            .values()
            .filter(|a| a.is_alive && required.is_subset(&a.capabilities))
            .collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        agents
    }

    pub fn increment_workload(&mut self, agent_id: &str) {
        if let Some(state) = self.agents.get_mut(agent_id) {
            state.workload += 1;
        }
    }

    /// Decrement workload, floored at zero.
    pub fn decrement_workload(&mut self, agent_id: &str) -> Result<(), CoordinationError> {
        let state = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| CoordinationError::UnknownAgent(agent_id.to_string()))?;
        state.workload = state.workload.saturating_sub(1);
        Ok(())
    }

    /// Refresh heartbeats from the leader.
    ///
    /// The leader's own timestamp updates and, in lieu of a transport, every
    /// alive follower's `last_heartbeat` and `current_leader` are written
    /// directly. Returns the leader id, or `None` when there is no alive
    /// leader to beat.
    pub fn propagate_heartbeats(&mut self, now: DateTime<Utc>) -> Option<String> {
        let leader_id = self.alive_leader()?.agent_id.clone();
        for state in self.agents.values_mut() {
            if !state.is_alive {
                continue;
            }
            state.last_heartbeat = now;
            state.current_leader = Some(leader_id.clone());
        }
        Some(leader_id)
    }

    /// Snapshot views of every agent, sorted by id.
    pub fn snapshot_agents(&self) -> Vec<AgentSnapshot> {
        let mut agents: Vec<AgentSnapshot> = self.agents.values().map(AgentSnapshot::from).collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        agents
    }

    /// Highest term seen across all agents.
    pub fn max_term(&self) -> u64 {
        self.agents.values().map(|a| a.term).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = AgentRegistry::new();
        registry.register("a", caps(&["x"]), 1).unwrap();
        let err = registry.register("a", caps(&["y"]), 9).unwrap_err();
        assert!(matches!(err, CoordinationError::DuplicateAgent(_)));
        // Original state untouched
        assert_eq!(registry.get("a").unwrap().priority, 1);
    }

    #[test]
    fn test_eligible_filters_capabilities_and_liveness() {
        let mut registry = AgentRegistry::new();
        registry.register("a", caps(&["x"]), 0).unwrap();
        registry.register("b", caps(&["x", "y"]), 0).unwrap();
        registry.register("c", caps(&["y"]), 0).unwrap();
        registry.mark_dead("b").unwrap();

        let eligible = registry.eligible(&caps(&["y"]));
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].agent_id, "c");
    }

    #[test]
    fn test_eligible_sorted_by_id() {
        let mut registry = AgentRegistry::new();
        registry.register("zeta", caps(&[]), 0).unwrap();
        registry.register("alpha", caps(&[]), 0).unwrap();
        registry.register("mid", caps(&[]), 0).unwrap();

        let ids: Vec<&str> = registry
            .eligible(&HashSet::new())
            .iter()
            .map(|a| a.agent_id.as_str())
            .collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_workload_floor_at_zero() {
        let mut registry = AgentRegistry::new();
        registry.register("a", caps(&[]), 0).unwrap();
        registry.decrement_workload("a").unwrap();
        assert_eq!(registry.get("a").unwrap().workload, 0);
        registry.increment_workload("a");
        assert_eq!(registry.get("a").unwrap().workload, 1);
    }

    #[test]
    fn test_decrement_unknown_agent() {
        let mut registry = AgentRegistry::new();
        assert!(matches!(
            registry.decrement_workload("ghost"),
            Err(CoordinationError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_propagate_heartbeats_without_leader() {
        let mut registry = AgentRegistry::new();
        registry.register("a", caps(&[]), 0).unwrap();
        assert!(registry.propagate_heartbeats(Utc::now()).is_none());
    }
}
