//! Bully-style leader election
//!
//! The election is unconditional and single-step: no quorum, no vote
//! exchange. The highest `(priority, agent_id)` pair among alive agents
//! claims leadership. Callers run it under the registry's write lock, which
//! serializes concurrent election attempts.

use crate::registry::AgentRegistry;
use common::AgentRole;
use tracing::{info, warn};

/// Run one election over the registry.
///
/// Demotes every agent to follower, bumps the term past the highest seen,
/// and promotes the alive agent with the highest `(priority, agent_id)`.
/// Returns the new leader's id, or `None` when no alive agent exists (the
/// system stays leaderless until membership changes).
pub fn run_election(registry: &mut AgentRegistry) -> Option<String> {
    let winner = registry
        .iter()
        .filter(|a| a.is_alive)
        .max_by(|a, b| {
            (a.priority, a.agent_id.as_str()).cmp(&(b.priority, b.agent_id.as_str()))
        })
        .map(|a| a.agent_id.clone());

    let Some(winner_id) = winner else {
        warn!("Election aborted: no alive agents");
        return None;
    };

    let next_term = registry.max_term() + 1;

    for state in registry.iter_mut() {
        state.role = AgentRole::Follower;
        state.voted_for = None;
        state.term = next_term;
        if state.is_alive {
            state.current_leader = Some(winner_id.clone());
        }
    }
    if let Some(leader) = registry.get_mut(&winner_id) {
        leader.role = AgentRole::Leader;
        leader.last_heartbeat = chrono::Utc::now();
    }

    info!(leader = %winner_id, term = next_term, "Elected new leader");
    Some(winner_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn registry_with(agents: &[(&str, i32)]) -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        for (id, priority) in agents {
            registry.register(id, HashSet::new(), *priority).unwrap();
        }
        registry
    }

    #[test]
    fn test_highest_priority_wins() {
        let mut registry = registry_with(&[("a", 1), ("b", 5), ("c", 3)]);
        let leader = run_election(&mut registry).unwrap();
        assert_eq!(leader, "b");
        assert_eq!(registry.get("b").unwrap().role, AgentRole::Leader);
    }

    #[test]
    fn test_agent_id_breaks_priority_ties() {
        let mut registry = registry_with(&[("alpha", 5), ("omega", 5), ("mid", 5)]);
        let leader = run_election(&mut registry).unwrap();
        assert_eq!(leader, "omega");
    }

    #[test]
    fn test_repeated_elections_deterministic() {
        let mut registry = registry_with(&[("a", 2), ("b", 7), ("c", 7)]);
        let first = run_election(&mut registry).unwrap();
        for _ in 0..5 {
            assert_eq!(run_election(&mut registry).unwrap(), first);
        }
        assert_eq!(first, "c");
    }

    #[test]
    fn test_at_most_one_leader() {
        let mut registry = registry_with(&[("a", 1), ("b", 2), ("c", 3)]);
        run_election(&mut registry);
        run_election(&mut registry);
        let leaders = registry
            .iter()
            .filter(|a| a.role == AgentRole::Leader)
            .count();
        assert_eq!(leaders, 1);
    }

    #[test]
    fn test_term_increments_per_election() {
        let mut registry = registry_with(&[("a", 1)]);
        run_election(&mut registry);
        assert_eq!(registry.get("a").unwrap().term, 1);
        run_election(&mut registry);
        assert_eq!(registry.get("a").unwrap().term, 2);
    }

    #[test]
    fn test_dead_agents_cannot_win() {
        let mut registry = registry_with(&[("a", 1), ("b", 9)]);
        registry.mark_dead("b").unwrap();
        let leader = run_election(&mut registry).unwrap();
        assert_eq!(leader, "a");
    }

    #[test]
    fn test_no_alive_agents_leaves_leaderless() {
        let mut registry = registry_with(&[("a", 1)]);
        registry.mark_dead("a").unwrap();
        assert!(run_election(&mut registry).is_none());
        assert!(registry.alive_leader().is_none());
    }

    #[test]
    fn test_followers_point_at_leader() {
        let mut registry = registry_with(&[("a", 1), ("b", 5)]);
        run_election(&mut registry);
        assert_eq!(
            registry.get("a").unwrap().current_leader.as_deref(),
            Some("b")
        );
        assert_eq!(
            registry.get("b").unwrap().current_leader.as_deref(),
            Some("b")
        );
    }
}
