use std::collections::BTreeMap;
use std::path::Path;

use super::types::{AgentProfile, Allocation, Capability};
use crate::config::load_ron_config;
use crate::error::{AppError, AppResult};

const REGISTRY_FILE: &str = "coordination_agents.ron";
const BUILTIN_REGISTRY: &str = include_str!("../../config/coordination_agents.ron");

/// The coordination agents, in registry order
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentProfile>,
    capability_map: BTreeMap<Capability, Vec<usize>>,
}

impl AgentRegistry {
    pub fn new(agents: Vec<AgentProfile>) -> AppResult<Self> {
        let mut capability_map: BTreeMap<Capability, Vec<usize>> = BTreeMap::new();
        for (index, agent) in agents.iter().enumerate() {
            if agents[..index].iter().any(|a| a.key == agent.key) {
                return Err(AppError::config(format!("duplicate coordination agent '{}'", agent.key)));
            }
            for capability in &agent.capabilities {
                let holders = capability_map.entry(*capability).or_default();
                if !holders.contains(&index) {
                    holders.push(index);
                }
            }
        }
        Ok(Self { agents, capability_map })
    }

    /// Registry from `config_dir` when the file is there, else the built-in one
    pub fn load(config_dir: Option<&Path>) -> AppResult<Self> {
        let registry = Self::new(load_ron_config(config_dir, REGISTRY_FILE, BUILTIN_REGISTRY)?)?;
        log::info!(
            "[COORDINATION] Loaded {} agents covering {} capabilities",
            registry.agents.len(),
            registry.capability_map.len()
        );
        Ok(registry)
    }

    pub fn builtin() -> AppResult<Self> {
        Self::load(None)
    }

    pub fn agents(&self) -> &[AgentProfile] {
        &self.agents
    }

    pub fn get(&self, key: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.key == key)
    }

    pub fn agents_for(&self, capability: Capability) -> impl Iterator<Item = &AgentProfile> {
        self.capability_map
            .get(&capability)
            .into_iter()
            .flatten()
            .map(|&index| &self.agents[index])
    }

    /// Number of distinct capabilities some agent offers
    pub fn capabilities_available(&self) -> usize {
        self.capability_map.len()
    }

    fn max_cost(&self) -> f64 {
        self.agents.iter().map(|a| a.cost_per_request).fold(0.0, f64::max)
    }

    fn max_response_time(&self) -> f64 {
        self.agents.iter().map(|a| a.avg_response_time).fold(0.0, f64::max)
    }

    /// Selection score of `agent` for `capability`. Cost and speed are relative
    /// to the most expensive and slowest agents in the whole registry.
    pub fn score(&self, agent: &AgentProfile, capability: Capability) -> f64 {
        let mut score = 0.0;
        if agent.available {
            score += 10.0;
        }

        for keyword in capability.keywords() {
            score += 5.0
                * agent
                    .specializations
                    .iter()
                    .filter(|s| s.to_lowercase().contains(keyword))
                    .count() as f64;
        }

        let max_cost = self.max_cost();
        if max_cost > 0.0 {
            score += 10.0 * (max_cost - agent.cost_per_request) / max_cost;
        }
        let max_time = self.max_response_time();
        if max_time > 0.0 {
            score += 10.0 * (max_time - agent.avg_response_time) / max_time;
        }
        score
    }

    /// Best agent for a capability; the earliest registered wins a tie
    pub fn select(&self, capability: Capability) -> Option<&AgentProfile> {
        let mut best: Option<(&AgentProfile, f64)> = None;
        for agent in self.agents_for(capability) {
            let score = self.score(agent, capability);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((agent, score));
            }
        }
        best.map(|(agent, _)| agent)
    }

    /// Group the requested capabilities by their chosen agent, in first-use order.
    /// Capabilities no agent offers are skipped.
    pub fn allocate(&self, capabilities: &[Capability]) -> Vec<Allocation> {
        let mut allocations: Vec<Allocation> = Vec::new();
        for &capability in capabilities {
            let Some(agent) = self.select(capability) else {
                log::warn!("[COORDINATION] No agents available for capability: {}", capability);
                continue;
            };
            match allocations.iter_mut().find(|a| a.agent.key == agent.key) {
                Some(allocation) => {
                    if !allocation.capabilities.contains(&capability) {
                        allocation.capabilities.push(capability);
                    }
                }
                None => allocations.push(Allocation {
                    agent: agent.clone(),
                    capabilities: vec![capability],
                }),
            }
        }
        allocations
    }
}
