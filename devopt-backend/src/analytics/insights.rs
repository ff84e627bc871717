//! Integration opportunities and optimization tips derived from the inventory

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{AgentType, AiAgent, AppCredential, TrackedApp};

const MAX_OPPORTUNITIES: usize = 10;
const MAX_TIPS: usize = 8;

const HIGH_COST_THRESHOLD: f64 = 10.0;
const LOW_EFFECTIVENESS_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    AgentConsolidation,
    FeatureSharing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationOpportunity {
    #[serde(rename = "type")]
    pub kind: OpportunityKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub apps_affected: Vec<String>,
    pub potential_savings: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complementary_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Cost,
    Performance,
    Efficiency,
    Security,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationTip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub potential_savings: String,
    pub apps_affected: Vec<String>,
    pub action_items: Vec<String>,
}

/// Capitalize the first letter of every word, lowercasing the rest
pub(crate) fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

fn app_names<'a>(agents: impl Iterator<Item = &'a AiAgent>, names_by_id: &HashMap<i64, &str>) -> Vec<String> {
    let mut names = Vec::new();
    for agent in agents {
        if let Some(name) = names_by_id.get(&agent.app_id) {
            push_unique(&mut names, name);
        }
    }
    names
}

/// Find places where apps could share or merge their AI agents
pub fn integration_opportunities(apps: &[TrackedApp], agents: &[AiAgent]) -> Vec<IntegrationOpportunity> {
    let names_by_id: HashMap<i64, &str> = apps.iter().map(|a| (a.id, a.name.as_str())).collect();
    let mut opportunities = Vec::new();

    let mut by_type: BTreeMap<AgentType, Vec<&AiAgent>> = BTreeMap::new();
    for agent in agents {
        by_type.entry(agent.agent_type).or_default().push(agent);
    }

    for (agent_type, group) in &by_type {
        if group.len() < 2 {
            continue;
        }
        let names = app_names(group.iter().copied(), &names_by_id);
        if names.len() < 2 {
            continue;
        }

        // Agents without recorded features do not narrow the shared set
        let mut common: BTreeSet<&str> = group[0].features_used.iter().map(String::as_str).collect();
        for agent in &group[1..] {
            if !agent.features_used.is_empty() {
                let theirs: BTreeSet<&str> = agent.features_used.iter().map(String::as_str).collect();
                common = common.intersection(&theirs).copied().collect();
            }
        }
        if common.is_empty() {
            continue;
        }

        opportunities.push(IntegrationOpportunity {
            kind: OpportunityKind::AgentConsolidation,
            priority: Priority::High,
            title: format!("Consolidate {} Agents", agent_type.title()),
            description: format!(
                "Consider creating a shared {} service for {}",
                agent_type,
                names.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
            ),
            apps_affected: names,
            potential_savings: format!("Reduce {} costs by 30-50%", agent_type),
            common_features: common.into_iter().map(str::to_string).collect(),
            complementary_types: Vec::new(),
        });
    }

    let types_by_app: HashMap<i64, BTreeSet<AgentType>> = agents.iter().fold(HashMap::new(), |mut acc, agent| {
        acc.entry(agent.app_id).or_insert_with(BTreeSet::new).insert(agent.agent_type);
        acc
    });
    let empty = BTreeSet::new();

    for (i, first) in apps.iter().enumerate() {
        for second in &apps[i + 1..] {
            let language = match (&first.language, &second.language) {
                (Some(a), Some(b)) if a == b => a,
                _ => continue,
            };
            let first_types = types_by_app.get(&first.id).unwrap_or(&empty);
            let second_types = types_by_app.get(&second.id).unwrap_or(&empty);
            if first_types.is_empty() || second_types.is_empty() || first_types == second_types {
                continue;
            }

            opportunities.push(IntegrationOpportunity {
                kind: OpportunityKind::FeatureSharing,
                priority: Priority::Medium,
                title: format!("Cross-pollinate {} and {}", first.name, second.name),
                description: format!("Share AI capabilities between similar {} projects", language),
                apps_affected: vec![first.name.clone(), second.name.clone()],
                potential_savings: "Accelerate development by 20-40%".to_string(),
                common_features: Vec::new(),
                complementary_types: first_types
                    .union(second_types)
                    .map(|t| t.as_str().to_string())
                    .collect(),
            });
        }
    }

    // Widest impact first, consolidation ahead of sharing on ties
    opportunities.sort_by(|a, b| {
        b.apps_affected
            .len()
            .cmp(&a.apps_affected.len())
            .then_with(|| (b.priority == Priority::High).cmp(&(a.priority == Priority::High)))
    });
    opportunities.truncate(MAX_OPPORTUNITIES);
    opportunities
}

fn actions(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Cost, performance, cleanup and credential hygiene advice for the current inventory
pub fn optimization_tips(apps: &[TrackedApp], agents: &[AiAgent], credentials: &[AppCredential]) -> Vec<OptimizationTip> {
    let names_by_id: HashMap<i64, &str> = apps.iter().map(|a| (a.id, a.name.as_str())).collect();
    let mut tips = Vec::new();

    let high_cost: Vec<&AiAgent> = agents.iter().filter(|a| a.cost_estimate > HIGH_COST_THRESHOLD).collect();
    if !high_cost.is_empty() {
        let total: f64 = high_cost.iter().map(|a| a.cost_estimate).sum();
        tips.push(OptimizationTip {
            kind: TipKind::Cost,
            priority: Priority::High,
            title: "High-Cost Agent Optimization".to_string(),
            description: format!("Review {} agents with high usage costs", high_cost.len()),
            potential_savings: format!("Potential monthly savings: ${:.2}", total * 0.3),
            apps_affected: app_names(high_cost.iter().copied(), &names_by_id),
            action_items: actions(&[
                "Consider switching to more cost-effective models",
                "Implement caching for repeated queries",
                "Optimize prompt engineering",
            ]),
        });
    }

    let underperforming: Vec<&AiAgent> = agents
        .iter()
        .filter(|a| a.effectiveness_score < LOW_EFFECTIVENESS_THRESHOLD)
        .collect();
    if !underperforming.is_empty() {
        tips.push(OptimizationTip {
            kind: TipKind::Performance,
            priority: Priority::Medium,
            title: "Performance Enhancement Opportunities".to_string(),
            description: format!(
                "Improve effectiveness of {} underperforming agents",
                underperforming.len()
            ),
            potential_savings: "Increase success rates by up to 40%".to_string(),
            apps_affected: app_names(underperforming.iter().copied(), &names_by_id),
            action_items: actions(&[
                "Review and optimize prompts",
                "Consider fine-tuning or different models",
                "Implement better error handling",
            ]),
        });
    }

    let unused: Vec<&AiAgent> = agents.iter().filter(|a| a.usage_frequency == 0).collect();
    if !unused.is_empty() {
        tips.push(OptimizationTip {
            kind: TipKind::Efficiency,
            priority: Priority::Low,
            title: "Remove Unused AI Agents".to_string(),
            description: format!("Clean up {} agents that haven't been used", unused.len()),
            potential_savings: "Reduce maintenance overhead".to_string(),
            apps_affected: app_names(unused.iter().copied(), &names_by_id),
            action_items: actions(&[
                "Archive or remove unused agent configurations",
                "Document why agents were created but not used",
                "Consider alternative implementations",
            ]),
        });
    }

    // Services in order of first appearance
    let mut holders: Vec<(&str, Vec<String>)> = Vec::new();
    for credential in credentials {
        let Some(app_name) = names_by_id.get(&credential.app_id) else {
            continue;
        };
        match holders.iter_mut().find(|(service, _)| *service == credential.service_name) {
            Some((_, names)) => push_unique(names, app_name),
            None => holders.push((credential.service_name.as_str(), vec![app_name.to_string()])),
        }
    }
    for (service, names) in holders {
        if names.len() < 2 {
            continue;
        }
        tips.push(OptimizationTip {
            kind: TipKind::Security,
            priority: Priority::Medium,
            title: format!("Centralize {} Credentials", title_case(service)),
            description: format!(
                "Multiple apps using {} credentials - consider centralized management",
                service
            ),
            potential_savings: "Improved security and easier credential rotation".to_string(),
            apps_affected: names,
            action_items: actions(&[
                "Implement centralized credential management",
                "Use environment variables consistently",
                "Set up credential rotation policies",
            ]),
        });
    }

    tips.truncate(MAX_TIPS);
    tips
}
