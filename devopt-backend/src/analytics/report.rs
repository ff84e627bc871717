//! Summary figures built from the agent inventory

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::{AiAgent, TrackedApp};

/// Headline numbers shown on the landing page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandingStats {
    pub total_apps: i64,
    pub total_agents: i64,
    pub estimated_savings: String,
    pub effectiveness_score: String,
}

/// Format an integer with comma thousands separators
pub(crate) fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

pub fn landing_stats(total_apps: i64, total_agents: i64) -> LandingStats {
    let estimated_savings = if total_apps > 0 {
        format!("${}", group_thousands(total_apps * 220))
    } else {
        "$2.4K".to_string()
    };
    let effectiveness_score = if total_agents > 0 {
        format!("{:.0}%", (75.0 + total_agents as f64 * 0.5).min(95.0))
    } else {
        "92%".to_string()
    };

    LandingStats {
        total_apps,
        total_agents,
        estimated_savings,
        effectiveness_score,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopAgent {
    pub name: String,
    pub usage_count: i64,
    pub app: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub total_apps: i64,
    pub total_agents: i64,
    pub apps_change: i64,
    pub agents_change: i64,
    pub top_agents: Vec<TopAgent>,
    pub total_cost: f64,
    pub cost_change: f64,
    pub key_recommendations: Vec<String>,
}

/// Monday of the week containing `day`
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

fn app_name(apps: &[TrackedApp], app_id: i64) -> String {
    apps.iter()
        .find(|a| a.id == app_id)
        .map(|a| a.name.clone())
        .unwrap_or_default()
}

/// `top_agents` is expected most used first
pub fn weekly_summary(
    today: NaiveDate,
    apps: &[TrackedApp],
    agents: &[AiAgent],
    top_agents: &[AiAgent],
) -> WeeklySummary {
    WeeklySummary {
        week_start: week_start(today),
        total_apps: apps.len() as i64,
        total_agents: agents.len() as i64,
        // No historical series is kept, so week-over-week deltas stay at zero
        apps_change: 0,
        agents_change: 0,
        top_agents: top_agents
            .iter()
            .take(5)
            .map(|agent| TopAgent {
                name: agent.agent_name.clone(),
                usage_count: agent.usage_frequency,
                app: app_name(apps, agent.app_id),
            })
            .collect(),
        total_cost: agents.iter().map(|a| a.cost_estimate).sum(),
        cost_change: 0.0,
        key_recommendations: vec![
            "Review high-cost agents for optimization opportunities".to_string(),
            "Consider consolidating similar AI agents across projects".to_string(),
        ],
    }
}

impl WeeklySummary {
    /// Plain-text digest queued as a notification
    pub fn to_message(&self) -> String {
        let mut message = format!(
            "Weekly AI Agent Summary\n\nWeek of {}\n\nGrowth:\n- Apps: {:+}\n- AI Agents: {:+}\n\nMost Active Agents:\n",
            self.week_start.format("%Y-%m-%d"),
            self.apps_change,
            self.agents_change
        );
        for agent in self.top_agents.iter().take(3) {
            message.push_str(&format!("- {} ({} uses)\n", agent.name, agent.usage_count));
        }
        message.push_str(&format!(
            "\nCost Analysis:\n- Total Estimated: ${:.2}\n- Change: ${:+.2}\n\nKey Recommendations:\n",
            self.total_cost, self.cost_change
        ));
        for rec in self.key_recommendations.iter().take(2) {
            message.push_str(&format!("- {}\n", rec));
        }
        message
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageTrends {
    pub total_usage: i64,
    pub average_effectiveness: f64,
    pub total_estimated_cost: f64,
    pub most_used_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostAnalysis {
    pub total_cost: f64,
    pub cost_by_type: BTreeMap<String, f64>,
    pub cost_by_app: BTreeMap<String, f64>,
    pub highest_cost_app: Option<String>,
    pub average_cost_per_agent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectivenessRanges {
    pub excellent: usize,
    pub good: usize,
    pub average: usize,
    pub poor: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentScore {
    pub id: i64,
    pub name: String,
    pub effectiveness_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectivenessMetrics {
    pub average_effectiveness: f64,
    pub effectiveness_ranges: EffectivenessRanges,
    pub top_performers: Vec<AgentScore>,
    pub improvement_candidates: Vec<AgentScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub usage_trends: UsageTrends,
    pub cost_analysis: CostAnalysis,
    pub effectiveness: EffectivenessMetrics,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Highest value wins, earliest key on ties
fn max_key<K: Clone + Ord, V: PartialOrd + Copy>(map: &BTreeMap<K, V>) -> Option<K> {
    let mut best: Option<(&K, V)> = None;
    for (key, value) in map {
        if best.is_none_or(|(_, v)| *value > v) {
            best = Some((key, *value));
        }
    }
    best.map(|(k, _)| k.clone())
}

fn score(agent: &AiAgent) -> AgentScore {
    AgentScore {
        id: agent.id,
        name: agent.agent_name.clone(),
        effectiveness_score: agent.effectiveness_score,
    }
}

pub fn analytics_report(apps: &[TrackedApp], agents: &[AiAgent]) -> AnalyticsReport {
    let mut usage_by_type: BTreeMap<String, i64> = BTreeMap::new();
    let mut cost_by_type: BTreeMap<String, f64> = BTreeMap::new();
    let mut cost_by_app: BTreeMap<String, f64> = BTreeMap::new();
    for agent in agents {
        *usage_by_type.entry(agent.agent_type.to_string()).or_default() += agent.usage_frequency;
        *cost_by_type.entry(agent.agent_type.to_string()).or_default() += agent.cost_estimate;
        *cost_by_app.entry(app_name(apps, agent.app_id)).or_default() += agent.cost_estimate;
    }

    let total_cost: f64 = agents.iter().map(|a| a.cost_estimate).sum();
    let average_effectiveness = mean(agents.iter().map(|a| a.effectiveness_score));

    let mut ranges = EffectivenessRanges::default();
    for agent in agents {
        match agent.effectiveness_score {
            s if s >= 0.8 => ranges.excellent += 1,
            s if s >= 0.6 => ranges.good += 1,
            s if s >= 0.4 => ranges.average += 1,
            _ => ranges.poor += 1,
        }
    }

    let mut ranked: Vec<&AiAgent> = agents.iter().collect();
    ranked.sort_by(|a, b| b.effectiveness_score.total_cmp(&a.effectiveness_score));

    AnalyticsReport {
        usage_trends: UsageTrends {
            total_usage: agents.iter().map(|a| a.usage_frequency).sum(),
            average_effectiveness,
            total_estimated_cost: total_cost,
            most_used_type: max_key(&usage_by_type),
        },
        cost_analysis: CostAnalysis {
            total_cost,
            highest_cost_app: max_key(&cost_by_app),
            cost_by_type,
            cost_by_app,
            average_cost_per_agent: mean(agents.iter().map(|a| a.cost_estimate)),
        },
        effectiveness: EffectivenessMetrics {
            average_effectiveness,
            effectiveness_ranges: ranges,
            top_performers: ranked.iter().take(5).map(|a| score(a)).collect(),
            improvement_candidates: agents
                .iter()
                .filter(|a| a.effectiveness_score < 0.5)
                .map(score)
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentType;
    use chrono::Utc;

    fn app(id: i64, name: &str) -> TrackedApp {
        TrackedApp {
            id,
            repl_id: format!("repl-{}", id),
            name: name.to_string(),
            url: None,
            language: None,
            description: None,
            file_count: 0,
            size_kb: 0.0,
            is_active: true,
            last_modified: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn agent(id: i64, app_id: i64, agent_type: AgentType, usage: i64, score: f64, cost: f64) -> AiAgent {
        AiAgent {
            id,
            app_id,
            agent_type,
            agent_name: format!("agent-{}", id),
            model_name: None,
            role_description: None,
            usage_frequency: usage,
            last_used: None,
            effectiveness_score: score,
            cost_estimate: cost,
            features_used: Vec::new(),
            api_endpoints: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_landing_stats_defaults() {
        let stats = landing_stats(0, 0);
        assert_eq!(stats.estimated_savings, "$2.4K");
        assert_eq!(stats.effectiveness_score, "92%");
    }

    #[test]
    fn test_landing_stats_scaled() {
        let stats = landing_stats(12, 10);
        assert_eq!(stats.estimated_savings, "$2,640");
        assert_eq!(stats.effectiveness_score, "80%");
        assert_eq!(landing_stats(5000, 100).estimated_savings, "$1,100,000");
        assert_eq!(landing_stats(1, 100).effectiveness_score, "95%");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(-1234567), "-1,234,567");
    }

    #[test]
    fn test_week_starts_on_monday() {
        let thursday = NaiveDate::from_ymd_opt(2024, 6, 13).unwrap();
        assert_eq!(week_start(thursday), NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn test_weekly_summary() {
        let apps = vec![app(1, "Alpha")];
        let agents: Vec<AiAgent> = (1..=7)
            .map(|i| agent(i, 1, AgentType::OpenAi, 10 - i, 0.9, 1.5))
            .collect();
        let day = NaiveDate::from_ymd_opt(2024, 6, 16).unwrap();
        let summary = weekly_summary(day, &apps, &agents, &agents);

        assert_eq!(summary.week_start, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(summary.top_agents.len(), 5);
        assert_eq!(summary.top_agents[0].app, "Alpha");
        assert!((summary.total_cost - 10.5).abs() < 1e-9);
        assert_eq!(summary.key_recommendations.len(), 2);

        let message = summary.to_message();
        assert!(message.contains("Week of 2024-06-10"));
        assert!(message.contains("- Apps: +0"));
        assert!(message.contains("- Total Estimated: $10.50"));
    }

    #[test]
    fn test_analytics_report() {
        let apps = vec![app(1, "Alpha"), app(2, "Beta")];
        let agents = vec![
            agent(1, 1, AgentType::OpenAi, 10, 0.9, 4.0),
            agent(2, 1, AgentType::Anthropic, 30, 0.65, 1.0),
            agent(3, 2, AgentType::OpenAi, 5, 0.3, 12.0),
        ];
        let report = analytics_report(&apps, &agents);

        assert_eq!(report.usage_trends.total_usage, 45);
        assert_eq!(report.usage_trends.most_used_type.as_deref(), Some("anthropic"));
        assert!((report.cost_analysis.total_cost - 17.0).abs() < 1e-9);
        assert_eq!(report.cost_analysis.highest_cost_app.as_deref(), Some("Beta"));
        assert!((report.cost_analysis.cost_by_type["openai"] - 16.0).abs() < 1e-9);
        assert_eq!(
            report.effectiveness.effectiveness_ranges,
            EffectivenessRanges { excellent: 1, good: 1, average: 0, poor: 1 }
        );
        assert_eq!(report.effectiveness.top_performers[0].id, 1);
        assert_eq!(report.effectiveness.improvement_candidates.len(), 1);
    }

    #[test]
    fn test_empty_report() {
        let report = analytics_report(&[], &[]);
        assert_eq!(report.usage_trends.average_effectiveness, 0.0);
        assert!(report.usage_trends.most_used_type.is_none());
        assert!(report.cost_analysis.highest_cost_app.is_none());
    }
}
