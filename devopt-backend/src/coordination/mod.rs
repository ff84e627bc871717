//! Multi-agent coordination
//!
//! A request names the capabilities it needs. Each capability goes to the best
//! scoring agent in the registry, every chosen agent runs concurrently, and the
//! contributions are merged into one response.

pub mod executor;
pub mod registry;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::executions::{ExecutionOutcome, ExecutionTracker};
use crate::models::ExecutionStatus;

pub use executor::{AgentExecutor, AgentOutput, AgentTask, LlmExecutor};
pub use registry::AgentRegistry;
pub use types::{
    AgentContribution, AgentProfile, Allocation, Capability, CoordinatedResponse, CoordinationRequest,
    RequestType, SupportingInsight,
};

const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RECOMMENDATIONS: usize = 5;
const MAX_NEXT_STEPS: usize = 3;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinationMetrics {
    pub total_requests: u64,
    /// Requests where at least one agent succeeded
    pub successful_coordinations: u64,
    /// Mean processing time in seconds over all requests
    pub average_response_time: f64,
    /// Runs per agent key
    pub agent_utilization: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveRequest {
    pub request_type: RequestType,
    pub started_at: DateTime<Utc>,
}

/// Holds a request id in the active set until dropped, including when the
/// coordinating future is cancelled mid-flight.
struct ActiveRequestGuard<'a> {
    active: &'a DashMap<String, ActiveRequest>,
    request_id: String,
}

impl<'a> ActiveRequestGuard<'a> {
    fn claim(active: &'a DashMap<String, ActiveRequest>, request: &CoordinationRequest) -> AppResult<Self> {
        match active.entry(request.request_id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "request {} is already being coordinated",
                request.request_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(ActiveRequest {
                    request_type: request.request_type,
                    started_at: Utc::now(),
                });
                Ok(Self {
                    active,
                    request_id: request.request_id.clone(),
                })
            }
        }
    }
}

impl Drop for ActiveRequestGuard<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.request_id);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryEntry {
    pub name: String,
    pub capabilities: Vec<Capability>,
    pub availability: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinationStatus {
    pub service_status: &'static str,
    pub registered_agents: usize,
    pub active_requests: usize,
    pub capabilities_available: usize,
    pub metrics: CoordinationMetrics,
    pub agent_registry: BTreeMap<String, RegistryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentHealth {
    pub status: &'static str,
    pub response_time: f64,
    pub cost_per_request: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall_status: &'static str,
    pub agents: BTreeMap<String, AgentHealth>,
    pub timestamp: DateTime<Utc>,
}

/// Merge agent contributions into the final response
pub fn synthesize(
    request: &CoordinationRequest,
    contributions: Vec<AgentContribution>,
    processing_time: f64,
) -> CoordinatedResponse {
    let successful: Vec<&AgentContribution> = contributions.iter().filter(|c| c.success).collect();

    let total_cost = contributions.iter().map(|c| c.cost_estimate).sum();
    let overall_confidence = if successful.is_empty() {
        0.0
    } else {
        successful.iter().map(|c| c.confidence_score).sum::<f64>() / successful.len() as f64
    };

    // First of the most confident wins
    let primary_response = successful
        .iter()
        .fold(None, |best: Option<&AgentContribution>, c| match best {
            Some(b) if b.confidence_score >= c.confidence_score => Some(b),
            _ => Some(*c),
        })
        .map(|c| c.response_data.clone())
        .unwrap_or_else(|| Value::Object(Default::default()));

    let supporting_insights = successful
        .iter()
        .filter(|c| c.response_data.is_object() && c.response_data.get("error").is_none())
        .map(|c| SupportingInsight {
            agent: c.agent_key.clone(),
            capability: c.capability,
            insight: c.response_data.clone(),
            confidence: c.confidence_score,
        })
        .collect();

    let mut recommendations: Vec<String> = successful
        .iter()
        .filter_map(|c| c.response_data.get("recommendations").and_then(Value::as_array))
        .flatten()
        .filter_map(|r| r.as_str().map(str::to_string))
        .collect();
    if let Some(line) = request.request_type.recommendation() {
        recommendations.push(line.to_string());
    }
    recommendations.truncate(MAX_RECOMMENDATIONS);

    let next_steps = request
        .request_type
        .next_steps()
        .iter()
        .take(MAX_NEXT_STEPS)
        .map(|s| s.to_string())
        .collect();

    CoordinatedResponse {
        request_id: request.request_id.clone(),
        primary_response,
        supporting_insights,
        agent_contributions: contributions,
        overall_confidence,
        total_cost,
        processing_time,
        recommendations,
        next_steps,
    }
}

/// Routes requests across the registered agents
pub struct CoordinationService {
    registry: AgentRegistry,
    executor: Arc<dyn AgentExecutor>,
    tracker: Option<Arc<ExecutionTracker>>,
    agent_timeout: Duration,
    active_requests: DashMap<String, ActiveRequest>,
    metrics: Mutex<CoordinationMetrics>,
}

impl CoordinationService {
    pub fn new(registry: AgentRegistry, executor: Arc<dyn AgentExecutor>) -> Self {
        log::info!(
            "[COORDINATION] Service initialized with {} agents",
            registry.agents().len()
        );
        Self {
            registry,
            executor,
            tracker: None,
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            active_requests: DashMap::new(),
            metrics: Mutex::new(CoordinationMetrics::default()),
        }
    }

    /// Record every agent run and refresh that agent's metrics
    pub fn with_tracker(mut self, tracker: Arc<ExecutionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Coordinate one request. Invalid requests are errors; requests no agent
    /// can serve come back as a failed response.
    pub async fn coordinate(&self, request: CoordinationRequest) -> AppResult<CoordinatedResponse> {
        if request.description.trim().is_empty() {
            return Err(AppError::validation("description is required"));
        }
        if !(1..=10).contains(&request.priority) {
            return Err(AppError::validation("priority must be between 1 and 10"));
        }
        let active = ActiveRequestGuard::claim(&self.active_requests, &request)?;

        let started = Instant::now();
        self.metrics.lock().total_requests += 1;

        let allocations = self.registry.allocate(request.capabilities());
        let response = if allocations.is_empty() {
            log::warn!(
                "[COORDINATION] No agents could be allocated for request {}",
                request.request_id
            );
            CoordinatedResponse::failed(
                &request.request_id,
                "No agents available for the requested capabilities",
                started.elapsed().as_secs_f64(),
            )
        } else {
            let contributions = self.run_agents(&request, &allocations).await;
            synthesize(&request, contributions, started.elapsed().as_secs_f64())
        };

        drop(active);
        self.record_metrics(&response);
        log::info!(
            "[COORDINATION] Request {} finished in {:.2}s with {} contributions",
            request.request_id,
            response.processing_time,
            response.agent_contributions.len()
        );
        Ok(response)
    }

    async fn run_agents(&self, request: &CoordinationRequest, allocations: &[Allocation]) -> Vec<AgentContribution> {
        let runs = allocations.iter().map(|allocation| self.run_agent(request, allocation));
        let contributions = join_all(runs).await;

        if let Some(tracker) = &self.tracker {
            for allocation in allocations {
                if let Err(e) = tracker.refresh_metrics(&allocation.agent.key) {
                    log::warn!(
                        "[COORDINATION] Failed to refresh metrics for {}: {}",
                        allocation.agent.key,
                        e
                    );
                }
            }
        }
        contributions
    }

    async fn run_agent(&self, request: &CoordinationRequest, allocation: &Allocation) -> AgentContribution {
        let agent = &allocation.agent;
        let task = AgentTask {
            request,
            capabilities: &allocation.capabilities,
        };
        let execution_id = self.tracker.as_ref().and_then(|tracker| {
            tracker
                .start_execution(&agent.key, &agent.name, &executor::execution_input(task))
                .map_err(|e| log::warn!("[COORDINATION] Failed to record run for {}: {}", agent.key, e))
                .ok()
        });

        let started = Instant::now();
        let result = tokio::time::timeout(self.agent_timeout, self.executor.execute(agent, task)).await;
        let elapsed = started.elapsed();

        let (contribution, outcome) = match result {
            Ok(Ok(output)) => {
                let outcome = ExecutionOutcome::success(
                    output.data.clone(),
                    elapsed.as_millis() as i64,
                    output.tokens_used,
                    agent.cost_per_request,
                );
                (
                    AgentContribution {
                        agent_key: agent.key.clone(),
                        agent_name: agent.name.clone(),
                        capability: allocation.capabilities[0],
                        response_data: output.data,
                        confidence_score: output.confidence,
                        processing_time: elapsed.as_secs_f64(),
                        cost_estimate: agent.cost_per_request,
                        success: true,
                        error_message: None,
                    },
                    outcome,
                )
            }
            Ok(Err(message)) => {
                log::warn!("[COORDINATION] Agent {} failed: {}", agent.key, message);
                let outcome = ExecutionOutcome::failure(ExecutionStatus::Failed, &message, elapsed.as_millis() as i64);
                (failed_contribution(allocation, message, elapsed), outcome)
            }
            Err(_) => {
                let message = format!("{} timed out after {}s", agent.name, self.agent_timeout.as_secs_f64());
                log::warn!("[COORDINATION] {}", message);
                let outcome = ExecutionOutcome::failure(ExecutionStatus::Timeout, &message, elapsed.as_millis() as i64);
                (failed_contribution(allocation, message, elapsed), outcome)
            }
        };

        if let (Some(tracker), Some(id)) = (&self.tracker, execution_id) {
            if let Err(e) = tracker.complete_execution(&id, &outcome) {
                log::warn!("[COORDINATION] Failed to finish run {}: {}", id, e);
            }
        }
        contribution
    }

    fn record_metrics(&self, response: &CoordinatedResponse) {
        let mut metrics = self.metrics.lock();
        if response.agent_contributions.iter().any(|c| c.success) {
            metrics.successful_coordinations += 1;
        }
        let n = metrics.total_requests as f64;
        metrics.average_response_time += (response.processing_time - metrics.average_response_time) / n;
        for contribution in &response.agent_contributions {
            *metrics
                .agent_utilization
                .entry(contribution.agent_key.clone())
                .or_default() += 1;
        }
    }

    pub fn metrics(&self) -> CoordinationMetrics {
        self.metrics.lock().clone()
    }

    pub fn status(&self) -> CoordinationStatus {
        CoordinationStatus {
            service_status: "operational",
            registered_agents: self.registry.agents().len(),
            active_requests: self.active_requests.len(),
            capabilities_available: self.registry.capabilities_available(),
            metrics: self.metrics(),
            agent_registry: self
                .registry
                .agents()
                .iter()
                .map(|agent| {
                    (
                        agent.key.clone(),
                        RegistryEntry {
                            name: agent.name.clone(),
                            capabilities: agent.capabilities.clone(),
                            availability: agent.available,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn health(&self) -> HealthReport {
        let agents: BTreeMap<String, AgentHealth> = self
            .registry
            .agents()
            .iter()
            .map(|agent| {
                (
                    agent.key.clone(),
                    AgentHealth {
                        status: if agent.available { "healthy" } else { "unavailable" },
                        response_time: agent.avg_response_time,
                        cost_per_request: agent.cost_per_request,
                    },
                )
            })
            .collect();
        let overall_status = if agents.values().all(|a| a.status == "healthy") {
            "healthy"
        } else {
            "degraded"
        };
        HealthReport {
            overall_status,
            agents,
            timestamp: Utc::now(),
        }
    }
}

fn failed_contribution(allocation: &Allocation, message: String, elapsed: Duration) -> AgentContribution {
    AgentContribution {
        agent_key: allocation.agent.key.clone(),
        agent_name: allocation.agent.name.clone(),
        capability: allocation.capabilities[0],
        response_data: serde_json::json!({ "error": message }),
        confidence_score: 0.0,
        processing_time: elapsed.as_secs_f64(),
        cost_estimate: 0.0,
        success: false,
        error_message: Some(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::memory_db;
    use async_trait::async_trait;
    use serde_json::json;

    /// Answers from a fixed script keyed by agent
    struct ScriptedExecutor;

    #[async_trait]
    impl AgentExecutor for ScriptedExecutor {
        async fn execute(&self, agent: &AgentProfile, task: AgentTask<'_>) -> Result<AgentOutput, String> {
            match agent.key.as_str() {
                "analysis_service" => Ok(AgentOutput {
                    data: json!({
                        "analysis_results": format!("reviewed {}", task.request.description),
                        "recommendations": ["Continue current strategy", "Scale successful features"],
                    }),
                    confidence: 0.9,
                    tokens_used: 300,
                }),
                "ceo_agent" => Ok(AgentOutput {
                    data: json!({"strategic_direction": "grow"}),
                    confidence: 0.8,
                    tokens_used: 120,
                }),
                "wealth_expert" => Err("upstream refused the request".to_string()),
                "cco_agent" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(AgentOutput {
                        data: json!({}),
                        confidence: 1.0,
                        tokens_used: 0,
                    })
                }
                other => Err(format!("no script for {}", other)),
            }
        }
    }

    fn service() -> CoordinationService {
        CoordinationService::new(AgentRegistry::builtin().unwrap(), Arc::new(ScriptedExecutor))
            .with_agent_timeout(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_development_request() {
        let service = service();
        let response = service
            .coordinate(CoordinationRequest::new(RequestType::Development, "checkout latency"))
            .await
            .unwrap();

        assert_eq!(response.agent_contributions.len(), 2);
        assert!(response.agent_contributions.iter().all(|c| c.success));
        assert!((response.overall_confidence - 0.85).abs() < 1e-9);
        assert!((response.total_cost - 0.13).abs() < 1e-9);
        assert_eq!(response.primary_response["analysis_results"], "reviewed checkout latency");
        assert_eq!(response.supporting_insights.len(), 2);
        assert_eq!(
            response.recommendations,
            vec![
                "Continue current strategy",
                "Scale successful features",
                "Consider integrating multiple AI services for enhanced functionality"
            ]
        );
        assert_eq!(response.next_steps.len(), 3);

        let metrics = service.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.successful_coordinations, 1);
        assert_eq!(metrics.agent_utilization.get("analysis_service"), Some(&1));
        assert_eq!(service.status().active_requests, 0);
    }

    #[tokio::test]
    async fn test_failures_and_timeouts_become_contributions() {
        let service = service();
        let mut request = CoordinationRequest::new(RequestType::Creative, "campaign launch");
        request.required_capabilities = vec![Capability::RiskAssessment, Capability::CreativeDirection];
        let response = service.coordinate(request).await.unwrap();

        assert_eq!(response.agent_contributions.len(), 2);
        assert!(response.agent_contributions.iter().all(|c| !c.success));
        let timed_out = &response.agent_contributions[1];
        assert_eq!(timed_out.agent_key, "cco_agent");
        assert!(timed_out.error_message.as_deref().unwrap().contains("timed out"));
        assert_eq!(response.overall_confidence, 0.0);
        assert_eq!(response.total_cost, 0.0);
        assert!(response.supporting_insights.is_empty());
        assert_eq!(response.recommendations, vec!["Leverage multimedia services for comprehensive creative output"]);
        assert_eq!(service.metrics().successful_coordinations, 0);
    }

    #[tokio::test]
    async fn test_duplicate_and_cancelled_requests() {
        let service = service().with_agent_timeout(Duration::from_secs(10));
        let mut request = CoordinationRequest::new(RequestType::Creative, "brand refresh");
        request.required_capabilities = vec![Capability::CreativeDirection];

        let mut first = Box::pin(service.coordinate(request.clone()));
        assert!(tokio::time::timeout(Duration::from_millis(20), &mut first).await.is_err());
        assert_eq!(service.status().active_requests, 1);
        assert!(matches!(
            service.coordinate(request.clone()).await,
            Err(AppError::Conflict(_))
        ));

        drop(first);
        assert_eq!(service.status().active_requests, 0);

        // The id is free again once the abandoned run is gone
        let retry = tokio::time::timeout(Duration::from_millis(20), service.coordinate(request)).await;
        assert!(retry.is_err());
        assert_eq!(service.status().active_requests, 0);
    }

    #[tokio::test]
    async fn test_unservable_request_fails_softly() {
        let registry = AgentRegistry::new(vec![]).unwrap();
        let service = CoordinationService::new(registry, Arc::new(ScriptedExecutor));
        let response = service
            .coordinate(CoordinationRequest::new(RequestType::Strategic, "expand"))
            .await
            .unwrap();
        assert_eq!(response.primary_response["error"], "No agents available for the requested capabilities");
        assert_eq!(response.next_steps, vec!["Review request parameters and retry"]);
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected() {
        let service = service();
        assert!(service
            .coordinate(CoordinationRequest::new(RequestType::Development, "  "))
            .await
            .is_err());
        let mut request = CoordinationRequest::new(RequestType::Development, "x");
        request.priority = 11;
        assert!(matches!(
            service.coordinate(request).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(service.metrics().total_requests, 0);
    }

    #[tokio::test]
    async fn test_runs_are_tracked() {
        let tracker = Arc::new(ExecutionTracker::new(Arc::new(memory_db())));
        let service = service().with_tracker(tracker.clone());
        let mut request = CoordinationRequest::new(RequestType::Financial, "hedge exposure");
        request.required_capabilities = vec![Capability::CodeAnalysis, Capability::RiskAssessment];
        service.coordinate(request).await.unwrap();

        let history = tracker.history(None, 10).unwrap();
        assert_eq!(history.len(), 2);
        let failed = history.iter().find(|e| e.agent_key == "wealth_expert").unwrap();
        assert_eq!(failed.status, ExecutionStatus::Failed);

        let performance = tracker.performance().unwrap();
        let analysis = performance.iter().find(|m| m.agent_key == "analysis_service").unwrap();
        assert_eq!(analysis.successful_executions, 1);
    }

    #[test]
    fn test_status_and_health() {
        let service = service();
        let status = service.status();
        assert_eq!(status.registered_agents, 5);
        assert_eq!(status.capabilities_available, 10);
        assert_eq!(status.agent_registry["ceo_agent"].name, "CEO Strategy Agent");

        let health = service.health();
        assert_eq!(health.overall_status, "healthy");
        assert_eq!(health.agents["multimedia_service"].response_time, 8.0);
    }

    #[test]
    fn test_synthesis_caps_recommendations() {
        let request = CoordinationRequest::new(RequestType::Financial, "x");
        let contribution = AgentContribution {
            agent_key: "wealth_expert".into(),
            agent_name: "Ultimate Wealth Expert".into(),
            capability: Capability::FinancialAnalysis,
            response_data: json!({"recommendations": ["a", "b", "c", "d", "e", "f"]}),
            confidence_score: 0.88,
            processing_time: 0.1,
            cost_estimate: 0.08,
            success: true,
            error_message: None,
        };
        let response = synthesize(&request, vec![contribution], 0.1);
        assert_eq!(response.recommendations, vec!["a", "b", "c", "d", "e"]);
    }
}
