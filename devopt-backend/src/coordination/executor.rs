use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::types::{AgentProfile, Capability, CoordinationRequest};
use crate::ai::{Message, OpenAIClient};

const DEFAULT_CONFIDENCE: f64 = 0.75;

/// What one agent is asked to do for a request
#[derive(Debug, Clone, Copy)]
pub struct AgentTask<'a> {
    pub request: &'a CoordinationRequest,
    pub capabilities: &'a [Capability],
}

#[derive(Debug, Clone)]
pub struct AgentOutput {
    /// JSON object returned by the agent
    pub data: Value,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub tokens_used: i64,
}

/// Runs a single coordination agent
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, agent: &AgentProfile, task: AgentTask<'_>) -> Result<AgentOutput, String>;
}

/// Executes agents by prompting an OpenAI-compatible model with the agent's persona
pub struct LlmExecutor {
    client: Option<OpenAIClient>,
}

impl LlmExecutor {
    pub fn new(client: Option<OpenAIClient>) -> Self {
        if client.is_none() {
            log::warn!("[COORDINATION] No LLM API key configured, coordination agents are unavailable");
        }
        Self { client }
    }
}

fn persona_prompt(agent: &AgentProfile, capabilities: &[Capability]) -> String {
    let capabilities: Vec<String> = capabilities.iter().map(|c| c.to_string()).collect();
    format!(
        "You are {}, a specialist in {}. You have been assigned: {}.\n\
         Reply with a single JSON object only. Include your findings as fields, a \
         \"recommendations\" array of short actionable strings, and a \"confidence\" \
         number between 0 and 1.",
        agent.name,
        agent.specializations.join(", "),
        capabilities.join(", ")
    )
}

fn task_prompt(request: &CoordinationRequest) -> String {
    let mut prompt = format!("Request type: {}\nDescription: {}", request.request_type, request.description);
    if !request.context.is_null() {
        prompt.push_str(&format!("\nContext: {}", request.context));
    }
    if let Some(app) = &request.requesting_app {
        prompt.push_str(&format!("\nRequesting app: {}", app));
    }
    prompt
}

/// Parse a model reply into an object and its confidence. Replies that are not a
/// JSON object are kept as text under "result".
pub(crate) fn parse_agent_reply(reply: &str) -> (Value, f64) {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let mut object = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("result".to_string(), Value::String(trimmed.to_string()));
            map
        }
    };

    let confidence = object
        .remove("confidence")
        .and_then(|v| v.as_f64())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);
    (Value::Object(object), confidence)
}

#[async_trait]
impl AgentExecutor for LlmExecutor {
    async fn execute(&self, agent: &AgentProfile, task: AgentTask<'_>) -> Result<AgentOutput, String> {
        if !agent.available {
            return Err(format!("{} is unavailable", agent.name));
        }
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| format!("{} unavailable: no LLM API key configured", agent.name))?;

        let messages = vec![
            Message::system(persona_prompt(agent, task.capabilities)),
            Message::user(task_prompt(task.request)),
        ];
        let completion = client.complete(messages).await?;
        let (data, confidence) = parse_agent_reply(&completion.content);

        Ok(AgentOutput {
            data,
            confidence,
            tokens_used: completion.usage.total_tokens as i64,
        })
    }
}

/// Input recorded for an agent run
pub(crate) fn execution_input(task: AgentTask<'_>) -> Value {
    json!({
        "request_id": task.request.request_id,
        "request_type": task.request.request_type,
        "description": task.request.description,
        "capabilities": task.capabilities,
        "priority": task.request.priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::types::RequestType;

    #[test]
    fn test_parse_fenced_json_reply() {
        let (data, confidence) =
            parse_agent_reply("```json\n{\"summary\": \"ok\", \"recommendations\": [\"a\"], \"confidence\": 0.92}\n```");
        assert_eq!(data["summary"], "ok");
        assert!(data.get("confidence").is_none());
        assert!((confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_parse_plain_text_reply() {
        let (data, confidence) = parse_agent_reply("Ship it.");
        assert_eq!(data, json!({"result": "Ship it."}));
        assert_eq!(confidence, DEFAULT_CONFIDENCE);

        let (_, clamped) = parse_agent_reply(r#"{"confidence": 7}"#);
        assert_eq!(clamped, 1.0);
    }

    #[tokio::test]
    async fn test_missing_client_reports_unavailable() {
        let executor = LlmExecutor::new(None);
        let agent = AgentProfile {
            key: "ceo_agent".into(),
            name: "CEO Strategy Agent".into(),
            capabilities: vec![Capability::TechnicalStrategy],
            specializations: vec!["Strategic Planning".into()],
            available: true,
            cost_per_request: 0.1,
            avg_response_time: 4.0,
        };
        let request = CoordinationRequest::new(RequestType::Strategic, "plan the quarter");
        let err = executor
            .execute(
                &agent,
                AgentTask {
                    request: &request,
                    capabilities: &[Capability::TechnicalStrategy],
                },
            )
            .await
            .unwrap_err();
        assert!(err.contains("unavailable"));
    }

    #[test]
    fn test_prompts_name_the_persona() {
        let request = CoordinationRequest::new(RequestType::Creative, "new logo");
        let agent = AgentProfile {
            key: "cco_agent".into(),
            name: "Chief Creative Officer".into(),
            capabilities: vec![Capability::CreativeDirection],
            specializations: vec!["Brand Strategy".into(), "Visual Identity".into()],
            available: true,
            cost_per_request: 0.05,
            avg_response_time: 2.5,
        };
        let prompt = persona_prompt(&agent, &[Capability::CreativeDirection]);
        assert!(prompt.starts_with("You are Chief Creative Officer"));
        assert!(prompt.contains("creative_direction"));
        assert!(task_prompt(&request).contains("Request type: creative"));
    }
}
