//! Assistant agent client.
//!
//! Talks to an LLM-style agent over HTTP and normalizes whatever comes back
//! into an analysis plus a canonical diagram patch. The round trip is
//! timeout-bound so a hung agent can never stall the save path; callers get
//! an error and no patch is produced.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::env;
use std::time::Duration;
use tracing::warn;

use crate::models::{DiagramContent, DiagramPatch};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Normalized agent response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    /// Free-form analysis block (summary, detected intent, ...).
    pub analysis: Value,
    /// Canonical patch proposed by the agent; may be empty.
    pub patch: DiagramPatch,
    /// First human-readable message from the agent, if any.
    pub message: Option<String>,
}

/// Client for the diagram assistant agent.
pub struct AgentService {
    client: Client,
    base_url: Option<String>,
    token: Option<String>,
    model: String,
    mock: bool,
    timeout: Duration,
}

impl AgentService {
    /// Create the agent client from environment configuration.
    ///
    /// Mock mode is the default; set AGENT_MOCK=false together with
    /// AGENT_URL/AGENT_TOKEN to talk to a real agent.
    pub fn from_env() -> Self {
        let base_url = env::var("AGENT_URL")
            .ok()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        let token = env::var("AGENT_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let model = env::var("AGENT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let mock = env::var("AGENT_MOCK")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);
        let timeout = env::var("AGENT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            client: Client::new(),
            base_url,
            token,
            model,
            mock,
            timeout: Duration::from_secs(timeout),
        }
    }

    /// Create a client pinned to mock mode (used by tests).
    pub fn mock() -> Self {
        Self {
            client: Client::new(),
            base_url: None,
            token: None,
            model: "mock".to_string(),
            mock: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Ask the agent for a proposal over the given diagram.
    pub async fn call(
        &self,
        diagram: &DiagramContent,
        intent: &str,
        user_message: &str,
    ) -> Result<AgentReply> {
        if self.mock {
            return Ok(mock_reply(diagram, intent, user_message));
        }
        let (Some(base_url), Some(token)) = (&self.base_url, &self.token) else {
            warn!("AGENT_URL/AGENT_TOKEN not configured, falling back to mock agent");
            return Ok(mock_reply(diagram, intent, user_message));
        };

        let payload = json!({
            "diagram": diagram,
            "intent": intent,
            "user_message": user_message,
        });
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": payload.to_string() },
            ],
        });

        let response = self
            .client
            .post(format!("{base_url}/v1/chat/completions"))
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("agent request failed")?;

        let status = response.status();
        let text = response.text().await.context("agent response unreadable")?;
        if !status.is_success() {
            return Err(anyhow!("agent returned {status}: {}", text.chars().take(200).collect::<String>()));
        }

        let data: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let content = data
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("agent response carried no message content"))?;

        Ok(coerce_reply(content, intent))
    }
}

/// System prompt forcing the JSON envelope the frontend expects.
fn system_prompt() -> String {
    [
        "You are an expert agent for UML class diagrams and databases.",
        "Return EXCLUSIVELY one JSON object with this schema, no extra text and no Markdown fences:",
        "{",
        "  \"analysis\": { \"summary\": \"string\", \"intent\": \"string?\" },",
        "  \"proposal\": {",
        "    \"patch\": {",
        "      \"classes\": [",
        "        { \"id\": \"string\", \"name\": \"string\", \"x\": number, \"y\": number, \"attributes\": string[], \"methods\": string[] }",
        "      ],",
        "      \"relations\": [",
        "        { \"id\": \"string\", \"type\": \"Asociación|Composición|Agregación|Generalización\", \"source\": \"classId\", \"target\": \"classId\", \"multiplicidadOrigen\": \"string\", \"multiplicidadDestino\": \"string\" }",
        "      ]",
        "    }",
        "  }",
        "}",
        "Rules:",
        "- Place x/y at reasonable numeric positions (e.g. x: 100, y: 100).",
        "- Use unique ids (e.g. \"class-<timestamp>\" / \"rel-<timestamp>\").",
        "- Tag primary/foreign keys in attributes where appropriate (e.g. \"id (PK)\", \"customer_id (FK)\").",
        "- Send no text outside the JSON.",
    ]
    .join("\n")
}

/// Coerce raw agent text into a normalized reply.
///
/// Tolerates Markdown fences and surrounding prose; an unparseable answer
/// degrades to an empty patch with the raw text as summary.
fn coerce_reply(text: &str, intent: &str) -> AgentReply {
    let parsed = extract_first_json(text);

    if let Some(envelope) = &parsed {
        if envelope.get("analysis").is_some() || envelope.get("proposal").is_some() {
            let patch = envelope
                .pointer("/proposal/patch")
                .and_then(|raw| DiagramPatch::from_value(raw).ok())
                .unwrap_or_default();
            let message = envelope
                .pointer("/messages/0")
                .and_then(Value::as_str)
                .map(str::to_string);
            return AgentReply {
                analysis: envelope.get("analysis").cloned().unwrap_or(Value::Null),
                patch,
                message,
            };
        }
    }

    AgentReply {
        analysis: json!({
            "summary": text.chars().take(4000).collect::<String>(),
            "intent": intent,
        }),
        patch: DiagramPatch::default(),
        message: None,
    }
}

/// Extract the first JSON object from free-form agent text.
///
/// Tries a fenced ```json block, then the first balanced `{...}` slice, then
/// the whole text.
fn extract_first_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let blob = fenced_block(trimmed).unwrap_or(trimmed);

    if let (Some(first), Some(last)) = (blob.find('{'), blob.rfind('}')) {
        if last > first {
            if let Ok(value) = serde_json::from_str(&blob[first..=last]) {
                return Some(value);
            }
        }
    }

    serde_json::from_str(blob).ok()
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = text[start..].strip_prefix("json").unwrap_or(&text[start..]);
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Canned proposal used when no real agent is configured.
///
/// Converts whatever diagram is loaded into the Customer/Order e-commerce
/// starter so the realtime apply-and-broadcast path stays exercisable.
fn mock_reply(diagram: &DiagramContent, intent: &str, user_message: &str) -> AgentReply {
    let stamp = Utc::now().timestamp_millis();
    let customer_id = format!("class-{stamp}");
    let order_id = format!("class-{}", stamp + 1);
    let relation_id = format!("rel-{stamp}");

    let patch = json!({
        "classes": [
            {
                "id": customer_id,
                "name": "Customer",
                "x": 100,
                "y": 100,
                "attributes": ["id (PK)", "name", "email", "address"],
                "methods": []
            },
            {
                "id": order_id,
                "name": "Order",
                "x": 300,
                "y": 100,
                "attributes": ["id (PK)", "order_date", "status", "customer_id (FK)"],
                "methods": []
            }
        ],
        "relations": [
            {
                "id": relation_id,
                "type": "Asociación",
                "source": customer_id,
                "target": order_id,
                "multiplicidadOrigen": "1..*",
                "multiplicidadDestino": "1"
            }
        ]
    });

    AgentReply {
        analysis: json!({
            "summary": "Converted the diagram to an e-commerce model with Customer and Order",
            "intent": intent,
            "classes_detected": diagram.classes.len(),
            "user_request": user_message,
        }),
        patch: DiagramPatch::from_value(&patch).unwrap_or_default(),
        message: Some("Diagram updated by the assistant".to_string()),
    }
}
