//! Client for Ollama's native /api/chat endpoint, non-streaming, with
//! function-calling support.

use async_trait::async_trait;
use mathchat_core::{AgentError, AgentReply, Settings, ToolCall, ToolSchema};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{BackendTurn, ChatMessage, LlmBackend};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool<'a>>,
}

#[derive(Debug, Serialize)]
struct OllamaTool<'a> {
    r#type: &'static str,
    function: &'a ToolSchema,
}

/// Client for a single configured model on one Ollama host.
pub struct OllamaClient {
    client: Client,
    api_base: String,
    model: String,
}

impl OllamaClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: Client::new(),
            api_base: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        }
    }

    fn build_messages(system_prompt: &str, transcript: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: system_prompt.to_string(),
            tool_calls: None,
            tool_name: None,
        }];
        messages.extend(transcript.iter().cloned());
        messages
    }
}

#[async_trait]
impl LlmBackend for OllamaClient {
    async fn chat(
        &self,
        system_prompt: &str,
        transcript: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<BackendTurn, AgentError> {
        let url = format!("{}/api/chat", self.api_base);

        let request = OllamaChatRequest {
            model: &self.model,
            messages: Self::build_messages(system_prompt, transcript),
            stream: false,
            tools: tools
                .iter()
                .map(|t| OllamaTool { r#type: "function", function: t })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::LlmError(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::LlmError(e.to_string()))?;

        debug!("Ollama response body: {}", body);
        parse_turn(body)
    }
}

/// Interprets one /api/chat response body: an error field fails the call,
/// tool calls are handed back for execution, and anything else goes to the
/// reply normalizer verbatim.
fn parse_turn(body: Value) -> Result<BackendTurn, AgentError> {
    if let Some(err) = body.get("error").and_then(|e| e.as_str()) {
        return Err(AgentError::LlmError(err.to_string()));
    }

    let Some(message) = body.get("message") else {
        // No message at all; let the normalizer stringify whatever arrived.
        return Ok(BackendTurn::Reply(AgentReply::from_value(body)));
    };

    if let Some(raw_calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
        if !raw_calls.is_empty() {
            let calls: Vec<ToolCall> = raw_calls
                .iter()
                .filter_map(|c| {
                    let function = c.get("function")?;
                    Some(ToolCall {
                        name: function.get("name")?.as_str()?.to_string(),
                        arguments: function.get("arguments").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect();
            // An all-malformed list would otherwise look like "no calls" and
            // spin the gateway against the iteration guard.
            if calls.is_empty() {
                return Err(AgentError::ParseError(format!(
                    "unrecognized tool_calls shape: {}",
                    Value::Array(raw_calls.clone())
                )));
            }
            info!(
                "Model requested {} tool call(s): {:?}",
                calls.len(),
                calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
            );
            return Ok(BackendTurn::ToolCalls(calls));
        }
    }

    Ok(BackendTurn::Reply(AgentReply::from_value(message.clone())))
}
