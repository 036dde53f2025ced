//! LLM backend abstraction and the native Ollama client.
//!
//! The gateway talks to the model through [`LlmBackend`], which keeps the
//! network client swappable (tests script a backend in-process).

mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use mathchat_core::{AgentError, AgentReply, ToolCall, ToolSchema};
use serde::Serialize;

/// One message in the conversation transcript sent to the model.
/// Mirrors Ollama's native /api/chat message shape.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    pub fn user(content: &str) -> Self {
        Self {
            role: "user",
            content: content.to_string(),
            tool_calls: None,
            tool_name: None,
        }
    }

    /// Echo of the assistant turn that requested tool calls, kept in the
    /// transcript so the model sees its own requests.
    pub fn assistant_calls(calls: &[ToolCall]) -> Self {
        let wire: Vec<serde_json::Value> = calls
            .iter()
            .map(|c| {
                serde_json::json!({
                    "function": { "name": c.name, "arguments": c.arguments }
                })
            })
            .collect();
        Self {
            role: "assistant",
            content: String::new(),
            tool_calls: Some(serde_json::Value::Array(wire)),
            tool_name: None,
        }
    }

    pub fn tool(name: &str, content: &str) -> Self {
        Self {
            role: "tool",
            content: content.to_string(),
            tool_calls: None,
            tool_name: Some(name.to_string()),
        }
    }
}

/// Outcome of one model turn: either a final reply to normalize, or tool
/// calls the gateway must execute before asking again.
#[derive(Debug)]
pub enum BackendTurn {
    Reply(AgentReply),
    ToolCalls(Vec<ToolCall>),
}

/// A chat-completion backend the agent can drive.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn chat(
        &self,
        system_prompt: &str,
        transcript: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<BackendTurn, AgentError>;
}
