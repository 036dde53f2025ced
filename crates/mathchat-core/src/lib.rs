//! Core domain types shared across the mathchat gateway:
//! errors, process settings, tool call types, and reply normalization.

mod reply;

pub use reply::{AgentReply, ContentBlock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while driving the agent.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    LlmError(String),

    #[error("Failed to parse LLM reply: {0}")]
    ParseError(String),

    #[error("Unknown tool requested by model: {0}")]
    UnknownTool(String),

    #[error("Tool execution failed: {0}")]
    ToolFailed(String),

    #[error("Tool call limit ({0}) exceeded")]
    ToolLoopExceeded(usize),
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::ParseError(err.to_string())
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Schema for a tool, sent to the model for function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Process-wide settings, read from the environment once at startup
/// and passed down to the agent constructor.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub base_url: String,
    pub port: u16,
}

impl Settings {
    /// Loads settings from the environment, with defaults for a local Ollama.
    pub fn from_env() -> Self {
        Self {
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "llama3.1".into()),
            base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".into()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
        }
    }
}
