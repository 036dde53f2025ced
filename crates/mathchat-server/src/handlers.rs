//! Request handlers for the chat endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::ServerState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// POST /chat: forwards the message to the agent and wraps its reply.
pub async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    info!(
        "Chat request: {}...",
        req.message.get(..50).unwrap_or(&req.message)
    );

    let response = state.agent.invoke(&req.message).await?;
    Ok(Json(ChatResponse { response }))
}

pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use mathchat_agent::Agent;
    use mathchat_core::{AgentError, AgentReply, ToolCall, ToolSchema};
    use mathchat_llm::{BackendTurn, ChatMessage, LlmBackend};
    use mathchat_tools::ToolRegistry;
    use serde_json::json;

    struct ScriptedBackend {
        turns: Mutex<Vec<BackendTurn>>,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn chat(
            &self,
            _system_prompt: &str,
            _transcript: &[ChatMessage],
            _tools: &[ToolSchema],
        ) -> Result<BackendTurn, AgentError> {
            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() {
                return Err(AgentError::LlmError("script exhausted".into()));
            }
            Ok(turns.remove(0))
        }
    }

    fn state_with(turns: Vec<BackendTurn>) -> Arc<ServerState> {
        let backend = Arc::new(ScriptedBackend { turns: Mutex::new(turns) });
        let agent = Agent::with_backend(backend, Arc::new(ToolRegistry::with_defaults()));
        Arc::new(ServerState { agent })
    }

    #[tokio::test]
    async fn calculation_request_routes_through_the_tool() {
        // The model asks for the calculator, then relays its result.
        let state = state_with(vec![
            BackendTurn::ToolCalls(vec![ToolCall {
                name: "calcular".into(),
                arguments: json!({"expressao": "12 * 7"}),
            }]),
            BackendTurn::Reply(AgentReply::from_value(json!("84"))),
        ]);

        let Json(resp) = chat(
            State(state),
            Json(ChatRequest { message: "what is 12 * 7?".into() }),
        )
        .await
        .unwrap();

        assert_eq!(resp.response, "84");
    }

    #[tokio::test]
    async fn small_talk_returns_a_non_empty_response() {
        let state = state_with(vec![BackendTurn::Reply(AgentReply::from_value(json!({
            "role": "assistant",
            "content": "Oi! Como posso ajudar?"
        })))]);

        let Json(resp) = chat(
            State(state),
            Json(ChatRequest { message: "hello".into() }),
        )
        .await
        .unwrap();

        assert!(!resp.response.is_empty());
    }

    #[tokio::test]
    async fn backend_failure_becomes_a_transport_error() {
        let state = state_with(vec![]);
        let result = chat(
            State(state),
            Json(ChatRequest { message: "hi".into() }),
        )
        .await;
        assert!(result.is_err());
    }
}
