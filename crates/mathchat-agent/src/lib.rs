//! The agent gateway: one message in, one string out.
//!
//! The gateway sends the message to the backend together with the registered
//! tool schemas, executes any tool calls the model requests, feeds the results
//! back, and normalizes the final reply. Backend failures propagate unhandled;
//! there is no retry and no recovery here.

use std::sync::Arc;

use mathchat_core::{AgentError, Settings, ToolSchema};
use mathchat_llm::{BackendTurn, ChatMessage, LlmBackend, OllamaClient};
use mathchat_tools::ToolRegistry;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "Você é um assistente de IA. \
    Quando a pergunta envolver cálculos matemáticos ou operações numéricas, \
    use a ferramenta 'calcular' passando apenas a expressão matemática. \
    Caso contrário, responda normalmente com seu conhecimento.";

/// Bound on the tool loop so a misbehaving model cannot spin forever.
const MAX_TOOL_ITERATIONS: usize = 10;

/// Process-wide agent, configured once at startup and shared read-only
/// across requests.
pub struct Agent {
    backend: Arc<dyn LlmBackend>,
    tools: Arc<ToolRegistry>,
    schemas: Vec<ToolSchema>,
    system_prompt: String,
}

impl Agent {
    /// Builds the default agent: the configured Ollama model plus the
    /// built-in calculator tool.
    pub fn new(settings: &Settings) -> Self {
        Self::with_backend(
            Arc::new(OllamaClient::new(settings)),
            Arc::new(ToolRegistry::with_defaults()),
        )
    }

    /// Builds an agent over an arbitrary backend and tool set.
    pub fn with_backend(backend: Arc<dyn LlmBackend>, tools: Arc<ToolRegistry>) -> Self {
        let schemas = tools.list();
        Self {
            backend,
            tools,
            schemas,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Sends a message through the agent and returns the normalized reply.
    pub async fn invoke(&self, message: &str) -> Result<String, AgentError> {
        let mut transcript = vec![ChatMessage::user(message)];

        for _ in 0..MAX_TOOL_ITERATIONS {
            let turn = self
                .backend
                .chat(&self.system_prompt, &transcript, &self.schemas)
                .await?;

            match turn {
                BackendTurn::Reply(reply) => {
                    let text = reply.into_text();
                    debug!("Final reply: {} chars", text.len());
                    return Ok(text);
                }
                BackendTurn::ToolCalls(calls) => {
                    transcript.push(ChatMessage::assistant_calls(&calls));
                    for call in calls {
                        let tool = self
                            .tools
                            .get(&call.name)
                            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;

                        let result = tool
                            .execute(call.arguments)
                            .await
                            .map_err(|e| AgentError::ToolFailed(e.to_string()))?;

                        info!("Tool {}: {} chars", call.name, result.len());
                        transcript.push(ChatMessage::tool(&call.name, &result));
                    }
                }
            }
        }

        Err(AgentError::ToolLoopExceeded(MAX_TOOL_ITERATIONS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use mathchat_core::{AgentReply, ToolCall};
    use serde_json::json;

    /// Backend that replays a fixed sequence of turns and records the
    /// transcript it was last given.
    struct ScriptedBackend {
        turns: Mutex<Vec<BackendTurn>>,
        last_transcript: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedBackend {
        fn new(turns: Vec<BackendTurn>) -> Self {
            Self {
                turns: Mutex::new(turns),
                last_transcript: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn chat(
            &self,
            _system_prompt: &str,
            transcript: &[ChatMessage],
            _tools: &[ToolSchema],
        ) -> Result<BackendTurn, AgentError> {
            *self.last_transcript.lock().unwrap() = transcript.to_vec();
            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() {
                return Err(AgentError::LlmError("script exhausted".into()));
            }
            Ok(turns.remove(0))
        }
    }

    fn agent_with(turns: Vec<BackendTurn>) -> (Agent, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new(turns));
        let agent =
            Agent::with_backend(backend.clone(), Arc::new(ToolRegistry::with_defaults()));
        (agent, backend)
    }

    #[tokio::test]
    async fn direct_reply_passes_through() {
        let (agent, _) = agent_with(vec![BackendTurn::Reply(AgentReply::from_value(json!(
            "Olá!"
        )))]);
        assert_eq!(agent.invoke("hello").await.unwrap(), "Olá!");
    }

    #[tokio::test]
    async fn tool_call_is_executed_and_fed_back() {
        let (agent, backend) = agent_with(vec![
            BackendTurn::ToolCalls(vec![ToolCall {
                name: "calcular".into(),
                arguments: json!({"expressao": "12 * 7"}),
            }]),
            BackendTurn::Reply(AgentReply::from_value(json!("84"))),
        ]);

        assert_eq!(agent.invoke("what is 12 * 7?").await.unwrap(), "84");

        // The second turn must have seen the tool result in the transcript.
        let transcript = backend.last_transcript.lock().unwrap();
        let tool_msg = transcript
            .iter()
            .find(|m| m.role == "tool")
            .expect("tool result in transcript");
        assert_eq!(tool_msg.content, "84");
        assert_eq!(tool_msg.tool_name.as_deref(), Some("calcular"));
    }

    #[tokio::test]
    async fn unknown_tool_propagates_an_error() {
        let (agent, _) = agent_with(vec![BackendTurn::ToolCalls(vec![ToolCall {
            name: "launch_missiles".into(),
            arguments: json!({}),
        }])]);
        assert!(matches!(
            agent.invoke("hi").await,
            Err(AgentError::UnknownTool(_))
        ));
    }

    #[tokio::test]
    async fn endless_tool_calls_hit_the_iteration_guard() {
        let turns = (0..MAX_TOOL_ITERATIONS + 1)
            .map(|_| {
                BackendTurn::ToolCalls(vec![ToolCall {
                    name: "calcular".into(),
                    arguments: json!({"expressao": "1+1"}),
                }])
            })
            .collect();
        let (agent, _) = agent_with(turns);
        assert!(matches!(
            agent.invoke("loop").await,
            Err(AgentError::ToolLoopExceeded(_))
        ));
    }

    #[tokio::test]
    async fn backend_errors_propagate_unhandled() {
        let (agent, _) = agent_with(vec![]);
        assert!(matches!(
            agent.invoke("hi").await,
            Err(AgentError::LlmError(_))
        ));
    }
}
