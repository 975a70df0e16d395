//! Agent runner with tool calling loop.

use super::backend::{ChatBackend, ChatMessage, ToolCallRequest};
use super::callbacks::{AgentEvent, CallbackManager};
use crate::config::{AgentPrompts, Prompts};
use crate::error::{ConciergeError, Result};
use crate::tools::ToolRegistry;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Conversational agent that routes requests through registered tools.
pub struct Agent {
    backend: Arc<dyn ChatBackend>,
    tools: ToolRegistry,
    system_prompt: String,
    max_iterations: usize,
    callbacks: CallbackManager,
    history: Vec<ChatMessage>,
}

impl Agent {
    /// Create an agent with the default system prompt.
    pub fn new(backend: Arc<dyn ChatBackend>, tools: ToolRegistry) -> Self {
        let system_prompt = Prompts::render(&AgentPrompts::default().system, &HashMap::new());
        Self {
            backend,
            tools,
            history: vec![ChatMessage::system(system_prompt.clone())],
            system_prompt,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            callbacks: CallbackManager::default(),
        }
    }

    /// Set a custom system prompt. Clears the conversation.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self.reset();
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_callbacks(mut self, callbacks: CallbackManager) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Messages so far, starting with the system prompt.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Forget the conversation, keeping the system prompt.
    pub fn reset(&mut self) {
        self.history = vec![ChatMessage::system(self.system_prompt.clone())];
    }

    /// Send one user message; the conversation carries over to the next call.
    ///
    /// A failed turn leaves the history as it was.
    pub async fn chat(&mut self, message: &str) -> Result<AgentResponse> {
        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(message));

        let response = self.drive(&mut messages).await?;
        self.history = messages;
        Ok(response)
    }

    /// Run a single task in a fresh conversation.
    pub async fn run(&self, task: &str) -> Result<AgentResponse> {
        self.run_with_history(&[], task).await
    }

    /// Answer `task` after replaying `prior` messages, without touching the
    /// agent's own history. System messages in `prior` are ignored.
    pub async fn run_with_history(&self, prior: &[ChatMessage], task: &str) -> Result<AgentResponse> {
        let mut messages = Vec::with_capacity(prior.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(
            prior
                .iter()
                .filter(|m| !matches!(m, ChatMessage::System { .. }))
                .cloned(),
        );
        messages.push(ChatMessage::user(task));
        self.drive(&mut messages).await
    }

    async fn drive(&self, messages: &mut Vec<ChatMessage>) -> Result<AgentResponse> {
        let definitions = self.tools.definitions();
        let mut tool_calls_made = Vec::new();

        for iteration in 1..=self.max_iterations {
            debug!("Agent iteration {}", iteration);
            self.callbacks.emit(AgentEvent::AgentStep { iteration });

            let reply = self.backend.complete(messages.as_slice(), &definitions).await?;

            if reply.tool_calls.is_empty() {
                messages.push(ChatMessage::Assistant {
                    content: reply.content.clone(),
                    tool_calls: Vec::new(),
                });
                return Ok(AgentResponse {
                    content: reply.content.unwrap_or_default(),
                    tool_calls: tool_calls_made,
                    iterations: iteration,
                });
            }

            messages.push(ChatMessage::Assistant {
                content: reply.content,
                tool_calls: reply.tool_calls.clone(),
            });

            for call in reply.tool_calls {
                let record = self.execute_tool_call(&call).await;
                messages.push(ChatMessage::Tool {
                    tool_call_id: call.id,
                    content: record.result.clone(),
                });
                tool_calls_made.push(record);
            }
        }

        Err(ConciergeError::Agent(format!(
            "Agent exceeded maximum iterations ({})",
            self.max_iterations
        )))
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, call: &ToolCallRequest) -> ToolCallRecord {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);
        self.callbacks.emit(AgentEvent::ToolCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let (result, ok) = match self.tools.dispatch(&call.name, &call.arguments).await {
            Ok(output) => (output.render(), output.is_success()),
            Err(e) => {
                warn!("Tool {} failed: {}", call.name, e);
                (format!("Tool error: {}", e), false)
            }
        };

        self.callbacks.emit(AgentEvent::ToolResult {
            name: call.name.clone(),
            ok,
        });

        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
            ok,
        }
    }
}

/// Response from an agent run.
#[derive(Debug, Serialize)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    /// Text returned to the model.
    pub result: String,
    pub ok: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
