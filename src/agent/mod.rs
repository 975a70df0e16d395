//! Conversational agent with tool calling.
//!
//! The agent sends the conversation and the registered tool definitions to a
//! [`ChatBackend`], executes the tool calls the model asks for one at a time,
//! and feeds the results back until the model answers in plain text.

mod backend;
mod callbacks;
mod runner;

pub use backend::{ChatBackend, ChatMessage, ChatReply, OpenAIBackend, ToolCallRequest};
pub use callbacks::{AgentEvent, CallbackManager, EventHandler, TracingHandler};
pub use runner::{Agent, AgentResponse, ToolCallRecord, DEFAULT_MAX_ITERATIONS};
