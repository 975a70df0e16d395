//! Event callbacks observed during agent turns and retrieval.

use crate::index::IndexType;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Something that happened while answering a message.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The model is about to be called.
    AgentStep { iteration: usize },
    ToolCall { name: String, arguments: String },
    ToolResult { name: String, ok: bool },
    Retrieve {
        index_type: IndexType,
        query: String,
        nodes: usize,
    },
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentEvent::AgentStep { iteration } => write!(f, "step {}", iteration),
            AgentEvent::ToolCall { name, arguments } => write!(f, "call {}({})", name, arguments),
            AgentEvent::ToolResult { name, ok } => {
                write!(f, "{} {}", name, if *ok { "succeeded" } else { "failed" })
            }
            AgentEvent::Retrieve {
                index_type,
                query,
                nodes,
            } => write!(f, "retrieved {} {} nodes for {:?}", nodes, index_type, query),
        }
    }
}

/// Receives agent events.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &AgentEvent);
}

/// Logs every event at debug level.
#[derive(Debug, Default)]
pub struct TracingHandler;

impl EventHandler for TracingHandler {
    fn on_event(&self, event: &AgentEvent) {
        debug!(target: "concierge::events", "{}", event);
    }
}

/// Fans events out to a list of handlers.
#[derive(Clone, Default)]
pub struct CallbackManager {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl CallbackManager {
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self { handlers }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn emit(&self, event: AgentEvent) {
        for handler in &self.handlers {
            handler.on_event(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackManager")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
