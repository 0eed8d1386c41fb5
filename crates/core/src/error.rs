//! Error types for the RagWeave domain.
//!
//! One enum per collaborator boundary. Inside a turn none of these reach the
//! caller: the agents turn them into inline tool results or a terminal
//! `error` event.

use thiserror::Error;

/// What a `LanguageModel` adapter reports when a generation fails.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Action {action} not found on tool {tool_name}")]
    ActionNotFound { tool_name: String, action: String },

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Retriever unavailable: {0}")]
    Unavailable(String),
}
