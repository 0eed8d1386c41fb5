//! # RagWeave Core
//!
//! Domain types, traits, and error definitions for the RagWeave agent core.
//! The collaborators this system depends on (language models, tool execution,
//! retrieval) are defined here as traits; their implementations live outside
//! the workspace or in test helpers.

pub mod agent;
pub mod error;
pub mod limits;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::AgentKind;
pub use error::{ProviderError, RetrievalError, ToolError};
pub use limits::{MAX_EXECUTION_STEPS, MAX_REACT_ITERATIONS};
pub use message::{Attachment, ChatTurn, ContentPart, Message, MessageContent, Role};
pub use provider::{
    ChunkStream, FinishReason, GenerationRequest, LanguageModel, ModelChunk, ModelResponse,
    ModelToolCall, ProviderKind, ToolArguments, ToolCallDelta, ToolDefinition,
};
pub use retrieval::{Retriever, SourceDocument};
pub use tool::{
    ParamBucket, ParamProperty, ParamSchema, ParameterBuckets, ToolAction, ToolCallRecord,
    ToolCallStatus, ToolDescriptor, ToolExecutor,
};
