//! Tool-calling agents for RagWeave.
//!
//! An agent turns one query into a lazy stream of [`AgentEvent`]s:
//!
//! 1. **Retrieve** documents for the query (optional)
//! 2. **Build messages** (system prompt + replayed history + query)
//! 3. **Generate**, running any requested tools through the
//!    [`ToolCallHandler`] until the model answers
//! 4. **Report** sources and the turn's tool calls
//!
//! [`ClassicAgent`] does this once. [`ReActAgent`] wraps it in a bounded
//! plan / act / observe loop and synthesizes a final answer from its
//! observations. Nothing is spawned: dropping the stream stops the turn.

pub mod base;
pub mod classic;
pub mod factory;
pub mod handler;
pub mod prompts;
pub mod react;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

use futures::stream::BoxStream;
use ragweave_core::error::ProviderError;
use ragweave_core::retrieval::Retriever;

pub use classic::ClassicAgent;
pub use factory::AgentBuilder;
pub use handler::{HandlerEvent, ToolCallHandler, TurnContext, TurnState};
pub use react::ReActAgent;
pub use stream_event::{AgentEvent, StepStatus};

/// An agent: one query in, a stream of events out.
pub trait Agent: Send + Sync {
    /// Run one turn. The stream ends after the final event (or an `error`).
    fn generate<'a>(
        &'a self,
        query: &'a str,
        retriever: Option<&'a dyn Retriever>,
    ) -> BoxStream<'a, AgentEvent>;
}

/// Errors that end an agent turn.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("model request failed: {0}")]
    Provider(#[from] ProviderError),
}
