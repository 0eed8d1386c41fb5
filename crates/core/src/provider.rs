//! LanguageModel trait, the minimal generation contract over LLM backends.
//!
//! Provider adapters translate their wire shapes into the types in this
//! module: a complete [`ModelResponse`] for non-streamed generation, or a
//! stream of [`ModelChunk`] values. The agent core only ever matches on these.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// The family of provider behind a model; selects tool-call conventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Google,
    /// Any OpenAI-compatible endpoint (groq, ollama, vllm, ...)
    OpenAiCompatible,
}

impl ProviderKind {
    /// Map a provider name (as used in configuration) to its kind.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "openai" | "azure_openai" | "azure" => Self::OpenAi,
            "anthropic" => Self::Anthropic,
            "google" | "gemini" => Self::Google,
            _ => Self::OpenAiCompatible,
        }
    }
}

/// A tool definition sent to the LLM so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name, shaped `<action>_<tool_id>`
    pub name: String,

    /// Description of what the action does
    pub description: String,

    /// JSON Schema describing the parameters
    pub parameters: serde_json::Value,
}

/// A generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "gpt-4o", "gemini-2.0-flash")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Tool schemas, when the model may call tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
        }
    }

    pub fn with_tools(mut self, tools: Option<Vec<ToolDefinition>>) -> Self {
        self.tools = tools;
        self
    }
}

/// Tool-call arguments as delivered by the provider.
///
/// OpenAI-style providers send a JSON-encoded string (possibly in fragments),
/// Google-style providers send a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    Encoded(String),
    Structured(serde_json::Value),
}

impl Default for ToolArguments {
    fn default() -> Self {
        Self::Encoded(String::new())
    }
}

impl ToolArguments {
    /// Merge a streamed fragment into the accumulated arguments.
    ///
    /// String fragments concatenate; a structured value replaces what was there.
    pub fn merge(&mut self, fragment: ToolArguments) {
        match (self, fragment) {
            (Self::Encoded(acc), Self::Encoded(more)) => acc.push_str(&more),
            (slot, other) => *slot = other,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Encoded(s) => s.is_empty(),
            Self::Structured(v) => v.is_null(),
        }
    }
}

/// A complete tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub arguments: ToolArguments,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    /// Map a provider's raw finish reason string.
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "stop" | "end_turn" | "stop_sequence" => Self::Stop,
            "tool_calls" | "tool_use" | "function_call" => Self::ToolCalls,
            "length" | "max_tokens" => Self::Length,
            "content_filter" | "safety" => Self::ContentFilter,
            _ => Self::Other,
        }
    }
}

/// A partial tool call delivered in a stream, keyed by `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<ToolArguments>,
}

/// A single normalized chunk of a streamed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelChunk {
    Text { text: String },
    ToolCallDelta(ToolCallDelta),
    Finish { reason: FinishReason },
}

impl ModelChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn finish(reason: FinishReason) -> Self {
        Self::Finish { reason }
    }
}

/// A complete (non-streaming) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated text, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ModelToolCall>,

    pub finish_reason: FinishReason,

    /// Provider-only fields (refusals, audio, logprobs, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ModelResponse {
    /// A final text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            metadata: serde_json::Map::new(),
        }
    }

    /// A response requesting tool calls.
    pub fn tool_calls(content: Option<String>, tool_calls: Vec<ModelToolCall>) -> Self {
        Self {
            content,
            tool_calls,
            finish_reason: FinishReason::ToolCalls,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn requires_tool_call(&self) -> bool {
        self.finish_reason == FinishReason::ToolCalls
    }

    /// Replay this response as an equivalent chunk stream.
    pub fn into_chunks(self) -> Vec<ModelChunk> {
        let mut chunks = Vec::new();
        if let Some(content) = self.content
            && !content.is_empty()
        {
            chunks.push(ModelChunk::text(content));
        }
        for (index, call) in self.tool_calls.into_iter().enumerate() {
            chunks.push(ModelChunk::ToolCallDelta(ToolCallDelta {
                index,
                id: call.id,
                name: Some(call.name),
                arguments: Some(call.arguments),
            }));
        }
        chunks.push(ModelChunk::finish(self.finish_reason));
        chunks
    }
}

/// Stream of normalized chunks.
pub type ChunkStream = BoxStream<'static, Result<ModelChunk, ProviderError>>;

/// The core LanguageModel trait.
///
/// Every backend adapter implements this. The agents call `generate()` or
/// `generate_stream()` without knowing which provider is behind it.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// A human-readable name (e.g., "openai", "google").
    fn name(&self) -> &str;

    /// Provider family, used to pick tool-call conventions.
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    /// Whether tool schemas may be sent with requests.
    fn supports_tools(&self) -> bool {
        true
    }

    /// Whether attachments can be sent as message parts.
    fn supports_attachments(&self) -> bool {
        false
    }

    /// Send a request and get a complete response.
    async fn generate(&self, request: GenerationRequest) -> Result<ModelResponse, ProviderError>;

    /// Send a request and get a stream of chunks.
    ///
    /// Default implementation calls `generate()` and replays the result as chunks.
    async fn generate_stream(&self, request: GenerationRequest) -> Result<ChunkStream, ProviderError> {
        let response = self.generate(request).await?;
        Ok(stream::iter(response.into_chunks().into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel;

    #[async_trait]
    impl LanguageModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _request: GenerationRequest) -> Result<ModelResponse, ProviderError> {
            Ok(ModelResponse::tool_calls(
                Some("checking".into()),
                vec![ModelToolCall {
                    id: Some("c1".into()),
                    name: "lookup_3".into(),
                    arguments: ToolArguments::Encoded("{}".into()),
                }],
            ))
        }
    }

    #[test]
    fn encoded_fragments_concatenate() {
        let mut args = ToolArguments::default();
        args.merge(ToolArguments::Encoded("{\"a\":".into()));
        args.merge(ToolArguments::Encoded("1}".into()));
        assert_eq!(args, ToolArguments::Encoded("{\"a\":1}".into()));
    }

    #[test]
    fn structured_fragment_replaces() {
        let mut args = ToolArguments::default();
        args.merge(ToolArguments::Structured(serde_json::json!({"q": "x"})));
        assert_eq!(args, ToolArguments::Structured(serde_json::json!({"q": "x"})));
    }

    #[test]
    fn arguments_deserialize_by_shape() {
        let encoded: ToolArguments = serde_json::from_str(r#""{\"a\":1}""#).unwrap();
        assert!(matches!(encoded, ToolArguments::Encoded(_)));
        let structured: ToolArguments = serde_json::from_str(r#"{"a":1}"#).unwrap();
        assert!(matches!(structured, ToolArguments::Structured(_)));
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(FinishReason::from_provider("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::from_provider("tool_use"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::from_provider("STOP"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("weird"), FinishReason::Other);
    }

    #[test]
    fn provider_kind_from_name() {
        assert_eq!(ProviderKind::from_name("google"), ProviderKind::Google);
        assert_eq!(ProviderKind::from_name("openai"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_name("groq"), ProviderKind::OpenAiCompatible);
    }

    #[tokio::test]
    async fn default_stream_replays_response() {
        let model = FixedModel;
        let stream = model
            .generate_stream(GenerationRequest::new("m", vec![]))
            .await
            .unwrap();
        let chunks: Vec<ModelChunk> = stream.map(|c| c.unwrap()).collect().await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], ModelChunk::text("checking"));
        assert!(matches!(&chunks[1], ModelChunk::ToolCallDelta(d) if d.index == 0));
        assert_eq!(chunks[2], ModelChunk::finish(FinishReason::ToolCalls));
    }
}
