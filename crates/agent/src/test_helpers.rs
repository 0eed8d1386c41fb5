//! Shared test helpers: a scripted model and a stub tool executor.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use ragweave_core::error::{ProviderError, ToolError};
use ragweave_core::provider::{
    ChunkStream, GenerationRequest, LanguageModel, ModelChunk, ModelResponse, ModelToolCall,
    ProviderKind, ToolArguments,
};
use ragweave_core::tool::{ParameterBuckets, ToolAction, ToolDescriptor, ToolExecutor};
use ragweave_tools::{ToolSet, tool_definitions};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::handler::TurnContext;

/// One scripted model reply.
#[derive(Debug, Clone)]
pub enum Script {
    /// A complete response (replayed as chunks when streamed).
    Response(ModelResponse),
    /// Raw chunks; only valid for streamed requests.
    Chunks(Vec<ModelChunk>),
    /// The request fails.
    Fail(String),
}

/// A mock model that returns scripted replies in order.
///
/// When the queue runs dry the `fallback` reply (if any) repeats forever,
/// otherwise requests fail.
pub struct ScriptedModel {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Option<Script>,
    requests: Mutex<Vec<GenerationRequest>>,
    kind: ProviderKind,
    supports_tools: bool,
}

impl ScriptedModel {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            kind: ProviderKind::OpenAi,
            supports_tools: true,
        }
    }

    /// A model that answers every request with the same text.
    pub fn always_text(text: &str) -> Self {
        Self::new(vec![]).with_fallback(Script::Response(ModelResponse::text(text)))
    }

    pub fn with_fallback(mut self, script: Script) -> Self {
        self.fallback = Some(script);
        self
    }

    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn without_tools(mut self) -> Self {
        self.supports_tools = false;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: GenerationRequest) -> Script {
        self.requests.lock().unwrap().push(request);
        let scripted = self.scripts.lock().unwrap().pop_front();
        scripted
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Script::Fail("script exhausted".into()))
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn supports_tools(&self) -> bool {
        self.supports_tools
    }

    async fn generate(&self, request: GenerationRequest) -> Result<ModelResponse, ProviderError> {
        match self.next(request) {
            Script::Response(response) => Ok(response),
            Script::Chunks(_) => panic!("ScriptedModel: chunk script used for generate()"),
            Script::Fail(message) => Err(ProviderError::Network(message)),
        }
    }

    async fn generate_stream(&self, request: GenerationRequest) -> Result<ChunkStream, ProviderError> {
        let chunks = match self.next(request) {
            Script::Response(response) => response.into_chunks(),
            Script::Chunks(chunks) => chunks,
            Script::Fail(message) => return Err(ProviderError::Network(message)),
        };
        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

/// A tool executor over fixed descriptors.
///
/// Action `echo` returns its `parameters` bucket as JSON, action `fail`
/// always fails.
pub struct StubExecutor {
    tools: Vec<ToolDescriptor>,
    calls: Mutex<Vec<(String, ParameterBuckets)>>,
}

impl StubExecutor {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn tool_set(&self) -> ToolSet {
        ToolSet::new(self.tools.clone())
    }

    /// Executed `(action, params)` pairs, in order.
    pub fn calls(&self) -> Vec<(String, ParameterBuckets)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for StubExecutor {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(self.tools.clone())
    }

    async fn resolve(&self, tool_id: &str) -> Result<Option<ToolDescriptor>, ToolError> {
        Ok(self.tools.iter().find(|t| t.id == tool_id).cloned())
    }

    async fn execute(
        &self,
        tool: &ToolDescriptor,
        action_name: &str,
        params: ParameterBuckets,
    ) -> Result<serde_json::Value, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((action_name.to_string(), params.clone()));
        match action_name {
            "fail" => Err(ToolError::ExecutionFailed {
                tool_name: tool.name.clone(),
                reason: "stub failure".into(),
            }),
            _ => Ok(serde_json::Value::Object(params.parameters)),
        }
    }
}

fn tool_with_action(id: &str, name: &str, action: &str) -> ToolDescriptor {
    ToolDescriptor {
        id: id.into(),
        name: name.into(),
        actions: vec![ToolAction {
            name: action.into(),
            description: format!("{action} things"),
            active: true,
            query_params: None,
            headers: None,
            body: None,
            parameters: None,
        }],
    }
}

/// A tool with an `echo` action.
pub fn echo_tool(id: &str) -> ToolDescriptor {
    tool_with_action(id, "echo_tool", "echo")
}

/// A tool with a `fail` action.
pub fn failing_tool(id: &str) -> ToolDescriptor {
    tool_with_action(id, "broken_tool", "fail")
}

/// A tool call with JSON-encoded arguments.
pub fn tool_call(id: &str, name: &str, arguments: &str) -> ModelToolCall {
    ModelToolCall {
        id: Some(id.into()),
        name: name.into(),
        arguments: ToolArguments::Encoded(arguments.into()),
    }
}

/// A turn context exposing every tool in `tools`.
pub fn context<'a>(
    model: &'a ScriptedModel,
    executor: &'a StubExecutor,
    tools: &'a ToolSet,
) -> TurnContext<'a> {
    let definitions = tool_definitions(tools);
    TurnContext {
        model,
        model_id: "test-model",
        executor,
        tools,
        definitions: (!definitions.is_empty()).then_some(definitions),
    }
}
