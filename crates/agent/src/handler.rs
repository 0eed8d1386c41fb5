//! ToolCallHandler: the tool-calling protocol loop.
//!
//! A model either answers or asks for tool calls. While it asks, the handler
//! resolves each call against the loaded tools, runs it through the
//! executor, appends a `function_call` / `function_response` message pair and
//! asks the model again. Streamed generations deliver calls in fragments keyed
//! by index; they are buffered until the model signals `tool_calls`.
//!
//! The handler is a lazy stream: nothing runs until the consumer polls it,
//! and dropping it stops further model and tool calls.

use async_stream::stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use ragweave_core::message::{Message, Role};
use ragweave_core::provider::{
    FinishReason, GenerationRequest, LanguageModel, ModelChunk, ModelToolCall, ProviderKind,
    ToolArguments, ToolDefinition,
};
use ragweave_core::error::ToolError;
use ragweave_core::tool::{ToolCallRecord, ToolDescriptor, ToolExecutor};
use ragweave_telemetry::{Span, SpanKind, Trace};
use ragweave_tools::{ParsedToolCall, ToolActionParser, ToolSet, build_parameters};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::AgentError;

/// What the handler yields while it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerEvent {
    /// Model text, forwarded as soon as it arrives.
    Text(String),
    /// A tool call changed status (pending, then completed or error).
    ToolCall(ToolCallRecord),
}

/// Collaborators of one turn.
pub struct TurnContext<'a> {
    pub model: &'a dyn LanguageModel,
    pub model_id: &'a str,
    pub executor: &'a dyn ToolExecutor,
    pub tools: &'a ToolSet,
    /// Schemas sent with every request; `None` disables tool calling.
    pub definitions: Option<Vec<ToolDefinition>>,
}

/// State owned by the in-flight turn.
#[derive(Debug)]
pub struct TurnState {
    pub messages: Vec<Message>,
    /// Every tool call of the turn, in execution order.
    pub tool_calls: Vec<ToolCallRecord>,
    pub trace: Trace,
}

impl TurnState {
    pub fn new(messages: Vec<Message>, trace: Trace) -> Self {
        Self {
            messages,
            tool_calls: Vec::new(),
            trace,
        }
    }
}

/// A tool call being assembled from stream fragments.
#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: String,
    arguments: ToolArguments,
}

impl PendingCall {
    fn into_call(self) -> ModelToolCall {
        ModelToolCall {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}

/// A call that resolved to a loaded tool.
struct ResolvedCall<'t> {
    parsed: ParsedToolCall,
    tool: &'t ToolDescriptor,
}

/// Drives tool calls for one provider family.
#[derive(Debug, Clone)]
pub struct ToolCallHandler {
    parser: ToolActionParser,
    response_role: Role,
    max_rounds: usize,
}

impl ToolCallHandler {
    /// Google-style providers take tool responses under the `model` role,
    /// every other provider under `tool`.
    pub fn for_provider(kind: ProviderKind) -> Self {
        let response_role = match kind {
            ProviderKind::Google => Role::Model,
            _ => Role::Tool,
        };
        Self {
            parser: ToolActionParser::for_provider(kind),
            response_role,
            max_rounds: 25,
        }
    }

    /// Limit the model round-trips that request tools.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Role used for function responses.
    pub fn response_role(&self) -> Role {
        self.response_role
    }

    /// Streaming mode: request a stream, forward text, buffer call fragments,
    /// and run the buffered calls whenever the model finishes with `tool_calls`.
    pub fn run_streaming<'a>(
        &'a self,
        ctx: &'a TurnContext<'a>,
        state: &'a mut TurnState,
    ) -> BoxStream<'a, Result<HandlerEvent, AgentError>> {
        Box::pin(stream! {
            let mut rounds = 0usize;
            loop {
                let request = GenerationRequest::new(ctx.model_id, state.messages.clone())
                    .with_tools(ctx.definitions.clone());
                let mut span = Span::new(SpanKind::LlmCall, ctx.model_id)
                    .with_meta("mode", "stream");

                let mut chunks = match ctx.model.generate_stream(request).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        span.end(false);
                        state.trace.add_span(span);
                        yield Err(AgentError::from(e));
                        return;
                    }
                };

                let mut buffer: BTreeMap<usize, PendingCall> = BTreeMap::new();
                let mut round_text = String::new();
                let mut finish = None;

                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(ModelChunk::Text { text }) => {
                            if text.is_empty() {
                                continue;
                            }
                            round_text.push_str(&text);
                            yield Ok(HandlerEvent::Text(text));
                        }
                        Ok(ModelChunk::ToolCallDelta(delta)) => {
                            let entry = buffer.entry(delta.index).or_default();
                            if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
                                entry.id = Some(id);
                            }
                            if let Some(name) = delta.name.filter(|name| !name.is_empty()) {
                                entry.name = name;
                            }
                            if let Some(fragment) = delta.arguments {
                                entry.arguments.merge(fragment);
                            }
                        }
                        Ok(ModelChunk::Finish { reason }) => {
                            finish = Some(reason);
                            break;
                        }
                        Err(e) => {
                            span.end(false);
                            state.trace.add_span(span);
                            yield Err(AgentError::from(e));
                            return;
                        }
                    }
                }
                drop(chunks);
                span.end(true);
                state.trace.add_span(span);

                if finish != Some(FinishReason::ToolCalls) {
                    if !buffer.is_empty() {
                        warn!(
                            pending = buffer.len(),
                            finish = ?finish,
                            "Stream ended with unfinished tool calls, discarding them"
                        );
                    }
                    break;
                }

                if buffer.is_empty() {
                    warn!("Model finished with tool_calls but sent none");
                    break;
                }

                rounds += 1;
                if rounds > self.max_rounds {
                    warn!(max_rounds = self.max_rounds, "Tool round limit reached, stopping");
                    break;
                }

                debug!(round = rounds, calls = buffer.len(), "Executing streamed tool calls");
                if !round_text.is_empty() {
                    state.messages.push(Message::assistant(round_text));
                }

                for (_, pending) in std::mem::take(&mut buffer) {
                    let call = pending.into_call();
                    let (record, resolved) = self.begin_call(ctx.tools, &call);
                    yield Ok(HandlerEvent::ToolCall(record.clone()));
                    let record = self.finish_call(ctx, state, &call, record, resolved).await;
                    yield Ok(HandlerEvent::ToolCall(record));
                }
            }
        })
    }

    /// Non-streaming mode: generate, and while the model asks for tools run
    /// them and generate again. The final content is yielded as text.
    pub fn run_response<'a>(
        &'a self,
        ctx: &'a TurnContext<'a>,
        state: &'a mut TurnState,
    ) -> BoxStream<'a, Result<HandlerEvent, AgentError>> {
        Box::pin(stream! {
            let mut rounds = 0usize;
            loop {
                let request = GenerationRequest::new(ctx.model_id, state.messages.clone())
                    .with_tools(ctx.definitions.clone());
                let mut span = Span::new(SpanKind::LlmCall, ctx.model_id)
                    .with_meta("mode", "generate");

                let response = match ctx.model.generate(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        span.end(false);
                        state.trace.add_span(span);
                        yield Err(AgentError::from(e));
                        return;
                    }
                };
                span.end(true);
                state.trace.add_span(span);

                let wants_tools = response.requires_tool_call() && !response.tool_calls.is_empty();
                if wants_tools {
                    rounds += 1;
                }
                if !wants_tools || rounds > self.max_rounds {
                    if wants_tools {
                        warn!(max_rounds = self.max_rounds, "Tool round limit reached, stopping");
                    } else if response.requires_tool_call() {
                        warn!("Model finished with tool_calls but sent none");
                    }
                    if let Some(content) = response.content.filter(|c| !c.is_empty()) {
                        yield Ok(HandlerEvent::Text(content));
                    }
                    break;
                }

                debug!(round = rounds, calls = response.tool_calls.len(), "Executing tool calls");
                // provider metadata is not replayed
                if let Some(content) = response.content.filter(|c| !c.is_empty()) {
                    state.messages.push(Message::assistant(content));
                }

                for call in response.tool_calls {
                    let (record, resolved) = self.begin_call(ctx.tools, &call);
                    yield Ok(HandlerEvent::ToolCall(record.clone()));
                    let record = self.finish_call(ctx, state, &call, record, resolved).await;
                    yield Ok(HandlerEvent::ToolCall(record));
                }
            }
        })
    }

    /// Parse and resolve a call, producing its pending record.
    ///
    /// Resolution failures become the call's result instead of an error.
    fn begin_call<'t>(
        &self,
        tools: &'t ToolSet,
        call: &ModelToolCall,
    ) -> (ToolCallRecord, Result<ResolvedCall<'t>, String>) {
        let call_id = call
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let Some(parsed) = self.parser.parse(call) else {
            let record =
                ToolCallRecord::pending(&call.name, call_id, &call.name, raw_arguments(call));
            return (record, Err("Failed to parse tool call.".to_string()));
        };

        match tools.get(&parsed.tool_id) {
            Some(tool) => {
                let record = ToolCallRecord::pending(
                    &tool.name,
                    call_id,
                    &call.name,
                    parsed.arguments.clone(),
                );
                (record, Ok(ResolvedCall { parsed, tool }))
            }
            None => {
                let message = format!(
                    "Tool with ID {} not found. Available tools: {}",
                    parsed.tool_id,
                    tools.available_ids()
                );
                let record =
                    ToolCallRecord::pending(&call.name, call_id, &call.name, parsed.arguments);
                (record, Err(message))
            }
        }
    }

    /// Run a resolved call, append its message pair and settle the record.
    async fn finish_call(
        &self,
        ctx: &TurnContext<'_>,
        state: &mut TurnState,
        call: &ModelToolCall,
        mut record: ToolCallRecord,
        resolved: Result<ResolvedCall<'_>, String>,
    ) -> ToolCallRecord {
        let mut span = Span::new(SpanKind::ToolExecution, &call.name);
        let step = match resolved {
            Ok(resolved) => execute(ctx.executor, resolved).await,
            Err(message) => Err(message),
        };
        span.end(step.is_ok());
        state.trace.add_span(span);

        let result = match &step {
            Ok(output) => {
                record.complete(output.clone());
                output.clone()
            }
            Err(message) => {
                warn!(call = %call.name, "Tool call failed: {message}");
                record.fail(message.clone());
                message.clone()
            }
        };

        state.messages.push(Message::function_call(
            &call.name,
            record.arguments.clone(),
            &record.call_id,
        ));
        state.messages.push(Message::function_response(
            self.response_role,
            &call.name,
            result,
            &record.call_id,
        ));
        state.tool_calls.push(record.clone());
        record
    }
}

/// Execute one resolved call; the output or the error text.
async fn execute(executor: &dyn ToolExecutor, resolved: ResolvedCall<'_>) -> Result<String, String> {
    let ResolvedCall { parsed, tool } = resolved;
    let Some(action) = tool.action(&parsed.action_name) else {
        let missing = ToolError::ActionNotFound {
            tool_name: tool.name.clone(),
            action: parsed.action_name.clone(),
        };
        return Err(format!("Error executing function: {missing}"));
    };

    let params = build_parameters(action, &parsed.arguments);
    match executor.execute(tool, &action.name, params).await {
        Ok(serde_json::Value::String(text)) => Ok(text),
        Ok(value) => Ok(value.to_string()),
        Err(e) => Err(format!("Error executing function: {e}")),
    }
}

fn raw_arguments(call: &ModelToolCall) -> serde_json::Value {
    match &call.arguments {
        ToolArguments::Encoded(raw) => serde_json::Value::String(raw.clone()),
        ToolArguments::Structured(value) => value.clone(),
    }
}
