//! Behavior shared by every agent: retrieval, tool loading, message
//! building, plain streamed generations and trace submission.

use async_stream::stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use ragweave_config::AgentSettings;
use ragweave_core::message::{Attachment, ChatTurn, ContentPart, Message, Role};
use ragweave_core::provider::{GenerationRequest, LanguageModel, ModelChunk, ToolDefinition};
use ragweave_core::retrieval::{Retriever, SourceDocument, join_texts};
use ragweave_core::tool::{ToolCallRecord, ToolExecutor};
use ragweave_telemetry::{Span, SpanKind, TelemetryEngine, Trace};
use ragweave_tools::{ToolSet, load_tools, tool_definitions};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::AgentError;
use crate::handler::{ToolCallHandler, TurnContext};

/// The configured collaborators and settings of an agent.
pub struct AgentCore {
    pub(crate) model: Arc<dyn LanguageModel>,
    pub(crate) model_id: String,
    pub(crate) executor: Arc<dyn ToolExecutor>,
    pub(crate) system_prompt: String,
    pub(crate) chat_history: Vec<ChatTurn>,
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) allowed_tool_ids: Option<HashSet<String>>,
    pub(crate) settings: AgentSettings,
    pub(crate) telemetry: Option<Arc<TelemetryEngine>>,
}

impl AgentCore {
    pub(crate) fn handler(&self) -> ToolCallHandler {
        ToolCallHandler::for_provider(self.model.kind()).with_max_rounds(self.settings.max_tool_rounds)
    }

    /// Documents for the query; a failing retriever counts as no documents.
    pub(crate) async fn retrieve(
        &self,
        query: &str,
        retriever: Option<&dyn Retriever>,
    ) -> Vec<SourceDocument> {
        let Some(retriever) = retriever else {
            return Vec::new();
        };
        match retriever.search(query).await {
            Ok(docs) => {
                debug!(count = docs.len(), "Retrieved documents");
                docs
            }
            Err(e) => {
                warn!("Retrieval failed, continuing without documents: {e}");
                Vec::new()
            }
        }
    }

    /// Load this turn's tools and their schemas.
    ///
    /// Schemas are only offered when the model supports tools and at least
    /// one exists.
    pub(crate) async fn prepare_tools(&self) -> (ToolSet, Option<Vec<ToolDefinition>>) {
        let tools = load_tools(self.executor.as_ref(), self.allowed_tool_ids.as_ref()).await;
        let definitions = tool_definitions(&tools);
        let offered = (self.model.supports_tools() && !definitions.is_empty()).then_some(definitions);
        (tools, offered)
    }

    pub(crate) fn context<'a>(
        &'a self,
        tools: &'a ToolSet,
        definitions: Option<Vec<ToolDefinition>>,
    ) -> TurnContext<'a> {
        TurnContext {
            model: self.model.as_ref(),
            model_id: &self.model_id,
            executor: self.executor.as_ref(),
            tools,
            definitions,
        }
    }

    /// System prompt, replayed history, then the query.
    ///
    /// `{summaries}` in the system prompt is replaced by the document texts.
    pub(crate) fn build_messages(
        &self,
        system_prompt: &str,
        docs: &[SourceDocument],
        query: &str,
    ) -> Vec<Message> {
        let mut messages = vec![Message::system(
            system_prompt.replace("{summaries}", &join_texts(docs)),
        )];

        let response_role = self.handler().response_role();
        for turn in &self.chat_history {
            if !turn.prompt.is_empty() && !turn.response.is_empty() {
                messages.push(Message::user(&turn.prompt));
                messages.push(Message::assistant(&turn.response));
            }
            for call in &turn.tool_calls {
                let call_id = if call.call_id.is_empty() {
                    uuid::Uuid::new_v4().to_string()
                } else {
                    call.call_id.clone()
                };
                messages.push(Message::function_call(
                    &call.action_name,
                    call.arguments.clone(),
                    &call_id,
                ));
                messages.push(Message::function_response(
                    response_role,
                    &call.action_name,
                    call.result.clone().unwrap_or_default(),
                    &call_id,
                ));
            }
        }

        messages.push(self.query_message(query));
        messages
    }

    /// The user message for the query, with attachments as parts when the
    /// model takes them and inlined as text otherwise.
    fn query_message(&self, query: &str) -> Message {
        if self.attachments.is_empty() {
            return Message::user(query);
        }

        if self.model.supports_attachments() {
            let mut parts = vec![ContentPart::Text {
                text: query.to_string(),
            }];
            parts.extend(self.attachments.iter().map(|a| ContentPart::Attachment {
                name: a.name.clone(),
                mime_type: a.mime_type.clone(),
                content: a.content.clone(),
            }));
            return Message::with_parts(Role::User, parts);
        }

        let mut text = query.to_string();
        for attachment in &self.attachments {
            text.push_str(&format!(
                "\n\nAttached file: {}\n{}",
                attachment.name, attachment.content
            ));
        }
        Message::user(text)
    }

    /// A tool-free streamed generation, yielding its text chunks.
    pub(crate) fn stream_text<'a>(
        &'a self,
        messages: Vec<Message>,
        trace: &'a mut Trace,
    ) -> BoxStream<'a, Result<String, AgentError>> {
        Box::pin(stream! {
            let mut span = Span::new(SpanKind::LlmCall, &self.model_id).with_meta("mode", "stream");
            let request = GenerationRequest::new(&self.model_id, messages);
            let mut chunks = match self.model.generate_stream(request).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    span.end(false);
                    trace.add_span(span);
                    yield Err(AgentError::from(e));
                    return;
                }
            };

            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(ModelChunk::Text { text }) if !text.is_empty() => {
                        yield Ok(text);
                    }
                    Ok(ModelChunk::Finish { .. }) => break,
                    Ok(_) => {}
                    Err(e) => {
                        span.end(false);
                        trace.add_span(span);
                        yield Err(AgentError::from(e));
                        return;
                    }
                }
            }
            span.end(true);
            trace.add_span(span);
        })
    }

    /// Copies of the records with results cut to the preview length.
    pub(crate) fn previews(&self, records: &[ToolCallRecord]) -> Vec<ToolCallRecord> {
        records
            .iter()
            .map(|r| r.preview(self.settings.tool_preview_chars))
            .collect()
    }

    /// Close the turn's trace and hand it to the telemetry engine.
    pub(crate) fn submit_trace(&self, mut trace: Trace) {
        trace.end();
        if let Some(engine) = &self.telemetry {
            engine.submit(trace);
        }
    }
}
