//! ClassicAgent: retrieve once, generate once, run tools until the model answers.

use async_stream::stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use ragweave_core::retrieval::Retriever;
use ragweave_telemetry::Trace;
use tracing::{info, warn};

use crate::base::AgentCore;
use crate::handler::{HandlerEvent, TurnState};
use crate::{Agent, AgentEvent};

pub struct ClassicAgent {
    core: AgentCore,
}

impl ClassicAgent {
    pub(crate) fn new(core: AgentCore) -> Self {
        Self { core }
    }
}

impl Agent for ClassicAgent {
    fn generate<'a>(
        &'a self,
        query: &'a str,
        retriever: Option<&'a dyn Retriever>,
    ) -> BoxStream<'a, AgentEvent> {
        let core = &self.core;
        Box::pin(stream! {
            info!(model = %core.model_id, "Classic turn starting");

            let docs = core.retrieve(query, retriever).await;
            let (tools, definitions) = core.prepare_tools().await;
            let messages = core.build_messages(&core.system_prompt, &docs, query);
            let mut state = TurnState::new(messages, Trace::new("classic"));
            let ctx = core.context(&tools, definitions);
            let handler = core.handler();

            // text seen since the last tool call settled
            let mut answered = false;
            let mut failure = None;
            {
                let mut events = handler.run_streaming(&ctx, &mut state);
                while let Some(event) = events.next().await {
                    match event {
                        Ok(HandlerEvent::Text(text)) => {
                            answered = true;
                            yield AgentEvent::answer(text);
                        }
                        Ok(HandlerEvent::ToolCall(record)) => {
                            answered = false;
                            yield AgentEvent::ToolCall { data: record };
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }

            if let Some(e) = failure {
                warn!("Classic turn failed: {e}");
                core.submit_trace(state.trace);
                yield AgentEvent::error(e.to_string());
                return;
            }

            if !state.tool_calls.is_empty() && !answered {
                // the model went quiet after its tools ran; ask again without tools
                let mut failure = None;
                {
                    let mut chunks = core.stream_text(state.messages.clone(), &mut state.trace);
                    while let Some(chunk) = chunks.next().await {
                        match chunk {
                            Ok(text) => {
                                yield AgentEvent::answer(text);
                            }
                            Err(e) => {
                                failure = Some(e);
                                break;
                            }
                        }
                    }
                }
                if let Some(e) = failure {
                    warn!("Classic answer generation failed: {e}");
                    core.submit_trace(state.trace);
                    yield AgentEvent::error(e.to_string());
                    return;
                }
            }

            info!(tool_calls = state.tool_calls.len(), "Classic turn completed");
            yield AgentEvent::Sources { sources: docs };
            yield AgentEvent::ToolCalls {
                tool_calls: core.previews(&state.tool_calls),
            };
            core.submit_trace(state.trace);
        })
    }
}
