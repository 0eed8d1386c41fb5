//! ReAct pattern: Plan → Act → Observe, bounded.
//!
//! Each iteration streams a plan (emitted as `thought` events), runs the
//! tool loop against that plan, and records what happened as observations.
//! The loop stops once the model answers `SATISFIED` or the iteration cap is
//! reached. A final tool-free generation turns the observations into the
//! answer.
//!
//! # Observation format
//!
//! - the plan, verbatim
//! - one line per tool call:
//!   `Action '<action>' of tool '<tool>' with arguments '<json>' returned: '<result>'`
//! - the model's text after its tool calls

use async_stream::stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use ragweave_core::MAX_REACT_ITERATIONS;
use ragweave_core::message::Message;
use ragweave_core::retrieval::{Retriever, join_texts};
use ragweave_core::tool::ToolCallRecord;
use ragweave_telemetry::Trace;
use tracing::{debug, info, warn};

use crate::base::AgentCore;
use crate::handler::{HandlerEvent, TurnState};
use crate::prompts::{SATISFIED_MARKER, execution_prompt, final_prompt, planning_prompt};
use crate::{Agent, AgentEvent};

const TRUNCATION_SUFFIX: &str = "...[truncated]";

pub struct ReActAgent {
    core: AgentCore,
}

impl ReActAgent {
    pub(crate) fn new(core: AgentCore) -> Self {
        Self { core }
    }

    fn observations_text(&self, observations: &[String]) -> String {
        truncate_observations(observations, self.core.settings.observation_char_budget)
    }
}

/// Observations joined by newlines, cut to `budget` characters.
pub fn truncate_observations(observations: &[String], budget: usize) -> String {
    let joined = observations.join("\n");
    if joined.chars().count() <= budget {
        return joined;
    }
    let head: String = joined.chars().take(budget).collect();
    format!("{head}{TRUNCATION_SUFFIX}")
}

fn observation_line(record: &ToolCallRecord) -> String {
    format!(
        "Action '{}' of tool '{}' with arguments '{}' returned: '{}'",
        record.action_name,
        record.tool_name,
        record.arguments,
        record.result.as_deref().unwrap_or_default()
    )
}

impl Agent for ReActAgent {
    fn generate<'a>(
        &'a self,
        query: &'a str,
        retriever: Option<&'a dyn Retriever>,
    ) -> BoxStream<'a, AgentEvent> {
        let core = &self.core;
        Box::pin(stream! {
            let max_iterations = core.settings.react_max_iterations.min(MAX_REACT_ITERATIONS);
            info!(model = %core.model_id, max_iter = max_iterations, "ReAct loop starting");

            let docs = core.retrieve(query, retriever).await;
            let summaries = join_texts(&docs);
            let (tools, definitions) = core.prepare_tools().await;
            let ctx = core.context(&tools, definitions);
            let handler = core.handler();
            let mut state = TurnState::new(Vec::new(), Trace::new("react"));
            let mut observations: Vec<String> = Vec::new();
            let mut satisfied = false;

            for iteration in 1..=max_iterations {
                debug!(iteration, "ReAct iteration");

                // ── Plan ──
                let plan_request = vec![Message::user(planning_prompt(
                    query,
                    &summaries,
                    &core.system_prompt,
                    &self.observations_text(&observations),
                ))];
                let mut plan = String::new();
                let mut failure = None;
                {
                    let mut chunks = core.stream_text(plan_request, &mut state.trace);
                    while let Some(chunk) = chunks.next().await {
                        match chunk {
                            Ok(text) => {
                                plan.push_str(&text);
                                yield AgentEvent::Thought { thought: text };
                            }
                            Err(e) => {
                                failure = Some(e);
                                break;
                            }
                        }
                    }
                }
                if let Some(e) = failure {
                    warn!("ReAct planning failed: {e}");
                    core.submit_trace(state.trace);
                    yield AgentEvent::error(e.to_string());
                    return;
                }
                if !plan.is_empty() {
                    observations.push(plan.clone());
                }

                // ── Act ──
                let system = execution_prompt(
                    &core.system_prompt,
                    &plan,
                    &self.observations_text(&observations),
                );
                state.messages = core.build_messages(&system, &docs, query);
                let first_new_call = state.tool_calls.len();
                let mut post_text = String::new();
                let mut failure = None;
                {
                    let mut events = handler.run_response(&ctx, &mut state);
                    while let Some(event) = events.next().await {
                        match event {
                            Ok(HandlerEvent::Text(text)) => post_text.push_str(&text),
                            Ok(HandlerEvent::ToolCall(record)) => {
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
                    warn!("ReAct execution failed: {e}");
                    core.submit_trace(state.trace);
                    yield AgentEvent::error(e.to_string());
                    return;
                }

                // ── Observe ──
                observations.extend(state.tool_calls[first_new_call..].iter().map(observation_line));
                if !post_text.is_empty() {
                    observations.push(post_text.clone());
                }

                yield AgentEvent::Sources { sources: docs.clone() };
                yield AgentEvent::ToolCalls {
                    tool_calls: core.previews(&state.tool_calls),
                };

                if post_text.contains(SATISFIED_MARKER) {
                    debug!(iteration, "ReAct satisfied");
                    satisfied = true;
                    break;
                }
            }

            if !satisfied {
                warn!("ReAct: max iterations reached ({max_iterations})");
            }

            // ── Final answer ──
            let final_request = vec![Message::user(final_prompt(
                query,
                &self.observations_text(&observations),
            ))];
            let mut failure = None;
            {
                let mut chunks = core.stream_text(final_request, &mut state.trace);
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
                warn!("ReAct final answer failed: {e}");
                yield AgentEvent::error(e.to_string());
            }

            info!(
                tool_calls = state.tool_calls.len(),
                observations = observations.len(),
                "ReAct loop completed"
            );
            core.submit_trace(state.trace);
        })
    }
}
