//! GraphExecutor: walks a workflow graph as one lazy event stream.
//!
//! Each step emits `workflow_step{running}`, runs the node, appends a log
//! entry and emits `workflow_step{completed}` with a state snapshot, then
//! follows the node's first outgoing edge. The walk ends at an `end` node, a
//! node without outgoing edges, the first failure, or the step ceiling.

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use ragweave_agent::{Agent, AgentBuilder, AgentEvent, StepStatus};
use ragweave_config::AgentSettings;
use ragweave_core::AgentKind;
use ragweave_core::message::ChatTurn;
use ragweave_core::provider::LanguageModel;
use ragweave_core::tool::ToolExecutor;
use ragweave_telemetry::{Span, SpanKind, TelemetryEngine, Trace};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::WorkflowError;
use crate::graph::{NodeType, WorkflowGraph, WorkflowNode};
use crate::state::{ExecutionState, StateNodeConfig};

pub use ragweave_core::MAX_EXECUTION_STEPS;

const OUTPUT_SEPARATOR: &str = "\n\n";

/// What agent nodes build their sub-agents from.
#[derive(Clone)]
pub struct NodeServices {
    pub model: Arc<dyn LanguageModel>,
    pub model_id: String,
    pub executor: Arc<dyn ToolExecutor>,
    pub settings: AgentSettings,
    pub telemetry: Option<Arc<TelemetryEngine>>,
}

impl NodeServices {
    pub fn new(model: Arc<dyn LanguageModel>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            model_id: model.name().to_string(),
            model,
            executor,
            settings: AgentSettings::default(),
            telemetry: None,
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_telemetry(mut self, engine: Option<Arc<TelemetryEngine>>) -> Self {
        self.telemetry = engine;
        self
    }
}

/// Settings of an `agent` node.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentNodeConfig {
    #[serde(default)]
    pub agent_type: Option<String>,

    #[serde(default)]
    pub model_id: Option<String>,

    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Prompt rendered against state; the query when unset
    #[serde(default)]
    pub prompt_template: Option<String>,

    /// State key for the answer; `node_<id>_output` when unset
    #[serde(default)]
    pub output_variable: Option<String>,

    #[serde(default = "default_true")]
    pub stream_to_user: bool,

    /// Tool ids the sub-agent may use
    #[serde(default)]
    pub tools: Vec<String>,
}

impl Default for AgentNodeConfig {
    fn default() -> Self {
        Self {
            agent_type: None,
            model_id: None,
            system_prompt: None,
            prompt_template: None,
            output_variable: None,
            stream_to_user: true,
            tools: Vec::new(),
        }
    }
}

impl AgentNodeConfig {
    pub fn kind(&self) -> AgentKind {
        self.agent_type
            .as_deref()
            .map(AgentKind::from_name)
            .unwrap_or_default()
    }

    pub fn output_key(&self, node_id: &str) -> String {
        self.output_variable
            .clone()
            .unwrap_or_else(|| format!("node_{node_id}_output"))
    }
}

/// Settings of an `end` node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndNodeConfig {
    #[serde(default)]
    pub output_template: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Decode a node's config; a missing config means defaults.
fn node_config<T: DeserializeOwned + Default>(node: &WorkflowNode) -> Result<T, WorkflowError> {
    if node.config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(node.config.clone()).map_err(|e| WorkflowError::InvalidConfig {
        node_id: node.id.clone(),
        message: e.to_string(),
    })
}

/// One executed node. Appended once, never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub node_id: String,
    pub node_type: NodeType,
    pub node_title: String,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub state_snapshot: serde_json::Value,
}

fn step_event(
    node: &WorkflowNode,
    status: StepStatus,
    state_snapshot: Option<serde_json::Value>,
    error: Option<String>,
) -> AgentEvent {
    AgentEvent::WorkflowStep {
        node_id: node.id.clone(),
        node_type: node.node_type.to_string(),
        node_title: node.title.clone(),
        status,
        state_snapshot,
        error,
    }
}

/// Walks one workflow graph.
pub struct GraphExecutor {
    graph: WorkflowGraph,
    services: NodeServices,
    max_steps: usize,
    state: ExecutionState,
    /// Conversation of the current run, replayed to agent nodes
    chat_history: Vec<ChatTurn>,
    log: Vec<ExecutionLogEntry>,
    /// Agent nodes whose answer reached the caller so far
    streamed_outputs: usize,
}

impl GraphExecutor {
    pub fn new(graph: WorkflowGraph, services: NodeServices) -> Self {
        Self {
            graph,
            services,
            max_steps: MAX_EXECUTION_STEPS,
            state: ExecutionState::default(),
            chat_history: Vec::new(),
            log: Vec::new(),
            streamed_outputs: 0,
        }
    }

    /// Lower the step ceiling. Values above [`MAX_EXECUTION_STEPS`] are capped.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.min(MAX_EXECUTION_STEPS);
        self
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// State as left by the last run.
    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Log of the last run, in execution order.
    pub fn execution_summary(&self) -> &[ExecutionLogEntry] {
        &self.log
    }

    pub fn has_failures(&self) -> bool {
        self.log.iter().any(|e| e.status == StepStatus::Failed)
    }

    /// Run the graph for `query`. State and log are reset first.
    pub fn execute<'a>(
        &'a mut self,
        query: &'a str,
        chat_history: &'a [ChatTurn],
    ) -> BoxStream<'a, AgentEvent> {
        Box::pin(stream! {
            self.state = ExecutionState::new(query, chat_history);
            self.chat_history = chat_history.to_vec();
            self.log.clear();
            self.streamed_outputs = 0;

            let mut trace = Trace::new(format!("workflow:{}", self.graph.workflow.id));
            info!(
                workflow = %self.graph.workflow.id,
                nodes = self.graph.nodes.len(),
                "Workflow run starting"
            );

            let Some(start) = self.graph.start_node().cloned() else {
                error!(workflow = %self.graph.workflow.id, "Workflow has no start node");
                self.submit_trace(trace);
                yield AgentEvent::error(WorkflowError::NoStartNode.to_string());
                return;
            };

            let mut node = start;
            let mut steps = 0usize;
            loop {
                if steps >= self.max_steps {
                    warn!(
                        workflow = %self.graph.workflow.id,
                        max_steps = self.max_steps,
                        "Workflow step limit reached, stopping"
                    );
                    break;
                }
                steps += 1;
                debug!(step = steps, node_id = %node.id, node_type = %node.node_type, "Executing node");

                let started_at = Utc::now();
                let mut span = Span::new(SpanKind::NodeExecution, &node.id)
                    .with_meta("node_type", node.node_type.as_str());
                yield step_event(&node, StepStatus::Running, None, None);

                let outcome: Result<(), WorkflowError> = match node.node_type {
                    NodeType::Start | NodeType::Note => Ok(()),
                    NodeType::State => node_config::<StateNodeConfig>(&node)
                        .map(|config| self.state.apply_config(config)),
                    NodeType::End => match node_config::<EndNodeConfig>(&node) {
                        Ok(EndNodeConfig { output_template: Some(template) }) => {
                            let answer = self.state.render(&template);
                            yield AgentEvent::answer(answer);
                            Ok(())
                        }
                        Ok(_) => Ok(()),
                        Err(e) => Err(e),
                    },
                    NodeType::Agent => match node_config::<AgentNodeConfig>(&node) {
                        Err(e) => Err(e),
                        Ok(config) => {
                            let agent = self.sub_agent(&config);
                            let prompt = self
                                .state
                                .render(config.prompt_template.as_deref().unwrap_or("{{query}}"));

                            let mut output = String::new();
                            let mut forwarded = false;
                            let mut failure = None;
                            {
                                let mut events = agent.generate(&prompt, None);
                                while let Some(event) = events.next().await {
                                    match event {
                                        AgentEvent::Answer { answer } => {
                                            output.push_str(&answer);
                                            if config.stream_to_user {
                                                if !forwarded {
                                                    forwarded = true;
                                                    if self.streamed_outputs > 0 {
                                                        yield AgentEvent::answer(OUTPUT_SEPARATOR);
                                                    }
                                                    self.streamed_outputs += 1;
                                                }
                                                yield AgentEvent::Answer { answer };
                                            }
                                        }
                                        AgentEvent::Error { error } => {
                                            failure = Some(error);
                                            break;
                                        }
                                        event @ (AgentEvent::ToolCall { .. } | AgentEvent::Thought { .. }) => {
                                            if config.stream_to_user {
                                                yield event;
                                            }
                                        }
                                        _ => {}
                                    }
                                }
                            }

                            match failure {
                                Some(message) => Err(WorkflowError::AgentFailed {
                                    node_id: node.id.clone(),
                                    message,
                                }),
                                None => {
                                    self.state
                                        .set(config.output_key(&node.id), serde_json::Value::String(output));
                                    Ok(())
                                }
                            }
                        }
                    },
                };

                let snapshot = self.state.snapshot();
                let mut entry = ExecutionLogEntry {
                    node_id: node.id.clone(),
                    node_type: node.node_type,
                    node_title: node.title.clone(),
                    status: StepStatus::Completed,
                    started_at,
                    ended_at: Utc::now(),
                    error: None,
                    state_snapshot: snapshot.clone(),
                };

                if let Err(e) = outcome {
                    error!(node_id = %node.id, node_type = %node.node_type, "Workflow node failed: {e}");
                    span.end(false);
                    trace.add_span(span);
                    entry.status = StepStatus::Failed;
                    entry.error = Some(e.to_string());
                    self.log.push(entry);
                    yield step_event(&node, StepStatus::Failed, Some(snapshot), Some(e.to_string()));
                    yield AgentEvent::error(e.to_string());
                    break;
                }

                span.end(true);
                trace.add_span(span);
                self.log.push(entry);
                yield step_event(&node, StepStatus::Completed, Some(snapshot), None);

                if node.node_type == NodeType::End {
                    break;
                }
                let Some(edge) = self.graph.next_edge(&node.id) else {
                    debug!(node_id = %node.id, "No outgoing edge, workflow done");
                    break;
                };
                match self.graph.node(&edge.target) {
                    Some(next) => node = next.clone(),
                    None => {
                        let e = WorkflowError::UnknownNode {
                            edge_id: edge.id.clone(),
                            target: edge.target.clone(),
                        };
                        error!("{e}");
                        yield AgentEvent::error(e.to_string());
                        break;
                    }
                }
            }

            info!(
                workflow = %self.graph.workflow.id,
                steps = self.log.len(),
                failed = self.has_failures(),
                "Workflow run finished"
            );
            self.submit_trace(trace);
        })
    }

    fn sub_agent(&self, config: &AgentNodeConfig) -> Box<dyn Agent> {
        let services = &self.services;
        let mut builder = AgentBuilder::new(services.model.clone(), services.executor.clone())
            .model_id(config.model_id.as_deref().unwrap_or(&services.model_id))
            .settings(services.settings.clone())
            .telemetry(services.telemetry.clone())
            .allowed_tool_ids(Some(config.tools.iter().cloned().collect()))
            .chat_history(self.chat_history.clone());
        if let Some(prompt) = &config.system_prompt {
            builder = builder.system_prompt(prompt);
        }
        builder.build(config.kind())
    }

    fn submit_trace(&self, mut trace: Trace) {
        trace.end();
        if let Some(engine) = &self.services.telemetry {
            engine.submit(trace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::test_support::{ReplyModel, services};
    use serde_json::json;

    async fn run(executor: &mut GraphExecutor, query: &str) -> Vec<AgentEvent> {
        executor.execute(query, &[]).collect().await
    }

    fn answers(events: &[AgentEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Answer { answer } => Some(answer.clone()),
                _ => None,
            })
            .collect()
    }

    fn set_x() -> WorkflowNode {
        node(
            "set",
            NodeType::State,
            json!({"operations": [{"operation": "set", "key": "x", "value": "hi"}]}),
        )
    }

    #[tokio::test]
    async fn start_state_end_renders_answer() {
        let graph = graph(
            vec![start(), set_x(), end("{{x}} world")],
            vec![edge("start", "set"), edge("set", "end")],
        );
        let mut executor = GraphExecutor::new(graph, services(Arc::new(ReplyModel::new(&[]))));

        let events = run(&mut executor, "q").await;

        assert_eq!(answers(&events), vec!["hi world"]);
        assert_eq!(events.len(), 7);
        assert_eq!(executor.execution_summary().len(), 3);
        assert!(!executor.has_failures());
        match events.last().unwrap() {
            AgentEvent::WorkflowStep { node_id, status, state_snapshot, .. } => {
                assert_eq!(node_id, "end");
                assert_eq!(*status, StepStatus::Completed);
                assert_eq!(state_snapshot.as_ref().unwrap()["x"], "hi");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_start_yields_single_error() {
        let graph = graph(vec![set_x(), end("x")], vec![edge("set", "end")]);
        let mut executor = GraphExecutor::new(graph, services(Arc::new(ReplyModel::new(&[]))));

        let events = run(&mut executor, "q").await;

        assert_eq!(events, vec![AgentEvent::error("Workflow has no start node")]);
        assert!(executor.execution_summary().is_empty());
    }

    #[tokio::test]
    async fn only_first_edge_followed() {
        let graph = graph(
            vec![start(), end("{{x}}"), set_x()],
            vec![edge("start", "end"), edge("start", "set")],
        );
        let mut executor = GraphExecutor::new(graph, services(Arc::new(ReplyModel::new(&[]))));

        let events = run(&mut executor, "q").await;

        assert_eq!(answers(&events), vec!["{{x}}"]);
        let visited: Vec<_> = executor
            .execution_summary()
            .iter()
            .map(|e| e.node_id.as_str())
            .collect();
        assert_eq!(visited, vec!["start", "end"]);
    }

    #[tokio::test]
    async fn cyclic_graph_stops_at_step_limit() {
        let graph = graph(
            vec![
                start(),
                node("a", NodeType::Note, json!({})),
                node("b", NodeType::Note, json!({})),
            ],
            vec![edge("start", "a"), edge("a", "b"), edge("b", "a")],
        );
        let mut executor = GraphExecutor::new(graph, services(Arc::new(ReplyModel::new(&[]))));

        let events = run(&mut executor, "q").await;

        assert_eq!(executor.execution_summary().len(), MAX_EXECUTION_STEPS);
        assert!(events.iter().all(|e| e.event_type() == "workflow_step"));

        let mut limited = GraphExecutor::new(executor.graph().clone(), executor.services.clone())
            .with_max_steps(5);
        run(&mut limited, "q").await;
        assert_eq!(limited.execution_summary().len(), 5);
    }

    #[tokio::test]
    async fn raised_step_limit_is_capped() {
        let graph = graph(
            vec![
                start(),
                node("a", NodeType::Note, json!({})),
                node("b", NodeType::Note, json!({})),
            ],
            vec![edge("start", "a"), edge("a", "b"), edge("b", "a")],
        );
        let mut executor = GraphExecutor::new(graph, services(Arc::new(ReplyModel::new(&[]))))
            .with_max_steps(500);

        run(&mut executor, "q").await;

        assert_eq!(executor.execution_summary().len(), MAX_EXECUTION_STEPS);
    }

    #[tokio::test]
    async fn agent_node_streams_and_stores_answer() {
        let model = Arc::new(ReplyModel::new(&["sunny"]));
        let graph = graph(
            vec![
                start(),
                node(
                    "ask",
                    NodeType::Agent,
                    json!({"prompt_template": "Weather in {{query}}?", "output_variable": "forecast"}),
                ),
                end("Forecast: {{forecast}}"),
            ],
            vec![edge("start", "ask"), edge("ask", "end")],
        );
        let mut executor = GraphExecutor::new(graph, services(model.clone()));

        let events = run(&mut executor, "Oslo").await;

        assert_eq!(answers(&events), vec!["sunny", "Forecast: sunny"]);
        assert_eq!(executor.state().get("forecast"), Some(&json!("sunny")));
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.last().unwrap().text(), "Weather in Oslo?");
        assert!(requests[0].tools.is_none());
    }

    #[tokio::test]
    async fn agent_node_sees_conversation_history() {
        let model = Arc::new(ReplyModel::new(&["again"]));
        let graph = graph(
            vec![start(), node("ask", NodeType::Agent, json!({})), end("{{node_ask_output}}")],
            vec![edge("start", "ask"), edge("ask", "end")],
        );
        let mut executor = GraphExecutor::new(graph, services(model.clone()));
        let history = vec![ChatTurn::new("earlier question", "earlier answer")];

        let _: Vec<AgentEvent> = executor.execute("follow up", &history).collect().await;

        let requests = model.requests();
        let texts: Vec<String> = requests[0].messages.iter().map(|m| m.text()).collect();
        assert!(texts.contains(&"earlier question".to_string()));
        assert!(texts.contains(&"earlier answer".to_string()));
        assert_eq!(texts.last().map(String::as_str), Some("follow up"));
    }

    #[tokio::test]
    async fn later_agent_outputs_are_separated() {
        let model = Arc::new(ReplyModel::new(&["first", "hidden", "second"]));
        let graph = graph(
            vec![
                start(),
                node("a1", NodeType::Agent, json!({})),
                node("a2", NodeType::Agent, json!({"stream_to_user": false})),
                node("a3", NodeType::Agent, json!({})),
            ],
            vec![edge("start", "a1"), edge("a1", "a2"), edge("a2", "a3")],
        );
        let mut executor = GraphExecutor::new(graph, services(model));

        let events = run(&mut executor, "q").await;

        assert_eq!(answers(&events), vec!["first", "\n\n", "second"]);
        assert_eq!(executor.state().get("node_a2_output"), Some(&json!("hidden")));
    }

    #[tokio::test]
    async fn agent_failure_fails_node_and_stops() {
        let model = Arc::new(ReplyModel::new(&["!fail"]));
        let graph = graph(
            vec![start(), node("ask", NodeType::Agent, json!({})), end("never")],
            vec![edge("start", "ask"), edge("ask", "end")],
        );
        let mut executor = GraphExecutor::new(graph, services(model));

        let events = run(&mut executor, "q").await;

        let n = events.len();
        match &events[n - 2] {
            AgentEvent::WorkflowStep { status, error, state_snapshot, .. } => {
                assert_eq!(*status, StepStatus::Failed);
                assert!(error.as_deref().unwrap().contains("ask"));
                assert!(state_snapshot.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(events[n - 1].event_type(), "error");
        assert!(executor.has_failures());
        assert_eq!(executor.execution_summary().len(), 2);
        assert!(answers(&events).is_empty());
    }

    #[tokio::test]
    async fn invalid_state_config_fails_node() {
        let graph = graph(
            vec![
                start(),
                node("bad", NodeType::State, json!({"operations": [{"operation": "explode"}]})),
            ],
            vec![edge("start", "bad")],
        );
        let mut executor = GraphExecutor::new(graph, services(Arc::new(ReplyModel::new(&[]))));

        let events = run(&mut executor, "q").await;

        assert_eq!(events.last().unwrap().event_type(), "error");
        let entry = executor.execution_summary().last().unwrap();
        assert_eq!(entry.status, StepStatus::Failed);
        assert!(entry.error.as_deref().unwrap().contains("bad"));
    }

    #[tokio::test]
    async fn dangling_edge_stops_with_error() {
        let graph = graph(vec![start()], vec![edge("start", "ghost")]);
        let mut executor = GraphExecutor::new(graph, services(Arc::new(ReplyModel::new(&[]))));

        let events = run(&mut executor, "q").await;

        assert_eq!(events.len(), 3);
        match events.last().unwrap() {
            AgentEvent::Error { error } => assert!(error.contains("ghost")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn node_spans_reach_telemetry() {
        let engine = Arc::new(TelemetryEngine::new(10));
        let graph = graph(vec![start(), end("done")], vec![edge("start", "end")]);
        let services = services(Arc::new(ReplyModel::new(&[]))).with_telemetry(Some(engine.clone()));
        let mut executor = GraphExecutor::new(graph, services);

        run(&mut executor, "q").await;

        assert_eq!(engine.trace_count(), 1);
        assert_eq!(engine.summary().node_executions, 2);
    }
}
