//! WorkflowAgent: an [`Agent`] whose turn is a workflow run.

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use ragweave_agent::{Agent, AgentEvent};
use ragweave_config::WorkflowSettings;
use ragweave_core::message::ChatTurn;
use ragweave_core::retrieval::Retriever;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::engine::{GraphExecutor, MAX_EXECUTION_STEPS, NodeServices};
use crate::error::WorkflowError;
use crate::graph::WorkflowGraph;
use crate::store::{RunStatus, WorkflowRunRecord, WorkflowRunStore, WorkflowStore};

/// Where the agent gets its graph from.
pub enum WorkflowSource {
    Embedded(WorkflowGraph),
    Stored {
        workflow_id: String,
        store: Arc<dyn WorkflowStore>,
    },
}

pub struct WorkflowAgent {
    source: WorkflowSource,
    owner: String,
    services: NodeServices,
    chat_history: Vec<ChatTurn>,
    max_steps: usize,
    run_store: Option<Arc<dyn WorkflowRunStore>>,
}

impl WorkflowAgent {
    /// Run a graph supplied with the request.
    pub fn embedded(graph: WorkflowGraph, services: NodeServices) -> Self {
        Self::new(WorkflowSource::Embedded(graph), services)
    }

    /// Run the current version of a stored workflow.
    pub fn stored(
        workflow_id: impl Into<String>,
        owner: impl Into<String>,
        store: Arc<dyn WorkflowStore>,
        services: NodeServices,
    ) -> Self {
        let source = WorkflowSource::Stored {
            workflow_id: workflow_id.into(),
            store,
        };
        Self::new(source, services).with_owner(owner)
    }

    fn new(source: WorkflowSource, services: NodeServices) -> Self {
        Self {
            source,
            owner: String::new(),
            services,
            chat_history: Vec::new(),
            max_steps: MAX_EXECUTION_STEPS,
            run_store: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_chat_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.chat_history = history;
        self
    }

    pub fn with_settings(mut self, settings: &WorkflowSettings) -> Self {
        self.max_steps = settings.max_execution_steps.min(MAX_EXECUTION_STEPS);
        self
    }

    pub fn with_run_store(mut self, store: Option<Arc<dyn WorkflowRunStore>>) -> Self {
        self.run_store = store;
        self
    }

    async fn load_graph(&self) -> Result<WorkflowGraph, WorkflowError> {
        match &self.source {
            WorkflowSource::Embedded(graph) => Ok(graph.clone()),
            WorkflowSource::Stored { workflow_id, store } => store
                .load(workflow_id, &self.owner)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(workflow_id.clone())),
        }
    }

    /// Record the run. Failures are logged and otherwise ignored.
    async fn save_run(&self, executor: &GraphExecutor, query: &str, created_at: DateTime<Utc>) {
        let Some(store) = &self.run_store else {
            return;
        };

        let status = if executor.has_failures() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        let record = WorkflowRunRecord {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: executor.graph().workflow.id.clone(),
            owner: self.owner.clone(),
            status,
            inputs: serde_json::json!({ "query": query }),
            outputs: executor.state().snapshot(),
            steps: executor.execution_summary().to_vec(),
            created_at,
            completed_at: Utc::now(),
        };

        let run_id = record.id.clone();
        match store.save_run(record).await {
            Ok(()) => debug!(run_id = %run_id, ?status, "Workflow run saved"),
            Err(e) => warn!(run_id = %run_id, "Failed to save workflow run: {e}"),
        }
    }
}

impl Agent for WorkflowAgent {
    fn generate<'a>(
        &'a self,
        query: &'a str,
        _retriever: Option<&'a dyn Retriever>,
    ) -> BoxStream<'a, AgentEvent> {
        Box::pin(stream! {
            let graph = match self.load_graph().await {
                Ok(graph) => graph,
                Err(e) => {
                    error!("Failed to load workflow: {e}");
                    yield AgentEvent::error(e.to_string());
                    return;
                }
            };

            let created_at = Utc::now();
            let mut executor = GraphExecutor::new(graph, self.services.clone())
                .with_max_steps(self.max_steps);
            {
                let mut events = executor.execute(query, &self.chat_history);
                while let Some(event) = events.next().await {
                    yield event;
                }
            }
            self.save_run(&executor, query, created_at).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::graph::NodeType;
    use crate::graph::fixtures::*;
    use crate::store::{InMemoryWorkflowRunStore, InMemoryWorkflowStore};
    use crate::test_support::{ReplyModel, services};
    use async_trait::async_trait;
    use serde_json::json;

    struct BrokenRunStore;

    #[async_trait]
    impl WorkflowRunStore for BrokenRunStore {
        async fn save_run(&self, _run: WorkflowRunRecord) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("disk full".into()))
        }
    }

    fn echo_graph() -> WorkflowGraph {
        graph(vec![start(), end("You said: {{query}}")], vec![edge("start", "end")])
    }

    fn svc() -> NodeServices {
        services(Arc::new(ReplyModel::new(&[])))
    }

    #[tokio::test]
    async fn embedded_run_is_recorded() {
        let runs = Arc::new(InMemoryWorkflowRunStore::new());
        let agent = WorkflowAgent::embedded(echo_graph(), svc())
            .with_owner("ana")
            .with_run_store(Some(runs.clone()));

        let events: Vec<AgentEvent> = agent.generate("hello", None).collect().await;

        assert!(events.contains(&AgentEvent::answer("You said: hello")));
        let saved = runs.runs().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].status, RunStatus::Completed);
        assert_eq!(saved[0].owner, "ana");
        assert_eq!(saved[0].inputs, json!({"query": "hello"}));
        assert_eq!(saved[0].outputs["query"], "hello");
        assert_eq!(saved[0].steps.len(), 2);
    }

    #[tokio::test]
    async fn failed_node_marks_run_failed() {
        let runs = Arc::new(InMemoryWorkflowRunStore::new());
        let graph = graph(
            vec![start(), node("bad", NodeType::State, json!({"operations": 7}))],
            vec![edge("start", "bad")],
        );
        let agent = WorkflowAgent::embedded(graph, svc()).with_run_store(Some(runs.clone()));

        let events: Vec<AgentEvent> = agent.generate("q", None).collect().await;

        assert_eq!(events.last().unwrap().event_type(), "error");
        assert_eq!(runs.runs().await[0].status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn stored_workflow_uses_latest_version() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        store.insert("ana", echo_graph()).await;
        store
            .insert(
                "ana",
                graph(vec![start(), end("v2: {{query}}")], vec![edge("start", "end")]),
            )
            .await;
        let agent = WorkflowAgent::stored("wf", "ana", store, svc());

        let events: Vec<AgentEvent> = agent.generate("hi", None).collect().await;

        assert!(events.contains(&AgentEvent::answer("v2: hi")));
    }

    #[tokio::test]
    async fn unknown_workflow_yields_one_error() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let agent = WorkflowAgent::stored("missing", "ana", store, svc());

        let events: Vec<AgentEvent> = agent.generate("hi", None).collect().await;

        assert_eq!(events, vec![AgentEvent::error("Workflow not found: missing")]);
    }

    #[tokio::test]
    async fn run_store_failure_is_not_raised() {
        let agent = WorkflowAgent::embedded(echo_graph(), svc())
            .with_run_store(Some(Arc::new(BrokenRunStore)));

        let events: Vec<AgentEvent> = agent.generate("hello", None).collect().await;

        assert!(events.iter().all(|e| e.event_type() != "error"));
        assert!(events.contains(&AgentEvent::answer("You said: hello")));
    }

    #[tokio::test]
    async fn step_limit_follows_settings() {
        let runs = Arc::new(InMemoryWorkflowRunStore::new());
        let graph = graph(
            vec![start(), node("loop", NodeType::Note, json!({}))],
            vec![edge("start", "loop"), edge("loop", "loop")],
        );
        let agent = WorkflowAgent::embedded(graph, svc())
            .with_settings(&WorkflowSettings { max_execution_steps: 3 })
            .with_run_store(Some(runs.clone()));

        let _: Vec<AgentEvent> = agent.generate("q", None).collect().await;

        assert_eq!(runs.runs().await[0].steps.len(), 3);
    }

    #[tokio::test]
    async fn settings_cannot_raise_step_limit() {
        let runs = Arc::new(InMemoryWorkflowRunStore::new());
        let graph = graph(
            vec![start(), node("loop", NodeType::Note, json!({}))],
            vec![edge("start", "loop"), edge("loop", "loop")],
        );
        let agent = WorkflowAgent::embedded(graph, svc())
            .with_settings(&WorkflowSettings { max_execution_steps: 500 })
            .with_run_store(Some(runs.clone()));

        let _: Vec<AgentEvent> = agent.generate("q", None).collect().await;

        assert_eq!(runs.runs().await[0].steps.len(), MAX_EXECUTION_STEPS);
    }
}
