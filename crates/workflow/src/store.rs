//! Workflow and run persistence contracts, with in-memory backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine::ExecutionLogEntry;
use crate::error::StoreError;
use crate::graph::WorkflowGraph;

/// Where workflow definitions live.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// The current version of a workflow owned by `owner`.
    async fn load(&self, workflow_id: &str, owner: &str)
    -> Result<Option<WorkflowGraph>, StoreError>;
}

/// Where finished runs are recorded.
#[async_trait]
pub trait WorkflowRunStore: Send + Sync {
    async fn save_run(&self, run: WorkflowRunRecord) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// One finished workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRunRecord {
    pub id: String,
    pub workflow_id: String,
    pub owner: String,
    pub status: RunStatus,
    /// `{"query": ...}`
    pub inputs: serde_json::Value,
    /// Final execution state
    pub outputs: serde_json::Value,
    pub steps: Vec<ExecutionLogEntry>,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Keeps every saved version of each workflow; `load` returns the latest.
pub struct InMemoryWorkflowStore {
    versions: Arc<RwLock<HashMap<(String, String), Vec<WorkflowGraph>>>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self {
            versions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Save a new version of `graph` for `owner`. Returns its version number, from 1.
    pub async fn insert(&self, owner: &str, graph: WorkflowGraph) -> usize {
        let key = (graph.workflow.id.clone(), owner.to_string());
        let mut versions = self.versions.write().await;
        let list = versions.entry(key).or_default();
        list.push(graph);
        list.len()
    }

    pub async fn version_count(&self, workflow_id: &str, owner: &str) -> usize {
        let key = (workflow_id.to_string(), owner.to_string());
        self.versions.read().await.get(&key).map_or(0, Vec::len)
    }
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn load(
        &self,
        workflow_id: &str,
        owner: &str,
    ) -> Result<Option<WorkflowGraph>, StoreError> {
        let key = (workflow_id.to_string(), owner.to_string());
        let versions = self.versions.read().await;
        Ok(versions.get(&key).and_then(|list| list.last()).cloned())
    }
}

/// Run records kept in a Vec, oldest first.
pub struct InMemoryWorkflowRunStore {
    runs: Arc<RwLock<Vec<WorkflowRunRecord>>>,
}

impl InMemoryWorkflowRunStore {
    pub fn new() -> Self {
        Self {
            runs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn runs(&self) -> Vec<WorkflowRunRecord> {
        self.runs.read().await.clone()
    }
}

impl Default for InMemoryWorkflowRunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowRunStore for InMemoryWorkflowRunStore {
    async fn save_run(&self, run: WorkflowRunRecord) -> Result<(), StoreError> {
        self.runs.write().await.push(run);
        Ok(())
    }
}
