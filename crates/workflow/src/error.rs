use thiserror::Error;

/// Errors raised while loading or walking a workflow graph.
///
/// Inside a walk these never escape the event stream: they fail the node and
/// surface as `workflow_step{failed}` followed by an `error` event.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow has no start node")]
    NoStartNode,

    #[error("Edge {edge_id} points to unknown node '{target}'")]
    UnknownNode { edge_id: String, target: String },

    #[error("Invalid config on node {node_id}: {message}")]
    InvalidConfig { node_id: String, message: String },

    #[error("Agent node {node_id} failed: {message}")]
    AgentFailed { node_id: String, message: String },

    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from workflow and run stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store write failed: {0}")]
    WriteFailed(String),
}
