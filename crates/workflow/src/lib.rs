//! Declarative workflows for RagWeave.
//!
//! A workflow is a graph of typed nodes (`start`, `state`, `agent`, `note`,
//! `end`) joined by edges. [`GraphExecutor`] walks it from the start node,
//! following one edge per node, and reports progress as the same
//! [`AgentEvent`](ragweave_agent::AgentEvent) stream every agent produces.
//! Agent nodes run a scoped classic or ReAct sub-agent and can stream its
//! answer straight through to the caller.
//!
//! [`WorkflowAgent`] wraps the executor behind the `Agent` trait, loading
//! graphs from a [`WorkflowStore`] and recording finished runs in a
//! [`WorkflowRunStore`].

pub mod agent;
pub mod engine;
pub mod error;
pub mod graph;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::{WorkflowAgent, WorkflowSource};
pub use engine::{
    AgentNodeConfig, EndNodeConfig, ExecutionLogEntry, GraphExecutor, MAX_EXECUTION_STEPS,
    NodeServices,
};
pub use error::{StoreError, WorkflowError};
pub use graph::{GraphIssue, NodeType, Workflow, WorkflowEdge, WorkflowGraph, WorkflowNode};
pub use state::{ExecutionState, StateNodeConfig, StateOperation};
pub use store::{
    InMemoryWorkflowRunStore, InMemoryWorkflowStore, RunStatus, WorkflowRunRecord,
    WorkflowRunStore, WorkflowStore,
};
