//! Workflow graph model: nodes, edges and structural checks.
//!
//! Graphs are plain JSON documents:
//!
//! ```json
//! {
//!   "workflow": {"id": "wf1", "name": "Greeter"},
//!   "nodes": [
//!     {"id": "s", "type": "start", "title": "Start"},
//!     {"id": "e", "type": "end", "title": "End", "config": {"output_template": "{{query}}"}}
//!   ],
//!   "edges": [{"id": "e1", "source": "s", "target": "e"}]
//! }
//! ```
//!
//! Walks never branch: only a node's first outgoing edge (declaration order)
//! is ever followed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::error::WorkflowError;

/// Workflow metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Kind of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Start,
    Agent,
    State,
    Note,
    End,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Agent => "agent",
            Self::State => "state",
            Self::Note => "note",
            Self::End => "end",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default)]
    pub title: String,

    /// Type-specific settings, decoded by the node's handler
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub workflow: Workflow,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

/// A structural problem found by [`WorkflowGraph::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphIssue {
    #[error("no start node")]
    MissingStart,

    #[error("{count} start nodes; only '{first}' will be used")]
    MultipleStarts { count: usize, first: String },

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("edge {edge_id} references unknown node '{node_id}'")]
    DanglingEdge { edge_id: String, node_id: String },

    #[error("node '{node_id}' has {count} outgoing edges; only the first is followed")]
    Branching { node_id: String, count: usize },
}

impl WorkflowGraph {
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The node a walk starts from. With several start nodes the first wins.
    pub fn start_node(&self) -> Option<&WorkflowNode> {
        let mut starts = self.nodes.iter().filter(|n| n.node_type == NodeType::Start);
        let first = starts.next()?;
        let extra = starts.count();
        if extra > 0 {
            warn!(
                workflow = %self.workflow.id,
                start_nodes = extra + 1,
                "Multiple start nodes, using '{}'", first.id
            );
        }
        Some(first)
    }

    /// Edges leaving `node_id`, in declaration order.
    pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &WorkflowEdge> {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// The edge a walk follows out of `node_id`.
    pub fn next_edge(&self, node_id: &str) -> Option<&WorkflowEdge> {
        self.outgoing(node_id).next()
    }

    /// Structural problems, in a stable order. Empty means runnable.
    ///
    /// Branching is reported but does not stop a walk.
    pub fn validate(&self) -> Vec<GraphIssue> {
        let mut issues = Vec::new();

        let starts: Vec<&WorkflowNode> = self
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Start)
            .collect();
        match starts.as_slice() {
            [] => issues.push(GraphIssue::MissingStart),
            [_] => {}
            [first, ..] => issues.push(GraphIssue::MultipleStarts {
                count: starts.len(),
                first: first.id.clone(),
            }),
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(GraphIssue::DuplicateNode(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                if !seen.contains(end.as_str()) {
                    issues.push(GraphIssue::DanglingEdge {
                        edge_id: edge.id.clone(),
                        node_id: end.clone(),
                    });
                }
            }
        }

        for node in &self.nodes {
            let count = self.outgoing(&node.id).count();
            if count > 1 {
                issues.push(GraphIssue::Branching {
                    node_id: node.id.clone(),
                    count,
                });
            }
        }

        issues
    }

    /// Whether any issue would prevent or corrupt a walk.
    pub fn is_runnable(&self) -> bool {
        self.validate()
            .iter()
            .all(|i| matches!(i, GraphIssue::Branching { .. } | GraphIssue::MultipleStarts { .. }))
    }
}
