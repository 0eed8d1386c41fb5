//! Loading the tools an agent may use.

use async_trait::async_trait;
use ragweave_core::error::ToolError;
use ragweave_core::tool::{ParameterBuckets, ToolDescriptor, ToolExecutor};
use std::collections::HashSet;
use tracing::{debug, warn};

/// The tools loaded for one turn, in load order.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: Vec<ToolDescriptor>,
}

impl ToolSet {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    /// Look up a tool by id.
    pub fn get(&self, tool_id: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.id == tool_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// Comma-separated tool ids, for "not found" messages.
    pub fn available_ids(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Load the tools available to an agent.
///
/// With an allow-list only those ids are resolved (in sorted order);
/// without one every tool the executor lists is loaded. Lookup failures are
/// logged and yield fewer tools, never an error.
pub async fn load_tools(executor: &dyn ToolExecutor, allowed: Option<&HashSet<String>>) -> ToolSet {
    let Some(allowed) = allowed else {
        return match executor.list_tools().await {
            Ok(tools) => {
                debug!(count = tools.len(), "Loaded tools");
                ToolSet::new(tools)
            }
            Err(e) => {
                warn!("Failed to list tools: {e}");
                ToolSet::default()
            }
        };
    };

    let mut ids: Vec<&String> = allowed.iter().collect();
    ids.sort();

    let mut tools = Vec::with_capacity(ids.len());
    for id in ids {
        match executor.resolve(id).await {
            Ok(Some(tool)) => tools.push(tool),
            Ok(None) => warn!(tool_id = %id, "Allowed tool not found"),
            Err(e) => warn!(tool_id = %id, "Failed to resolve tool: {e}"),
        }
    }

    debug!(count = tools.len(), "Loaded allowed tools");
    ToolSet::new(tools)
}

/// An executor with no tools, for agents that run without tool access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopToolExecutor;

#[async_trait]
impl ToolExecutor for NoopToolExecutor {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(Vec::new())
    }

    async fn resolve(&self, _tool_id: &str) -> Result<Option<ToolDescriptor>, ToolError> {
        Ok(None)
    }

    async fn execute(
        &self,
        tool: &ToolDescriptor,
        _action_name: &str,
        _params: ParameterBuckets,
    ) -> Result<serde_json::Value, ToolError> {
        Err(ToolError::NotFound(tool.id.clone()))
    }
}
