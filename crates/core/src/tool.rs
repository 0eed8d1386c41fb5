//! Tool domain types and the ToolExecutor trait.
//!
//! Tools are configured externally (API tools, notes, search connectors, ...).
//! The agent core only sees their descriptors and asks the executor to run an
//! action with its parameters sorted into buckets.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ToolError;

/// A configured tool with its callable actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool identifier, usually a numeric string
    pub id: String,

    /// Tool name (e.g., "api_tool", "brave")
    pub name: String,

    #[serde(default)]
    pub actions: Vec<ToolAction>,
}

impl ToolDescriptor {
    /// Find an action by name.
    pub fn action(&self, name: &str) -> Option<&ToolAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Actions that may be offered to the model.
    pub fn active_actions(&self) -> impl Iterator<Item = &ToolAction> {
        self.actions.iter().filter(|a| a.active)
    }
}

/// One callable action of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolAction {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<ParamSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<ParamSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ParamSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamSchema>,
}

impl ToolAction {
    /// The parameter buckets declared by this action, in a fixed order.
    pub fn schemas(&self) -> [(ParamBucket, Option<&ParamSchema>); 4] {
        [
            (ParamBucket::QueryParams, self.query_params.as_ref()),
            (ParamBucket::Headers, self.headers.as_ref()),
            (ParamBucket::Body, self.body.as_ref()),
            (ParamBucket::Parameters, self.parameters.as_ref()),
        ]
    }
}

fn default_true() -> bool {
    true
}

/// Properties of one parameter bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, ParamProperty>,
}

/// A single parameter property.
///
/// Carries ordinary JSON-schema keys (`type`, `description`, ...) in `schema`,
/// plus the executor-side flags which are never shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamProperty {
    /// Static value pre-filled by the tool's owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(default = "default_true")]
    pub filled_by_llm: bool,

    #[serde(default)]
    pub required: bool,

    #[serde(flatten)]
    pub schema: serde_json::Map<String, serde_json::Value>,
}

/// Which bucket a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamBucket {
    QueryParams,
    Headers,
    Body,
    Parameters,
}

/// Arguments for one action, sorted into the buckets the tool declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterBuckets {
    #[serde(default)]
    pub query_params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub headers: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub body: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ParameterBuckets {
    pub fn bucket_mut(&mut self, bucket: ParamBucket) -> &mut serde_json::Map<String, serde_json::Value> {
        match bucket {
            ParamBucket::QueryParams => &mut self.query_params,
            ParamBucket::Headers => &mut self.headers,
            ParamBucket::Body => &mut self.body,
            ParamBucket::Parameters => &mut self.parameters,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query_params.is_empty()
            && self.headers.is_empty()
            && self.body.is_empty()
            && self.parameters.is_empty()
    }
}

/// The external tool execution service.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// All tools available to the current user.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Look up a single tool by id.
    async fn resolve(&self, tool_id: &str) -> Result<Option<ToolDescriptor>, ToolError>;

    /// Run an action and return its raw result.
    async fn execute(
        &self,
        tool: &ToolDescriptor,
        action_name: &str,
        params: ParameterBuckets,
    ) -> Result<serde_json::Value, ToolError>;
}

/// Lifecycle status of a tool call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    #[default]
    Pending,
    Completed,
    Error,
}

/// A tool call made during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,

    pub call_id: String,

    /// Full `<action>_<tool_id>` name as the model used it
    pub action_name: String,

    #[serde(default)]
    pub arguments: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default)]
    pub status: ToolCallStatus,
}

impl ToolCallRecord {
    /// A pending record for a call that is about to run.
    pub fn pending(
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        action_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            action_name: action_name.into(),
            arguments,
            result: None,
            status: ToolCallStatus::Pending,
        }
    }

    pub fn complete(&mut self, result: impl Into<String>) {
        self.result = Some(result.into());
        self.status = ToolCallStatus::Completed;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.result = Some(error.into());
        self.status = ToolCallStatus::Error;
    }

    /// Copy with the result cut to `limit` characters, followed by `...`.
    pub fn preview(&self, limit: usize) -> Self {
        let mut copy = self.clone();
        if let Some(result) = &self.result
            && result.chars().count() > limit
        {
            let head: String = result.chars().take(limit).collect();
            copy.result = Some(format!("{head}..."));
        }
        copy
    }
}
