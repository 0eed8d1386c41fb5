//! Agent-level streaming events.
//!
//! `AgentEvent` is what every agent (and the workflow engine) yields to the
//! caller. It serializes with a `type` tag so a transport can forward it as
//! JSON lines or server-sent events unchanged.

use ragweave_core::retrieval::SourceDocument;
use ragweave_core::tool::ToolCallRecord;
use serde::{Deserialize, Serialize};

/// Status of a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Events emitted by an agent turn.
///
/// | type            | meaning                                       |
/// |-----------------|-----------------------------------------------|
/// | `answer`        | partial answer text                           |
/// | `thought`       | ReAct planning text                           |
/// | `tool_call`     | tool call lifecycle update                    |
/// | `sources`       | documents the answer was grounded on          |
/// | `tool_calls`    | tool calls of the turn, results cut to preview |
/// | `workflow_step` | a workflow node changed status                |
/// | `error`         | the turn failed; nothing follows              |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Answer {
        answer: String,
    },

    Thought {
        thought: String,
    },

    ToolCall {
        data: ToolCallRecord,
    },

    Sources {
        sources: Vec<SourceDocument>,
    },

    ToolCalls {
        tool_calls: Vec<ToolCallRecord>,
    },

    WorkflowStep {
        node_id: String,
        node_type: String,
        node_title: String,
        status: StepStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state_snapshot: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    Error {
        error: String,
    },
}

impl AgentEvent {
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer {
            answer: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Wire name of this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Answer { .. } => "answer",
            Self::Thought { .. } => "thought",
            Self::ToolCall { .. } => "tool_call",
            Self::Sources { .. } => "sources",
            Self::ToolCalls { .. } => "tool_calls",
            Self::WorkflowStep { .. } => "workflow_step",
            Self::Error { .. } => "error",
        }
    }
}
