//! Data model for diagnostics traces and spans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Span ──────────────────────────────────────────────────────────────────

/// What a span timed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// A model generation (streamed or not).
    LlmCall,
    /// A tool execution.
    ToolExecution,
    /// One workflow node.
    NodeExecution,
    /// Top-level turn (query → final event).
    Turn,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LlmCall => write!(f, "llm_call"),
            Self::ToolExecution => write!(f, "tool_execution"),
            Self::NodeExecution => write!(f, "node_execution"),
            Self::Turn => write!(f, "turn"),
        }
    }
}

/// One timed unit of work inside a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Span id (UUID v4).
    pub id: String,
    pub kind: SpanKind,
    /// Human-readable label (tool action, model name, node id).
    pub label: String,
    pub started_at: DateTime<Utc>,
    /// Unset while the span is open.
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    /// Outcome, set by [`Span::end`].
    pub success: Option<bool>,
    /// Free-form details such as the generation mode or node type.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Span {
    /// Open a span now.
    pub fn new(kind: SpanKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            success: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Close the span and record its duration.
    pub fn end(&mut self, success: bool) {
        let now = Utc::now();
        self.ended_at = Some(now);
        self.duration_ms = Some(
            now.signed_duration_since(self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.success = Some(success);
    }
}

// ── Trace ─────────────────────────────────────────────────────────────────

/// Everything timed during one agent turn or workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    /// What produced the trace (agent kind, workflow id).
    pub label: String,
    /// Spans in the order they closed.
    pub spans: Vec<Span>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Trace {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            spans: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn add_span(&mut self, span: Span) {
        self.spans.push(span);
    }

    /// Stamp the end time; done once the turn is over.
    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Sum of closed span durations.
    pub fn total_duration_ms(&self) -> u64 {
        self.spans.iter().filter_map(|s| s.duration_ms).sum()
    }

    fn count(&self, kind: SpanKind) -> usize {
        self.spans.iter().filter(|s| s.kind == kind).count()
    }

    /// Model round-trips, streamed or not.
    pub fn llm_call_count(&self) -> usize {
        self.count(SpanKind::LlmCall)
    }

    pub fn tool_execution_count(&self) -> usize {
        self.count(SpanKind::ToolExecution)
    }

    /// Number of workflow nodes executed in this trace.
    pub fn node_execution_count(&self) -> usize {
        self.count(SpanKind::NodeExecution)
    }

    /// Number of spans that ended unsuccessfully.
    pub fn failure_count(&self) -> usize {
        self.spans.iter().filter(|s| s.success == Some(false)).count()
    }
}

// ── Aggregated views ──────────────────────────────────────────────────────

/// Running totals across all submitted traces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub trace_count: u64,
    pub llm_calls: u64,
    pub tool_executions: u64,
    pub node_executions: u64,
    pub failures: u64,
}
