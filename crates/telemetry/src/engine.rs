//! Thread-safe telemetry engine: stores finished traces and keeps totals.

use crate::model::*;
use std::sync::{PoisonError, RwLock};

/// The core telemetry engine.
///
/// Thread-safe via `RwLock`. Holds at most `max_traces` traces, dropping the
/// oldest first.
pub struct TelemetryEngine {
    max_traces: usize,
    /// Submitted traces (most recent last).
    traces: RwLock<Vec<Trace>>,
    /// Running totals.
    totals: RwLock<TelemetrySummary>,
}

impl TelemetryEngine {
    pub fn new(max_traces: usize) -> Self {
        Self {
            max_traces: max_traces.max(1),
            traces: RwLock::new(Vec::new()),
            totals: RwLock::new(TelemetrySummary::default()),
        }
    }

    /// Store a finished trace and fold it into the totals.
    pub fn submit(&self, trace: Trace) {
        {
            let mut totals = self.totals.write().unwrap_or_else(PoisonError::into_inner);
            totals.trace_count += 1;
            totals.llm_calls += trace.llm_call_count() as u64;
            totals.tool_executions += trace.tool_execution_count() as u64;
            totals.node_executions += trace.node_execution_count() as u64;
            totals.failures += trace.failure_count() as u64;
        }

        tracing::debug!(
            trace_id = %trace.id,
            label = %trace.label,
            spans = trace.spans.len(),
            "Trace submitted"
        );

        let mut traces = self.traces.write().unwrap_or_else(PoisonError::into_inner);
        if traces.len() >= self.max_traces {
            let excess = traces.len() + 1 - self.max_traces;
            traces.drain(..excess);
        }
        traces.push(trace);
    }

    /// The most recent traces, newest first.
    pub fn recent_traces(&self, limit: usize) -> Vec<Trace> {
        let traces = self.traces.read().unwrap_or_else(PoisonError::into_inner);
        traces.iter().rev().take(limit).cloned().collect()
    }

    /// Look up a stored trace by id.
    pub fn get_trace(&self, trace_id: &str) -> Option<Trace> {
        let traces = self.traces.read().unwrap_or_else(PoisonError::into_inner);
        traces.iter().find(|t| t.id == trace_id).cloned()
    }

    /// Number of traces currently stored.
    pub fn trace_count(&self) -> usize {
        self.traces.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Totals across every trace ever submitted.
    pub fn summary(&self) -> TelemetrySummary {
        self.totals.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new(1000)
    }
}
