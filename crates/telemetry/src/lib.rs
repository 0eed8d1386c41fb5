//! Diagnostics traces for RagWeave.
//!
//! Every agent turn owns a [`Trace`] and records a [`Span`] for each model
//! round-trip, tool execution and workflow node. Finished traces can be
//! handed to a shared [`TelemetryEngine`] which keeps the most recent ones
//! and running totals.

pub mod engine;
pub mod model;

pub use engine::TelemetryEngine;
pub use model::{Span, SpanKind, TelemetrySummary, Trace};
