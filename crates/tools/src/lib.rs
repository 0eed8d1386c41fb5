//! Tool plumbing for RagWeave agents.
//!
//! The model sees each tool action as a function named `<action>_<tool_id>`.
//! This crate covers the path from configured tools to that view and back:
//!
//! - [`loader`]: load the tools available to an agent, honoring an allow-list
//! - [`schema`]: turn tool actions into function schemas for the model
//! - [`parser`]: split a model's tool call back into tool id, action and arguments
//! - [`params`]: sort the arguments into the buckets the tool declares

pub mod loader;
pub mod params;
pub mod parser;
pub mod schema;

pub use loader::{NoopToolExecutor, ToolSet, load_tools};
pub use params::build_parameters;
pub use parser::{ParsedToolCall, ToolActionParser};
pub use schema::tool_definitions;
