//! Hard ceilings on agent loops and workflow runs.
//!
//! Configuration may lower these, never raise them.

/// Plan/act cycles in one ReAct turn.
pub const MAX_REACT_ITERATIONS: usize = 10;

/// Node executions in one workflow run.
pub const MAX_EXECUTION_STEPS: usize = 50;
