//! Configuration loading, validation, and management for RagWeave.
//!
//! Loads configuration from `~/.ragweave/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use ragweave_core::{AgentKind, MAX_EXECUTION_STEPS, MAX_REACT_ITERATIONS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragweave/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Agent behavior
    #[serde(default)]
    pub agent: AgentSettings,

    /// Workflow execution limits
    #[serde(default)]
    pub workflow: WorkflowSettings,

    /// Diagnostics traces
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// "classic" or "react"
    #[serde(default)]
    pub kind: AgentKind,

    /// System prompt; `{summaries}` is replaced by retrieved text
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Plan/act cycles per ReAct turn
    #[serde(default = "default_react_max_iterations")]
    pub react_max_iterations: usize,

    /// Characters of observations re-embedded in ReAct prompts
    #[serde(default = "default_observation_char_budget")]
    pub observation_char_budget: usize,

    /// Result length in reported tool call previews
    #[serde(default = "default_tool_preview_chars")]
    pub tool_preview_chars: usize,

    /// Model round-trips with tool calls allowed per turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. Use the following context to answer.\n\n{summaries}".into()
}
fn default_react_max_iterations() -> usize {
    MAX_REACT_ITERATIONS
}
fn default_observation_char_budget() -> usize {
    20_000
}
fn default_tool_preview_chars() -> usize {
    50
}
fn default_max_tool_rounds() -> usize {
    25
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            kind: AgentKind::default(),
            system_prompt: default_system_prompt(),
            react_max_iterations: default_react_max_iterations(),
            observation_char_budget: default_observation_char_budget(),
            tool_preview_chars: default_tool_preview_chars(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Node executions per workflow run
    #[serde(default = "default_max_execution_steps")]
    pub max_execution_steps: usize,
}

fn default_max_execution_steps() -> usize {
    MAX_EXECUTION_STEPS
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_execution_steps: default_max_execution_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Whether turn traces are collected
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Traces kept in memory
    #[serde(default = "default_max_traces")]
    pub max_traces: usize,
}

fn default_max_traces() -> usize {
    1000
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_traces: default_max_traces(),
        }
    }
}

impl AppConfig {
    /// Read `config.toml` from [`AppConfig::config_dir`], then apply
    /// `RAGWEAVE_PROVIDER` / `RAGWEAVE_MODEL`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read one file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file absent, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), kind = %config.agent.kind, "Config loaded");
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        for (var, slot) in [
            ("RAGWEAVE_PROVIDER", &mut self.default_provider),
            ("RAGWEAVE_MODEL", &mut self.default_model),
        ] {
            if let Ok(value) = std::env::var(var) {
                *slot = value;
            }
        }
    }

    /// `$RAGWEAVE_HOME`, or `~/.ragweave`.
    pub fn config_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os("RAGWEAVE_HOME") {
            return PathBuf::from(dir);
        }
        let home = std::env::var_os(if cfg!(windows) { "USERPROFILE" } else { "HOME" })
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        home.join(".ragweave")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject settings no turn or run could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_model",
                reason: "must not be empty".into(),
            });
        }
        // (field, value, ceiling)
        let limits = [
            (
                "agent.react_max_iterations",
                self.agent.react_max_iterations,
                Some(MAX_REACT_ITERATIONS),
            ),
            ("agent.max_tool_rounds", self.agent.max_tool_rounds, None),
            (
                "workflow.max_execution_steps",
                self.workflow.max_execution_steps,
                Some(MAX_EXECUTION_STEPS),
            ),
        ];
        for (field, value, ceiling) in limits {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".into(),
                });
            }
            if let Some(ceiling) = ceiling.filter(|c| value > *c) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be at most {ceiling}"),
                });
            }
        }
        Ok(())
    }

    /// Render the configuration as TOML (for `config show`).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_model: default_model(),
            agent: AgentSettings::default(),
            workflow: WorkflowSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: String },
}
