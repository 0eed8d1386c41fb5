//! Agent kind selection.

use serde::{Deserialize, Serialize};

/// Which reasoning strategy an agent uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Single generation with a tool loop
    #[default]
    Classic,
    /// Bounded plan / act / observe loop
    React,
}

impl AgentKind {
    /// Parse a kind from configuration; unknown names fall back to classic.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "react" => Self::React,
            _ => Self::Classic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::React => "react",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
