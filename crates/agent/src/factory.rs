//! AgentBuilder: configure once, build a classic or ReAct agent.

use ragweave_config::{AgentSettings, AppConfig};
use ragweave_core::AgentKind;
use ragweave_core::message::{Attachment, ChatTurn};
use ragweave_core::provider::LanguageModel;
use ragweave_core::tool::ToolExecutor;
use ragweave_telemetry::TelemetryEngine;
use std::collections::HashSet;
use std::sync::Arc;

use crate::base::AgentCore;
use crate::{Agent, ClassicAgent, ReActAgent};

/// Builder for agents sharing one model and tool executor.
pub struct AgentBuilder {
    model: Arc<dyn LanguageModel>,
    model_id: String,
    executor: Arc<dyn ToolExecutor>,
    system_prompt: String,
    chat_history: Vec<ChatTurn>,
    attachments: Vec<Attachment>,
    allowed_tool_ids: Option<HashSet<String>>,
    settings: AgentSettings,
    telemetry: Option<Arc<TelemetryEngine>>,
}

impl AgentBuilder {
    /// Start with default settings; the model id defaults to the model's name.
    pub fn new(model: Arc<dyn LanguageModel>, executor: Arc<dyn ToolExecutor>) -> Self {
        let settings = AgentSettings::default();
        Self {
            model_id: model.name().to_string(),
            model,
            executor,
            system_prompt: settings.system_prompt.clone(),
            chat_history: Vec::new(),
            attachments: Vec::new(),
            allowed_tool_ids: None,
            settings,
            telemetry: None,
        }
    }

    /// Start from the application configuration.
    pub fn from_config(
        config: &AppConfig,
        model: Arc<dyn LanguageModel>,
        executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self::new(model, executor)
            .model_id(&config.default_model)
            .settings(config.agent.clone())
    }

    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn chat_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.chat_history = history;
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Restrict the agent to these tool ids; `None` allows every tool.
    pub fn allowed_tool_ids(mut self, ids: Option<HashSet<String>>) -> Self {
        self.allowed_tool_ids = ids;
        self
    }

    /// Replace the settings; the system prompt follows them.
    pub fn settings(mut self, settings: AgentSettings) -> Self {
        self.system_prompt = settings.system_prompt.clone();
        self.settings = settings;
        self
    }

    pub fn telemetry(mut self, engine: Option<Arc<TelemetryEngine>>) -> Self {
        self.telemetry = engine;
        self
    }

    pub(crate) fn into_core(self) -> AgentCore {
        AgentCore {
            model: self.model,
            model_id: self.model_id,
            executor: self.executor,
            system_prompt: self.system_prompt,
            chat_history: self.chat_history,
            attachments: self.attachments,
            allowed_tool_ids: self.allowed_tool_ids,
            settings: self.settings,
            telemetry: self.telemetry,
        }
    }

    pub fn build_classic(self) -> ClassicAgent {
        ClassicAgent::new(self.into_core())
    }

    pub fn build_react(self) -> ReActAgent {
        ReActAgent::new(self.into_core())
    }

    /// Build the agent for `kind`.
    pub fn build(self, kind: AgentKind) -> Box<dyn Agent> {
        match kind {
            AgentKind::Classic => Box::new(self.build_classic()),
            AgentKind::React => Box::new(self.build_react()),
        }
    }
}
