//! Message domain types.
//!
//! These are the value objects exchanged with the language model:
//! caller history → agent builds messages → model generates → tool results are appended.

use serde::{Deserialize, Serialize};

use crate::tool::ToolCallRecord;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Tool execution result (OpenAI-style providers)
    Tool,
    /// Model turn (Google-style providers, also used for tool results)
    Model,
}

/// A single typed part of a structured message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    FunctionCall {
        name: String,
        args: serde_json::Value,
        call_id: String,
    },
    FunctionResponse {
        name: String,
        response: serde_json::Value,
        call_id: String,
    },
    /// Only sent to models that advertise attachment support.
    Attachment {
        name: String,
        mime_type: String,
        content: String,
    },
}

/// Message content: plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of the content (text parts only).
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    pub fn parts(&self) -> &[ContentPart] {
        match self {
            Self::Text(_) => &[],
            Self::Parts(parts) => parts,
        }
    }
}

/// A single message sent to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The content
    pub content: MessageContent,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a message from typed parts.
    pub fn with_parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }

    /// An assistant message announcing a single function call.
    pub fn function_call(
        name: impl Into<String>,
        args: serde_json::Value,
        call_id: impl Into<String>,
    ) -> Self {
        Self::with_parts(
            Role::Assistant,
            vec![ContentPart::FunctionCall {
                name: name.into(),
                args,
                call_id: call_id.into(),
            }],
        )
    }

    /// A function response under the given role (`tool` or `model`).
    ///
    /// The result is wrapped as `{"result": ...}`.
    pub fn function_response(
        role: Role,
        name: impl Into<String>,
        result: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        Self::with_parts(
            role,
            vec![ContentPart::FunctionResponse {
                name: name.into(),
                response: serde_json::json!({ "result": result.into() }),
                call_id: call_id.into(),
            }],
        )
    }

    /// Plain text of the message.
    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// A file handed in with the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Extracted text content.
    pub content: String,
}

fn default_mime_type() -> String {
    "text/plain".into()
}

/// One caller-supplied history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default)]
    pub prompt: String,

    #[serde(default)]
    pub response: String,

    /// Tool calls made while answering this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl ChatTurn {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// Checks that every function call has a matching later function response.
pub fn calls_are_answered(messages: &[Message]) -> bool {
    let mut open: Vec<&str> = Vec::new();
    for message in messages {
        for part in message.content.parts() {
            match part {
                ContentPart::FunctionCall { call_id, .. } => open.push(call_id),
                ContentPart::FunctionResponse { call_id, .. } => {
                    if let Some(pos) = open.iter().position(|id| id == call_id) {
                        open.remove(pos);
                    }
                }
                _ => {}
            }
        }
    }
    open.is_empty()
}
