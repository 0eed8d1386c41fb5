//! ToolActionParser: maps a model tool call back to `(tool_id, action, arguments)`.

use ragweave_core::provider::{ModelToolCall, ProviderKind, ToolArguments};
use tracing::{error, warn};

/// A tool call resolved into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolCall {
    pub tool_id: String,
    pub action_name: String,
    pub arguments: serde_json::Value,
}

/// Parses `<action_name>_<tool_id>` calls.
///
/// OpenAI-family providers deliver arguments as a JSON string, Google-style
/// providers as an object. Both shapes are accepted whatever the provider.
#[derive(Debug, Clone, Copy)]
pub struct ToolActionParser {
    kind: ProviderKind,
}

impl ToolActionParser {
    pub fn for_provider(kind: ProviderKind) -> Self {
        Self { kind }
    }

    pub fn provider(&self) -> ProviderKind {
        self.kind
    }

    /// Split a call into tool id, action name and decoded arguments.
    ///
    /// Returns `None` for a malformed name (no underscore) or arguments
    /// that are not valid JSON.
    pub fn parse(&self, call: &ModelToolCall) -> Option<ParsedToolCall> {
        let Some((action_name, tool_id)) = call.name.rsplit_once('_') else {
            warn!(
                provider = ?self.kind,
                name = %call.name,
                "Malformed tool call name, expected <action>_<tool_id>"
            );
            return None;
        };

        if tool_id.is_empty() || !tool_id.chars().all(|c| c.is_ascii_digit()) {
            warn!(
                provider = ?self.kind,
                tool_id = %tool_id,
                "Tool id is not numeric, the model may have invented this tool"
            );
        }

        let arguments = match &call.arguments {
            ToolArguments::Encoded(raw) if raw.trim().is_empty() => serde_json::json!({}),
            ToolArguments::Encoded(raw) => match serde_json::from_str(raw) {
                Ok(value) => value,
                Err(e) => {
                    error!(
                        provider = ?self.kind,
                        name = %call.name,
                        "Failed to decode tool call arguments: {e}"
                    );
                    return None;
                }
            },
            ToolArguments::Structured(serde_json::Value::Null) => serde_json::json!({}),
            ToolArguments::Structured(value) => value.clone(),
        };

        Some(ParsedToolCall {
            tool_id: tool_id.to_string(),
            action_name: action_name.to_string(),
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: ToolArguments) -> ModelToolCall {
        ModelToolCall {
            id: Some("call_1".into()),
            name: name.into(),
            arguments,
        }
    }

    fn encoded(s: &str) -> ToolArguments {
        ToolArguments::Encoded(s.into())
    }

    #[test]
    fn splits_on_last_underscore() {
        let parser = ToolActionParser::for_provider(ProviderKind::OpenAi);
        let parsed = parser
            .parse(&call("get_weather_42", encoded(r#"{"city":"Oslo"}"#)))
            .unwrap();
        assert_eq!(parsed.tool_id, "42");
        assert_eq!(parsed.action_name, "get_weather");
        assert_eq!(parsed.arguments["city"], "Oslo");
    }

    #[test]
    fn name_without_underscore_is_rejected() {
        let parser = ToolActionParser::for_provider(ProviderKind::OpenAi);
        for name in ["search", "lookup42", ""] {
            assert!(parser.parse(&call(name, encoded("{}"))).is_none(), "{name}");
        }
    }

    #[test]
    fn non_numeric_id_still_parses() {
        let parser = ToolActionParser::for_provider(ProviderKind::OpenAi);
        let parsed = parser.parse(&call("search_docs", encoded("{}"))).unwrap();
        assert_eq!(parsed.tool_id, "docs");
        assert_eq!(parsed.action_name, "search");
    }

    #[test]
    fn invalid_json_is_rejected() {
        let parser = ToolActionParser::for_provider(ProviderKind::OpenAi);
        assert!(parser.parse(&call("get_1", encoded("{\"a\":"))).is_none());
    }

    #[test]
    fn empty_arguments_decode_to_object() {
        let parser = ToolActionParser::for_provider(ProviderKind::OpenAi);
        let parsed = parser.parse(&call("get_1", encoded(""))).unwrap();
        assert_eq!(parsed.arguments, serde_json::json!({}));
    }

    #[test]
    fn structured_arguments_pass_through() {
        let parser = ToolActionParser::for_provider(ProviderKind::Google);
        let args = serde_json::json!({"q": "rust", "limit": 3});
        let parsed = parser
            .parse(&call("search_7", ToolArguments::Structured(args.clone())))
            .unwrap();
        assert_eq!(parsed.arguments, args);
        assert_eq!(parser.provider(), ProviderKind::Google);
    }
}
