//! Workflow execution state and state-node operations.

use ragweave_core::message::ChatTurn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Variables shared by the nodes of one workflow run.
///
/// Seeded with `query` and the serialized `chat_history`; written only by
/// state and agent nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    values: Map<String, Value>,
}

impl ExecutionState {
    pub fn new(query: &str, chat_history: &[ChatTurn]) -> Self {
        let mut values = Map::new();
        values.insert("query".into(), Value::String(query.to_string()));
        values.insert(
            "chat_history".into(),
            Value::String(serde_json::to_string(chat_history).unwrap_or_else(|_| "[]".into())),
        );
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Current values as a JSON object.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Replace every `{{name}}` with the named value.
    ///
    /// Strings are inserted verbatim, other values as JSON. Placeholders for
    /// missing or null values are left as written.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                break;
            };
            out.push_str(&rest[..open]);
            let placeholder = &rest[open..open + 2 + close + 2];
            match self.values.get(after_open[..close].trim()) {
                Some(Value::String(s)) => out.push_str(s),
                Some(Value::Null) | None => out.push_str(placeholder),
                Some(other) => out.push_str(&other.to_string()),
            }
            rest = &after_open[close + 2..];
        }

        out.push_str(rest);
        out
    }

    /// Render string values; everything else passes through.
    fn render_value(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.render(&s)),
            other => other,
        }
    }

    pub fn apply(&mut self, op: StateOperation) {
        match op {
            StateOperation::Set { key, value } => {
                let value = self.render_value(value);
                self.values.insert(key, value);
            }
            StateOperation::Increment { key, amount } => {
                // Missing or non-numeric values count as zero.
                let next = match self.values.get(&key) {
                    Some(Value::Number(n)) => match n.as_i64() {
                        Some(i) => Value::from(i.saturating_add(amount)),
                        None => Value::from(n.as_f64().unwrap_or_default() + amount as f64),
                    },
                    _ => Value::from(amount),
                };
                self.values.insert(key, next);
            }
            StateOperation::Append { key, value } => {
                let value = self.render_value(value);
                let slot = self.values.entry(key).or_insert(Value::Null);
                *slot = match slot.take() {
                    Value::Array(mut items) => {
                        items.push(value);
                        Value::Array(items)
                    }
                    Value::Null => Value::Array(vec![value]),
                    previous => Value::Array(vec![previous, value]),
                };
            }
        }
    }

    /// Apply a state node's configuration.
    pub fn apply_config(&mut self, config: StateNodeConfig) {
        if let Some(ops) = config.operations {
            for op in ops {
                self.apply(op);
            }
            return;
        }

        if let Some(variable) = config.variable {
            let value = config.value.unwrap_or(Value::Null);
            self.apply(StateOperation::Set { key: variable, value });
        }
        for (key, value) in config.updates.unwrap_or_default() {
            self.apply(StateOperation::Set { key, value });
        }
    }
}

/// One typed state update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum StateOperation {
    Set {
        key: String,
        #[serde(default)]
        value: Value,
    },
    Increment {
        key: String,
        #[serde(default = "default_amount")]
        amount: i64,
    },
    Append {
        key: String,
        #[serde(default)]
        value: Value,
    },
}

fn default_amount() -> i64 {
    1
}

/// Settings of a `state` node.
///
/// Either a list of `operations`, or the legacy single `{variable, value}`
/// update and/or an `updates` map of plain sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateNodeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<StateOperation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> ExecutionState {
        ExecutionState::new("what is up", &[])
    }

    #[test]
    fn seeded_with_query_and_history() {
        let s = state();
        assert_eq!(s.get("query"), Some(&json!("what is up")));
        assert_eq!(s.get("chat_history"), Some(&json!("[]")));
    }

    #[test]
    fn render_substitutes_known_values() {
        let mut s = state();
        s.set("n", json!(3));
        s.set("name", json!("Ada"));
        assert_eq!(s.render("Hi {{name}}, {{ n }} left"), "Hi Ada, 3 left");
    }

    #[test]
    fn render_leaves_unknown_and_null_placeholders() {
        let mut s = state();
        s.set("gone", Value::Null);
        assert_eq!(s.render("{{missing}} and {{gone}}"), "{{missing}} and {{gone}}");
        assert_eq!(s.render("open {{ never closed"), "open {{ never closed");
    }

    #[test]
    fn set_renders_string_values() {
        let mut s = state();
        s.apply(StateOperation::Set {
            key: "echo".into(),
            value: json!("Q: {{query}}"),
        });
        assert_eq!(s.get("echo"), Some(&json!("Q: what is up")));
    }

    #[test]
    fn increment_treats_missing_and_non_numeric_as_zero() {
        let mut s = state();
        s.apply(StateOperation::Increment { key: "c".into(), amount: 1 });
        s.apply(StateOperation::Increment { key: "c".into(), amount: 5 });
        assert_eq!(s.get("c"), Some(&json!(6)));

        s.set("word", json!("abc"));
        s.apply(StateOperation::Increment { key: "word".into(), amount: 4 });
        assert_eq!(s.get("word"), Some(&json!(4)));
    }

    #[test]
    fn append_builds_lists() {
        let mut s = state();
        s.apply(StateOperation::Append { key: "xs".into(), value: json!(1) });
        s.apply(StateOperation::Append { key: "xs".into(), value: json!(2) });
        assert_eq!(s.get("xs"), Some(&json!([1, 2])));

        s.set("one", json!("a"));
        s.apply(StateOperation::Append { key: "one".into(), value: json!("b") });
        assert_eq!(s.get("one"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn operations_config_parses() {
        let config: StateNodeConfig = serde_json::from_value(json!({
            "operations": [
                {"operation": "set", "key": "x", "value": "hi"},
                {"operation": "increment", "key": "n"},
                {"operation": "append", "key": "log", "value": "{{x}}"}
            ]
        }))
        .unwrap();
        let mut s = state();
        s.apply_config(config);
        assert_eq!(s.get("x"), Some(&json!("hi")));
        assert_eq!(s.get("n"), Some(&json!(1)));
        assert_eq!(s.get("log"), Some(&json!(["hi"])));
    }

    #[test]
    fn legacy_config_sets_variable_and_updates() {
        let config: StateNodeConfig = serde_json::from_value(json!({
            "variable": "topic",
            "value": "{{query}}",
            "updates": {"mode": "short"}
        }))
        .unwrap();
        let mut s = state();
        s.apply_config(config);
        assert_eq!(s.get("topic"), Some(&json!("what is up")));
        assert_eq!(s.get("mode"), Some(&json!("short")));
    }
}
