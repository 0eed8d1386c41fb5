//! Function schemas offered to the model.

use ragweave_core::provider::ToolDefinition;
use ragweave_core::tool::ToolAction;

use crate::loader::ToolSet;

/// One function schema per active action, named `<action>_<tool_id>`.
pub fn tool_definitions(tools: &ToolSet) -> Vec<ToolDefinition> {
    tools
        .iter()
        .flat_map(|tool| {
            tool.active_actions().map(move |action| ToolDefinition {
                name: format!("{}_{}", action.name, tool.id),
                description: action.description.clone(),
                parameters: action_parameters(action),
            })
        })
        .collect()
}

/// JSON schema of the model-fillable properties across all buckets.
///
/// Executor-side keys (`value`, `filled_by_llm`, `required`) never reach
/// the model; `required` flags become the schema's `required` list.
pub fn action_parameters(action: &ToolAction) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for (_, schema) in action.schemas() {
        let Some(schema) = schema else { continue };
        for (name, prop) in &schema.properties {
            if !prop.filled_by_llm {
                continue;
            }
            properties.insert(name.clone(), serde_json::Value::Object(prop.schema.clone()));
            if prop.required && !required.contains(name) {
                required.push(name.clone());
            }
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragweave_core::tool::ToolDescriptor;

    fn api_tool() -> ToolDescriptor {
        serde_json::from_value(serde_json::json!({
            "id": "12",
            "name": "api_tool",
            "actions": [
                {
                    "name": "create_issue",
                    "description": "Open an issue",
                    "headers": {
                        "properties": {
                            "Authorization": {
                                "type": "string",
                                "value": "Bearer secret",
                                "filled_by_llm": false
                            }
                        }
                    },
                    "body": {
                        "properties": {
                            "title": {"type": "string", "description": "Issue title", "required": true},
                            "labels": {"type": "array", "items": {"type": "string"}}
                        }
                    }
                },
                {"name": "archived", "active": false}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn names_are_action_then_tool_id() {
        let defs = tool_definitions(&ToolSet::new(vec![api_tool()]));
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "create_issue_12");
        assert_eq!(defs[0].description, "Open an issue");
    }

    #[test]
    fn only_llm_fillable_properties_exposed() {
        let defs = tool_definitions(&ToolSet::new(vec![api_tool()]));
        let params = &defs[0].parameters;

        let props = params["properties"].as_object().unwrap();
        assert!(props.contains_key("title"));
        assert!(props.contains_key("labels"));
        assert!(!props.contains_key("Authorization"));

        assert_eq!(params["required"], serde_json::json!(["title"]));
        assert!(props["title"].get("required").is_none());
        assert!(props["title"].get("filled_by_llm").is_none());
        assert_eq!(props["title"]["description"], "Issue title");
    }

    #[test]
    fn empty_set_has_no_definitions() {
        assert!(tool_definitions(&ToolSet::default()).is_empty());
    }
}
