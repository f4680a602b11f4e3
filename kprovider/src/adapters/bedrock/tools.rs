//! Tool definition translation into Converse `toolSpec` entries.
//!
//! A property whose declared type is a list containing `"null"` is optional;
//! every other property, including one with a single non-list type, is required.

use serde_json::Value;

use crate::ToolDefinition;

use super::types::{
    BedrockTool, ToolConfig, ToolInputSchema, ToolJsonSchema, ToolProperties, ToolProperty,
    ToolSpec,
};

const DEFAULT_PROPERTY_TYPE: &str = "string";

/// Builds the tool config block, or `None` when no tools were supplied.
pub fn translate_tools(tools: &[ToolDefinition]) -> Option<ToolConfig> {
    if tools.is_empty() {
        return None;
    }

    Some(ToolConfig {
        tools: tools.iter().map(translate_tool).collect(),
    })
}

pub fn translate_tool(tool: &ToolDefinition) -> BedrockTool {
    let mut properties = Vec::new();
    let mut required = Vec::new();

    if let Some(declared) = tool.parameters.get("properties").and_then(Value::as_object) {
        for (name, info) in declared {
            let type_decl = info.get("type");
            if !is_nullable(type_decl) {
                required.push(name.clone());
            }

            let description = info
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            properties.push((
                name.clone(),
                ToolProperty {
                    property_type: effective_type(type_decl),
                    description,
                },
            ));
        }
    }

    BedrockTool {
        tool_spec: ToolSpec {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: ToolInputSchema {
                json: ToolJsonSchema {
                    schema_type: "object",
                    properties: ToolProperties(properties),
                    required,
                },
            },
        },
    }
}

/// First non-`"null"` entry of a type list, the type itself when it is a plain string.
fn effective_type(type_decl: Option<&Value>) -> String {
    let selected = match type_decl {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .find(|entry| *entry != "null"),
        Some(Value::String(single)) => Some(single.as_str()),
        _ => None,
    };

    selected
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_PROPERTY_TYPE)
        .to_string()
}

fn is_nullable(type_decl: Option<&Value>) -> bool {
    match type_decl {
        Some(Value::Array(entries)) => entries.iter().any(|entry| entry == "null"),
        Some(Value::String(single)) => single == "null",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn search_tool() -> ToolDefinition {
        ToolDefinition::new(
            "search",
            "Search the web",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search terms"},
                    "page": {"type": ["integer", "null"]},
                    "region": {"type": ["null", "string"], "description": "ISO code"},
                    "raw": {}
                }
            }),
        )
    }

    #[test]
    fn null_marks_optional_and_plain_types_are_required() {
        let tool = translate_tool(&search_tool());
        let schema = &tool.tool_spec.input_schema.json;

        assert_eq!(schema.required, vec!["query".to_string(), "raw".to_string()]);
        assert_eq!(
            schema.properties.get("page").map(|p| p.property_type.as_str()),
            Some("integer")
        );
        assert_eq!(
            schema.properties.get("region").map(|p| p.property_type.as_str()),
            Some("string")
        );
        assert_eq!(
            schema.properties.get("raw").map(|p| p.property_type.as_str()),
            Some("string")
        );
    }

    #[test]
    fn property_order_and_descriptions_are_preserved() {
        let tool = translate_tool(&search_tool());
        let schema = &tool.tool_spec.input_schema.json;

        assert_eq!(
            schema.properties.names().collect::<Vec<_>>(),
            vec!["query", "page", "region", "raw"]
        );
        assert_eq!(
            schema.properties.get("page").map(|p| p.description.as_str()),
            Some("")
        );
    }

    #[test]
    fn type_list_of_only_null_defaults_to_string() {
        assert_eq!(effective_type(Some(&json!(["null"]))), "string");
        assert_eq!(effective_type(Some(&json!([]))), "string");
        assert!(!is_nullable(Some(&json!([]))));
    }

    #[test]
    fn wire_shape_matches_converse_tool_spec() {
        let config = translate_tools(&[ToolDefinition::new(
            "clock",
            "Current time",
            json!({"properties": {"tz": {"type": ["string", "null"]}}}),
        )])
        .expect("one tool yields a config");

        let value = serde_json::to_value(&config).expect("config should serialize");
        assert_eq!(
            value,
            json!({"tools": [{"toolSpec": {
                "name": "clock",
                "description": "Current time",
                "inputSchema": {"json": {
                    "type": "object",
                    "properties": {"tz": {"type": "string", "description": ""}},
                    "required": []
                }}
            }}]})
        );
    }

    #[test]
    fn no_tools_means_no_config() {
        assert!(translate_tools(&[]).is_none());
    }

    #[test]
    fn missing_properties_yield_empty_schema() {
        let tool = translate_tool(&ToolDefinition::new("noop", "", json!({})));
        assert!(tool.tool_spec.input_schema.json.properties.0.is_empty());
        assert!(tool.tool_spec.input_schema.json.required.is_empty());
    }
}
