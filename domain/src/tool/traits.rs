//! Tool domain traits
//!
//! Contains pure domain logic traits for argument validation.
//! The async executor port is defined in the application layer (ports).

use super::entities::{ToolCall, ToolDescriptor};
use serde_json::Value;

/// Validator for tool calls
///
/// Checks a call's arguments against the descriptor's parameter contract
/// without performing any I/O.
pub trait ToolValidator: Send + Sync {
    /// Validate a tool call against its descriptor
    fn validate(&self, call: &ToolCall, descriptor: &ToolDescriptor) -> Result<(), String>;
}

/// Validates against the JSON schema rendered by
/// [`ToolDescriptor::parameter_schema`].
///
/// Supports the subset of JSON schema that tool contracts use in practice:
/// `required`, per-property `type` (single or list), `enum`, `minimum`,
/// and `additionalProperties: false`.
#[derive(Debug, Clone, Default)]
pub struct SchemaToolValidator;

impl ToolValidator for SchemaToolValidator {
    fn validate(&self, call: &ToolCall, descriptor: &ToolDescriptor) -> Result<(), String> {
        let schema = descriptor.parameter_schema();
        let properties = schema.get("properties").and_then(|p| p.as_object());

        if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
            for name in required.iter().filter_map(|n| n.as_str()) {
                match call.arguments.get(name) {
                    None | Some(Value::Null) => {
                        return Err(format!(
                            "Missing required parameter '{}' for tool '{}'",
                            name, descriptor.name
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

        for (name, value) in &call.arguments {
            let Some(prop) = properties.and_then(|p| p.get(name)) else {
                if closed {
                    return Err(format!(
                        "Unknown parameter '{}' for tool '{}'",
                        name, descriptor.name
                    ));
                }
                continue;
            };

            // Optional parameters may be sent as explicit nulls.
            if value.is_null() && !is_required(&schema, name) {
                continue;
            }

            if let Some(expected) = prop.get("type")
                && !matches_type(value, expected)
            {
                return Err(format!(
                    "Parameter '{}' for tool '{}' must be of type {}, got {}",
                    name,
                    descriptor.name,
                    type_label(expected),
                    json_type_name(value)
                ));
            }

            if let Some(allowed) = prop.get("enum").and_then(|e| e.as_array())
                && !allowed.contains(value)
            {
                let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(format!(
                    "Parameter '{}' for tool '{}' must be one of [{}], got {}",
                    name,
                    descriptor.name,
                    options.join(", "),
                    value
                ));
            }

            if let (Some(minimum), Some(actual)) =
                (prop.get("minimum").and_then(|m| m.as_f64()), value.as_f64())
                && actual < minimum
            {
                return Err(format!(
                    "Parameter '{}' for tool '{}' must be >= {}, got {}",
                    name, descriptor.name, minimum, value
                ));
            }
        }

        Ok(())
    }
}

fn is_required(schema: &Value, name: &str) -> bool {
    schema
        .get("required")
        .and_then(|r| r.as_array())
        .is_some_and(|r| r.iter().any(|n| n.as_str() == Some(name)))
}

fn matches_type(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(t) => matches_single_type(value, t),
        Value::Array(types) => types
            .iter()
            .filter_map(|t| t.as_str())
            .any(|t| matches_single_type(value, t)),
        // Unrecognised type declarations are not enforced.
        _ => true,
    }
}

fn matches_single_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_label(expected: &Value) -> String {
    match expected {
        Value::String(t) => t.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::ToolParameter;
    use serde_json::json;

    fn image_tool() -> ToolDescriptor {
        ToolDescriptor::new("image_generation", "Generate images")
            .with_parameter(ToolParameter::new("prompt", "Prompt", true))
            .with_parameter(
                ToolParameter::new("size", "Size", false)
                    .with_allowed_values(["1024x1024", "1792x1024"]),
            )
    }

    #[test]
    fn test_validator_missing_required() {
        let call = ToolCall::new("c1", "image_generation");
        let result = SchemaToolValidator.validate(&call, &image_tool());
        assert!(result.unwrap_err().contains("Missing required parameter 'prompt'"));
    }

    #[test]
    fn test_validator_wrong_type() {
        let call = ToolCall::new("c1", "image_generation").with_arg("prompt", 42);
        let result = SchemaToolValidator.validate(&call, &image_tool());
        assert!(result.unwrap_err().contains("must be of type string"));
    }

    #[test]
    fn test_validator_enum_violation() {
        let call = ToolCall::new("c1", "image_generation")
            .with_arg("prompt", "a cat")
            .with_arg("size", "10x10");
        let result = SchemaToolValidator.validate(&call, &image_tool());
        assert!(result.unwrap_err().contains("must be one of"));
    }

    #[test]
    fn test_validator_valid_call() {
        let call = ToolCall::new("c1", "image_generation")
            .with_arg("prompt", "a cat")
            .with_arg("size", "1024x1024");
        assert!(SchemaToolValidator.validate(&call, &image_tool()).is_ok());
    }

    #[test]
    fn test_validator_optional_null_is_accepted() {
        let call = ToolCall::new("c1", "image_generation")
            .with_arg("prompt", "a cat")
            .with_arg("size", Value::Null);
        assert!(SchemaToolValidator.validate(&call, &image_tool()).is_ok());
    }

    #[test]
    fn test_validator_closed_schema_rejects_unknown() {
        let tool = ToolDescriptor::new("execute_code", "Run code").with_input_schema(json!({
            "type": "object",
            "properties": {"code": {"type": "string"}},
            "required": ["code"],
            "additionalProperties": false
        }));
        let call = ToolCall::new("c1", "execute_code")
            .with_arg("code", "print(1)")
            .with_arg("lang", "py");
        let result = SchemaToolValidator.validate(&call, &tool);
        assert!(result.unwrap_err().contains("Unknown parameter 'lang'"));
    }

    #[test]
    fn test_validator_integer_minimum() {
        let tool = ToolDescriptor::new("paged", "Paged").with_input_schema(json!({
            "type": "object",
            "properties": {"page": {"type": "integer", "minimum": 1}}
        }));
        let call = ToolCall::new("c1", "paged").with_arg("page", 0);
        assert!(SchemaToolValidator.validate(&call, &tool).is_err());

        let call = ToolCall::new("c1", "paged").with_arg("page", 1.5);
        assert!(SchemaToolValidator.validate(&call, &tool).is_err());

        let call = ToolCall::new("c1", "paged").with_arg("page", 3);
        assert!(SchemaToolValidator.validate(&call, &tool).is_ok());
    }
}
