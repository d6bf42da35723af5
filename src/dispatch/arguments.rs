//! Tool arguments and their validation against a tool's input schema.
//!
//! Supports the JSON Schema keywords tool catalogs use in practice: `type`
//! (single or list), `properties`, `required`, `additionalProperties`,
//! `items` and `enum`. Unknown keywords are ignored.

use crate::error::{AppError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Arguments of a tool call: a JSON object whose values are any JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    /// Accept an absent or null value as "no arguments"; anything other than
    /// an object is a validation error.
    pub fn from_json(value: Option<Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self(map)),
            Some(other) => Err(AppError::ValidationError(format!(
                "arguments must be an object, got {}",
                type_name(&other)
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Check the arguments against `schema`, collecting every violation.
    pub fn validate(&self, schema: &Value) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        validate_value(&Value::Object(self.0.clone()), schema, "$", &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_value(value: &Value, schema: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(schema) = schema.as_object() else {
        // `true`, `{}` or anything non-object constrains nothing
        return;
    };

    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(t) => vec![t.as_str()],
            Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|t| matches_type(value, t)) {
            errors.push(format!(
                "{}: expected {}, got {}",
                path,
                allowed.join(" or "),
                type_name(value)
            ));
            return;
        }
    }

    if let Some(Value::Array(options)) = schema.get("enum") {
        if !options.contains(value) {
            errors.push(format!("{}: value {} is not one of the allowed values", path, value));
        }
    }

    match value {
        Value::Object(map) => validate_object(map, schema, path, errors),
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_value(item, item_schema, &format!("{}[{}]", path, i), errors);
                }
            }
        }
        _ => {}
    }
}

fn validate_object(
    map: &Map<String, Value>,
    schema: &Map<String, Value>,
    path: &str,
    errors: &mut Vec<String>,
) {
    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(Value::Array(required)) = schema.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !map.contains_key(name) {
                errors.push(format!("{}: missing required property '{}'", path, name));
            }
        }
    }

    for (key, child) in map {
        let child_path = format!("{}.{}", path, key);
        match properties.and_then(|p| p.get(key)) {
            Some(child_schema) => validate_value(child, child_schema, &child_path, errors),
            None => match schema.get("additionalProperties") {
                Some(Value::Bool(false)) => {
                    errors.push(format!("{}: unexpected property", child_path));
                }
                Some(extra_schema @ Value::Object(_)) => {
                    validate_value(child, extra_schema, &child_path, errors)
                }
                _ => {}
            },
        }
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
            _ => false,
        },
        // Unknown type names are not ours to reject
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
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
    use serde_json::json;

    fn args(value: Value) -> ToolArguments {
        ToolArguments::from_json(Some(value)).unwrap()
    }

    fn file_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "lines": { "type": "integer" },
                "mode": { "type": "string", "enum": ["text", "binary"] },
                "tags": { "type": "array", "items": { "type": "string" } },
                "options": {
                    "type": "object",
                    "properties": { "follow": { "type": "boolean" } },
                    "additionalProperties": false
                }
            },
            "required": ["path"]
        })
    }

    #[test]
    fn test_from_json_accepts_missing_and_null() {
        assert_eq!(ToolArguments::from_json(None).unwrap(), ToolArguments::default());
        assert_eq!(
            ToolArguments::from_json(Some(Value::Null)).unwrap(),
            ToolArguments::default()
        );
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = ToolArguments::from_json(Some(json!([1, 2]))).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("array")));
    }

    #[test]
    fn test_valid_arguments_pass() {
        let a = args(json!({
            "path": "/etc/hosts",
            "lines": 10,
            "mode": "text",
            "tags": ["a", "b"],
            "options": { "follow": true },
            "extra": "allowed at top level"
        }));
        assert_eq!(a.validate(&file_schema()), Ok(()));
    }

    #[test]
    fn test_every_violation_is_reported() {
        let a = args(json!({
            "lines": 2.5,
            "mode": "csv",
            "tags": ["ok", 3],
            "options": { "follow": "yes", "depth": 1 }
        }));
        let errors = a.validate(&file_schema()).unwrap_err();

        assert!(errors.contains(&"$: missing required property 'path'".to_string()));
        assert!(errors.contains(&"$.lines: expected integer, got number".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("$.mode: value \"csv\"")));
        assert!(errors.contains(&"$.tags[1]: expected string, got integer".to_string()));
        assert!(errors.contains(&"$.options.follow: expected boolean, got string".to_string()));
        assert!(errors.contains(&"$.options.depth: unexpected property".to_string()));
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_type_lists_and_integral_floats() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": { "type": ["string", "integer"] },
                "count": { "type": "integer" }
            }
        });

        assert!(args(json!({ "id": "abc", "count": 3.0 })).validate(&schema).is_ok());
        assert!(args(json!({ "id": 7 })).validate(&schema).is_ok());
        assert!(args(json!({ "id": true })).validate(&schema).is_err());
    }

    #[test]
    fn test_permissive_schemas() {
        let a = args(json!({ "anything": [1, { "x": null }] }));
        assert!(a.validate(&json!({})).is_ok());
        assert!(a.validate(&json!(true)).is_ok());
        assert!(a.validate(&json!({ "type": "object" })).is_ok());
    }

    #[test]
    fn test_additional_properties_schema() {
        let schema = json!({
            "type": "object",
            "additionalProperties": { "type": "number" }
        });
        assert!(args(json!({ "a": 1, "b": 2.5 })).validate(&schema).is_ok());
        assert_eq!(
            args(json!({ "a": "x" })).validate(&schema),
            Err(vec!["$.a: expected number, got string".to_string()])
        );
    }
}
