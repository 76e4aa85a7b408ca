//! Structural JSON-schema validation.
//!
//! Documents declare, inside their `#document_info` directive, the schemas
//! their directives must satisfy. This module implements the keyword
//! subset those declarations use: `type`, `properties`, `required`,
//! `additionalProperties` (boolean form), `items`, `pattern`, and `enum`.
//! Every violation is collected; validation never stops at the first
//! failure.

use std::fmt;

use regex::Regex;
use serde_json::Value;

/// One schema violation, anchored to a JSON-pointer-style path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Path of the offending value; empty for the root.
    pub path: String,
    /// What failed.
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "at document root: {}", self.message)
        } else {
            write!(f, "at {}: {}", self.path, self.message)
        }
    }
}

/// Validate `value` against `schema`, collecting every violation.
#[must_use]
pub fn validate(value: &Value, schema: &Value) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();
    validate_at(value, schema, "", &mut violations);
    violations
}

fn push(out: &mut Vec<SchemaViolation>, path: &str, message: String) {
    out.push(SchemaViolation {
        path: path.to_owned(),
        message,
    });
}

fn validate_at(value: &Value, schema: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
    let Some(schema) = schema.as_object() else {
        // Schemas without constraints (or non-object schemas) accept
        // anything.
        return;
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(value, expected) {
            push(
                out,
                path,
                format!("expected type \"{expected}\", found {}", type_name(value)),
            );
        }
    }

    if let Some(permitted) = schema.get("enum").and_then(Value::as_array) {
        if !permitted.contains(value) {
            push(out, path, format!("{value} is not one of the permitted values"));
        }
    }

    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        if let Some(text) = value.as_str() {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(text) {
                        push(
                            out,
                            path,
                            format!("{text:?} does not match pattern {pattern:?}"),
                        );
                    }
                }
                Err(err) => push(out, path, format!("invalid pattern {pattern:?}: {err}")),
            }
        }
    }

    if let Some(object) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(name) {
                    push(out, path, format!("missing required property {name:?}"));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        if let Some(properties) = properties {
            for (name, subschema) in properties {
                if let Some(item) = object.get(name) {
                    validate_at(item, subschema, &format!("{path}/{name}"), out);
                }
            }
        }

        if schema.get("additionalProperties").and_then(Value::as_bool) == Some(false) {
            for name in object.keys() {
                let declared = properties.is_some_and(|props| props.contains_key(name));
                if !declared {
                    push(out, path, format!("unexpected additional property {name:?}"));
                }
            }
        }
    }

    if let Some(items) = value.as_array() {
        if let Some(item_schema) = schema.get("items") {
            for (index, item) in items.iter().enumerate() {
                validate_at(item, item_schema, &format!("{path}/{index}"), out);
            }
        }
    }
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_unconstrained_schema_accepts_anything() {
        assert!(validate(&json!({"a": 1}), &json!({"title": "#shortform"})).is_empty());
        assert!(validate(&json!("text"), &json!({})).is_empty());
    }

    #[test]
    fn test_type_mismatch() {
        let violations = validate(&json!("text"), &json!({"type": "object"}));
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "expected type \"object\", found string"
        );
    }

    #[test]
    fn test_integer_vs_number() {
        assert!(validate(&json!(3), &json!({"type": "integer"})).is_empty());
        assert!(!validate(&json!(3.5), &json!({"type": "integer"})).is_empty());
        assert!(validate(&json!(3.5), &json!({"type": "number"})).is_empty());
    }

    #[test]
    fn test_required_properties() {
        let schema = json!({"type": "object", "required": ["id", "method"]});
        let violations = validate(&json!({"id": "x"}), &schema);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "missing required property \"method\"");
    }

    #[test]
    fn test_pattern_search_semantics() {
        let schema = json!({"type": "string", "pattern": "^.+-$"});
        assert!(validate(&json!("SRD-"), &schema).is_empty());
        assert!(!validate(&json!("SRD"), &schema).is_empty());
        // Unanchored patterns match anywhere in the string
        let contains = json!({"type": "string", "pattern": "mid"});
        assert!(validate(&json!("a mid b"), &contains).is_empty());
    }

    #[test]
    fn test_enum() {
        let schema = json!({"enum": ["a", "b"]});
        assert!(validate(&json!("a"), &schema).is_empty());
        assert!(!validate(&json!("c"), &schema).is_empty());
    }

    #[test]
    fn test_additional_properties_rejected() {
        let schema = json!({
            "type": "object",
            "properties": {"prefix": {"type": "string"}},
            "additionalProperties": false
        });
        let violations = validate(&json!({"prefix": "SRD-", "extra": 1}), &schema);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("\"extra\""));
    }

    #[test]
    fn test_items_and_paths() {
        let schema = json!({
            "type": "array",
            "items": {
                "type": "object",
                "required": ["prefix"],
                "properties": {"prefix": {"type": "string", "pattern": "^.+-$"}}
            }
        });
        let violations = validate(
            &json!([{"prefix": "SRD-"}, {"prefix": "BAD"}, {}]),
            &schema,
        );
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].path, "/1/prefix");
        assert_eq!(violations[1].path, "/2");
    }

    #[test]
    fn test_collects_all_violations() {
        let schema = json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {"c": {"type": "integer"}},
            "additionalProperties": false
        });
        let violations = validate(&json!({"c": "nope", "d": 1}), &schema);
        // missing a, missing b, c wrong type, d unexpected
        assert_eq!(violations.len(), 4);
    }

    #[test]
    fn test_nested_object_paths() {
        let schema = json!({
            "type": "object",
            "properties": {
                "outer": {
                    "type": "object",
                    "properties": {"inner": {"type": "string"}}
                }
            }
        });
        let violations = validate(&json!({"outer": {"inner": 7}}), &schema);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "/outer/inner");
    }
}
