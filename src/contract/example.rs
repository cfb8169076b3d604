//! Example payloads synthesized from schemas
//!
//! Used when an operation carries no explicit example: every property gets a
//! value taken from, in order, the schema example, its default, the first
//! enum value, a sample for its format, or a plain value of its type.

use serde_json::{json, Map, Number, Value};

use super::schema::{Facets, SchemaDescriptor, SchemaKind};

/// Nesting limit for synthesized documents
const MAX_SYNTH_DEPTH: usize = 8;

/// Build a valid-looking value for a schema
pub fn synthesize(schema: &SchemaDescriptor) -> Value {
    synthesize_at(schema, 0)
}

fn synthesize_at(schema: &SchemaDescriptor, depth: usize) -> Value {
    let facets = &schema.facets;
    if let Some(example) = &facets.example {
        return example.clone();
    }
    if let Some(default) = &facets.default {
        return default.clone();
    }
    if let Some(first) = facets.enum_values.first() {
        return first.clone();
    }

    match &schema.kind {
        SchemaKind::String => Value::String(sample_string(facets)),
        SchemaKind::Integer => json!(sample_integer(facets)),
        SchemaKind::Number => Number::from_f64(sample_number(facets))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SchemaKind::Boolean => Value::Bool(true),
        SchemaKind::Array { items } => {
            if depth >= MAX_SYNTH_DEPTH || matches!(items.kind, SchemaKind::Any) {
                json!([])
            } else {
                json!([synthesize_at(items, depth + 1)])
            }
        }
        SchemaKind::Object { properties, .. } => {
            let mut map = Map::new();
            if depth < MAX_SYNTH_DEPTH {
                for (name, child) in properties {
                    if matches!(child.kind, SchemaKind::Any) && child.facets.example.is_none() {
                        continue;
                    }
                    map.insert(name.clone(), synthesize_at(child, depth + 1));
                }
            }
            Value::Object(map)
        }
        SchemaKind::Any => Value::Null,
    }
}

/// Sample value for well-known string formats
pub fn format_sample(format: &str) -> Option<&'static str> {
    let sample = match format {
        "date" => "2020-12-12",
        "date-time" => "2020-12-12T10:15:30Z",
        "time" => "10:15:30Z",
        "email" => "user@example.com",
        "uuid" => "4d2a9f0c-6b1e-4c53-9a8e-2f1b7c3d5e60",
        "uri" | "url" => "https://example.com/resource",
        "hostname" => "example.com",
        "ipv4" => "192.168.0.1",
        "ipv6" => "2001:db8::1",
        "byte" => "ZXhhbXBsZQ==",
        "password" => "Passw0rd!",
        _ => return None,
    };
    Some(sample)
}

fn sample_string(facets: &Facets) -> String {
    let base = facets
        .format
        .as_deref()
        .and_then(format_sample)
        .unwrap_or("example");

    let mut value: String = base.to_string();
    if let Some(min) = facets.min_length {
        let len = value.chars().count();
        if len < min {
            value.push_str(&"a".repeat(min - len));
        }
    }
    if let Some(max) = facets.max_length {
        if value.chars().count() > max {
            value = value.chars().take(max).collect();
        }
    }
    value
}

fn sample_integer(facets: &Facets) -> i64 {
    let mut value: i64 = 1;
    if let Some(min) = facets.minimum {
        value = value.max(min.ceil() as i64);
    }
    if let Some(max) = facets.maximum {
        value = value.min(max.floor() as i64);
    }
    value
}

fn sample_number(facets: &Facets) -> f64 {
    let mut value = 1.5;
    if let Some(min) = facets.minimum {
        value = f64::max(value, min);
    }
    if let Some(max) = facets.maximum {
        value = f64::min(value, max);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::schema::SchemaParser;

    fn schema(raw: Value) -> SchemaDescriptor {
        SchemaParser::new(None).parse(&raw).unwrap()
    }

    #[test]
    fn prefers_example_then_default_then_enum() {
        assert_eq!(synthesize(&schema(json!({"type": "string", "example": "x", "default": "y"}))), json!("x"));
        assert_eq!(synthesize(&schema(json!({"type": "string", "default": "y"}))), json!("y"));
        assert_eq!(synthesize(&schema(json!({"type": "string", "enum": ["A", "B"]}))), json!("A"));
    }

    #[test]
    fn respects_length_and_range_facets() {
        let long = synthesize(&schema(json!({"type": "string", "minLength": 10})));
        assert_eq!(long.as_str().unwrap().len(), 10);

        let short = synthesize(&schema(json!({"type": "string", "maxLength": 3})));
        assert_eq!(short, json!("exa"));

        assert_eq!(synthesize(&schema(json!({"type": "integer", "minimum": 18}))), json!(18));
        assert_eq!(synthesize(&schema(json!({"type": "integer", "maximum": -5}))), json!(-5));
    }

    #[test]
    fn uses_format_samples() {
        assert_eq!(
            synthesize(&schema(json!({"type": "string", "format": "email"}))),
            json!("user@example.com")
        );
    }

    #[test]
    fn builds_nested_objects() {
        let raw = json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": {"age": {"type": "integer"}, "tags": {"type": "array", "items": {"type": "string"}}}
                },
                "active": {"type": "boolean"}
            }
        });
        assert_eq!(
            synthesize(&schema(raw)),
            json!({"user": {"age": 1, "tags": ["example"]}, "active": true})
        );
    }

    #[test]
    fn skips_untyped_properties() {
        let raw = json!({"type": "object", "properties": {"blob": {}, "id": {"type": "integer"}}});
        assert_eq!(synthesize(&schema(raw)), json!({"id": 1}));
    }
}
