//! Schema Descriptors - Typed view of request body schemas
//!
//! Raw JSON Schema fragments are parsed once per contract load into a tagged
//! enum plus a facet record, so generators dispatch with an exhaustive match.

use serde_json::{Map, Value};

use crate::errors::ContractError;
use crate::fuzzer::path::{MAX_PATH_DEPTH, SEPARATOR};

const REF_PREFIX: &str = "#/components/schemas/";

/// Declared type of a schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String,
    Integer,
    Number,
    Boolean,
    Array {
        items: Box<SchemaDescriptor>,
    },
    Object {
        /// Properties in declaration order
        properties: Vec<(String, SchemaDescriptor)>,
        required: Vec<String>,
        additional_properties: bool,
        /// Discriminator property name, if the object is polymorphic
        discriminator: Option<String>,
    },
    /// No usable type information (or a recursive reference)
    Any,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
            Self::Any => "any",
        }
    }
}

/// Constraining facets of a schema node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    pub format: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub enum_values: Vec<Value>,
    pub default: Option<Value>,
    pub example: Option<Value>,
    pub nullable: bool,
}

/// Parsed, read-only schema of one node
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    pub kind: SchemaKind,
    pub facets: Facets,
}

impl SchemaDescriptor {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            facets: Facets::default(),
        }
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, SchemaKind::String)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, SchemaKind::Integer | SchemaKind::Number)
    }

    /// Property schema by name, for object schemas
    pub fn property(&self, name: &str) -> Option<&SchemaDescriptor> {
        match &self.kind {
            SchemaKind::Object { properties, .. } => properties
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, schema)| schema),
            _ => None,
        }
    }

    /// Every field reachable from this schema as `#`-joined paths
    ///
    /// Arrays are transparent: fields of array items are listed under the
    /// array's own path, matching the fan-out rule of field paths.
    pub fn flatten_fields(&self) -> Vec<FieldInfo<'_>> {
        let mut fields = Vec::new();
        collect_fields(self, "", 0, &mut fields);
        fields
    }

    /// Whether a value has the declared shape
    ///
    /// Checks types, required properties and declared properties that are
    /// present. Undeclared properties and value facets are not checked.
    pub fn matches(&self, value: &Value) -> bool {
        matches_node(self, value, 0)
    }
}

fn matches_node(schema: &SchemaDescriptor, value: &Value, depth: usize) -> bool {
    if depth >= MAX_PATH_DEPTH {
        return true;
    }
    if value.is_null() {
        return schema.facets.nullable || matches!(schema.kind, SchemaKind::Any);
    }

    match &schema.kind {
        SchemaKind::String => value.is_string(),
        SchemaKind::Integer => value.is_i64() || value.is_u64(),
        SchemaKind::Number => value.is_number(),
        SchemaKind::Boolean => value.is_boolean(),
        SchemaKind::Array { items } => value
            .as_array()
            .is_some_and(|elements| elements.iter().all(|e| matches_node(items, e, depth + 1))),
        SchemaKind::Object {
            properties,
            required,
            ..
        } => {
            let Some(object) = value.as_object() else {
                return false;
            };
            required.iter().all(|name| object.contains_key(name))
                && properties.iter().all(|(name, child)| {
                    object
                        .get(name)
                        .map_or(true, |field| matches_node(child, field, depth + 1))
                })
        }
        SchemaKind::Any => true,
    }
}

/// A field declared by a request schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo<'a> {
    pub path: String,
    pub name: &'a str,
    pub schema: &'a SchemaDescriptor,
    /// Required within its parent object
    pub required: bool,
    /// Parent object declares this property as its discriminator
    pub discriminator: bool,
}

fn collect_fields<'a>(
    schema: &'a SchemaDescriptor,
    prefix: &str,
    depth: usize,
    fields: &mut Vec<FieldInfo<'a>>,
) {
    if depth >= MAX_PATH_DEPTH {
        return;
    }

    match &schema.kind {
        SchemaKind::Object {
            properties,
            required,
            discriminator,
            ..
        } => {
            for (name, child) in properties {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}{}{}", prefix, SEPARATOR, name)
                };
                fields.push(FieldInfo {
                    path: path.clone(),
                    name: name.as_str(),
                    schema: child,
                    required: required.contains(name),
                    discriminator: discriminator.as_deref() == Some(name.as_str()),
                });
                collect_fields(child, &path, depth + 1, fields);
            }
        }
        SchemaKind::Array { items } => collect_fields(items, prefix, depth, fields),
        _ => {}
    }
}

/// Resolves `$ref`s against `components.schemas` while parsing
pub struct SchemaParser<'a> {
    components: Option<&'a Map<String, Value>>,
}

impl<'a> SchemaParser<'a> {
    pub fn new(components: Option<&'a Map<String, Value>>) -> Self {
        Self { components }
    }

    /// Parser for a full contract document
    pub fn for_document(document: &'a Value) -> Self {
        let components = document
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object);
        Self::new(components)
    }

    /// Parse a raw schema fragment
    pub fn parse(&self, raw: &Value) -> Result<SchemaDescriptor, ContractError> {
        let mut visiting = Vec::new();
        self.parse_node(raw, &mut visiting)
    }

    /// Raw component schema by name
    pub fn component(&self, name: &str) -> Option<&'a Value> {
        self.components?.get(name)
    }

    fn parse_node(
        &self,
        raw: &Value,
        visiting: &mut Vec<String>,
    ) -> Result<SchemaDescriptor, ContractError> {
        let Some(node) = raw.as_object() else {
            return Ok(SchemaDescriptor::any());
        };

        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            return self.parse_ref(reference, visiting);
        }

        if let Some(parts) = node.get("allOf").and_then(Value::as_array) {
            return self.parse_all_of(node, parts, visiting);
        }

        for key in ["oneOf", "anyOf"] {
            if let Some(first) = node.get(key).and_then(Value::as_array).and_then(|a| a.first()) {
                let mut descriptor = self.parse_node(first, visiting)?;
                merge_facets(&mut descriptor.facets, &parse_facets(node));
                return Ok(descriptor);
            }
        }

        let kind = match declared_type(node).as_deref() {
            Some("string") => SchemaKind::String,
            Some("integer") => SchemaKind::Integer,
            Some("number") => SchemaKind::Number,
            Some("boolean") => SchemaKind::Boolean,
            Some("array") => SchemaKind::Array {
                items: Box::new(match node.get("items") {
                    Some(items) => self.parse_node(items, visiting)?,
                    None => SchemaDescriptor::any(),
                }),
            },
            Some("object") => self.parse_object(node, visiting)?,
            _ => SchemaKind::Any,
        };

        Ok(SchemaDescriptor {
            kind,
            facets: parse_facets(node),
        })
    }

    fn parse_ref(
        &self,
        reference: &str,
        visiting: &mut Vec<String>,
    ) -> Result<SchemaDescriptor, ContractError> {
        let unresolved = || ContractError::UnresolvedRef {
            reference: reference.to_string(),
        };
        let name = reference.strip_prefix(REF_PREFIX).ok_or_else(unresolved)?;
        let target = self.component(name).ok_or_else(unresolved)?;

        if visiting.iter().any(|v| v == name) {
            return Ok(SchemaDescriptor::any());
        }

        visiting.push(name.to_string());
        let parsed = self.parse_node(target, visiting);
        visiting.pop();
        parsed
    }

    fn parse_all_of(
        &self,
        node: &Map<String, Value>,
        parts: &[Value],
        visiting: &mut Vec<String>,
    ) -> Result<SchemaDescriptor, ContractError> {
        let mut merged_properties: Vec<(String, SchemaDescriptor)> = Vec::new();
        let mut merged_required: Vec<String> = Vec::new();
        let mut merged_discriminator = None;
        let mut additional = true;
        let mut fallback = None;

        for part in parts {
            let descriptor = self.parse_node(part, visiting)?;
            match descriptor.kind {
                SchemaKind::Object {
                    properties,
                    required,
                    additional_properties,
                    discriminator,
                } => {
                    for (name, schema) in properties {
                        merged_properties.retain(|(existing, _)| *existing != name);
                        merged_properties.push((name, schema));
                    }
                    for name in required {
                        if !merged_required.contains(&name) {
                            merged_required.push(name);
                        }
                    }
                    additional &= additional_properties;
                    merged_discriminator = merged_discriminator.or(discriminator);
                }
                SchemaKind::Any => {}
                other => fallback = fallback.or(Some(other)),
            }
        }

        let kind = if merged_properties.is_empty() {
            match fallback {
                Some(kind) => kind,
                None => SchemaKind::Object {
                    properties: merged_properties,
                    required: merged_required,
                    additional_properties: additional,
                    discriminator: merged_discriminator,
                },
            }
        } else {
            SchemaKind::Object {
                properties: merged_properties,
                required: merged_required,
                additional_properties: additional,
                discriminator: merged_discriminator.or_else(|| discriminator_of(node)),
            }
        };

        Ok(SchemaDescriptor {
            kind,
            facets: parse_facets(node),
        })
    }

    fn parse_object(
        &self,
        node: &Map<String, Value>,
        visiting: &mut Vec<String>,
    ) -> Result<SchemaKind, ContractError> {
        let mut properties = Vec::new();
        if let Some(raw) = node.get("properties").and_then(Value::as_object) {
            for (name, schema) in raw {
                properties.push((name.clone(), self.parse_node(schema, visiting)?));
            }
        }

        let required = node
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let additional_properties = !matches!(node.get("additionalProperties"), Some(Value::Bool(false)));

        Ok(SchemaKind::Object {
            properties,
            required,
            additional_properties,
            discriminator: discriminator_of(node),
        })
    }
}

fn discriminator_of(node: &Map<String, Value>) -> Option<String> {
    node.get("discriminator")
        .and_then(|d| d.get("propertyName"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn declared_type(node: &Map<String, Value>) -> Option<String> {
    match node.get("type") {
        Some(Value::String(t)) => Some(t.clone()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(str::to_string),
        _ => {
            if node.contains_key("properties") {
                Some("object".to_string())
            } else if node.contains_key("items") {
                Some("array".to_string())
            } else {
                node.get("enum")
                    .and_then(Value::as_array)
                    .and_then(|values| values.first())
                    .map(|first| match first {
                        Value::String(_) => "string",
                        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
                        Value::Number(_) => "number",
                        Value::Bool(_) => "boolean",
                        _ => "any",
                    })
                    .map(str::to_string)
            }
        }
    }
}

fn parse_facets(node: &Map<String, Value>) -> Facets {
    let as_usize = |key: &str| node.get(key).and_then(Value::as_u64).map(|n| n as usize);

    let example = node.get("example").cloned().or_else(|| {
        node.get("examples")
            .and_then(Value::as_array)
            .and_then(|e| e.first())
            .cloned()
    });

    let nullable = node.get("nullable").and_then(Value::as_bool).unwrap_or(false)
        || node
            .get("type")
            .and_then(Value::as_array)
            .is_some_and(|types| types.iter().any(|t| t == "null"));

    Facets {
        format: node.get("format").and_then(Value::as_str).map(str::to_string),
        minimum: node.get("minimum").and_then(Value::as_f64),
        maximum: node.get("maximum").and_then(Value::as_f64),
        min_length: as_usize("minLength"),
        max_length: as_usize("maxLength"),
        pattern: node.get("pattern").and_then(Value::as_str).map(str::to_string),
        enum_values: node
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        default: node.get("default").cloned(),
        example,
        nullable,
    }
}

fn merge_facets(target: &mut Facets, outer: &Facets) {
    if outer.example.is_some() {
        target.example = outer.example.clone();
    }
    if outer.default.is_some() {
        target.default = outer.default.clone();
    }
    target.nullable |= outer.nullable;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> SchemaDescriptor {
        SchemaParser::new(None).parse(&raw).unwrap()
    }

    #[test]
    fn values_match_declared_shapes() {
        let schema = parse(json!({
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": {"type": "integer"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "note": {"type": "string", "nullable": true}
            }
        }));
        assert!(schema.matches(&json!({"id": 1, "tags": ["a"], "note": null, "extra": true})));
        assert!(!schema.matches(&json!({"tags": []})));
        assert!(!schema.matches(&json!({"id": "1"})));
        assert!(!schema.matches(&json!({"id": 1, "tags": [2]})));
        assert!(!schema.matches(&json!([{"id": 1}])));
        assert!(SchemaDescriptor::any().matches(&json!(null)));
    }

    #[test]
    fn parses_scalar_facets() {
        let schema = parse(json!({
            "type": "string",
            "format": "email",
            "minLength": 3,
            "maxLength": 64,
            "pattern": "^.+@.+$",
            "example": "a@b.c"
        }));
        assert!(schema.is_string());
        assert_eq!(schema.facets.format.as_deref(), Some("email"));
        assert_eq!(schema.facets.min_length, Some(3));
        assert_eq!(schema.facets.max_length, Some(64));
        assert_eq!(schema.facets.example, Some(json!("a@b.c")));
    }

    #[test]
    fn parses_object_properties_in_order() {
        let schema = parse(json!({
            "type": "object",
            "required": ["name"],
            "additionalProperties": false,
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "minimum": 0}
            }
        }));
        let SchemaKind::Object {
            properties,
            required,
            additional_properties,
            ..
        } = &schema.kind
        else {
            panic!("expected object");
        };
        assert_eq!(properties[0].0, "name");
        assert_eq!(properties[1].0, "age");
        assert_eq!(required, &vec!["name".to_string()]);
        assert!(!additional_properties);
    }

    #[test]
    fn infers_types_without_type_keyword() {
        assert!(matches!(parse(json!({"properties": {}})).kind, SchemaKind::Object { .. }));
        assert!(matches!(parse(json!({"items": {}})).kind, SchemaKind::Array { .. }));
        assert!(matches!(parse(json!({"enum": [1, 2]})).kind, SchemaKind::Integer));
        assert!(matches!(parse(json!({})).kind, SchemaKind::Any));
    }

    #[test]
    fn nullable_type_arrays() {
        let schema = parse(json!({"type": ["null", "integer"]}));
        assert!(matches!(schema.kind, SchemaKind::Integer));
        assert!(schema.facets.nullable);
    }

    #[test]
    fn resolves_refs_and_guards_recursion() {
        let document = json!({
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "string"},
                        "next": {"$ref": "#/components/schemas/Node"}
                    }
                }
            }}
        });
        let parser = SchemaParser::for_document(&document);
        let schema = parser
            .parse(&json!({"$ref": "#/components/schemas/Node"}))
            .unwrap();

        let next = schema.property("next").unwrap();
        assert!(matches!(next.kind, SchemaKind::Any));
        assert!(schema.property("value").unwrap().is_string());
    }

    #[test]
    fn unresolved_ref_is_an_error() {
        let parser = SchemaParser::new(None);
        let result = parser.parse(&json!({"$ref": "#/components/schemas/Missing"}));
        assert!(matches!(result, Err(ContractError::UnresolvedRef { .. })));
    }

    #[test]
    fn merges_all_of() {
        let schema = parse(json!({
            "allOf": [
                {"type": "object", "required": ["id"], "properties": {"id": {"type": "integer"}}},
                {"type": "object", "required": ["name"], "properties": {"name": {"type": "string"}}}
            ]
        }));
        let fields: Vec<_> = schema.flatten_fields().into_iter().map(|f| f.path).collect();
        assert_eq!(fields, vec!["id", "name"]);
        assert!(schema.flatten_fields().iter().all(|f| f.required));
    }

    #[test]
    fn one_of_uses_first_alternative() {
        let schema = parse(json!({"oneOf": [{"type": "string"}, {"type": "integer"}]}));
        assert!(schema.is_string());
    }

    #[test]
    fn flattens_nested_fields_through_arrays() {
        let schema = parse(json!({
            "type": "object",
            "required": ["items"],
            "discriminator": {"propertyName": "kind"},
            "properties": {
                "kind": {"type": "string"},
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id"],
                        "properties": {"id": {"type": "integer"}, "note": {"type": "string"}}
                    }
                }
            }
        }));
        let fields = schema.flatten_fields();
        let paths: Vec<_> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["kind", "items", "items#id", "items#note"]);

        assert!(fields[0].discriminator);
        assert!(fields[1].required);
        assert!(fields[2].required);
        assert!(!fields[3].required);
    }
}
