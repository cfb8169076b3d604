//! Contract - OpenAPI-style input parsed once per run
//!
//! Only the parts the fuzzer needs are read: operations (method and path),
//! header and path parameters, the JSON request body schema with its example,
//! and the documented response codes. Everything is read-only after loading.

pub mod context;
pub mod example;
pub mod schema;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::ContractError;
use crate::fuzzer::family::ResponseCodeFamily;
use crate::fuzzer::mutation::stringify;

pub use self::context::ContractContext;
use self::schema::{SchemaDescriptor, SchemaParser};

/// HTTP methods an operation can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Head,
        Self::Options,
        Self::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }

    /// Parse an OpenAPI path-item key (`get`, `post`, ...)
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(key))
    }

    /// Methods whose requests carry a JSON body
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared request header
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSpec {
    pub name: String,
    pub required: bool,
    /// Value sent in baseline requests
    pub example: Option<String>,
    pub schema: SchemaDescriptor,
}

impl HeaderSpec {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            example: None,
            schema: SchemaDescriptor::new(schema::SchemaKind::String),
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Value used when the header is not being fuzzed
    pub fn baseline_value(&self) -> String {
        self.example.clone().unwrap_or_else(|| {
            match example::synthesize(&self.schema) {
                Value::String(s) => s,
                Value::Null => "example".to_string(),
                other => other.to_string(),
            }
        })
    }
}

/// One contract operation
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: HttpMethod,
    pub path: String,
    pub operation_id: Option<String>,
    pub headers: Vec<HeaderSpec>,
    /// Values substituted for `{name}` placeholders in the path
    pub path_params: Vec<(String, String)>,
    /// Query parameters sent with every request
    pub query_params: Vec<(String, String)>,
    pub request_schema: Option<SchemaDescriptor>,
    /// Baseline JSON body; `Value::Null` when the operation has none
    pub payload: Arc<Value>,
    /// Union of documented response codes
    pub documented: Option<ResponseCodeFamily>,
    /// JSON body schemas documented for exact response codes
    pub response_schemas: Vec<(u16, SchemaDescriptor)>,
}

impl Operation {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            operation_id: None,
            headers: Vec::new(),
            path_params: Vec::new(),
            query_params: Vec::new(),
            request_schema: None,
            payload: Arc::new(Value::Null),
            documented: None,
            response_schemas: Vec::new(),
        }
    }

    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn with_header(mut self, header: HeaderSpec) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_schema(mut self, schema: SchemaDescriptor) -> Self {
        self.request_schema = Some(schema);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Arc::new(payload);
        self
    }

    pub fn with_documented(mut self, documented: ResponseCodeFamily) -> Self {
        self.documented = Some(documented);
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    pub fn with_response_schema(mut self, status: u16, schema: SchemaDescriptor) -> Self {
        self.response_schemas.retain(|(code, _)| *code != status);
        self.response_schemas.push((status, schema));
        self
    }

    /// Documented body schema for an exact response code
    pub fn response_schema(&self, status: u16) -> Option<&SchemaDescriptor> {
        self.response_schemas
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, schema)| schema)
    }

    /// `METHOD /path`
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Path with `{name}` placeholders filled from the path parameters
    pub fn resolved_path(&self) -> String {
        self.path_params
            .iter()
            .fold(self.path.clone(), |path, (name, value)| {
                path.replace(&format!("{{{}}}", name), value)
            })
    }
}

/// Parsed contract
#[derive(Debug, Clone, Default)]
pub struct Contract {
    pub title: Option<String>,
    pub operations: Vec<Arc<Operation>>,
    pub context: ContractContext,
}

impl Contract {
    /// Read and parse a contract file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| ContractError::io(&display, &e))?;
        Self::from_json_str(&display, &text)
    }

    /// Parse contract text; `name` labels diagnostics
    pub fn from_json_str(name: &str, text: &str) -> Result<Self, ContractError> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| ContractError::json_parse(name, text, &e))?;
        Self::from_document(&document)
    }

    /// Build a contract from an already-parsed document
    pub fn from_document(document: &Value) -> Result<Self, ContractError> {
        let paths = document
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| ContractError::invalid("missing 'paths' object"))?;

        let parser = SchemaParser::for_document(document);
        let mut operations = Vec::new();

        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            let shared_parameters = item.get("parameters");

            for (key, raw) in item {
                let Some(method) = HttpMethod::from_key(key) else {
                    continue;
                };
                let operation = parse_operation(document, &parser, method, path, raw, shared_parameters)?;
                debug!(
                    "Loaded {} ({} headers, body: {})",
                    operation.label(),
                    operation.headers.len(),
                    operation.request_schema.is_some()
                );
                operations.push(Arc::new(operation));
            }
        }

        if operations.is_empty() {
            return Err(ContractError::invalid("no operations declared under 'paths'"));
        }

        Ok(Self {
            title: document
                .get("info")
                .and_then(|i| i.get("title"))
                .and_then(Value::as_str)
                .map(str::to_string),
            operations,
            context: ContractContext::from_document(document),
        })
    }
}

fn parse_operation(
    document: &Value,
    parser: &SchemaParser<'_>,
    method: HttpMethod,
    path: &str,
    raw: &Value,
    shared_parameters: Option<&Value>,
) -> Result<Operation, ContractError> {
    let mut operation = Operation::new(method, path);
    if let Some(id) = raw.get("operationId").and_then(Value::as_str) {
        operation = operation.with_operation_id(id);
    }

    let parameters = shared_parameters
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .chain(raw.get("parameters").and_then(Value::as_array).into_iter().flatten());

    for parameter in parameters {
        let parameter = resolve_component(document, parameter, "parameters")?;
        let location = parameter.get("in").and_then(Value::as_str);
        if !matches!(location, Some("header") | Some("path") | Some("query")) {
            continue;
        }
        let Some(name) = parameter.get("name").and_then(Value::as_str) else {
            continue;
        };

        let schema = match parameter.get("schema") {
            Some(raw_schema) => parser.parse(raw_schema)?,
            None => SchemaDescriptor::new(schema::SchemaKind::String),
        };
        let example = parameter
            .get("example")
            .or(schema.facets.example.as_ref())
            .map(stringify);

        let required = parameter.get("required").and_then(Value::as_bool).unwrap_or(false);

        if location == Some("query") {
            // Optional parameters without a documented value are left out
            let value = match example.or_else(|| schema.facets.default.as_ref().map(stringify)) {
                Some(value) => value,
                None if required => stringify(&example::synthesize(&schema)),
                None => continue,
            };
            operation.query_params.retain(|(n, _)| n != name);
            operation.query_params.push((name.to_string(), value));
            continue;
        }

        if location == Some("path") {
            let value = example.unwrap_or_else(|| stringify(&example::synthesize(&schema)));
            operation.path_params.retain(|(n, _)| n != name);
            operation.path_params.push((name.to_string(), value));
            continue;
        }

        operation.headers.retain(|h| !h.name.eq_ignore_ascii_case(name));
        operation.headers.push(HeaderSpec {
            name: name.to_string(),
            required,
            example,
            schema,
        });
    }

    if let Some(body) = raw.get("requestBody") {
        let body = resolve_component(document, body, "requestBodies")?;
        if let Some(media) = json_media_type(body) {
            let schema = match media.get("schema") {
                Some(raw_schema) => parser.parse(raw_schema)?,
                None => SchemaDescriptor::any(),
            };
            let payload = media_example(media).unwrap_or_else(|| example::synthesize(&schema));
            operation = operation.with_schema(schema).with_payload(payload);
        }
    }

    if let Some(responses) = raw.get("responses").and_then(Value::as_object) {
        let documented = responses
            .keys()
            .filter(|code| code.as_str() != "default")
            .filter_map(|code| code.parse::<ResponseCodeFamily>().ok())
            .reduce(ResponseCodeFamily::union);
        if let Some(documented) = documented {
            operation = operation.with_documented(documented);
        }

        for (code, response) in responses {
            let Ok(status) = code.parse::<u16>() else {
                continue;
            };
            let response = resolve_component(document, response, "responses")?;
            let Some(raw_schema) = json_media_type(response).and_then(|media| media.get("schema")) else {
                continue;
            };
            operation = operation.with_response_schema(status, parser.parse(raw_schema)?);
        }
    }

    Ok(operation)
}

fn resolve_component<'a>(
    document: &'a Value,
    value: &'a Value,
    section: &str,
) -> Result<&'a Value, ContractError> {
    let Some(reference) = value.get("$ref").and_then(Value::as_str) else {
        return Ok(value);
    };
    let prefix = format!("#/components/{}/", section);
    reference
        .strip_prefix(&prefix)
        .and_then(|name| document.get("components")?.get(section)?.get(name))
        .ok_or_else(|| ContractError::UnresolvedRef {
            reference: reference.to_string(),
        })
}

fn json_media_type(body: &Value) -> Option<&Map<String, Value>> {
    let content = body.get("content")?.as_object()?;
    content
        .get("application/json")
        .or_else(|| {
            content
                .iter()
                .find(|(media, _)| media.contains("json"))
                .map(|(_, v)| v)
        })
        .and_then(Value::as_object)
}

fn media_example(media: &Map<String, Value>) -> Option<Value> {
    media.get("example").cloned().or_else(|| {
        media
            .get("examples")?
            .as_object()?
            .values()
            .find_map(|e| e.get("value").cloned())
    })
}
