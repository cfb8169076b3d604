//! Built-in Fuzzers - Catalog of (value producer, strategy, expectation) pairings
//!
//! A fuzzer is data: a planner turns one target (a field, a header or the
//! whole operation) into zero or more cases. The iterators in
//! [`super::iterator`] walk the contract and attach the cases to units.

use rand::rngs::SmallRng;
use serde_json::{json, Value};

use crate::contract::schema::{SchemaDescriptor, SchemaKind};
use crate::contract::{HeaderSpec, Operation};

use super::detection::SecurityCheck;
use super::family::ResponseCodeFamily;
use super::generator::ValueGenerator;
use super::mutation::dictionary::{Dictionary, TokenCategory};
use super::mutation::strategy::MutationStrategy;
use super::path::FieldPath;

/// Name of the key added by `new-fields`
pub const EXTRA_FIELD_NAME: &str = "contractfuzzExtraField";

/// Length of values sent by `extra-long-headers`
const LONG_HEADER_LEN: usize = 10_000;

/// Injection payloads tried per field
const PAYLOADS_PER_FIELD: usize = 3;

/// One planned mutation
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub strategy: MutationStrategy,
    pub expected: ResponseCodeFamily,
    pub scenario: String,
}

impl Case {
    pub fn new(strategy: MutationStrategy, expected: ResponseCodeFamily, scenario: impl Into<String>) -> Self {
        Self {
            strategy,
            expected,
            scenario: scenario.into(),
        }
    }

    /// Informational case that sends nothing
    pub fn skip(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            scenario: reason.clone(),
            strategy: MutationStrategy::Skip(reason),
            expected: ResponseCodeFamily::CLIENT_ERROR,
        }
    }
}

/// A body field as seen by a planner
#[derive(Debug, Clone)]
pub struct FieldTarget<'a> {
    pub path: FieldPath,
    pub schema: &'a SchemaDescriptor,
    pub required: bool,
    /// First value found at the path in the baseline
    pub current: Value,
}

/// Shared inputs to value producers
pub struct Generation<'a> {
    pub rng: &'a mut SmallRng,
    pub dictionary: &'a Dictionary,
    pub strict_types: bool,
}

/// How a fuzzer turns a target into cases
#[derive(Clone, Copy)]
pub enum Planner {
    Fields(fn(&FieldTarget<'_>, &mut Generation<'_>) -> Vec<Case>),
    Headers(fn(&HeaderSpec, &mut Generation<'_>) -> Vec<Case>),
    /// Targets the request as a whole
    Operation(fn(&Operation, &mut Generation<'_>) -> Vec<Case>),
}

impl Planner {
    pub fn target_kind(&self) -> &'static str {
        match self {
            Self::Fields(_) => "fields",
            Self::Headers(_) => "headers",
            Self::Operation(_) => "operation",
        }
    }
}

/// A built-in fuzzer
#[derive(Clone, Copy)]
pub struct FuzzerDef {
    pub name: &'static str,
    pub description: &'static str,
    pub planner: Planner,
    pub security: Option<SecurityCheck>,
}

impl std::fmt::Debug for FuzzerDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzerDef")
            .field("name", &self.name)
            .field("target", &self.planner.target_kind())
            .finish()
    }
}

/// All built-in fuzzers, in execution order
pub const BUILTIN_FUZZERS: &[FuzzerDef] = &[
    FuzzerDef {
        name: "happy-path",
        description: "Send the baseline request unchanged and expect success",
        planner: Planner::Operation(happy_path),
        security: None,
    },
    FuzzerDef {
        name: "remove-fields",
        description: "Remove each field; required fields must be rejected",
        planner: Planner::Fields(remove_fields),
        security: None,
    },
    FuzzerDef {
        name: "new-fields",
        description: "Add an undeclared field to the request body",
        planner: Planner::Operation(new_fields),
        security: None,
    },
    FuzzerDef {
        name: "duplicate-keys",
        description: "Send each field twice in the same object",
        planner: Planner::Fields(duplicate_keys),
        security: None,
    },
    FuzzerDef {
        name: "zero-width-chars-in-names",
        description: "Insert a zero-width space into each field name",
        planner: Planner::Fields(zero_width_names),
        security: None,
    },
    FuzzerDef {
        name: "boundary-values",
        description: "Send values just outside declared length and range bounds",
        planner: Planner::Fields(boundary_values),
        security: None,
    },
    FuzzerDef {
        name: "invalid-enum-values",
        description: "Send values outside declared enumerations",
        planner: Planner::Fields(invalid_enum_values),
        security: None,
    },
    FuzzerDef {
        name: "invalid-formats",
        description: "Send strings that violate the declared format",
        planner: Planner::Fields(invalid_formats),
        security: None,
    },
    FuzzerDef {
        name: "numbers-as-strings",
        description: "Send numeric and boolean fields as strings",
        planner: Planner::Fields(numbers_as_strings),
        security: None,
    },
    FuzzerDef {
        name: "leading-spaces",
        description: "Prefix string fields with whitespace",
        planner: Planner::Fields(leading_spaces),
        security: None,
    },
    FuzzerDef {
        name: "trailing-spaces",
        description: "Append whitespace to string fields",
        planner: Planner::Fields(trailing_spaces),
        security: None,
    },
    FuzzerDef {
        name: "sql-injection",
        description: "Send SQL injection payloads and watch for database errors",
        planner: Planner::Fields(sql_injection),
        security: Some(SecurityCheck::SqlInjection),
    },
    FuzzerDef {
        name: "xss-injection",
        description: "Send script payloads and watch for unsanitized reflection",
        planner: Planner::Fields(xss_injection),
        security: Some(SecurityCheck::Xss),
    },
    FuzzerDef {
        name: "command-injection",
        description: "Send shell payloads and watch for command output",
        planner: Planner::Fields(command_injection),
        security: Some(SecurityCheck::CommandInjection),
    },
    FuzzerDef {
        name: "remove-headers",
        description: "Omit each header; required headers must be rejected",
        planner: Planner::Headers(remove_headers),
        security: None,
    },
    FuzzerDef {
        name: "extra-long-headers",
        description: "Send very long header values",
        planner: Planner::Headers(extra_long_headers),
        security: Some(SecurityCheck::Generic),
    },
];

/// Look up a built-in fuzzer by name
pub fn find(name: &str) -> Option<&'static FuzzerDef> {
    BUILTIN_FUZZERS.iter().find(|def| def.name == name)
}

/// Names of all built-in fuzzers
pub fn names() -> Vec<&'static str> {
    BUILTIN_FUZZERS.iter().map(|def| def.name).collect()
}

fn required_or_optional(required: bool) -> ResponseCodeFamily {
    if required {
        ResponseCodeFamily::CLIENT_ERROR
    } else {
        ResponseCodeFamily::SUCCESS
    }
}

fn happy_path(_operation: &Operation, _ctx: &mut Generation<'_>) -> Vec<Case> {
    vec![Case::new(
        MutationStrategy::NoOp,
        ResponseCodeFamily::SUCCESS,
        "send the baseline request",
    )]
}

fn new_fields(operation: &Operation, _ctx: &mut Generation<'_>) -> Vec<Case> {
    if !operation.payload.is_object() {
        return Vec::new();
    }
    let expected = if operation.method.has_body() {
        ResponseCodeFamily::CLIENT_ERROR
    } else {
        ResponseCodeFamily::SUCCESS
    };
    vec![Case::new(
        MutationStrategy::NewKey {
            name: EXTRA_FIELD_NAME.to_string(),
            value: json!(EXTRA_FIELD_NAME),
        },
        expected,
        format!("add undeclared field {}", EXTRA_FIELD_NAME),
    )]
}

fn remove_fields(field: &FieldTarget<'_>, _ctx: &mut Generation<'_>) -> Vec<Case> {
    let kind = if field.required { "required" } else { "optional" };
    vec![Case::new(
        MutationStrategy::Remove,
        required_or_optional(field.required),
        format!("remove {} field {}", kind, field.path),
    )]
}

fn duplicate_keys(field: &FieldTarget<'_>, _ctx: &mut Generation<'_>) -> Vec<Case> {
    vec![Case::new(
        MutationStrategy::DuplicateKey(field.current.clone()),
        ResponseCodeFamily::CLIENT_ERROR,
        format!("duplicate field {}", field.path),
    )]
}

fn zero_width_names(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    ctx.dictionary
        .tokens_in(TokenCategory::ZeroWidth)
        .first()
        .map(|chars| {
            Case::new(
                MutationStrategy::KeyInsert(chars.clone()),
                ResponseCodeFamily::CLIENT_ERROR,
                format!("insert {:?} into the name of field {}", chars, field.path),
            )
        })
        .into_iter()
        .collect()
}

fn boundary_values(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    if !field.schema.is_string() && !field.schema.is_numeric() {
        return Vec::new();
    }
    let values = ValueGenerator::boundary_values(field.schema, ctx.rng);
    if values.is_empty() {
        return vec![Case::skip(format!("field {} declares no bounds", field.path))];
    }
    values
        .into_iter()
        .map(|value| {
            Case::new(
                MutationStrategy::Replace(value),
                ResponseCodeFamily::CLIENT_ERROR,
                format!("send out-of-bounds value for field {}", field.path),
            )
        })
        .collect()
}

fn invalid_enum_values(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    ValueGenerator::invalid_enum_values(field.schema, ctx.rng)
        .into_iter()
        .map(|value| {
            Case::new(
                MutationStrategy::Replace(value),
                ResponseCodeFamily::CLIENT_ERROR,
                format!("send value outside the enum of field {}", field.path),
            )
        })
        .collect()
}

fn invalid_formats(field: &FieldTarget<'_>, _ctx: &mut Generation<'_>) -> Vec<Case> {
    ValueGenerator::format_violation(field.schema)
        .map(|value| {
            Case::new(
                MutationStrategy::Replace(value),
                ResponseCodeFamily::CLIENT_ERROR,
                format!("send malformed value for field {}", field.path),
            )
        })
        .into_iter()
        .collect()
}

fn numbers_as_strings(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    let expected = if ctx.strict_types {
        ResponseCodeFamily::CLIENT_ERROR
    } else {
        ResponseCodeFamily::SUCCESS
    };
    ValueGenerator::coercion_values(field.schema, &field.current)
        .into_iter()
        .map(|value| {
            Case::new(
                MutationStrategy::Replace(value),
                expected,
                format!("send field {} as a string", field.path),
            )
        })
        .collect()
}

fn is_plain_string(schema: &SchemaDescriptor) -> bool {
    matches!(schema.kind, SchemaKind::String)
}

fn whitespace_cases(
    field: &FieldTarget<'_>,
    ctx: &mut Generation<'_>,
    strategy: fn(String) -> MutationStrategy,
    position: &str,
) -> Vec<Case> {
    if !is_plain_string(field.schema) {
        return Vec::new();
    }
    ctx.dictionary
        .tokens_in(TokenCategory::Whitespace)
        .iter()
        .map(|space| {
            Case::new(
                strategy(space.repeat(2)),
                ResponseCodeFamily::SUCCESS,
                format!("{} whitespace {:?} on field {}", position, space, field.path),
            )
        })
        .collect()
}

fn leading_spaces(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    whitespace_cases(field, ctx, MutationStrategy::Prefix, "leading")
}

fn trailing_spaces(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    whitespace_cases(field, ctx, MutationStrategy::Trail, "trailing")
}

fn injection_cases(
    field: &FieldTarget<'_>,
    ctx: &mut Generation<'_>,
    category: TokenCategory,
    label: &str,
) -> Vec<Case> {
    if !is_plain_string(field.schema) || !field.schema.facets.enum_values.is_empty() {
        return Vec::new();
    }
    ctx.dictionary
        .sample(category, Some(PAYLOADS_PER_FIELD), ctx.rng)
        .into_iter()
        .map(|payload| {
            Case::new(
                MutationStrategy::Replace(Value::String(payload)),
                ResponseCodeFamily::CLIENT_OR_SUCCESS,
                format!("send {} payload in field {}", label, field.path),
            )
        })
        .collect()
}

fn sql_injection(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    injection_cases(field, ctx, TokenCategory::SqlInjection, "SQL injection")
}

fn xss_injection(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    injection_cases(field, ctx, TokenCategory::Xss, "XSS")
}

fn command_injection(field: &FieldTarget<'_>, ctx: &mut Generation<'_>) -> Vec<Case> {
    injection_cases(field, ctx, TokenCategory::CommandInjection, "command injection")
}

fn remove_headers(header: &HeaderSpec, _ctx: &mut Generation<'_>) -> Vec<Case> {
    let kind = if header.required { "required" } else { "optional" };
    vec![Case::new(
        MutationStrategy::Remove,
        required_or_optional(header.required),
        format!("omit {} header {}", kind, header.name),
    )]
}

fn extra_long_headers(header: &HeaderSpec, ctx: &mut Generation<'_>) -> Vec<Case> {
    let value = ValueGenerator::random_string(LONG_HEADER_LEN, ctx.rng);
    vec![Case::new(
        MutationStrategy::Replace(Value::String(value)),
        ResponseCodeFamily::CLIENT_OR_SUCCESS,
        format!("send a {}-character value in header {}", LONG_HEADER_LEN, header.name),
    )]
}
