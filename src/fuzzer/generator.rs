//! Fuzz Value Generator - Candidate values derived from a field's schema
//!
//! Pure functions: a schema (plus an RNG where randomness is needed) maps to
//! zero or more values. Pairing a value with a strategy and an expected
//! outcome is left to the fuzzer definitions.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Number, Value};

use crate::contract::example;
use crate::contract::schema::{SchemaDescriptor, SchemaKind};

/// Cap on generated string lengths
pub const MAX_GENERATED_LEN: usize = 10_000;

/// Characters added past `maxLength`
const OVERFLOW_LEN: usize = 10;

/// Schema-driven value generation
pub struct ValueGenerator;

impl ValueGenerator {
    /// A value the schema accepts
    pub fn valid(schema: &SchemaDescriptor) -> Value {
        example::synthesize(schema)
    }

    /// Values just outside the declared bounds
    ///
    /// Strings get one character fewer than `minLength` and ten more than
    /// `maxLength`. Integers step past `minimum`/`maximum`, or past the
    /// int32/int64 range when unbounded. Unbounded strings and numbers have
    /// no boundary and produce nothing.
    pub fn boundary_values(schema: &SchemaDescriptor, rng: &mut impl Rng) -> Vec<Value> {
        let facets = &schema.facets;
        let mut values = Vec::new();

        match &schema.kind {
            SchemaKind::String => {
                if let Some(min) = facets.min_length.filter(|min| *min > 0) {
                    values.push(Value::String(Self::random_string(min - 1, rng)));
                }
                if let Some(max) = facets.max_length {
                    let len = max.saturating_add(OVERFLOW_LEN).min(MAX_GENERATED_LEN);
                    if len > max {
                        values.push(Value::String(Self::random_string(len, rng)));
                    }
                }
            }
            SchemaKind::Integer => {
                let int32 = facets.format.as_deref() == Some("int32");
                match facets.minimum {
                    Some(min) => values.extend(integer_past(min.ceil(), -1)),
                    None if int32 => values.push(json!(i32::MIN as i64 - 1)),
                    None => values.extend(float(-1e20)),
                }
                match facets.maximum {
                    Some(max) => values.extend(integer_past(max.floor(), 1)),
                    None if int32 => values.push(json!(i32::MAX as i64 + 1)),
                    None => values.push(json!(u64::MAX)),
                }
            }
            SchemaKind::Number => {
                if let Some(min) = facets.minimum {
                    values.extend(float(min - 1.0));
                }
                if let Some(max) = facets.maximum {
                    values.extend(float(max + 1.0));
                }
            }
            _ => {}
        }

        values
    }

    /// Values outside a declared enumeration
    pub fn invalid_enum_values(schema: &SchemaDescriptor, rng: &mut impl Rng) -> Vec<Value> {
        let allowed = &schema.facets.enum_values;
        if allowed.is_empty() {
            return Vec::new();
        }

        match &schema.kind {
            SchemaKind::Integer | SchemaKind::Number => {
                let max = allowed.iter().filter_map(Value::as_f64).fold(f64::MIN, f64::max);
                if max == f64::MIN {
                    return Vec::new();
                }
                if matches!(schema.kind, SchemaKind::Integer) {
                    integer_past(max.floor(), 1).into_iter().collect()
                } else {
                    float(max + 1.0).into_iter().collect()
                }
            }
            _ => {
                let len = allowed
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(3);
                for _ in 0..8 {
                    let candidate = Value::String(Self::random_string(len, rng));
                    if !allowed.contains(&candidate) {
                        return vec![candidate];
                    }
                }
                vec![Value::String("__invalid_enum__".to_string())]
            }
        }
    }

    /// The current value re-typed as a string, for numeric and boolean fields
    pub fn coercion_values(schema: &SchemaDescriptor, current: &Value) -> Vec<Value> {
        let coercible = matches!(
            schema.kind,
            SchemaKind::Integer | SchemaKind::Number | SchemaKind::Boolean
        );
        match current {
            Value::Number(_) | Value::Bool(_) if coercible => {
                vec![Value::String(current.to_string())]
            }
            _ => Vec::new(),
        }
    }

    /// A string that is not valid for the declared format
    pub fn format_violation(schema: &SchemaDescriptor) -> Option<Value> {
        if !schema.is_string() {
            return None;
        }
        let format = schema.facets.format.as_deref()?;
        example::format_sample(format)?;

        let invalid = match format {
            "date" => "2020-13-45",
            "date-time" => "2020-12-12 25:61:00",
            "time" => "25:61:99",
            "email" => "not-an-email",
            "uuid" => "4d2a9f0c-zzzz-4c53",
            "uri" | "url" => "ht tp://bad uri",
            "hostname" => "-bad_host-",
            "ipv4" => "256.256.256.256",
            "ipv6" => "2001:db8:::zz",
            "byte" => "!!not base64!!",
            _ => return None,
        };
        Some(Value::String(invalid.to_string()))
    }

    /// Random alphanumeric string of `len` characters, capped
    pub fn random_string(len: usize, rng: &mut impl Rng) -> String {
        std::iter::repeat_with(|| char::from(rng.sample(Alphanumeric)))
            .take(len.min(MAX_GENERATED_LEN))
            .collect()
    }
}

fn float(value: f64) -> Option<Value> {
    Number::from_f64(value).map(Value::Number)
}

/// The integer one `step` past `edge`
///
/// Falls back to a float twice as far out when the result fits neither
/// i64 nor u64.
fn integer_past(edge: f64, step: i128) -> Option<Value> {
    let past = (edge as i128).saturating_add(step);
    if let Ok(value) = i64::try_from(past) {
        return Some(json!(value));
    }
    if let Ok(value) = u64::try_from(past) {
        return Some(json!(value));
    }
    float(edge * 2.0)
}
