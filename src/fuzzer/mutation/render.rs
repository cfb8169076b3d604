//! Duplicate-key rendering
//!
//! `serde_json::Map` cannot hold the same key twice, so duplicate-key
//! payloads are produced at serialization time: the document is written as
//! compact JSON and the extra member is emitted right after the original.

use serde_json::Value;

use crate::fuzzer::path::{Location, Step};

/// Serialize `document`, repeating the member at `location` with `duplicate`
///
/// `location` must end on an object key; otherwise the output equals
/// `serde_json::to_string(document)`.
pub fn to_string_with_duplicate(
    document: &Value,
    location: &Location,
    duplicate: &Value,
) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    write_value(&mut out, document, Some(location.steps()), duplicate)?;
    Ok(out)
}

fn write_value(
    out: &mut String,
    value: &Value,
    target: Option<&[Step]>,
    duplicate: &Value,
) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            out.push('{');
            for (i, (key, child)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let encoded_key = serde_json::to_string(key)?;
                out.push_str(&encoded_key);
                out.push(':');

                let (child_target, is_terminal) = match target {
                    Some([Step::Key(k), rest @ ..]) if k == key => {
                        (Some(rest).filter(|r| !r.is_empty()), rest.is_empty())
                    }
                    _ => (None, false),
                };
                write_value(out, child, child_target, duplicate)?;

                if is_terminal {
                    out.push(',');
                    out.push_str(&encoded_key);
                    out.push(':');
                    out.push_str(&serde_json::to_string(duplicate)?);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let child_target = match target {
                    Some([Step::Index(n), rest @ ..]) if *n == i && !rest.is_empty() => Some(rest),
                    _ => None,
                };
                write_value(out, item, child_target, duplicate)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}
