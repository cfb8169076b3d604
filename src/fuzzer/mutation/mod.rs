//! Mutation Module - Structural edits of request payloads
//!
//! Every mutation works on a clone of the baseline document. The baseline is
//! shared by many fuzzing units and is never modified.

pub mod dictionary;
pub mod render;
pub mod strategy;

use serde_json::Value;

use self::strategy::MutationStrategy;
use super::path::{EditError, FieldPath, Location, Step};

/// Errors produced while applying a mutation
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("{strategy} not applicable at {location}: {reason}")]
    NotApplicable {
        strategy: &'static str,
        location: String,
        reason: String,
    },

    #[error("skipped: {0}")]
    Skipped(String),

    #[error("failed to render payload: {0}")]
    Render(#[from] serde_json::Error),
}

impl MutationError {
    fn not_applicable(strategy: &MutationStrategy, location: &Location, reason: impl ToString) -> Self {
        Self::NotApplicable {
            strategy: strategy.as_str(),
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A serialized, mutated request body
#[derive(Debug, Clone, PartialEq)]
pub struct MutatedPayload {
    /// Location the mutation was applied at
    pub location: Location,
    /// Serialized JSON body
    pub body: String,
}

/// Apply a strategy at one concrete location
pub fn apply(
    baseline: &Value,
    location: &Location,
    strategy: &MutationStrategy,
) -> Result<MutatedPayload, MutationError> {
    let not_applicable = |err: EditError| MutationError::not_applicable(strategy, location, err);

    let body = match strategy {
        MutationStrategy::Skip(reason) => return Err(MutationError::Skipped(reason.clone())),
        MutationStrategy::NoOp => serde_json::to_string(baseline)?,
        MutationStrategy::Replace(value) => {
            let mut document = baseline.clone();
            location
                .replace(&mut document, value.clone())
                .map_err(not_applicable)?;
            serde_json::to_string(&document)?
        }
        MutationStrategy::Prefix(text) | MutationStrategy::Trail(text) => {
            let current = location
                .get(baseline)
                .ok_or_else(|| not_applicable(EditError::Missing(location.to_string())))?;
            let current = stringify(current);
            let combined = if matches!(strategy, MutationStrategy::Prefix(_)) {
                format!("{}{}", text, current)
            } else {
                format!("{}{}", current, text)
            };

            let mut document = baseline.clone();
            location
                .replace(&mut document, Value::String(combined))
                .map_err(not_applicable)?;
            serde_json::to_string(&document)?
        }
        MutationStrategy::Remove => {
            let mut document = baseline.clone();
            location.remove(&mut document).map_err(not_applicable)?;
            serde_json::to_string(&document)?
        }
        MutationStrategy::DuplicateKey(value) => duplicate(baseline, location, value, strategy)?,
        MutationStrategy::KeyInsert(chars) => {
            let Some(Step::Key(name)) = location.last() else {
                return Err(MutationError::not_applicable(
                    strategy,
                    location,
                    "location is not an object member",
                ));
            };
            let renamed = insert_in_the_middle(name, chars);
            let mut document = baseline.clone();
            location
                .rename_key(&mut document, &renamed)
                .map_err(not_applicable)?;
            serde_json::to_string(&document)?
        }
        MutationStrategy::NewKey { name, value } => {
            let mut document = baseline.clone();
            location
                .insert_key(&mut document, name, value.clone())
                .map_err(not_applicable)?;
            serde_json::to_string(&document)?
        }
    };

    Ok(MutatedPayload {
        location: location.clone(),
        body,
    })
}

/// Resolve `path` and apply the strategy at every match
///
/// Fan-out paths produce one payload per location. A path that resolves to
/// nothing is reported as not applicable.
pub fn apply_at_path(
    baseline: &Value,
    path: &FieldPath,
    strategy: &MutationStrategy,
) -> Result<Vec<MutatedPayload>, MutationError> {
    let locations: Vec<Location> = path
        .resolve(baseline)
        .into_iter()
        .map(|resolved| resolved.location)
        .collect();

    if locations.is_empty() {
        return Err(MutationError::NotApplicable {
            strategy: strategy.as_str(),
            location: path.to_string(),
            reason: "field not present in payload".to_string(),
        });
    }

    locations
        .iter()
        .map(|location| apply(baseline, location, strategy))
        .collect()
}

fn duplicate(
    baseline: &Value,
    location: &Location,
    value: &Value,
    strategy: &MutationStrategy,
) -> Result<String, MutationError> {
    if location.get(baseline).is_none() {
        return Err(MutationError::not_applicable(
            strategy,
            location,
            EditError::Missing(location.to_string()),
        ));
    }

    match location.last() {
        Some(Step::Key(_)) => Ok(render::to_string_with_duplicate(baseline, location, value)?),
        Some(Step::Index(index)) => {
            let mut document = baseline.clone();
            let index = *index;
            let parent = location.parent().unwrap_or_default();
            let items = parent
                .get_mut(&mut document)
                .and_then(Value::as_array_mut)
                .ok_or_else(|| {
                    MutationError::not_applicable(strategy, location, "parent is not an array")
                })?;
            let copy = items[index].clone();
            items.insert(index + 1, copy);
            Ok(serde_json::to_string(&document)?)
        }
        None => Err(MutationError::not_applicable(
            strategy,
            location,
            EditError::Root,
        )),
    }
}

/// String form of a value for concatenating strategies
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Insert `chars` at the character midpoint of `name`
pub fn insert_in_the_middle(name: &str, chars: &str) -> String {
    let middle = name.chars().count() / 2;
    let mut result = String::with_capacity(name.len() + chars.len());
    for (i, ch) in name.chars().enumerate() {
        if i == middle {
            result.push_str(chars);
        }
        result.push(ch);
    }
    if middle >= name.chars().count() {
        result.push_str(chars);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn bodies(payloads: &[MutatedPayload]) -> Vec<Value> {
        payloads
            .iter()
            .map(|p| serde_json::from_str(&p.body).unwrap())
            .collect()
    }

    #[test]
    fn replace_nested_value() {
        let baseline = json!({"user": {"age": 30}});
        let payloads =
            apply_at_path(&baseline, &path("user#age"), &MutationStrategy::Replace(json!(-1))).unwrap();
        assert_eq!(bodies(&payloads), vec![json!({"user": {"age": -1}})]);
        assert_eq!(baseline, json!({"user": {"age": 30}}));
    }

    #[test]
    fn replace_fans_out_over_array() {
        let baseline = json!({"items": [{"id": 1}, {"id": 2}]});
        let payloads =
            apply_at_path(&baseline, &path("items#id"), &MutationStrategy::Replace(json!("x"))).unwrap();
        assert_eq!(
            bodies(&payloads),
            vec![
                json!({"items": [{"id": "x"}, {"id": 2}]}),
                json!({"items": [{"id": 1}, {"id": "x"}]}),
            ]
        );
    }

    #[test]
    fn absent_field_is_not_applicable() {
        let baseline = json!({});
        let result = apply_at_path(&baseline, &path("missing#field"), &MutationStrategy::Remove);
        assert!(matches!(result, Err(MutationError::NotApplicable { .. })));
    }

    #[test]
    fn prefix_and_trail_coerce_to_string() {
        let baseline = json!({"count": 5, "name": "bob"});
        let prefixed =
            apply_at_path(&baseline, &path("count"), &MutationStrategy::Prefix(" ".into())).unwrap();
        assert_eq!(bodies(&prefixed)[0]["count"], json!(" 5"));

        let trailed =
            apply_at_path(&baseline, &path("name"), &MutationStrategy::Trail("\t".into())).unwrap();
        assert_eq!(bodies(&trailed)[0]["name"], json!("bob\t"));
    }

    #[test]
    fn remove_keeps_sibling_order() {
        let baseline = json!({"a": 1, "b": 2, "c": 3});
        let payloads = apply_at_path(&baseline, &path("b"), &MutationStrategy::Remove).unwrap();
        assert_eq!(payloads[0].body, r#"{"a":1,"c":3}"#);
    }

    #[test]
    fn duplicate_key_renders_both_members() {
        let baseline = json!({"name": "a", "age": 1});
        let payloads = apply_at_path(
            &baseline,
            &path("name"),
            &MutationStrategy::DuplicateKey(json!("catsFuzzyDup")),
        )
        .unwrap();
        assert_eq!(payloads[0].body, r#"{"name":"a","name":"catsFuzzyDup","age":1}"#);
    }

    #[test]
    fn duplicate_array_element() {
        let baseline = json!({"tags": ["a", "b"]});
        let payloads = apply_at_path(
            &baseline,
            &path("tags[0]"),
            &MutationStrategy::DuplicateKey(Value::Null),
        )
        .unwrap();
        assert_eq!(bodies(&payloads)[0], json!({"tags": ["a", "a", "b"]}));
    }

    #[test]
    fn key_insert_renames_at_midpoint() {
        let baseline = json!({"email": "x@y.z", "other": 1});
        let payloads = apply_at_path(
            &baseline,
            &path("email"),
            &MutationStrategy::KeyInsert("\u{200b}".into()),
        )
        .unwrap();
        assert_eq!(
            payloads[0].body,
            "{\"em\u{200b}ail\":\"x@y.z\",\"other\":1}"
        );
    }

    #[test]
    fn key_insert_on_array_element_is_not_applicable() {
        let baseline = json!({"tags": ["a"]});
        let result = apply_at_path(
            &baseline,
            &path("tags[0]"),
            &MutationStrategy::KeyInsert("x".into()),
        );
        assert!(matches!(result, Err(MutationError::NotApplicable { .. })));
    }

    #[test]
    fn new_key_on_root_object() {
        let baseline = json!({"a": 1});
        let payloads = apply_at_path(
            &baseline,
            &FieldPath::root(),
            &MutationStrategy::NewKey {
                name: "catsFuzzyField".into(),
                value: json!("catsFuzzyField"),
            },
        )
        .unwrap();
        assert_eq!(payloads[0].body, r#"{"a":1,"catsFuzzyField":"catsFuzzyField"}"#);
    }

    #[test]
    fn skip_is_reported_as_skipped() {
        let baseline = json!({"a": 1});
        let result = apply(&baseline, &Location::root(), &MutationStrategy::Skip("no".into()));
        assert!(matches!(result, Err(MutationError::Skipped(reason)) if reason == "no"));
    }

    #[test]
    fn no_op_replays_baseline() {
        let baseline = json!({"a": [1, 2]});
        let payload = apply(&baseline, &Location::root(), &MutationStrategy::NoOp).unwrap();
        assert_eq!(payload.body, r#"{"a":[1,2]}"#);
    }

    #[test]
    fn insert_in_the_middle_positions() {
        assert_eq!(insert_in_the_middle("abcd", "_"), "ab_cd");
        assert_eq!(insert_in_the_middle("abc", "_"), "a_bc");
        assert_eq!(insert_in_the_middle("a", "_"), "_a");
        assert_eq!(insert_in_the_middle("", "_"), "_");
    }
}
