//! Field Paths - Compound field addressing inside JSON payloads
//!
//! A field path names a location inside a request payload as `#`-separated
//! segments (`user#address#city`). Paths are validated when parsed and then
//! resolved against a concrete document: intermediate segments that land on
//! arrays fan out over every element, and a field that is absent from a given
//! document resolves to nothing rather than failing.
//!
//! # Grammar
//!
//! - `name` - object key; fans out over arrays when more segments follow
//! - `name[*]` - every element of the array stored under `name`
//! - `name[3]` - a single element of that array
//! - `$`, `$[*]`, `$[0]` - the document root (only as the first segment)

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Separator between path segments
pub const SEPARATOR: char = '#';

/// Default maximum number of named segments in a path
pub const MAX_PATH_DEPTH: usize = 32;

/// Root designator
pub const ROOT: &str = "$";

/// Errors raised while parsing a field path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("field path is empty")]
    Empty,

    #[error("empty segment at position {0}")]
    EmptySegment(usize),

    #[error("invalid character {ch:?} in segment '{segment}'")]
    InvalidCharacter { segment: String, ch: char },

    #[error("invalid array selector in segment '{0}'")]
    InvalidSelector(String),

    #[error("root designator '$' is only allowed as the first segment")]
    MisplacedRoot,

    #[error("path has {depth} segments, maximum is {max}")]
    TooDeep { depth: usize, max: usize },
}

/// Errors raised while editing a document at a resolved location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("location {0} does not exist in the document")]
    Missing(String),

    #[error("location {0} is not an object member")]
    NotAKey(String),

    #[error("location {0} is not an object")]
    NotAnObject(String),

    #[error("key '{0}' already exists")]
    KeyExists(String),

    #[error("the document root cannot be removed")]
    Root,
}

/// How a segment treats array values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Plain name: fans out over arrays when more segments follow
    Auto,
    /// `[*]`: every element of the array
    All,
    /// `[n]`: a single element of the array
    At(usize),
}

/// One parsed path segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Object key, `None` for the root designator
    pub name: Option<String>,
    /// Array selection applied after the key lookup
    pub selector: Selector,
}

impl Segment {
    fn parse(text: &str, position: usize) -> Result<Self, PathError> {
        let (name, selector) = match text.strip_suffix(']') {
            Some(head) => {
                let open = head
                    .rfind('[')
                    .ok_or_else(|| PathError::InvalidSelector(text.to_string()))?;
                let selector = match &head[open + 1..] {
                    "*" => Selector::All,
                    digits => digits
                        .parse::<usize>()
                        .map(Selector::At)
                        .map_err(|_| PathError::InvalidSelector(text.to_string()))?,
                };
                (&head[..open], selector)
            }
            None => (text, Selector::Auto),
        };

        if name == ROOT {
            if position != 0 {
                return Err(PathError::MisplacedRoot);
            }
            return Ok(Self {
                name: None,
                selector,
            });
        }

        if name.is_empty() {
            return Err(PathError::EmptySegment(position));
        }

        if let Some(ch) = name
            .chars()
            .find(|c| c.is_control() || matches!(c, '[' | ']'))
        {
            return Err(PathError::InvalidCharacter {
                segment: text.to_string(),
                ch,
            });
        }

        Ok(Self {
            name: Some(name.to_string()),
            selector,
        })
    }
}

/// A validated, `#`-separated field path
///
/// A field path is only a name: it carries no guarantee that the location
/// exists in any particular document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a path using the default depth limit
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        Self::parse_with_limit(raw, MAX_PATH_DEPTH)
    }

    /// Parse a path, rejecting paths with more than `max_depth` named segments
    pub fn parse_with_limit(raw: &str, max_depth: usize) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = raw
            .split(SEPARATOR)
            .enumerate()
            .map(|(position, text)| Segment::parse(text, position))
            .collect::<Result<Vec<_>, _>>()?;

        let depth = segments.iter().filter(|s| s.name.is_some()).count();
        if depth > max_depth {
            return Err(PathError::TooDeep {
                depth,
                max: max_depth,
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Path addressing the whole document
    pub fn root() -> Self {
        Self {
            raw: ROOT.to_string(),
            segments: vec![Segment {
                name: None,
                selector: Selector::Auto,
            }],
        }
    }

    /// Path for a field name, anchored under `$[*]` when the document is a root array
    pub fn anchored(field: &str, document: &Value) -> Result<Self, PathError> {
        if document.is_array() && !field.starts_with(ROOT) {
            Self::parse(&format!("{}[*]{}{}", ROOT, SEPARATOR, field))
        } else {
            Self::parse(field)
        }
    }

    /// Original textual form
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of named segments
    pub fn depth(&self) -> usize {
        self.segments.iter().filter(|s| s.name.is_some()).count()
    }

    /// Name of the terminal key, if the path ends on a key
    pub fn leaf_name(&self) -> Option<&str> {
        self.segments.last().and_then(|s| s.name.as_deref())
    }

    /// Resolve the path against a document
    ///
    /// Returns one entry per matching location; an absent field yields an
    /// empty vector.
    pub fn resolve<'a>(&self, document: &'a Value) -> Vec<Resolved<'a>> {
        let mut found = Vec::new();
        let mut steps = Vec::new();
        walk(document, &self.segments, &mut steps, &mut found);
        found
    }

    /// Check whether the path matches at least one location
    pub fn exists_in(&self, document: &Value) -> bool {
        !self.resolve(document).is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

fn walk<'a>(
    value: &'a Value,
    segments: &[Segment],
    steps: &mut Vec<Step>,
    found: &mut Vec<Resolved<'a>>,
) {
    let Some((segment, rest)) = segments.split_first() else {
        found.push(Resolved {
            location: Location {
                steps: steps.clone(),
            },
            value,
        });
        return;
    };

    match &segment.name {
        None => select(value, segment.selector, rest, steps, found),
        Some(name) => {
            let Some(child) = value.as_object().and_then(|map| map.get(name)) else {
                return;
            };
            steps.push(Step::Key(name.clone()));
            select(child, segment.selector, rest, steps, found);
            steps.pop();
        }
    }
}

fn select<'a>(
    value: &'a Value,
    selector: Selector,
    rest: &[Segment],
    steps: &mut Vec<Step>,
    found: &mut Vec<Resolved<'a>>,
) {
    match (selector, value) {
        (Selector::At(index), Value::Array(items)) => {
            if let Some(item) = items.get(index) {
                steps.push(Step::Index(index));
                walk(item, rest, steps, found);
                steps.pop();
            }
        }
        (Selector::All, Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                steps.push(Step::Index(index));
                walk(item, rest, steps, found);
                steps.pop();
            }
        }
        (Selector::At(_) | Selector::All, _) => {}
        (Selector::Auto, Value::Array(_)) if !rest.is_empty() => fan_out(value, rest, steps, found),
        (Selector::Auto, _) => walk(value, rest, steps, found),
    }
}

fn fan_out<'a>(
    value: &'a Value,
    rest: &[Segment],
    steps: &mut Vec<Step>,
    found: &mut Vec<Resolved<'a>>,
) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                steps.push(Step::Index(index));
                fan_out(item, rest, steps, found);
                steps.pop();
            }
        }
        _ => walk(value, rest, steps, found),
    }
}

/// A concrete match produced by [`FieldPath::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    /// Concrete position inside the document
    pub location: Location,
    /// Value currently stored there
    pub value: &'a Value,
}

/// A single step of a concrete location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// Concrete position inside a document, usable as a handle for edits
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    steps: Vec<Step>,
}

impl Location {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a location from explicit steps
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Final step (the key or index inside the container)
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Location of the enclosing container
    pub fn parent(&self) -> Option<Location> {
        let (_, head) = self.steps.split_last()?;
        Some(Self {
            steps: head.to_vec(),
        })
    }

    /// Read the value at this location
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.steps
            .iter()
            .try_fold(document, |current, step| match step {
                Step::Key(key) => current.as_object()?.get(key),
                Step::Index(index) => current.as_array()?.get(*index),
            })
    }

    /// Mutable access to the value at this location
    pub fn get_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = document;
        for step in &self.steps {
            current = match step {
                Step::Key(key) => current.as_object_mut()?.get_mut(key)?,
                Step::Index(index) => current.as_array_mut()?.get_mut(*index)?,
            };
        }
        Some(current)
    }

    /// Mutable handle to the container holding this location
    pub fn container_mut<'a>(&self, document: &'a mut Value) -> Option<Container<'a>> {
        let parent = self.parent()?;
        match parent.get_mut(document)? {
            Value::Object(map) => Some(Container::Object(map)),
            Value::Array(items) => Some(Container::Array(items)),
            _ => None,
        }
    }

    /// Overwrite the value at this location, returning the previous one
    pub fn replace(&self, document: &mut Value, value: Value) -> Result<Value, EditError> {
        let slot = self
            .get_mut(document)
            .ok_or_else(|| EditError::Missing(self.to_string()))?;
        Ok(std::mem::replace(slot, value))
    }

    /// Delete the member or element at this location, keeping sibling order
    pub fn remove(&self, document: &mut Value) -> Result<Value, EditError> {
        let last = self.last().cloned().ok_or(EditError::Root)?;
        let missing = || EditError::Missing(self.to_string());

        match (self.container_mut(document).ok_or_else(missing)?, last) {
            (Container::Object(map), Step::Key(key)) => {
                let removed = map.get(&key).cloned().ok_or_else(missing)?;
                map.retain(|k, _| *k != key);
                Ok(removed)
            }
            (Container::Array(items), Step::Index(index)) if index < items.len() => {
                Ok(items.remove(index))
            }
            _ => Err(missing()),
        }
    }

    /// Rename the object key at this location without moving it
    ///
    /// Returns the location of the renamed member.
    pub fn rename_key(&self, document: &mut Value, new_key: &str) -> Result<Location, EditError> {
        let Some(Step::Key(old_key)) = self.last().cloned() else {
            return Err(EditError::NotAKey(self.to_string()));
        };

        let map = match self.container_mut(document) {
            Some(Container::Object(map)) => map,
            _ => return Err(EditError::Missing(self.to_string())),
        };
        if !map.contains_key(&old_key) {
            return Err(EditError::Missing(self.to_string()));
        }
        if map.contains_key(new_key) {
            return Err(EditError::KeyExists(new_key.to_string()));
        }

        let members = std::mem::take(map);
        for (key, value) in members {
            if key == old_key {
                map.insert(new_key.to_string(), value);
            } else {
                map.insert(key, value);
            }
        }

        let mut steps = self.steps.clone();
        if let Some(last) = steps.last_mut() {
            *last = Step::Key(new_key.to_string());
        }
        Ok(Self { steps })
    }

    /// Add a brand-new member to the object stored at this location
    pub fn insert_key(&self, document: &mut Value, key: &str, value: Value) -> Result<(), EditError> {
        let map = self
            .get_mut(document)
            .ok_or_else(|| EditError::Missing(self.to_string()))?
            .as_object_mut()
            .ok_or_else(|| EditError::NotAnObject(self.to_string()))?;

        if map.contains_key(key) {
            return Err(EditError::KeyExists(key.to_string()));
        }
        map.insert(key.to_string(), value);
        Ok(())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str(ROOT);
        }

        let mut first = true;
        for step in &self.steps {
            match step {
                Step::Key(key) => {
                    if !first {
                        write!(f, "{}", SEPARATOR)?;
                    }
                    f.write_str(key)?;
                }
                Step::Index(index) => {
                    if first {
                        f.write_str(ROOT)?;
                    }
                    write!(f, "[{}]", index)?;
                }
            }
            first = false;
        }
        Ok(())
    }
}

/// Mutable view of the container that owns a location
#[derive(Debug)]
pub enum Container<'a> {
    Object(&'a mut Map<String, Value>),
    Array(&'a mut Vec<Value>),
}

/// Collect every field path present in a document
///
/// Array elements collapse onto the array's own path, so `items#id` is
/// listed once regardless of how many elements carry an `id`.
pub fn collect_paths(document: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    let prefix = if document.is_array() {
        format!("{}[*]", ROOT)
    } else {
        String::new()
    };
    collect_into(document, &prefix, &mut paths);
    paths
}

fn collect_into(value: &Value, prefix: &str, paths: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}{}{}", prefix, SEPARATOR, key)
                };
                if !paths.contains(&path) {
                    paths.push(path.clone());
                }
                collect_into(child, &path, paths);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_into(item, prefix, paths);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn parse_simple_path() {
        let path = FieldPath::parse("user#address#city").unwrap();
        assert_eq!(path.depth(), 3);
        assert_eq!(path.leaf_name(), Some("city"));
        assert_eq!(path.to_string(), "user#address#city");
    }

    #[test]
    fn parse_selectors() {
        let path = FieldPath::parse("$[*]#items[2]#tags[*]").unwrap();
        let segments = path.segments();
        assert_eq!(segments[0].name, None);
        assert_eq!(segments[0].selector, Selector::All);
        assert_eq!(segments[1].selector, Selector::At(2));
        assert_eq!(segments[2].selector, Selector::All);
        assert_eq!(path.depth(), 2);
    }

    #[test]
    fn rejects_empty_and_blank_segments() {
        assert_eq!(FieldPath::parse(""), Err(PathError::Empty));
        assert_eq!(FieldPath::parse("a##b"), Err(PathError::EmptySegment(1)));
        assert_eq!(FieldPath::parse("a#"), Err(PathError::EmptySegment(1)));
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(matches!(
            FieldPath::parse("user#na\u{0}me"),
            Err(PathError::InvalidCharacter { ch: '\u{0}', .. })
        ));
        assert!(matches!(
            FieldPath::parse("a]b"),
            Err(PathError::InvalidSelector(_)) | Err(PathError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            FieldPath::parse("items[x]"),
            Err(PathError::InvalidSelector(_))
        ));
    }

    #[test]
    fn rejects_misplaced_root() {
        assert_eq!(FieldPath::parse("a#$"), Err(PathError::MisplacedRoot));
    }

    #[test]
    fn rejects_paths_over_depth_limit() {
        let deep = vec!["n"; MAX_PATH_DEPTH + 1].join("#");
        assert_eq!(
            FieldPath::parse(&deep),
            Err(PathError::TooDeep {
                depth: MAX_PATH_DEPTH + 1,
                max: MAX_PATH_DEPTH
            })
        );

        let at_limit = vec!["n"; MAX_PATH_DEPTH].join("#");
        assert!(FieldPath::parse(&at_limit).is_ok());
        assert!(FieldPath::parse_with_limit("a#b#c", 2).is_err());
    }

    #[test]
    fn anchored_prefixes_root_arrays() {
        let array = json!([{"id": 1}]);
        let object = json!({"id": 1});
        assert_eq!(FieldPath::anchored("id", &array).unwrap().as_str(), "$[*]#id");
        assert_eq!(FieldPath::anchored("id", &object).unwrap().as_str(), "id");
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn resolves_nested_field() {
        let doc = json!({"user": {"age": 30}});
        let path = FieldPath::parse("user#age").unwrap();
        let found = path.resolve(&doc);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, &json!(30));
        assert_eq!(found[0].location.to_string(), "user#age");
    }

    #[test]
    fn absent_field_resolves_to_nothing() {
        let doc = json!({});
        let path = FieldPath::parse("missing#field").unwrap();
        assert!(path.resolve(&doc).is_empty());
        assert!(!path.exists_in(&doc));
    }

    #[test]
    fn fans_out_over_arrays() {
        let doc = json!({"items": [{"id": 1}, {"id": 2}, {"name": "no id"}]});
        let path = FieldPath::parse("items#id").unwrap();
        let found = path.resolve(&doc);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].location.to_string(), "items[0]#id");
        assert_eq!(found[1].location.to_string(), "items[1]#id");
    }

    #[test]
    fn fans_out_over_nested_arrays() {
        let doc = json!({"matrix": [[{"x": 1}], [{"x": 2}, {"x": 3}]]});
        let path = FieldPath::parse("matrix#x").unwrap();
        assert_eq!(path.resolve(&doc).len(), 3);
    }

    #[test]
    fn empty_array_resolves_to_nothing() {
        let doc = json!({"items": []});
        let path = FieldPath::parse("items#id").unwrap();
        assert!(path.resolve(&doc).is_empty());
    }

    #[test]
    fn terminal_array_is_a_single_location() {
        let doc = json!({"tags": ["a", "b"]});
        let path = FieldPath::parse("tags").unwrap();
        let found = path.resolve(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, &json!(["a", "b"]));

        let every = FieldPath::parse("tags[*]").unwrap();
        assert_eq!(every.resolve(&doc).len(), 2);
    }

    #[test]
    fn explicit_index_selects_one_element() {
        let doc = json!({"items": [{"id": 1}, {"id": 2}]});
        let path = FieldPath::parse("items[1]#id").unwrap();
        let found = path.resolve(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, &json!(2));

        let out_of_range = FieldPath::parse("items[5]#id").unwrap();
        assert!(out_of_range.resolve(&doc).is_empty());
    }

    #[test]
    fn resolves_root_array_elements() {
        let doc = json!([{"id": 1}, {"id": 2}]);
        let path = FieldPath::parse("$[*]#id").unwrap();
        let found = path.resolve(&doc);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].location.to_string(), "$[1]#id");
    }

    #[test]
    fn root_path_resolves_to_document() {
        let doc = json!({"a": 1});
        let found = FieldPath::root().resolve(&doc);
        assert_eq!(found.len(), 1);
        assert!(found[0].location.is_root());
    }

    #[test]
    fn location_display_parses_back_to_same_location() {
        let doc = json!({"orders": [{"lines": [{"sku": "a"}, {"sku": "b"}]}]});
        let path = FieldPath::parse("orders#lines#sku").unwrap();

        for resolved in path.resolve(&doc) {
            let concrete = FieldPath::parse(&resolved.location.to_string()).unwrap();
            let again = concrete.resolve(&doc);
            assert_eq!(again.len(), 1);
            assert_eq!(again[0].location, resolved.location);
        }
    }

    // =========================================================================
    // Edits
    // =========================================================================

    #[test]
    fn remove_keeps_sibling_order() {
        let mut doc = json!({"a": 1, "b": 2, "c": 3});
        let location = Location::from_steps(vec![Step::Key("b".into())]);
        assert_eq!(location.remove(&mut doc).unwrap(), json!(2));
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"a":1,"c":3}"#);
    }

    #[test]
    fn remove_array_element() {
        let mut doc = json!({"items": [1, 2, 3]});
        let location = Location::from_steps(vec![Step::Key("items".into()), Step::Index(0)]);
        location.remove(&mut doc).unwrap();
        assert_eq!(doc, json!({"items": [2, 3]}));
    }

    #[test]
    fn remove_root_is_rejected() {
        let mut doc = json!({"a": 1});
        assert_eq!(Location::root().remove(&mut doc), Err(EditError::Root));
    }

    #[test]
    fn rename_key_keeps_position() {
        let mut doc = json!({"first": 1, "middle": 2, "last": 3});
        let location = Location::from_steps(vec![Step::Key("middle".into())]);
        let renamed = location.rename_key(&mut doc, "mid\u{200b}dle").unwrap();

        assert_eq!(renamed.to_string(), "mid\u{200b}dle");
        let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["first", "mid\u{200b}dle", "last"]);
        assert_eq!(doc["mid\u{200b}dle"], json!(2));
    }

    #[test]
    fn rename_key_rejects_collisions_and_indices() {
        let mut doc = json!({"a": 1, "b": 2, "list": [1]});
        let a = Location::from_steps(vec![Step::Key("a".into())]);
        assert_eq!(
            a.rename_key(&mut doc, "b"),
            Err(EditError::KeyExists("b".into()))
        );

        let element = Location::from_steps(vec![Step::Key("list".into()), Step::Index(0)]);
        assert!(matches!(
            element.rename_key(&mut doc, "x"),
            Err(EditError::NotAKey(_))
        ));
    }

    #[test]
    fn insert_key_appends_member() {
        let mut doc = json!({"user": {"name": "a"}});
        let user = Location::from_steps(vec![Step::Key("user".into())]);
        user.insert_key(&mut doc, "extra", json!(true)).unwrap();

        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"{"user":{"name":"a","extra":true}}"#
        );
        assert_eq!(
            user.insert_key(&mut doc, "extra", json!(1)),
            Err(EditError::KeyExists("extra".into()))
        );
    }

    #[test]
    fn replace_missing_location_fails() {
        let mut doc = json!({});
        let location = Location::from_steps(vec![Step::Key("nope".into())]);
        assert!(matches!(
            location.replace(&mut doc, json!(1)),
            Err(EditError::Missing(_))
        ));
    }

    #[test]
    fn collect_paths_lists_nested_fields_once() {
        let doc = json!({
            "name": "x",
            "items": [{"id": 1, "tags": ["t"]}, {"id": 2}],
            "meta": {"created": "now"}
        });
        assert_eq!(
            collect_paths(&doc),
            vec!["name", "items", "items#id", "items#tags", "meta", "meta#created"]
        );
    }

    #[test]
    fn collect_paths_anchors_root_arrays() {
        let doc = json!([{"id": 1}]);
        assert_eq!(collect_paths(&doc), vec!["$[*]#id"]);
    }
}
