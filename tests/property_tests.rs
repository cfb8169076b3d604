//! Property Tests
//!
//! Path round-trips, baseline non-mutation, fan-out and family totality
//! over generated documents and status codes.

use quickcheck::{Arbitrary, Gen, TestResult};
use quickcheck_macros::quickcheck;
use serde_json::{json, Map, Value};

use contractfuzz::fuzzer::family::{ResponseCodeFamily, StatusClass};
use contractfuzz::fuzzer::mutation::strategy::MutationStrategy;
use contractfuzz::fuzzer::mutation::{apply, apply_at_path};
use contractfuzz::fuzzer::path::{collect_paths, FieldPath, Location};

/// Object-rooted JSON document
#[derive(Clone, Debug)]
struct ArbDocument(Value);

impl Arbitrary for ArbDocument {
    fn arbitrary(g: &mut Gen) -> Self {
        ArbDocument(arbitrary_object(g, 0))
    }
}

fn arbitrary_object(g: &mut Gen, depth: usize) -> Value {
    let len = usize::arbitrary(g) % 5;
    let mut map = Map::new();
    for _ in 0..len {
        let key = format!("key{}", u8::arbitrary(g) % 16);
        map.insert(key, arbitrary_value(g, depth + 1));
    }
    Value::Object(map)
}

// Depth-limited so generated documents stay well under the path limit
fn arbitrary_value(g: &mut Gen, depth: usize) -> Value {
    let choices = if depth > 4 { 4 } else { 6 };
    match u8::arbitrary(g) % choices {
        0 => Value::Null,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => json!(i32::arbitrary(g)),
        3 => Value::String(String::arbitrary(g)),
        4 => {
            let len = usize::arbitrary(g) % 4;
            Value::Array((0..len).map(|_| arbitrary_value(g, depth + 1)).collect())
        }
        _ => arbitrary_object(g, depth),
    }
}

/// Every concrete location of every field path in the document
fn all_locations(document: &Value) -> Vec<Location> {
    collect_paths(document)
        .iter()
        .filter_map(|raw| FieldPath::parse(raw).ok())
        .flat_map(|path| {
            path.resolve(document)
                .into_iter()
                .map(|resolved| resolved.location)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn strategies() -> Vec<MutationStrategy> {
    vec![
        MutationStrategy::Replace(json!("replaced")),
        MutationStrategy::Prefix(" ".to_string()),
        MutationStrategy::Trail("\t".to_string()),
        MutationStrategy::Remove,
        MutationStrategy::DuplicateKey(json!(0)),
        MutationStrategy::KeyInsert("\u{200B}".to_string()),
        MutationStrategy::NewKey {
            name: "extra".to_string(),
            value: json!(true),
        },
        MutationStrategy::NoOp,
    ]
}

#[quickcheck]
fn prop_replace_round_trips(doc: ArbDocument) -> bool {
    let replacement = json!({"replaced": [1, 2, 3]});
    let strategy = MutationStrategy::Replace(replacement.clone());

    all_locations(&doc.0).iter().all(|location| {
        let Ok(mutated) = apply(&doc.0, location, &strategy) else {
            return false;
        };
        let Ok(reparsed) = serde_json::from_str::<Value>(&mutated.body) else {
            return false;
        };
        location.get(&reparsed) == Some(&replacement)
    })
}

#[quickcheck]
fn prop_mutations_never_touch_the_baseline(doc: ArbDocument) -> bool {
    let before = serde_json::to_string(&doc.0).unwrap();

    for location in all_locations(&doc.0) {
        for strategy in strategies() {
            // Not-applicable combinations are fine; only the baseline matters
            let _ = apply(&doc.0, &location, &strategy);
        }
    }

    serde_json::to_string(&doc.0).unwrap() == before
}

#[quickcheck]
fn prop_fan_out_yields_one_location_per_element(ids: Vec<i32>) -> bool {
    let items: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
    let document = json!({"items": items});
    let path = FieldPath::parse("items#id").unwrap();

    let resolved = path.resolve(&document).len() == ids.len();
    let mutated = match apply_at_path(&document, &path, &MutationStrategy::Replace(json!("x"))) {
        Ok(payloads) => payloads.len() == ids.len(),
        // Nothing to fan out over
        Err(_) => ids.is_empty(),
    };
    resolved && mutated
}

#[quickcheck]
fn prop_class_membership_is_total(raw: u16) -> TestResult {
    let code = 100 + raw % 500;
    let owner = StatusClass::of(code);
    if owner.is_none() {
        return TestResult::failed();
    }

    let exact = StatusClass::ALL
        .into_iter()
        .all(|class| ResponseCodeFamily::class(class).accepts(code) == (Some(class) == owner));
    TestResult::from_bool(exact)
}

#[quickcheck]
fn prop_union_accepts_iff_a_member_does(raw: u16, a: u8, b: u8) -> bool {
    let code = 100 + raw % 500;
    let left = ResponseCodeFamily::class(StatusClass::ALL[a as usize % 5]);
    let right = ResponseCodeFamily::class(StatusClass::ALL[b as usize % 5]);
    left.union(right).accepts(code) == (left.accepts(code) || right.accepts(code))
}

#[quickcheck]
fn prop_codes_outside_range_are_never_accepted(raw: u16) -> bool {
    let code = if raw < 100 { raw } else { 600 + raw % 1000 };
    StatusClass::ALL
        .into_iter()
        .all(|class| !ResponseCodeFamily::class(class).accepts(code))
}

#[quickcheck]
fn prop_families_compare_by_accepted_codes(codes: Vec<u16>) -> bool {
    let codes: Vec<u16> = codes.into_iter().map(|c| 100 + c % 500).collect();
    let mut reversed = codes.clone();
    reversed.reverse();
    ResponseCodeFamily::codes(&codes) == ResponseCodeFamily::codes(&reversed)
}
