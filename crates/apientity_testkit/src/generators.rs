//! Property-based test generators using proptest.
//!
//! Payloads follow the [`Widget`](crate::fixtures::Widget) wire format.

use apientity_core::ObjectId;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Strategy for identifiers, numeric or textual.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop_oneof![
        (1i64..10_000).prop_map(ObjectId::Int),
        "[a-z0-9]{1,12}".prop_map(ObjectId::Text),
    ]
}

/// Strategy for one widget payload.
///
/// Identifiers come from a small range so that arrays contain repeats;
/// about one element in five has no identifier.
pub fn widget_payload_strategy() -> impl Strategy<Value = Value> {
    (
        prop::option::weighted(0.8, 1i64..16),
        "[A-Za-z][A-Za-z ]{0,15}",
        prop::option::of("(red|green|blue)"),
        0i64..500,
    )
        .prop_map(|(id, name, color, qty)| {
            let mut map = Map::new();
            if let Some(id) = id {
                map.insert("id".into(), json!(id));
            }
            map.insert("name".into(), json!(name));
            if let Some(color) = color {
                map.insert("colour".into(), json!(color));
            }
            map.insert("qty".into(), json!(qty));
            Value::Object(map)
        })
}

/// Strategy for a widget array, optionally wrapped under `widgets`.
pub fn widget_array_strategy() -> impl Strategy<Value = Value> {
    (prop::collection::vec(widget_payload_strategy(), 0..24), any::<bool>()).prop_map(
        |(items, wrapped)| {
            if wrapped {
                json!({ "widgets": items })
            } else {
                Value::Array(items)
            }
        },
    )
}

/// Strips the `widgets` wrapper, if present.
pub fn elements_of(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("widgets")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}
