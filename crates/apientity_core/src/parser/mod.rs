//! The parser boundary between wire payloads and entity fields.
//!
//! Parsers mutate their target in place and never touch its sync state;
//! state transitions belong to the caller.

mod collection;
mod object;

pub use collection::CollectionParser;
pub use object::ObjectParser;

pub(crate) use collection::{merge_elements, MergeMode};
pub(crate) use object::{decode_object, encode_object, DecodedRecord, StagedRecord};

use crate::error::CoreResult;
use serde_json::Value;

/// Converts an entity to and from its wire representation.
pub trait EntityParser {
    /// Serializes the entity's current state.
    fn object_to_network_dictionary(&self) -> CoreResult<Value>;

    /// Applies a wire payload to the entity.
    fn network_dictionary_to_object(&self, value: &Value) -> CoreResult<()>;
}

/// Strips a single root key wrapper (`{"widget": {...}}`) if present.
pub(crate) fn unwrap_root<'v>(value: &'v Value, root: &str) -> &'v Value {
    match value {
        Value::Object(map) if map.len() == 1 => match map.get(root) {
            Some(inner) if inner.is_object() || inner.is_array() => inner,
            _ => value,
        },
        _ => value,
    }
}

/// Short name of a JSON value kind, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_only_single_matching_root() {
        let wrapped = json!({"widget": {"id": 1}});
        assert_eq!(unwrap_root(&wrapped, "widget"), &json!({"id": 1}));

        let other = json!({"gadget": {"id": 1}});
        assert_eq!(unwrap_root(&other, "widget"), &other);

        let scalar_field = json!({"widget": "a name"});
        assert_eq!(unwrap_root(&scalar_field, "widget"), &scalar_field);

        let two_keys = json!({"widget": {"id": 1}, "meta": {}});
        assert_eq!(unwrap_root(&two_keys, "widget"), &two_keys);
    }

    #[test]
    fn kinds() {
        assert_eq!(kind_of(&json!([])), "array");
        assert_eq!(kind_of(&json!(null)), "null");
    }
}
