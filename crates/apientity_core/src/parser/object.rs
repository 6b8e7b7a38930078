//! Object parser.

use super::{kind_of, unwrap_root, EntityParser};
use crate::error::{CoreError, CoreResult};
use crate::object::{ApiObject, ObjectRecord};
use crate::resource::{Resource, WireMap};
use crate::types::ObjectId;
use serde_json::Value;
use std::marker::PhantomData;

/// Parser bound to a single [`ApiObject`].
pub struct ObjectParser<'a, R: Resource> {
    object: &'a ApiObject<R>,
}

impl<'a, R: Resource> ObjectParser<'a, R> {
    /// Creates a parser for `object`.
    pub fn new(object: &'a ApiObject<R>) -> Self {
        Self { object }
    }
}

impl<R: Resource> EntityParser for ObjectParser<'_, R> {
    fn object_to_network_dictionary(&self) -> CoreResult<Value> {
        encode_object(&self.object.record.read()).map(Value::Object)
    }

    fn network_dictionary_to_object(&self, value: &Value) -> CoreResult<()> {
        decode_object(&mut self.object.record.write(), value)
    }
}

fn fields_to_map<R: Resource>(fields: &R) -> CoreResult<WireMap> {
    match serde_json::to_value(fields).map_err(|e| CoreError::field_mapping(R::RESOURCE_NAME, e))? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::invalid_format(format!(
            "{} fields serialize to {}, expected object",
            R::RESOURCE_NAME,
            kind_of(&other)
        ))),
    }
}

/// Serializes the identifier and the mapped fields.
pub(crate) fn encode_object<R: Resource>(record: &ObjectRecord<R>) -> CoreResult<WireMap> {
    let fields = fields_to_map(&record.fields)?;
    let mut out = WireMap::new();

    if let Some(id) = &record.identifier {
        out.insert(R::IDENTIFIER_KEY.to_string(), id.to_value());
    }
    for (field, wire) in R::KEY_MAP {
        if let Some(value) = fields.get(*field) {
            out.insert((*wire).to_string(), value.clone());
        }
    }

    Ok(out)
}

/// Overlays the mapped subset of `value` onto the record.
///
/// The record is left untouched when the payload cannot be applied.
pub(crate) fn decode_object<R: Resource>(
    record: &mut ObjectRecord<R>,
    value: &Value,
) -> CoreResult<()> {
    let mut staged = StagedRecord::<R>::of(record)?;
    staged.overlay(value)?;
    staged.build()?.apply(record);
    Ok(())
}

/// Wire-level view of a record with payloads overlaid but not yet applied.
///
/// Several payloads can be overlaid in turn; nothing reaches the record
/// until [`build`](Self::build) succeeds and the result is applied.
pub(crate) struct StagedRecord<R> {
    fields: WireMap,
    identifier: Option<ObjectId>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> StagedRecord<R> {
    /// Stages on top of an existing record.
    pub(crate) fn of(record: &ObjectRecord<R>) -> CoreResult<Self> {
        Ok(Self {
            fields: fields_to_map(&record.fields)?,
            identifier: record.identifier.clone(),
            _resource: PhantomData,
        })
    }

    /// Stages on top of default field values.
    pub(crate) fn fresh() -> CoreResult<Self> {
        Ok(Self {
            fields: fields_to_map(&R::default())?,
            identifier: None,
            _resource: PhantomData,
        })
    }

    pub(crate) fn identifier(&self) -> Option<&ObjectId> {
        self.identifier.as_ref()
    }

    /// Overlays the mapped keys and the identifier of `value`.
    pub(crate) fn overlay(&mut self, value: &Value) -> CoreResult<()> {
        let value = unwrap_root(value, R::RESOURCE_NAME);
        let incoming = value.as_object().ok_or_else(|| {
            CoreError::invalid_format(format!(
                "expected {} object, got {}",
                R::RESOURCE_NAME,
                kind_of(value)
            ))
        })?;

        for (field, wire) in R::KEY_MAP {
            if let Some(v) = incoming.get(*wire) {
                self.fields.insert((*field).to_string(), v.clone());
            }
        }
        if let Some(id) = incoming.get(R::IDENTIFIER_KEY).and_then(ObjectId::from_value) {
            self.identifier = Some(id);
        }
        Ok(())
    }

    /// Deserializes the staged fields and runs the post-parse hook.
    pub(crate) fn build(self) -> CoreResult<DecodedRecord<R>> {
        let mut fields: R = serde_json::from_value(Value::Object(self.fields))
            .map_err(|e| CoreError::field_mapping(R::RESOURCE_NAME, e))?;
        fields.after_parse();
        Ok(DecodedRecord {
            fields,
            identifier: self.identifier,
        })
    }
}

/// Fully decoded payload, ready to replace a record's fields.
pub(crate) struct DecodedRecord<R> {
    fields: R,
    identifier: Option<ObjectId>,
}

impl<R> DecodedRecord<R> {
    /// Replaces the fields; a missing identifier never clears one.
    pub(crate) fn apply(self, record: &mut ObjectRecord<R>) {
        record.fields = self.fields;
        if self.identifier.is_some() {
            record.identifier = self.identifier;
        }
    }
}
