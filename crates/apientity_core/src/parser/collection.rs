//! Collection parser and the merge-by-identifier algorithm.

use super::{kind_of, unwrap_root, EntityParser, StagedRecord};
use crate::collection::ApiCollection;
use crate::error::{CoreError, CoreResult};
use crate::object::ApiObject;
use crate::resource::Resource;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// Parser bound to an [`ApiCollection`].
///
/// Serializes to a wire array and parses either a bare array or one
/// wrapped under the collection name.
pub struct CollectionParser<'a, R: Resource> {
    collection: &'a ApiCollection<R>,
}

impl<'a, R: Resource> CollectionParser<'a, R> {
    /// Creates a parser for `collection`.
    pub fn new(collection: &'a ApiCollection<R>) -> Self {
        Self { collection }
    }
}

impl<R: Resource> EntityParser for CollectionParser<'_, R> {
    fn object_to_network_dictionary(&self) -> CoreResult<Value> {
        self.collection.to_network_array().map(Value::Array)
    }

    fn network_dictionary_to_object(&self, value: &Value) -> CoreResult<()> {
        self.collection.parse(value)
    }
}

/// How a bulk merge treats its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeMode {
    /// A read: match by identifier, append the rest.
    Refresh,
    /// The reply to a push of the whole collection. Elements without a
    /// matching member are paired, in order, with the members that had
    /// no identifier when the push was sent, and every touched member
    /// ends up `Synced`.
    Confirm,
}

/// Counts produced by a bulk merge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergeOutcome {
    pub(crate) appended: usize,
    pub(crate) refreshed: usize,
    pub(crate) claimed: usize,
}

enum Target<R: Resource> {
    Member(Arc<ApiObject<R>>),
    Unsent(Arc<ApiObject<R>>),
    Fresh,
}

/// Merges wire elements into `objects`.
///
/// Elements whose identifier matches a member refresh that member in
/// place; everything else is appended as a new member. Several elements
/// with one identifier collapse into one member, the last one winning.
/// Every element is decoded before anything is applied, so a payload
/// that fails anywhere changes nothing. The caller must hold the
/// collection guard.
pub(crate) fn merge_elements<R: Resource>(
    collection: &ApiCollection<R>,
    objects: &mut Vec<Arc<ApiObject<R>>>,
    elements: &[Value],
    mode: MergeMode,
) -> CoreResult<MergeOutcome> {
    let mut unsent: VecDeque<Arc<ApiObject<R>>> = match mode {
        MergeMode::Refresh => VecDeque::new(),
        MergeMode::Confirm => objects
            .iter()
            .filter(|object| object.identifier().is_none())
            .cloned()
            .collect(),
    };

    let mut staged: Vec<(Target<R>, StagedRecord<R>)> = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let inner = unwrap_root(element, R::RESOURCE_NAME);
        if !inner.is_object() {
            return Err(CoreError::invalid_format(format!(
                "element {index} of {} is {}, expected object",
                R::COLLECTION_NAME,
                kind_of(inner)
            )));
        }

        let id = ApiObject::<R>::identifier_from_dictionary(element);
        let slot = id
            .as_ref()
            .and_then(|id| staged.iter().position(|(_, record)| record.identifier() == Some(id)));
        let slot = match slot {
            Some(slot) => slot,
            None => {
                let member = id.as_ref().and_then(|id| {
                    objects
                        .iter()
                        .find(|object| object.identifier().as_ref() == Some(id))
                        .cloned()
                });
                let (target, record) = match (member, unsent.front()) {
                    (Some(member), _) => {
                        let record = member.stage()?;
                        (Target::Member(member), record)
                    }
                    (None, Some(claim)) => {
                        let record = claim.stage()?;
                        (Target::Unsent(claim.clone()), record)
                    }
                    (None, None) => (Target::Fresh, StagedRecord::fresh()?),
                };
                if matches!(target, Target::Unsent(_)) {
                    unsent.pop_front();
                }
                staged.push((target, record));
                staged.len() - 1
            }
        };
        staged[slot].1.overlay(element)?;
    }

    let mut decoded = Vec::with_capacity(staged.len());
    for (target, record) in staged {
        decoded.push((target, record.build()?));
    }

    let confirmed = mode == MergeMode::Confirm;
    let mut outcome = MergeOutcome::default();
    for (target, record) in decoded {
        match target {
            Target::Member(object) => {
                object.commit(record, confirmed);
                outcome.refreshed += 1;
            }
            Target::Unsent(object) => {
                object.commit(record, confirmed);
                outcome.claimed += 1;
            }
            Target::Fresh => {
                let object = ApiObject::new_member(collection.downgrade());
                object.commit(record, confirmed);
                objects.push(object);
                outcome.appended += 1;
            }
        }
    }

    Ok(outcome)
}
