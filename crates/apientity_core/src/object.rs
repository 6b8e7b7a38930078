//! Single resource instances.

use crate::collection::ApiCollection;
use crate::entity::{join_path, SyncableEntity};
use crate::error::CoreResult;
use crate::parser::{self, DecodedRecord, ObjectParser, StagedRecord};
use crate::resource::{Resource, WireMap};
use crate::types::{ObjectId, SyncState};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Mutable part of an object, guarded as one unit.
pub(crate) struct ObjectRecord<R> {
    pub(crate) identifier: Option<ObjectId>,
    pub(crate) state: SyncState,
    pub(crate) fields: R,
    pub(crate) validation_errors: Vec<String>,
}

/// A single remote resource instance.
///
/// Objects are shared as `Arc<ApiObject<R>>`. A collection holding the
/// object owns it; the object only keeps a weak back-reference, so it
/// never keeps its collection (or its owner) alive.
///
/// # Invariants
///
/// - An object in [`SyncState::New`] has no identifier.
/// - Any other state implies an identifier.
/// - The object is either standalone or a member of exactly one collection.
pub struct ApiObject<R: Resource> {
    pub(crate) record: RwLock<ObjectRecord<R>>,
    collection: RwLock<Option<Weak<ApiCollection<R>>>>,
    owner: Option<Weak<dyn SyncableEntity>>,
}

impl<R: Resource> ApiObject<R> {
    fn build(
        identifier: Option<ObjectId>,
        state: SyncState,
        collection: Option<Weak<ApiCollection<R>>>,
        owner: Option<Weak<dyn SyncableEntity>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            record: RwLock::new(ObjectRecord {
                identifier,
                state,
                fields: R::default(),
                validation_errors: Vec::new(),
            }),
            collection: RwLock::new(collection),
            owner,
        })
    }

    /// Creates a new, standalone object that has never been sent.
    pub fn new() -> Arc<Self> {
        Self::build(None, SyncState::New, None, None)
    }

    /// Creates a new object nested under `owner`.
    ///
    /// The owner's path prefixes this object's path; the owner is not
    /// kept alive by the object.
    pub fn with_owner<O: SyncableEntity + 'static>(owner: &Arc<O>) -> Arc<Self> {
        let owner: Arc<dyn SyncableEntity> = owner.clone();
        Self::build(None, SyncState::New, None, Some(Arc::downgrade(&owner)))
    }

    /// Creates a reference to an object known to exist remotely.
    pub fn existing(identifier: impl Into<ObjectId>) -> Arc<Self> {
        Self::build(Some(identifier.into()), SyncState::Existing, None, None)
    }

    /// Builds an object from a wire payload.
    ///
    /// The object is `Synced` when the payload carries an identifier and
    /// every key in [`Resource::REQUIRED_KEYS`], `Existing` when it only
    /// carries an identifier, and `New` otherwise.
    pub fn from_dictionary(value: &Value) -> CoreResult<Arc<Self>> {
        let object = Self::new();
        object.parse(value)?;

        let complete = parser::unwrap_root(value, R::RESOURCE_NAME)
            .as_object()
            .map(|map| R::REQUIRED_KEYS.iter().all(|key| map.contains_key(*key)))
            .unwrap_or(false);
        if complete && object.identifier().is_some() {
            object.record.write().state = SyncState::Synced;
        }

        Ok(object)
    }

    /// Creates a member for `collection`.
    pub(crate) fn new_member(collection: Weak<ApiCollection<R>>) -> Arc<Self> {
        Self::build(None, SyncState::New, Some(collection), None)
    }

    /// Extracts the identifier from a wire payload without building an object.
    pub fn identifier_from_dictionary(value: &Value) -> Option<ObjectId> {
        parser::unwrap_root(value, R::RESOURCE_NAME)
            .as_object()?
            .get(R::IDENTIFIER_KEY)
            .and_then(ObjectId::from_value)
    }

    /// Returns the remote identifier, if assigned.
    pub fn identifier(&self) -> Option<ObjectId> {
        self.record.read().identifier.clone()
    }

    /// Returns the current sync state.
    pub fn state(&self) -> SyncState {
        self.record.read().state
    }

    /// Reads the fields.
    pub fn read<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.record.read().fields)
    }

    /// Returns a copy of the fields.
    pub fn fields(&self) -> R
    where
        R: Clone,
    {
        self.record.read().fields.clone()
    }

    /// Mutates the fields.
    ///
    /// An `Existing` or `Synced` object becomes `Dirty`. A `New` object
    /// stays `New`.
    pub fn update<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        let mut record = self.record.write();
        let out = f(&mut record.fields);
        if matches!(record.state, SyncState::Existing | SyncState::Synced) {
            debug!(resource = R::RESOURCE_NAME, from = %record.state, "marked dirty");
            record.state = SyncState::Dirty;
        }
        out
    }

    /// Flags a persisted object as needing a push.
    pub fn mark_dirty(&self) {
        self.update(|_| ());
    }

    /// Runs the resource's validation.
    ///
    /// On failure the validation errors are recorded and are never empty.
    pub fn validate(&self) -> bool {
        let mut record = self.record.write();
        match record.fields.validate() {
            Ok(()) => {
                record.validation_errors.clear();
                true
            }
            Err(mut errors) => {
                if errors.is_empty() {
                    errors.push(format!("{} is invalid", R::RESOURCE_NAME));
                }
                record.validation_errors = errors;
                false
            }
        }
    }

    /// Errors recorded by the last failed validation.
    pub fn validation_errors(&self) -> Vec<String> {
        self.record.read().validation_errors.clone()
    }

    /// Returns the owning collection, if the object is a member of one.
    pub fn collection(&self) -> Option<Arc<ApiCollection<R>>> {
        self.collection.read().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_collection(&self, collection: Option<Weak<ApiCollection<R>>>) {
        *self.collection.write() = collection;
    }

    /// Returns the owner this object is nested under, if any.
    pub fn owner(&self) -> Option<Arc<dyn SyncableEntity>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Path of the object relative to the API base URL.
    ///
    /// `{owner}/{RESOURCE_PATH}/{id}` for nested objects, the collection's
    /// path plus the identifier for members, `{RESOURCE_PATH}/{id}` otherwise.
    /// The identifier suffix is omitted until one is assigned.
    pub fn resource_path(&self) -> String {
        let base = if let Some(owner) = self.owner() {
            join_path(&owner.resource_path(), R::RESOURCE_PATH)
        } else if let Some(collection) = self.collection() {
            collection.resource_path()
        } else {
            R::RESOURCE_PATH.to_string()
        };

        match self.identifier() {
            Some(id) => join_path(&base, &id.to_string()),
            None => base,
        }
    }

    /// Returns the parser bound to this object.
    pub fn parser(&self) -> ObjectParser<'_, R> {
        ObjectParser::new(self)
    }

    /// Serializes the mapped fields (and identifier) to a wire dictionary.
    pub fn to_network_dictionary(&self) -> CoreResult<WireMap> {
        parser::encode_object(&self.record.read())
    }

    /// Applies a server payload and recomputes the sync state.
    ///
    /// An object that gains its first identifier becomes `Existing`. A
    /// refresh of an object that already had one becomes `Synced`, unless
    /// it is `Dirty`: payload fields win, but unsent local changes to
    /// other fields are still pending, so it stays `Dirty`.
    pub fn parse(&self, value: &Value) -> CoreResult<()> {
        let mut record = self.record.write();
        let had_identifier = record.identifier.is_some();
        parser::decode_object(&mut record, value)?;
        settle_after_parse(&mut record, had_identifier, false);
        Ok(())
    }

    /// Snapshot of the record for a staged parse.
    pub(crate) fn stage(&self) -> CoreResult<StagedRecord<R>> {
        StagedRecord::of(&self.record.read())
    }

    /// Applies a staged parse.
    ///
    /// With `confirmed`, the payload is the server's reply to a push of
    /// this object, so an object with an identifier ends up `Synced`.
    pub(crate) fn commit(&self, decoded: DecodedRecord<R>, confirmed: bool) {
        let mut record = self.record.write();
        let had_identifier = record.identifier.is_some();
        decoded.apply(&mut record);
        settle_after_parse(&mut record, had_identifier, confirmed);
    }

    /// Whether the back-reference points at `collection`.
    pub(crate) fn is_member_of(&self, collection: &ApiCollection<R>) -> bool {
        self.collection
            .read()
            .as_ref()
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), collection))
    }
}

fn settle_after_parse<R: Resource>(record: &mut ObjectRecord<R>, had_identifier: bool, confirmed: bool) {
    let has_identifier = record.identifier.is_some();
    let next = match (had_identifier, has_identifier, record.state) {
        (_, true, _) if confirmed => SyncState::Synced,
        (false, true, _) => SyncState::Existing,
        (true, _, SyncState::Dirty) => SyncState::Dirty,
        (true, _, _) => SyncState::Synced,
        (false, false, state) => state,
    };
    if next != record.state {
        debug!(
            resource = R::RESOURCE_NAME,
            id = ?record.identifier,
            from = %record.state,
            to = %next,
            "state changed by parse"
        );
        record.state = next;
    }
}

impl<R: Resource> SyncableEntity for ApiObject<R> {
    fn state(&self) -> SyncState {
        ApiObject::state(self)
    }

    fn set_state(&self, state: SyncState) {
        let mut record = self.record.write();
        if record.state != state {
            debug!(resource = R::RESOURCE_NAME, id = ?record.identifier, from = %record.state, to = %state, "state changed");
            record.state = state;
        }
    }

    fn resource_name(&self) -> &'static str {
        R::RESOURCE_NAME
    }

    fn resource_path(&self) -> String {
        ApiObject::resource_path(self)
    }

    fn identifier(&self) -> Option<ObjectId> {
        ApiObject::identifier(self)
    }

    fn requires_identifier(&self) -> bool {
        true
    }

    fn parse_network_value(&self, value: &Value) -> CoreResult<()> {
        self.parse(value)
    }

    fn to_network_value(&self) -> CoreResult<Value> {
        self.to_network_dictionary().map(Value::Object)
    }

    fn params_for_create(&self) -> Option<WireMap> {
        self.read(R::params_for_create)
    }

    fn params_for_update(&self) -> Option<WireMap> {
        self.read(R::params_for_update)
    }

    fn params_for_read(&self) -> Option<WireMap> {
        self.read(R::params_for_read)
    }

    fn validate(&self) -> bool {
        ApiObject::validate(self)
    }

    fn validation_errors(&self) -> Vec<String> {
        ApiObject::validation_errors(self)
    }

    fn did_destroy(&self) {
        if let Some(collection) = self.collection() {
            collection.detach(self);
        }
    }

    fn did_sync(&self) {
        if let Some(collection) = self.collection() {
            collection.claim_identifier(self);
        }
    }
}

impl<R: Resource> fmt::Debug for ApiObject<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record.read();
        f.debug_struct("ApiObject")
            .field("resource", &R::RESOURCE_NAME)
            .field("identifier", &record.identifier)
            .field("state", &record.state)
            .finish()
    }
}
