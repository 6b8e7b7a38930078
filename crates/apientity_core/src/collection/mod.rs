//! Ordered, identity-deduplicated sets of objects.

mod guard;

pub use guard::ObjectsGuard;

use crate::entity::{join_path, SyncableEntity};
use crate::error::{CoreError, CoreResult};
use crate::object::ApiObject;
use crate::parser::{self, kind_of, CollectionParser, MergeMode};
use crate::resource::Resource;
use crate::types::{ObjectId, SyncState};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Comparator applied to the members after every bulk parse.
pub type ObjectComparator<R> =
    Arc<dyn Fn(&ApiObject<R>, &ApiObject<R>) -> Ordering + Send + Sync>;

/// An ordered sequence of objects of one resource type.
///
/// Members are unique by identifier; objects without an identifier are
/// unique by reference. All structural operations serialize on one
/// internal guard, which callers can also hold explicitly through
/// [`lock_objects`](Self::lock_objects).
///
/// Lock order is the member guard first, then individual objects. Object
/// methods never take the member guard. Changes that arrive from a sync
/// completion while the guard is held (a destroyed member leaving, a
/// created member claiming its identifier) are queued and applied when
/// the guard is next taken or released.
pub struct ApiCollection<R: Resource> {
    this: Weak<Self>,
    objects: Mutex<Vec<Arc<ApiObject<R>>>>,
    deferred: Mutex<Vec<Deferred>>,
    state: RwLock<SyncState>,
    owner: Option<Weak<dyn SyncableEntity>>,
    order_after_parse: RwLock<Option<ObjectComparator<R>>>,
}

impl<R: Resource> ApiCollection<R> {
    fn build(state: SyncState, owner: Option<Weak<dyn SyncableEntity>>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            objects: Mutex::new(Vec::new()),
            deferred: Mutex::new(Vec::new()),
            state: RwLock::new(state),
            owner,
            order_after_parse: RwLock::new(None),
        })
    }

    /// Creates an empty, standalone collection.
    pub fn new() -> Arc<Self> {
        Self::build(SyncState::New, None)
    }

    /// Creates an empty collection nested under `owner`.
    pub fn with_owner<O: SyncableEntity + 'static>(owner: &Arc<O>) -> Arc<Self> {
        let owner: Arc<dyn SyncableEntity> = owner.clone();
        Self::build(SyncState::New, Some(Arc::downgrade(&owner)))
    }

    /// Creates a collection from a wire array (bare or wrapped).
    pub fn from_array(value: &Value) -> CoreResult<Arc<Self>> {
        let collection = Self::build(SyncState::Existing, None);
        collection.parse(value)?;
        Ok(collection)
    }

    pub(crate) fn downgrade(&self) -> Weak<Self> {
        self.this.clone()
    }

    /// Current sync state of the collection itself.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Root key of wrapped collection payloads.
    pub fn resource_name(&self) -> &'static str {
        R::COLLECTION_NAME
    }

    /// Path of the collection relative to the API base URL.
    pub fn resource_path(&self) -> String {
        match self.owner() {
            Some(owner) => join_path(&owner.resource_path(), R::RESOURCE_PATH),
            None => R::RESOURCE_PATH.to_string(),
        }
    }

    /// Returns the entity this collection is nested under, if any.
    pub fn owner(&self) -> Option<Arc<dyn SyncableEntity>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Snapshot of the members, in order.
    pub fn objects(&self) -> Vec<Arc<ApiObject<R>>> {
        self.members().clone()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members().len()
    }

    /// Whether the collection has no members.
    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    /// Creates a `New` object, appends it and returns it.
    pub fn build_object(&self) -> Arc<ApiObject<R>> {
        let object = ApiObject::new_member(self.downgrade());
        self.members().push(object.clone());
        object
    }

    /// Appends `object`.
    ///
    /// Returns `false`, leaving the collection unchanged, when the object
    /// is already a member, when a member has the same identifier, or when
    /// the object belongs to another collection.
    pub fn add_object(&self, object: Arc<ApiObject<R>>) -> bool {
        let mut objects = self.members();
        self.insert(&mut objects, object)
    }

    /// Removes every member matching one of `objects`, by identifier or by
    /// reference. Returns how many members were removed.
    pub fn remove_objects(&self, objects: &[Arc<ApiObject<R>>]) -> usize {
        remove_matching(&mut self.members(), objects)
    }

    /// Stable in-place reorder.
    pub fn order_with<F>(&self, mut compare: F)
    where
        F: FnMut(&ApiObject<R>, &ApiObject<R>) -> Ordering,
    {
        self.members().sort_by(|a, b| compare(a, b));
    }

    /// Sets the comparator applied after every bulk parse.
    pub fn set_order_after_parse<F>(&self, compare: F)
    where
        F: Fn(&ApiObject<R>, &ApiObject<R>) -> Ordering + Send + Sync + 'static,
    {
        *self.order_after_parse.write() = Some(Arc::new(compare));
    }

    /// Removes the post-parse comparator.
    pub fn clear_order_after_parse(&self) {
        *self.order_after_parse.write() = None;
    }

    /// Returns the member with the given identifier.
    pub fn object_with_identifier(&self, identifier: &ObjectId) -> Option<Arc<ApiObject<R>>> {
        self.members()
            .iter()
            .find(|object| object.identifier().as_ref() == Some(identifier))
            .cloned()
    }

    /// Members currently in `state`, in order.
    pub fn objects_in_state(&self, state: SyncState) -> Vec<Arc<ApiObject<R>>> {
        self.members()
            .iter()
            .filter(|object| object.state() == state)
            .cloned()
            .collect()
    }

    /// Holds the member guard until the returned guard is dropped.
    pub fn lock_objects(&self) -> ObjectsGuard<'_, R> {
        ObjectsGuard::new(self, self.members())
    }

    /// Takes the member guard and applies queued changes.
    fn members(&self) -> MutexGuard<'_, Vec<Arc<ApiObject<R>>>> {
        let mut objects = self.objects.lock();
        self.apply_deferred(&mut objects);
        objects
    }

    /// Applies changes queued while the guard was unavailable.
    pub(crate) fn apply_deferred(&self, objects: &mut Vec<Arc<ApiObject<R>>>) {
        let pending = std::mem::take(&mut *self.deferred.lock());
        if pending.is_empty() {
            return;
        }

        let before = objects.len();
        objects.retain(|member| member.is_member_of(self));
        for change in pending {
            if let Deferred::Claim { identifier, keeper } = change {
                resolve_claim(objects, &identifier, keeper);
            }
        }
        debug!(
            resource = R::COLLECTION_NAME,
            removed = before - objects.len(),
            "applied deferred member changes"
        );
    }

    /// Returns the parser bound to this collection.
    pub fn parser(&self) -> CollectionParser<'_, R> {
        CollectionParser::new(self)
    }

    /// Merges a wire array into the collection.
    ///
    /// Accepts a bare array or one wrapped under [`Resource::COLLECTION_NAME`].
    pub fn parse(&self, value: &Value) -> CoreResult<()> {
        let elements = Self::elements_of(value)?;
        self.parse_array(elements)
    }

    /// Merges wire elements by identifier.
    ///
    /// Matching members are refreshed in place, the rest are appended.
    /// Members absent from `elements` are kept. The post-parse comparator,
    /// if set, is applied afterwards. A payload that fails to decode
    /// leaves the collection unchanged.
    pub fn parse_array(&self, elements: &[Value]) -> CoreResult<()> {
        self.merge(elements, MergeMode::Refresh)
    }

    /// Applies the server's reply to a push of the whole collection.
    ///
    /// Like [`parse`](Self::parse), except that reply elements with no
    /// matching member are paired, in order, with the members that had no
    /// identifier, and every member the reply covers becomes `Synced`.
    pub fn parse_confirmed(&self, value: &Value) -> CoreResult<()> {
        let elements = Self::elements_of(value)?;
        self.merge(elements, MergeMode::Confirm)
    }

    fn elements_of(value: &Value) -> CoreResult<&[Value]> {
        let value = parser::unwrap_root(value, R::COLLECTION_NAME);
        value.as_array().map(Vec::as_slice).ok_or_else(|| {
            CoreError::invalid_format(format!(
                "expected {} array, got {}",
                R::COLLECTION_NAME,
                kind_of(value)
            ))
        })
    }

    fn merge(&self, elements: &[Value], mode: MergeMode) -> CoreResult<()> {
        let mut objects = self.members();
        let outcome = parser::merge_elements(self, &mut objects, elements, mode)?;

        let compare = self.order_after_parse.read().clone();
        if let Some(compare) = compare {
            objects.sort_by(|a, b| compare(a, b));
        }

        debug!(
            resource = R::COLLECTION_NAME,
            ?mode,
            appended = outcome.appended,
            refreshed = outcome.refreshed,
            claimed = outcome.claimed,
            members = objects.len(),
            "merged collection payload"
        );
        Ok(())
    }

    /// Serializes every member, in order.
    pub fn to_network_array(&self) -> CoreResult<Vec<Value>> {
        self.objects()
            .iter()
            .map(|object| object.to_network_dictionary().map(Value::Object))
            .collect()
    }

    pub(crate) fn insert(
        &self,
        objects: &mut Vec<Arc<ApiObject<R>>>,
        object: Arc<ApiObject<R>>,
    ) -> bool {
        if objects.iter().any(|member| Arc::ptr_eq(member, &object)) {
            return false;
        }
        if let Some(id) = object.identifier() {
            if objects.iter().any(|member| member.identifier().as_ref() == Some(&id)) {
                debug!(resource = R::COLLECTION_NAME, %id, "rejected duplicate identifier");
                return false;
            }
        }
        if let Some(current) = object.collection() {
            if !std::ptr::eq(Arc::as_ptr(&current), self) {
                warn!(
                    resource = R::COLLECTION_NAME,
                    id = ?object.identifier(),
                    "object already belongs to another collection"
                );
                return false;
            }
        }

        object.set_collection(Some(self.downgrade()));
        objects.push(object);
        true
    }

    /// Removes a single member, matched by identifier or by reference.
    pub fn remove_object(&self, object: &ApiObject<R>) -> CoreResult<()> {
        let mut objects = self.members();
        let before = objects.len();
        objects.retain(|member| {
            let hit = same_object(member, object);
            if hit {
                member.set_collection(None);
            }
            !hit
        });
        let removed = before != objects.len();
        drop(objects);

        if !removed {
            return Err(CoreError::NotAMember {
                path: self.resource_path(),
            });
        }
        Ok(())
    }

    /// Drops `object` after a confirmed remote destroy.
    ///
    /// When the guard is held elsewhere, the back-reference is cleared at
    /// once and the member is dropped the next time the guard is taken or
    /// released.
    pub(crate) fn detach(&self, object: &ApiObject<R>) -> bool {
        let Some(mut objects) = self.objects.try_lock() else {
            object.set_collection(None);
            self.deferred.lock().push(Deferred::Detach);
            debug!(resource = R::COLLECTION_NAME, id = ?object.identifier(), "deferred detach of destroyed member");
            return true;
        };
        self.apply_deferred(&mut objects);

        let before = objects.len();
        objects.retain(|member| {
            let hit = std::ptr::eq(Arc::as_ptr(member), object);
            if hit {
                member.set_collection(None);
            }
            !hit
        });
        let removed = before != objects.len();
        if removed {
            debug!(resource = R::COLLECTION_NAME, id = ?object.identifier(), "detached destroyed member");
        }
        removed
    }

    /// Keeps identifiers unique after `object` got one from the server.
    ///
    /// The member just confirmed by the server wins; any other member
    /// holding the same identifier is a stale copy and is dropped.
    pub(crate) fn claim_identifier(&self, object: &ApiObject<R>) {
        let Some(identifier) = object.identifier() else {
            return;
        };
        let keeper = object as *const ApiObject<R> as usize;

        match self.objects.try_lock() {
            Some(mut objects) => {
                self.apply_deferred(&mut objects);
                resolve_claim(&mut objects, &identifier, keeper);
            }
            None => self.deferred.lock().push(Deferred::Claim { identifier, keeper }),
        }
    }
}

/// A member change queued while the guard was held.
#[derive(Debug)]
enum Deferred {
    /// A member cleared its back-reference and must leave.
    Detach,
    /// The member at address `keeper` owns `identifier`.
    Claim { identifier: ObjectId, keeper: usize },
}

fn resolve_claim<R: Resource>(objects: &mut Vec<Arc<ApiObject<R>>>, identifier: &ObjectId, keeper: usize) {
    let address = |member: &Arc<ApiObject<R>>| Arc::as_ptr(member) as usize;
    if !objects.iter().any(|member| address(member) == keeper) {
        return;
    }
    objects.retain(|member| {
        let stale = address(member) != keeper && member.identifier().as_ref() == Some(identifier);
        if stale {
            warn!(resource = R::COLLECTION_NAME, id = %identifier, "dropped stale member sharing a confirmed identifier");
            member.set_collection(None);
        }
        !stale
    });
}

/// Identity used for removal: same reference, or same identifier.
fn same_object<R: Resource>(a: &ApiObject<R>, b: &ApiObject<R>) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    match (a.identifier(), b.identifier()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

pub(crate) fn remove_matching<R: Resource>(
    objects: &mut Vec<Arc<ApiObject<R>>>,
    targets: &[Arc<ApiObject<R>>],
) -> usize {
    let before = objects.len();
    objects.retain(|member| {
        let hit = targets.iter().any(|target| same_object(member, target));
        if hit {
            member.set_collection(None);
        }
        !hit
    });
    before - objects.len()
}

impl<R: Resource> SyncableEntity for ApiCollection<R> {
    fn state(&self) -> SyncState {
        ApiCollection::state(self)
    }

    fn set_state(&self, state: SyncState) {
        let mut current = self.state.write();
        let from = *current;
        if from != state {
            debug!(resource = R::COLLECTION_NAME, %from, to = %state, "state changed");
            *current = state;
        }
    }

    fn resource_name(&self) -> &'static str {
        R::COLLECTION_NAME
    }

    fn resource_path(&self) -> String {
        ApiCollection::resource_path(self)
    }

    fn parse_network_value(&self, value: &Value) -> CoreResult<()> {
        self.parse(value)
    }

    fn parse_push_response(&self, value: &Value) -> CoreResult<()> {
        self.parse_confirmed(value)
    }

    fn to_network_value(&self) -> CoreResult<Value> {
        self.to_network_array().map(Value::Array)
    }

    /// Validates every member; all members are checked even after a failure.
    fn validate(&self) -> bool {
        self.objects()
            .iter()
            .fold(true, |valid, object| object.validate() && valid)
    }

    fn validation_errors(&self) -> Vec<String> {
        self.objects()
            .iter()
            .flat_map(|object| object.validation_errors())
            .collect()
    }
}

impl<R: Resource> fmt::Debug for ApiCollection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCollection")
            .field("resource", &R::COLLECTION_NAME)
            .field("state", &self.state())
            .field("objects", &*self.members())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::EntityParser;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::thread;

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Widget {
        name: String,
        #[serde(default)]
        rank: i64,
    }

    impl Resource for Widget {
        const RESOURCE_PATH: &'static str = "widgets";
        const RESOURCE_NAME: &'static str = "widget";
        const COLLECTION_NAME: &'static str = "widgets";
        const KEY_MAP: &'static [(&'static str, &'static str)] =
            &[("name", "name"), ("rank", "rank")];
    }

    fn names(collection: &ApiCollection<Widget>) -> Vec<String> {
        collection
            .objects()
            .iter()
            .map(|o| o.read(|w| w.name.clone()))
            .collect()
    }

    #[test]
    fn parse_merges_by_identifier() {
        let widgets = ApiCollection::<Widget>::new();
        widgets
            .parse(&json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]))
            .unwrap();
        let first = widgets.object_with_identifier(&ObjectId::Int(1)).unwrap();

        widgets
            .parse(&json!([{"id": 1, "name": "a2"}, {"id": 3, "name": "c"}]))
            .unwrap();

        assert_eq!(names(&widgets), vec!["a2", "b", "c"]);
        let refreshed = widgets.object_with_identifier(&ObjectId::Int(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &refreshed));
        assert_eq!(refreshed.state(), SyncState::Synced);
        assert_eq!(
            widgets.object_with_identifier(&ObjectId::Int(3)).unwrap().state(),
            SyncState::Existing
        );
    }

    #[test]
    fn merge_within_one_payload_dedupes() {
        let widgets = ApiCollection::<Widget>::new();
        widgets
            .parse(&json!([{"id": 1, "name": "a"}, {"id": 1, "name": "a again"}]))
            .unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(names(&widgets), vec!["a again"]);
    }

    #[test]
    fn wrapped_payloads() {
        let widgets = ApiCollection::<Widget>::new();
        widgets
            .parse(&json!({"widgets": [{"widget": {"id": 1, "name": "a"}}]}))
            .unwrap();
        assert_eq!(names(&widgets), vec!["a"]);
    }

    #[test]
    fn malformed_payload_changes_nothing() {
        let widgets = ApiCollection::<Widget>::new();
        widgets.parse(&json!([{"id": 1, "name": "a"}])).unwrap();

        assert!(widgets.parse(&json!({"id": 1})).is_err());
        assert!(widgets.parse(&json!([{"id": 2, "name": "b"}, 7])).is_err());
        assert_eq!(widgets.len(), 1);

        let bad_field = json!([
            {"id": 1, "name": "a2"},
            {"id": 2, "name": "b"},
            {"id": 3, "name": "c", "rank": "high"}
        ]);
        let err = widgets.parse(&bad_field).unwrap_err();
        assert!(matches!(err, CoreError::FieldMapping { .. }));
        assert_eq!(names(&widgets), vec!["a"]);
        assert_eq!(widgets.objects()[0].state(), SyncState::Existing);
    }

    #[test]
    fn confirmed_reply_claims_unsent_members() {
        let widgets = ApiCollection::<Widget>::new();
        widgets.parse(&json!([{"id": 5, "name": "kept"}])).unwrap();
        let a = widgets.build_object();
        a.update(|w| w.name = "a".into());
        let b = widgets.build_object();
        b.update(|w| w.name = "b".into());

        widgets
            .parse_confirmed(&json!({"widgets": [
                {"id": 5, "name": "kept"},
                {"id": 6, "name": "a"},
                {"id": 7, "name": "b"}
            ]}))
            .unwrap();

        assert_eq!(widgets.len(), 3);
        assert_eq!(a.identifier(), Some(ObjectId::Int(6)));
        assert_eq!(b.identifier(), Some(ObjectId::Int(7)));
        assert!(widgets.objects().iter().all(|w| w.state() == SyncState::Synced));
        assert!(Arc::ptr_eq(&widgets.object_with_identifier(&ObjectId::Int(7)).unwrap(), &b));
    }

    #[test]
    fn members_point_back_to_collection() {
        let widgets = ApiCollection::<Widget>::from_array(&json!([{"id": 4, "name": "x"}])).unwrap();
        assert_eq!(widgets.state(), SyncState::Existing);

        let member = widgets.objects().remove(0);
        assert!(Arc::ptr_eq(&member.collection().unwrap(), &widgets));
        assert_eq!(member.resource_path(), "widgets/4");

        drop(widgets);
        assert!(member.collection().is_none());
    }

    #[test]
    fn build_object_appends_new_member() {
        let widgets = ApiCollection::<Widget>::new();
        let built = widgets.build_object();
        assert_eq!(built.state(), SyncState::New);
        assert_eq!(widgets.len(), 1);
        assert_eq!(built.resource_path(), "widgets");
        assert_eq!(widgets.objects_in_state(SyncState::New).len(), 1);
    }

    #[test]
    fn add_rejects_duplicates() {
        let widgets = ApiCollection::<Widget>::new();
        let one = ApiObject::<Widget>::existing(1);
        assert!(widgets.add_object(one.clone()));
        assert!(!widgets.add_object(one.clone()));
        assert!(!widgets.add_object(ApiObject::existing(1)));

        let fresh = ApiObject::<Widget>::new();
        assert!(widgets.add_object(fresh.clone()));
        assert!(!widgets.add_object(fresh));
        assert_eq!(widgets.len(), 2);
    }

    #[test]
    fn add_rejects_members_of_other_collections() {
        let a = ApiCollection::<Widget>::new();
        let b = ApiCollection::<Widget>::new();
        let object = a.build_object();

        assert!(!b.add_object(object.clone()));
        assert_eq!(a.remove_objects(&[object.clone()]), 1);
        assert!(object.collection().is_none());
        assert!(b.add_object(object.clone()));
        assert!(Arc::ptr_eq(&object.collection().unwrap(), &b));
    }

    #[test]
    fn remove_by_identifier_or_reference() {
        let widgets = ApiCollection::<Widget>::new();
        widgets
            .parse(&json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]))
            .unwrap();
        let pending = widgets.build_object();

        let removed = widgets.remove_objects(&[ApiObject::existing(2), pending]);
        assert_eq!(removed, 2);
        assert_eq!(names(&widgets), vec!["a"]);
        assert_eq!(widgets.remove_objects(&[ApiObject::new()]), 0);
    }

    #[test]
    fn remove_single_object() {
        let widgets = ApiCollection::<Widget>::new();
        let member = widgets.build_object();

        widgets.remove_object(&member).unwrap();
        let err = widgets.remove_object(&member).unwrap_err();
        assert!(matches!(err, CoreError::NotAMember { ref path } if path == "widgets"));
    }

    #[test]
    fn explicit_and_post_parse_ordering() {
        let widgets = ApiCollection::<Widget>::new();
        widgets
            .parse(&json!([
                {"id": 1, "name": "c", "rank": 3},
                {"id": 2, "name": "a", "rank": 1},
                {"id": 3, "name": "b", "rank": 2}
            ]))
            .unwrap();
        assert_eq!(names(&widgets), vec!["c", "a", "b"]);

        widgets.order_with(|a, b| a.read(|x| x.name.clone()).cmp(&b.read(|y| y.name.clone())));
        assert_eq!(names(&widgets), vec!["a", "b", "c"]);

        widgets.set_order_after_parse(|a, b| b.read(|x| x.rank).cmp(&a.read(|y| y.rank)));
        widgets.parse(&json!([{"id": 4, "name": "d", "rank": 0}])).unwrap();
        assert_eq!(names(&widgets), vec!["c", "b", "a", "d"]);
    }

    #[test]
    fn guard_allows_batched_changes() {
        let widgets = ApiCollection::<Widget>::new();
        let mut guard = widgets.lock_objects();
        assert!(guard.add_object(ApiObject::existing(2)));
        assert!(guard.add_object(ApiObject::existing(1)));
        guard.order_with(|a, b| a.identifier().cmp(&b.identifier()));
        assert_eq!(guard.len(), 2);
        assert_eq!(guard[0].identifier(), Some(ObjectId::Int(1)));
        assert_eq!(guard.remove_objects(&[ApiObject::existing(2)]), 1);
        guard.unlock();

        assert_eq!(widgets.len(), 1);
    }

    #[test]
    fn nested_collection_path() {
        let owner = ApiObject::<Widget>::existing(9);
        let parts = ApiCollection::<Widget>::with_owner(&owner);
        assert_eq!(parts.resource_path(), "widgets/9/widgets");
    }

    #[test]
    fn network_array_round_trip() {
        let widgets = ApiCollection::<Widget>::new();
        widgets.parse(&json!([{"id": 1, "name": "a", "extra": 1}])).unwrap();
        let out = widgets.parser().object_to_network_dictionary().unwrap();
        assert_eq!(out, json!([{"id": 1, "name": "a", "rank": 0}]));
    }

    #[test]
    fn detach_on_destroy() {
        let widgets = ApiCollection::<Widget>::new();
        widgets.parse(&json!([{"id": 1, "name": "a"}])).unwrap();
        let member = widgets.objects().remove(0);

        SyncableEntity::did_destroy(&*member);
        assert!(widgets.is_empty());
        assert!(member.collection().is_none());
    }

    #[test]
    fn destroy_while_guard_is_held_is_applied_on_release() {
        let widgets = ApiCollection::<Widget>::new();
        widgets
            .parse(&json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]))
            .unwrap();

        let guard = widgets.lock_objects();
        let first = guard[0].clone();
        SyncableEntity::did_destroy(&*first);
        assert!(first.collection().is_none());
        assert_eq!(guard.len(), 2);
        guard.unlock();

        assert_eq!(names(&widgets), vec!["b"]);
        assert!(widgets.object_with_identifier(&ObjectId::Int(1)).is_none());
    }

    #[test]
    fn created_member_claims_its_identifier() {
        let widgets = ApiCollection::<Widget>::new();
        widgets.parse(&json!([{"id": 7, "name": "old"}])).unwrap();
        let stale = widgets.object_with_identifier(&ObjectId::Int(7)).unwrap();

        let created = widgets.build_object();
        created.parse(&json!({"id": 7, "name": "new"})).unwrap();
        SyncableEntity::did_sync(&*created);

        assert_eq!(widgets.len(), 1);
        let member = widgets.object_with_identifier(&ObjectId::Int(7)).unwrap();
        assert!(Arc::ptr_eq(&member, &created));
        assert!(stale.collection().is_none());
    }

    #[test]
    fn identifier_claim_under_guard_waits_for_release() {
        let widgets = ApiCollection::<Widget>::new();
        widgets.parse(&json!([{"id": 3, "name": "old"}])).unwrap();
        let created = widgets.build_object();

        let guard = widgets.lock_objects();
        created.parse(&json!({"id": 3, "name": "new"})).unwrap();
        SyncableEntity::did_sync(&*created);
        assert_eq!(guard.len(), 2);
        drop(guard);

        assert_eq!(names(&widgets), vec!["new"]);
    }

    #[test]
    fn concurrent_adds_keep_identifiers_unique() {
        let widgets = ApiCollection::<Widget>::new();
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for id in 0..50 {
                        widgets.add_object(ApiObject::existing(id));
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..50 {
                    let _ = widgets.objects_in_state(SyncState::Existing);
                }
            });
        });
        assert_eq!(widgets.len(), 50);
    }
}
