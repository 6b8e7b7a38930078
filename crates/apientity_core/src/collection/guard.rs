//! Scoped access to a collection's member sequence.

use super::ApiCollection;
use crate::object::ApiObject;
use crate::resource::Resource;
use parking_lot::MutexGuard;
use std::cmp::Ordering;
use std::ops::Deref;
use std::sync::Arc;

/// Holds a collection's guard for as long as it lives.
///
/// Returned by [`ApiCollection::lock_objects`]. Dropping the guard, or
/// calling [`unlock`](Self::unlock), releases it. The guard is not
/// reentrant: calling any locking method of the same collection while a
/// guard is alive deadlocks, so structural changes made under a guard go
/// through the guard's own methods.
///
/// Syncing members while the guard is held is fine. A member destroyed
/// in the meantime loses its back-reference immediately but stays in
/// the sequence until the guard is released.
pub struct ObjectsGuard<'a, R: Resource> {
    collection: &'a ApiCollection<R>,
    objects: MutexGuard<'a, Vec<Arc<ApiObject<R>>>>,
}

impl<'a, R: Resource> ObjectsGuard<'a, R> {
    pub(super) fn new(
        collection: &'a ApiCollection<R>,
        objects: MutexGuard<'a, Vec<Arc<ApiObject<R>>>>,
    ) -> Self {
        Self {
            collection,
            objects,
        }
    }

    /// Appends `object` unless it duplicates a member. See
    /// [`ApiCollection::add_object`].
    pub fn add_object(&mut self, object: Arc<ApiObject<R>>) -> bool {
        self.collection.insert(&mut self.objects, object)
    }

    /// Removes the given objects. See [`ApiCollection::remove_objects`].
    pub fn remove_objects(&mut self, objects: &[Arc<ApiObject<R>>]) -> usize {
        super::remove_matching(&mut self.objects, objects)
    }

    /// Stable in-place reorder.
    pub fn order_with<F>(&mut self, mut compare: F)
    where
        F: FnMut(&ApiObject<R>, &ApiObject<R>) -> Ordering,
    {
        self.objects.sort_by(|a, b| compare(a, b));
    }

    /// Releases the guard.
    pub fn unlock(self) {}
}

impl<R: Resource> Drop for ObjectsGuard<'_, R> {
    fn drop(&mut self) {
        self.collection.apply_deferred(&mut self.objects);
    }
}

impl<R: Resource> Deref for ObjectsGuard<'_, R> {
    type Target = [Arc<ApiObject<R>>];

    fn deref(&self) -> &Self::Target {
        &self.objects
    }
}
