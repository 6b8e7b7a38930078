//! Sync verbs directly on shared entities.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::syncer::EntitySyncer;
use apientity_core::SyncableEntity;
use async_trait::async_trait;
use std::sync::Arc;

/// `sync`, `fetch`, `save` and `destroy` on `Arc<entity>`, using the
/// process-wide [`SyncConfig`].
///
/// ```rust,ignore
/// use apientity_sync::EntitySyncExt;
///
/// let widget = ApiObject::<Widget>::new();
/// widget.update(|w| w.name = "bolt".into());
/// widget.sync().await?;
/// ```
#[async_trait]
pub trait EntitySyncExt {
    /// The entity type.
    type Entity: SyncableEntity + ?Sized;

    /// Syncer bound to the process-wide configuration.
    fn syncer(&self) -> SyncResult<EntitySyncer<Self::Entity>>;

    /// Syncer bound to `config`.
    fn syncer_with(&self, config: Arc<SyncConfig>) -> EntitySyncer<Self::Entity>;

    /// See [`EntitySyncer::sync`].
    async fn sync(&self) -> SyncResult<Arc<Self::Entity>>;

    /// See [`EntitySyncer::fetch`].
    async fn fetch(&self) -> SyncResult<Arc<Self::Entity>>;

    /// See [`EntitySyncer::save`].
    async fn save(&self) -> SyncResult<Arc<Self::Entity>>;

    /// See [`EntitySyncer::destroy`].
    async fn destroy(&self) -> SyncResult<Arc<Self::Entity>>;
}

#[async_trait]
impl<E: SyncableEntity + ?Sized + 'static> EntitySyncExt for Arc<E> {
    type Entity = E;

    fn syncer(&self) -> SyncResult<EntitySyncer<E>> {
        EntitySyncer::with_global(self.clone())
    }

    fn syncer_with(&self, config: Arc<SyncConfig>) -> EntitySyncer<E> {
        EntitySyncer::new(self.clone(), config)
    }

    async fn sync(&self) -> SyncResult<Arc<E>> {
        self.syncer()?.sync().await
    }

    async fn fetch(&self) -> SyncResult<Arc<E>> {
        self.syncer()?.fetch().await
    }

    async fn save(&self) -> SyncResult<Arc<E>> {
        self.syncer()?.save().await
    }

    async fn destroy(&self) -> SyncResult<Arc<E>> {
        self.syncer()?.destroy().await
    }
}
