//! The capability set shared by objects and collections.

use crate::error::CoreResult;
use crate::resource::WireMap;
use crate::types::{ObjectId, SyncState};
use serde_json::Value;

/// Anything that can be created, fetched, updated and destroyed against
/// a REST endpoint.
///
/// [`ApiObject`](crate::ApiObject) and [`ApiCollection`](crate::ApiCollection)
/// are the two implementations. The trait is object safe so owners can be
/// held as `Weak<dyn SyncableEntity>` and syncers can work on
/// `Arc<dyn SyncableEntity>`.
///
/// Methods with default bodies are the optional members: path overrides,
/// parameter builders, validation and the post-sync hooks.
pub trait SyncableEntity: Send + Sync {
    /// Current sync state.
    fn state(&self) -> SyncState;

    /// Sets the sync state.
    fn set_state(&self, state: SyncState);

    /// Name used as the root key of wrapped payloads.
    fn resource_name(&self) -> &'static str;

    /// Path of this entity relative to the API base URL.
    fn resource_path(&self) -> String;

    /// Path used for create.
    fn path_for_create(&self) -> String {
        self.resource_path()
    }

    /// Path used for update.
    fn path_for_update(&self) -> String {
        self.resource_path()
    }

    /// Path used for read.
    fn path_for_read(&self) -> String {
        self.resource_path()
    }

    /// Path used for destroy.
    fn path_for_destroy(&self) -> String {
        self.resource_path()
    }

    /// Remote identifier, for entities that have one.
    fn identifier(&self) -> Option<ObjectId> {
        None
    }

    /// Whether a successful create must yield an identifier.
    fn requires_identifier(&self) -> bool {
        false
    }

    /// Applies a server payload. Does not change the sync state.
    fn parse_network_value(&self, value: &Value) -> CoreResult<()>;

    /// Applies the server's reply to a create or update of this entity.
    ///
    /// Defaults to [`parse_network_value`](Self::parse_network_value).
    fn parse_push_response(&self, value: &Value) -> CoreResult<()> {
        self.parse_network_value(value)
    }

    /// Serializes the entity to its wire representation.
    fn to_network_value(&self) -> CoreResult<Value>;

    /// Request body for create.
    fn params_for_create(&self) -> Option<WireMap> {
        None
    }

    /// Request body for update.
    fn params_for_update(&self) -> Option<WireMap> {
        None
    }

    /// Query parameters for read.
    fn params_for_read(&self) -> Option<WireMap> {
        None
    }

    /// Runs validation, recording any errors. Defaults to valid.
    fn validate(&self) -> bool {
        true
    }

    /// Errors recorded by the last failed [`validate`](Self::validate).
    fn validation_errors(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called after the server confirmed a destroy.
    fn did_destroy(&self) {}

    /// Called after a push or fetch left the entity `Synced`.
    fn did_sync(&self) {}
}

/// Joins two path segments with exactly one `/` between them.
pub(crate) fn join_path(base: &str, segment: &str) -> String {
    let base = base.trim_end_matches('/');
    let segment = segment.trim_start_matches('/');
    if base.is_empty() {
        segment.to_string()
    } else if segment.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_normalizes_slashes() {
        assert_eq!(join_path("posts/1", "comments"), "posts/1/comments");
        assert_eq!(join_path("posts/1/", "/comments"), "posts/1/comments");
        assert_eq!(join_path("", "widgets"), "widgets");
        assert_eq!(join_path("widgets", ""), "widgets");
    }
}
