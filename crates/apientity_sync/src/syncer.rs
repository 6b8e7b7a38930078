//! Maps entity sync state to network verbs.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse};
use apientity_core::{CoreError, SyncState, SyncableEntity};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Issues create, read, update and destroy requests for one entity.
///
/// | State              | `sync`        | `save`  |
/// |--------------------|---------------|---------|
/// | `New`              | create (POST) | create  |
/// | `Existing`/`Dirty` | update (PUT)  | update  |
/// | `Synced`           | no request    | update  |
///
/// Every successful push or fetch leaves the entity `Synced`. A failed
/// call leaves the state as it was. Validation runs before any push and
/// short-circuits with [`SyncError::ValidationFailure`].
///
/// The syncer never holds a lock across a request, and does not guard
/// against two concurrent calls on the same entity.
pub struct EntitySyncer<E: SyncableEntity + ?Sized> {
    entity: Arc<E>,
    config: Arc<SyncConfig>,
    headers: BTreeMap<String, String>,
}

impl<E: SyncableEntity + ?Sized> EntitySyncer<E> {
    /// Creates a syncer for `entity` using `config`.
    pub fn new(entity: Arc<E>, config: Arc<SyncConfig>) -> Self {
        Self {
            entity,
            config,
            headers: BTreeMap::new(),
        }
    }

    /// Creates a syncer using the process-wide configuration.
    pub fn with_global(entity: Arc<E>) -> SyncResult<Self> {
        Ok(Self::new(entity, SyncConfig::global()?))
    }

    /// Adds a header for this syncer's requests, overriding a shared one.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets a header for this syncer's requests.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// The entity this syncer works on.
    pub fn entity(&self) -> &Arc<E> {
        &self.entity
    }

    /// The configuration in use.
    pub fn config(&self) -> &Arc<SyncConfig> {
        &self.config
    }

    /// Pushes local state if the entity is not already synced.
    pub async fn sync(&self) -> SyncResult<Arc<E>> {
        let state = self.entity.state();
        if !state.needs_push() {
            debug!(resource = self.entity.resource_name(), "already synced, nothing to send");
            return Ok(self.entity.clone());
        }
        self.push(state).await
    }

    /// Pushes local state now: create when `New`, update otherwise.
    pub async fn save(&self) -> SyncResult<Arc<E>> {
        let state = self.entity.state();
        self.push(state).await
    }

    /// Reads the entity from the server, whatever its state.
    pub async fn fetch(&self) -> SyncResult<Arc<E>> {
        let path = self.entity.path_for_read();
        let params = self.entity.params_for_read().map(Value::Object);
        let response = self.send(HttpMethod::Get, &path, params).await?;

        self.entity.parse_network_value(&response.body)?;
        self.entity.set_state(SyncState::Synced);
        self.entity.did_sync();
        Ok(self.entity.clone())
    }

    /// Deletes the entity on the server.
    ///
    /// Fails without a request when the entity is `New`. On success the
    /// entity leaves its collection, if it has one.
    pub async fn destroy(&self) -> SyncResult<Arc<E>> {
        if !self.entity.state().is_persisted() {
            warn!(resource = self.entity.resource_name(), "destroy called on an unsent entity");
            return Err(SyncError::NotPersisted {
                resource: self.entity.resource_name(),
            });
        }

        let path = self.entity.path_for_destroy();
        self.send(HttpMethod::Delete, &path, None).await?;
        self.entity.did_destroy();
        info!(resource = self.entity.resource_name(), path = %path, "destroyed");
        Ok(self.entity.clone())
    }

    async fn push(&self, state: SyncState) -> SyncResult<Arc<E>> {
        if !self.entity.validate() {
            let errors = self.entity.validation_errors();
            warn!(resource = self.entity.resource_name(), state = %state, ?errors, "validation failed");
            return Err(SyncError::ValidationFailure { errors });
        }

        let (method, path, params) = if !state.is_persisted() {
            (HttpMethod::Post, self.entity.path_for_create(), self.entity.params_for_create())
        } else {
            (HttpMethod::Put, self.entity.path_for_update(), self.entity.params_for_update())
        };
        let body = match params {
            Some(map) => Value::Object(map),
            None => self.request_body()?,
        };

        let response = self.send(method, &path, Some(body)).await?;
        if !response.body.is_null() {
            self.entity.parse_push_response(&response.body)?;
        }
        if self.entity.requires_identifier() && self.entity.identifier().is_none() {
            return Err(CoreError::MissingIdentifier {
                resource: self.entity.resource_name(),
            }
            .into());
        }

        self.entity.set_state(SyncState::Synced);
        self.entity.did_sync();
        Ok(self.entity.clone())
    }

    /// Full serialization; arrays are wrapped under the resource name.
    fn request_body(&self) -> SyncResult<Value> {
        Ok(match self.entity.to_network_value()? {
            Value::Object(map) => Value::Object(map),
            other => {
                let mut wrapper = Map::new();
                wrapper.insert(self.entity.resource_name().to_string(), other);
                Value::Object(wrapper)
            }
        })
    }

    fn headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.config.shared_headers();
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    async fn send(&self, method: HttpMethod, path: &str, params: Option<Value>) -> SyncResult<HttpResponse> {
        let request = HttpRequest {
            method,
            url: self.config.url_for(path),
            params,
            headers: self.headers(),
        };
        debug!(method = %method, path, "dispatching request");

        let client = self.config.client();
        let call = client.perform_request(request);
        let response = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| SyncError::Timeout)??,
            None => call.await?,
        };

        if !response.is_success() {
            let message = server_message(&response.body);
            warn!(method = %method, path, status = response.status, ?message, "request rejected");
            return Err(SyncError::Server {
                status: response.status,
                message,
            });
        }

        debug!(method = %method, path, status = response.status, "request completed");
        Ok(response)
    }
}

/// Pulls a human-readable message out of an error body.
fn server_message(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => ["message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}
