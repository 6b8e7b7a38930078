//! Configuration for entity syncers.

use crate::error::{SyncError, SyncResult};
use crate::transport::HttpClient;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};

static GLOBAL: OnceLock<Arc<SyncConfig>> = OnceLock::new();

/// Where and how entity requests are sent.
///
/// Shared by every syncer built from it. Shared headers can change after
/// construction (auth tokens); the rest is fixed.
pub struct SyncConfig {
    base_url: String,
    client: Arc<dyn HttpClient>,
    shared_headers: RwLock<BTreeMap<String, String>>,
    timeout: Option<Duration>,
}

impl SyncConfig {
    /// Creates a configuration for `base_url` using `client`.
    pub fn new(base_url: impl Into<String>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            shared_headers: RwLock::new(BTreeMap::new()),
            timeout: None,
        }
    }

    /// Adds a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.shared_headers.get_mut().insert(name.into(), value.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the shared client.
    pub fn client(&self) -> Arc<dyn HttpClient> {
        self.client.clone()
    }

    /// Returns the request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets a header on every request sent from now on.
    pub fn set_shared_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.shared_headers.write().insert(name.into(), value.into());
    }

    /// Stops sending a shared header.
    pub fn remove_shared_header(&self, name: &str) -> Option<String> {
        self.shared_headers.write().remove(name)
    }

    /// Snapshot of the shared headers.
    pub fn shared_headers(&self) -> BTreeMap<String, String> {
        self.shared_headers.read().clone()
    }

    /// Absolute URL for an entity path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    /// Installs the process-wide default configuration.
    ///
    /// Only the first call has an effect; later calls return `false`.
    pub fn install(config: Arc<SyncConfig>) -> bool {
        let base_url = config.base_url.clone();
        match GLOBAL.set(config) {
            Ok(()) => {
                info!(base_url = %base_url, "installed sync configuration");
                true
            }
            Err(_) => {
                warn!(base_url = %base_url, "sync configuration already installed");
                false
            }
        }
    }

    /// Returns the process-wide default configuration.
    pub fn global() -> SyncResult<Arc<SyncConfig>> {
        GLOBAL.get().cloned().ok_or(SyncError::NotConfigured)
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("base_url", &self.base_url)
            .field("shared_headers", &self.shared_headers.read().keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockHttpClient;

    fn config() -> SyncConfig {
        SyncConfig::new("https://api.example.com/v1/", Arc::new(MockHttpClient::new()))
    }

    #[test]
    fn sync_config_builder() {
        let config = config()
            .with_header("Accept", "application/json")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url(), "https://api.example.com/v1/");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(
            config.shared_headers().get("Accept").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn shared_headers_change_after_construction() {
        let config = Arc::new(config());
        config.set_shared_header("Authorization", "Bearer one");
        config.set_shared_header("Authorization", "Bearer two");
        assert_eq!(config.shared_headers()["Authorization"], "Bearer two");

        assert_eq!(config.remove_shared_header("Authorization").as_deref(), Some("Bearer two"));
        assert!(config.shared_headers().is_empty());
    }

    #[test]
    fn url_joining() {
        let config = config();
        assert_eq!(config.url_for("widgets/1"), "https://api.example.com/v1/widgets/1");
        assert_eq!(config.url_for("/widgets"), "https://api.example.com/v1/widgets");
        assert_eq!(config.url_for(""), "https://api.example.com/v1");
    }

    #[test]
    fn debug_hides_header_values() {
        let config = config().with_header("Authorization", "Bearer secret");
        let debug = format!("{config:?}");
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("secret"));
    }
}
