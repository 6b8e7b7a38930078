//! # API Entity Sync
//!
//! Network verbs for syncable REST entities.
//!
//! This crate provides:
//! - The entity syncer (state → create/update/read/destroy)
//! - Process-wide and per-syncer configuration
//! - HTTP transport abstraction with a scripted mock
//! - A `reqwest` client (feature `reqwest`, on by default)
//!
//! ## Key Invariants
//!
//! - Validation failures never reach the transport
//! - A failed call leaves the entity's sync state unchanged
//! - Destroying an unsent entity fails locally
//! - Every operation resolves exactly once
//!
//! Nothing here retries. [`SyncError::is_retryable`] tells the caller
//! whether it makes sense to.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod ext;
#[cfg(feature = "reqwest")]
mod http;
mod syncer;
mod transport;

pub use config::SyncConfig;
pub use error::{SyncError, SyncErrorCode, SyncResult};
pub use ext::EntitySyncExt;
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use syncer::EntitySyncer;
pub use transport::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MockHttpClient};
