//! # API Entity Testkit
//!
//! Test utilities for syncable REST entities.
//!
//! This crate provides:
//! - Sample resources (`Widget`, and `Part` nested under it)
//! - An in-memory REST API usable as an `HttpClient`
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apientity_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn creates_widget() {
//!     let api = InMemoryApi::new();
//!     let widget = widget_named("bolt");
//!     EntitySyncer::new(widget.clone(), config_for(&api)).sync().await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::server::*;
    pub use apientity_core::{ApiCollection, ApiObject, ObjectId, SyncState, SyncableEntity};
    pub use apientity_sync::{EntitySyncer, SyncConfig, SyncError, SyncErrorCode};
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use server::*;
