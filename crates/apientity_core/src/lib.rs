//! # API Entity Core
//!
//! Syncable REST entities for client applications.
//!
//! This crate provides:
//! - Sync state tracking (new → existing → synced ↔ dirty)
//! - Single resource instances with typed fields
//! - Ordered collections, deduplicated by identifier
//! - The parser boundary between wire payloads and typed fields
//!
//! It performs no I/O. Network verbs are issued by `apientity_sync`.
//!
//! ## Key Invariants
//!
//! - A `New` object has no identifier; every other state implies one
//! - Collection members are unique by identifier
//! - Parsing a collection merges by identifier and never invalidates
//!   references to existing members
//! - Parsers never change sync state
//!
//! ## Example
//!
//! ```rust
//! use apientity_core::{ApiCollection, Resource, SyncState};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Default, Clone, Serialize, Deserialize)]
//! struct Widget {
//!     name: String,
//! }
//!
//! impl Resource for Widget {
//!     const RESOURCE_PATH: &'static str = "widgets";
//!     const RESOURCE_NAME: &'static str = "widget";
//!     const KEY_MAP: &'static [(&'static str, &'static str)] = &[("name", "name")];
//! }
//!
//! let widgets = ApiCollection::<Widget>::new();
//! widgets.parse(&json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])).unwrap();
//! assert_eq!(widgets.len(), 2);
//! assert_eq!(widgets.objects_in_state(SyncState::Existing).len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod entity;
mod error;
mod object;
mod parser;
mod resource;
mod types;

pub use collection::{ApiCollection, ObjectComparator, ObjectsGuard};
pub use entity::SyncableEntity;
pub use error::{CoreError, CoreResult};
pub use object::ApiObject;
pub use parser::{CollectionParser, EntityParser, ObjectParser};
pub use resource::{Resource, WireMap};
pub use types::{ObjectId, SyncState};
