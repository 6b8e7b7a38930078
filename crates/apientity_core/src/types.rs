//! Core type definitions: sync state and object identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The relationship between a local entity and the server's last known copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Created locally, never sent to the server. Has no identifier.
    New,
    /// Known to exist remotely but not confirmed fully synced.
    Existing,
    /// Local fields match the last known server state.
    Synced,
    /// Mutated locally since the last successful sync.
    Dirty,
}

impl SyncState {
    /// Returns true if the server knows about the entity.
    pub fn is_persisted(&self) -> bool {
        !matches!(self, SyncState::New)
    }

    /// Returns true if a `sync` must push local state to the server.
    pub fn needs_push(&self) -> bool {
        !matches!(self, SyncState::Synced)
    }
}

impl Default for SyncState {
    fn default() -> Self {
        SyncState::New
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::New => write!(f, "new"),
            SyncState::Existing => write!(f, "existing"),
            SyncState::Synced => write!(f, "synced"),
            SyncState::Dirty => write!(f, "dirty"),
        }
    }
}

/// Identifier of a remote object.
///
/// REST APIs use either numeric or string keys, so both are carried
/// verbatim. `1` and `"1"` are different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    /// Numeric identifier.
    Int(i64),
    /// String identifier (UUIDs, slugs).
    Text(String),
}

impl ObjectId {
    /// Reads an identifier from a wire value.
    ///
    /// Returns `None` for null, empty strings and non-scalar values.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ObjectId::Int),
            Value::String(s) if !s.is_empty() => Some(ObjectId::Text(s.clone())),
            _ => None,
        }
    }

    /// Converts to a wire value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            ObjectId::Int(n) => Value::from(*n),
            ObjectId::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Int(n) => write!(f, "{n}"),
            ObjectId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ObjectId {
    fn from(id: i64) -> Self {
        ObjectId::Int(id)
    }
}

impl From<i32> for ObjectId {
    fn from(id: i32) -> Self {
        ObjectId::Int(i64::from(id))
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        ObjectId::Int(i64::from(id))
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        ObjectId::Text(id.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        ObjectId::Text(id)
    }
}
