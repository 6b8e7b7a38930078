//! Per-resource configuration.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A wire-format dictionary.
pub type WireMap = Map<String, Value>;

/// Static description of a remote resource type and its typed fields.
///
/// The implementing type holds the resource's fields. Wire keys are mapped
/// to serde field names through [`Resource::KEY_MAP`]; only mapped fields
/// are ever read from or written to the wire.
///
/// Parsing rebuilds the fields from their serialized form, so fields the
/// resource skips with `#[serde(skip)]` are derived state: recompute them
/// in [`Resource::after_parse`].
///
/// The hooks with default bodies are optional: leaving them alone means
/// "always valid", "send the full serialization" and "do nothing after
/// parse".
///
/// # Example
///
/// ```rust
/// use apientity_core::Resource;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Clone, Serialize, Deserialize)]
/// struct Widget {
///     name: String,
///     color: Option<String>,
/// }
///
/// impl Resource for Widget {
///     const RESOURCE_PATH: &'static str = "widgets";
///     const RESOURCE_NAME: &'static str = "widget";
///     const KEY_MAP: &'static [(&'static str, &'static str)] =
///         &[("name", "name"), ("color", "colour")];
///
///     fn validate(&self) -> Result<(), Vec<String>> {
///         if self.name.is_empty() {
///             return Err(vec!["name can't be blank".into()]);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Resource: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Collection path relative to the API base URL (e.g. `"widgets"`).
    const RESOURCE_PATH: &'static str;

    /// Singular name, used as the root key of wrapped object payloads.
    const RESOURCE_NAME: &'static str;

    /// Root key of wrapped collection payloads.
    const COLLECTION_NAME: &'static str = Self::RESOURCE_PATH;

    /// Wire key holding the object identifier.
    const IDENTIFIER_KEY: &'static str = "id";

    /// `(field name, wire key)` pairs.
    const KEY_MAP: &'static [(&'static str, &'static str)];

    /// Wire keys that must all be present for a payload to count as a
    /// complete representation of the object.
    const REQUIRED_KEYS: &'static [&'static str] = &[];

    /// Checks the fields before they are pushed to the server.
    fn validate(&self) -> Result<(), Vec<String>> {
        Ok(())
    }

    /// Request body for create. `None` sends the full serialization.
    fn params_for_create(&self) -> Option<WireMap> {
        None
    }

    /// Request body for update. `None` sends the full serialization.
    fn params_for_update(&self) -> Option<WireMap> {
        None
    }

    /// Query parameters for read.
    fn params_for_read(&self) -> Option<WireMap> {
        None
    }

    /// Called after a payload has been applied to the fields.
    fn after_parse(&mut self) {}
}
