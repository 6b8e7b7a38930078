//! Sample resources and setup helpers.

use crate::server::InMemoryApi;
use apientity_core::{ApiObject, Resource, WireMap};
use apientity_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A top-level resource at `widgets`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    /// Display name; required.
    pub name: String,
    /// Optional color, `colour` on the wire.
    #[serde(default)]
    pub color: Option<String>,
    /// Stock count.
    #[serde(default)]
    pub quantity: i64,
}

impl Resource for Widget {
    const RESOURCE_PATH: &'static str = "widgets";
    const RESOURCE_NAME: &'static str = "widget";
    const KEY_MAP: &'static [(&'static str, &'static str)] = &[
        ("name", "name"),
        ("color", "colour"),
        ("quantity", "qty"),
    ];
    const REQUIRED_KEYS: &'static [&'static str] = &["name"];

    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("name can't be blank".to_string());
        }
        if self.quantity < 0 {
            errors.push("quantity must not be negative".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A resource nested under a widget: `widgets/{id}/parts`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part label.
    pub label: String,
    /// URL-friendly label; derived, never sent.
    #[serde(skip)]
    pub slug: String,
}

impl Resource for Part {
    const RESOURCE_PATH: &'static str = "parts";
    const RESOURCE_NAME: &'static str = "part";
    const KEY_MAP: &'static [(&'static str, &'static str)] = &[("label", "label")];

    fn params_for_create(&self) -> Option<WireMap> {
        let mut params = WireMap::new();
        params.insert("label".into(), Value::String(self.label.clone()));
        params.insert("source".into(), Value::String("testkit".into()));
        Some(params)
    }

    fn after_parse(&mut self) {
        self.slug = self.label.to_lowercase().replace(' ', "-");
    }
}

/// A new widget with the given name.
pub fn widget_named(name: &str) -> Arc<ApiObject<Widget>> {
    let widget = ApiObject::<Widget>::new();
    widget.update(|w| w.name = name.to_string());
    widget
}

/// A configuration pointing at `api`.
pub fn config_for(api: &Arc<InMemoryApi>) -> Arc<SyncConfig> {
    Arc::new(SyncConfig::new(InMemoryApi::BASE_URL, api.clone()))
}
