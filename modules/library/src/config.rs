use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Configuration for the library module (`modules.library`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Top-level collection partitioned by user id.
    #[serde(default = "default_users_root")]
    pub users_root: String,
    /// Per-user sub-collection (and blob folder) holding the items.
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_object_prefix")]
    pub object_prefix: String,
    /// Used when the local URI carries no extension.
    #[serde(default = "default_extension")]
    pub default_extension: String,
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
}

/// Endpoints of the HTTP blob store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    pub upload_base_url: String,
    pub download_base_url: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            users_root: default_users_root(),
            collection: default_collection(),
            order_by: default_order_by(),
            max_image_bytes: default_max_image_bytes(),
            object_prefix: default_object_prefix(),
            default_extension: default_extension(),
            token_length: default_token_length(),
            storage: None,
        }
    }
}

impl LibraryConfig {
    /// Read the `library` section of the application config; absent → defaults.
    pub fn from_app_config(app: &runtime::AppConfig) -> anyhow::Result<Self> {
        match app.module_section("library") {
            Some(raw) => serde_json::from_value(raw.clone())
                .context("invalid `modules.library` configuration"),
            None => Ok(Self::default()),
        }
    }
}

fn default_users_root() -> String {
    "users".to_string()
}

fn default_collection() -> String {
    "library".to_string()
}

fn default_order_by() -> String {
    "title".to_string()
}

fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_object_prefix() -> String {
    "library".to_string()
}

fn default_extension() -> String {
    "jpg".to_string()
}

fn default_token_length() -> usize {
    13
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = LibraryConfig::default();
        assert_eq!(cfg.users_root, "users");
        assert_eq!(cfg.collection, "library");
        assert_eq!(cfg.order_by, "title");
        assert_eq!(cfg.max_image_bytes, 5 * 1024 * 1024);
        assert!(cfg.storage.is_none());
    }

    #[test]
    fn partial_section_fills_defaults() {
        let mut app = runtime::AppConfig::default();
        app.modules.insert(
            "library".into(),
            serde_json::json!({ "max_image_bytes": 2048, "storage": {
                "upload_base_url": "http://up.local",
                "download_base_url": "http://down.local"
            }}),
        );

        let cfg = LibraryConfig::from_app_config(&app).unwrap();
        assert_eq!(cfg.max_image_bytes, 2048);
        assert_eq!(cfg.collection, "library");
        assert_eq!(
            cfg.storage.unwrap().upload_base_url,
            "http://up.local".to_string()
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut app = runtime::AppConfig::default();
        app.modules
            .insert("library".into(), serde_json::json!({ "colection": "x" }));
        assert!(LibraryConfig::from_app_config(&app).is_err());
    }

    #[test]
    fn missing_section_uses_defaults() {
        let app = runtime::AppConfig::default();
        assert_eq!(
            LibraryConfig::from_app_config(&app).unwrap(),
            LibraryConfig::default()
        );
    }
}
