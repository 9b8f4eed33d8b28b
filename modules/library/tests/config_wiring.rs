use std::fs;

use library::contract::model::SyncStatus;
use library::{Backends, LibraryContext};
use runtime::AppConfig;

#[tokio::test]
async fn context_reads_library_section_from_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    let cfg_path = dir.path().join("marinote.yaml");
    fs::write(
        &cfg_path,
        format!(
            r#"
app:
  home_dir: "{}"
modules:
  library:
    collection: "shelf"
    max_image_bytes: 1024
"#,
            home.to_string_lossy().replace('\\', "/")
        ),
    )
    .unwrap();

    let app = AppConfig::load_layered(&cfg_path).unwrap();
    let ctx = LibraryContext::from_app_config(&app, Backends::in_memory()).unwrap();

    assert_eq!(ctx.config().collection, "shelf");
    assert_eq!(ctx.config().max_image_bytes, 1024);
    assert_eq!(ctx.config().order_by, "title");
    assert_eq!(ctx.store().state().status, SyncStatus::Unauthenticated);
    assert!(home.is_dir());
}

#[tokio::test]
async fn invalid_library_section_is_an_error() {
    let mut app = AppConfig::default();
    app.modules.insert(
        "library".into(),
        serde_json::json!({ "max_image_bytes": "lots" }),
    );
    assert!(LibraryContext::from_app_config(&app, Backends::in_memory()).is_err());
}

#[tokio::test]
async fn local_backends_follow_storage_config() {
    let mut cfg = library::config::LibraryConfig::default();
    cfg.storage = Some(library::config::StorageConfig {
        upload_base_url: "http://127.0.0.1:9/v0/b/bucket".into(),
        download_base_url: "http://127.0.0.1:9/v0/b/bucket".into(),
    });
    let ctx = LibraryContext::new(cfg.clone(), Backends::local(&cfg));
    assert!(ctx.config().storage.is_some());
    assert!(ctx.client().items().is_empty());
}
