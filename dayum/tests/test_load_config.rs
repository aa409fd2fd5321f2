use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var("EXPORT_MODE");
    env::remove_var("FIREBASE_API_KEY");
    env::remove_var("FIREBASE_PROJECT_ID");
}

/// A full config file maps every section, and secrets come from the environment only.
#[tokio::test]
#[serial]
async fn test_load_config_success_all_sections() {
    clear_env();
    let config_yaml = r#"
store:
  project_id: project-dayum
  poll_interval_ms: 500
routes:
  prefetch_limit: 10
  fallback_slug: writing
deck:
  interval_ms: 3000
  drag_threshold_px: 80
landing:
  enter_target: /home
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    env::set_var("FIREBASE_API_KEY", "test-key");

    let config =
        dayum::load_config::load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.store.project_id, "project-dayum");
    assert_eq!(config.store.poll_interval_ms, 500);
    assert_eq!(config.store.collection, "stories");
    assert_eq!(config.store.api_key.as_deref(), Some("test-key"));
    assert_eq!(config.routes.prefetch_limit, 10);
    assert_eq!(config.routes.fallback_slug, "writing");
    assert!(!config.routes.export_mode);
    assert_eq!(
        config.routes.static_slugs,
        vec!["coding", "writing", "virtual-art"]
    );
    assert_eq!(config.deck.interval_ms, 3000);
    assert_eq!(config.deck.drag_threshold_px, 80.0);
    assert_eq!(config.deck.animation_ms, 800);
    assert_eq!(config.landing.enter_target, "/home");
    assert_eq!(config.landing.hero.interval_ms, 2500);
    clear_env();
}

/// The api key is never read from the file.
#[tokio::test]
#[serial]
async fn test_load_config_ignores_api_key_in_file() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "store:\n  api_key: leaked\n").unwrap();

    let config = dayum::load_config::load_config(config_file.path())
        .expect("Unknown keys are ignored");
    assert_eq!(config.store.api_key, None);
}

#[tokio::test]
#[serial]
async fn test_export_mode_env_overrides_config() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "routes:\n  export_mode: false\n").unwrap();

    env::set_var("EXPORT_MODE", "true");
    let config = dayum::load_config::load_config(config_file.path()).expect("Config should load");
    assert!(config.routes.export_mode);

    env::set_var("EXPORT_MODE", "false");
    let config = dayum::load_config::resolve_config(None).expect("Defaults should load");
    assert!(!config.routes.export_mode);
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_project_id_falls_back_to_env() {
    clear_env();
    env::set_var("FIREBASE_PROJECT_ID", "from-env");
    let config = dayum::load_config::resolve_config(None).expect("Defaults should load");
    assert_eq!(config.store.project_id, "from-env");
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_empty_file_is_all_defaults() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    let config = dayum::load_config::load_config(config_file.path())
        .expect("Empty config should load");
    assert_eq!(config.deck, dayum_core::config::CarouselConfig::deck());
    assert_eq!(config.routes, dayum_core::config::RouteConfig::default());
}

/// A config file that is not valid YAML makes load_config fail with a parse error.
#[tokio::test]
#[serial]
async fn test_load_config_errors_for_invalid_file() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"not-yaml: [:::").unwrap();

    let err = dayum::load_config::load_config(config_file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_for_missing_file() {
    let err = dayum::load_config::load_config("definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
