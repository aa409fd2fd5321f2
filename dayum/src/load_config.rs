/// `load_config` module: loads the static YAML config and layers environment settings on top.
///
/// This module is the only place where untrusted YAML is parsed into the typed settings used by
/// the CLI and handed to `dayum-core`.
///
/// # Responsibilities
/// - Parse the YAML file into [`CliConfig`]; every section is optional and falls back to defaults
/// - Inject secrets from the environment (`FIREBASE_API_KEY`), never from the file
/// - Apply the `EXPORT_MODE` switch over `routes.export_mode`
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use dayum_core::config::{CarouselConfig, LandingConfig, RouteConfig};
use dayum_core::story::COLLECTION;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const API_KEY_ENV: &str = "FIREBASE_API_KEY";
pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
pub const EXPORT_MODE_ENV: &str = "EXPORT_MODE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub routes: RouteConfig,
    #[serde(default = "CarouselConfig::deck")]
    pub deck: CarouselConfig,
    #[serde(default)]
    pub landing: LandingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    pub collection: String,
    /// How often a live query is re-run against Firestore.
    pub poll_interval_ms: u64,
    /// Only ever taken from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            project_id: String::new(),
            database: "(default)".to_string(),
            collection: COLLECTION.to_string(),
            poll_interval_ms: 2000,
            api_key: None,
        }
    }
}

/// Loads a static YAML config file (no secrets) and injects the environment settings.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid, all-defaults config.
    let raw: Option<CliConfig> = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let mut config = raw.unwrap_or_default();
    apply_env(&mut config);
    config.deck.trace_loaded("deck");
    Ok(config)
}

/// The config file when given, otherwise defaults; environment settings apply either way.
pub fn resolve_config(path: Option<&Path>) -> Result<CliConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            info!("No config file given, using defaults");
            let mut config = CliConfig::default();
            apply_env(&mut config);
            Ok(config)
        }
    }
}

fn apply_env(config: &mut CliConfig) {
    config.store.api_key = env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
    if config.store.api_key.is_none() {
        warn!(env = API_KEY_ENV, "No API key in environment, requests go out unauthenticated");
    }

    if config.store.project_id.is_empty() {
        if let Ok(project_id) = env::var(PROJECT_ID_ENV) {
            config.store.project_id = project_id;
        }
    }

    if let Ok(raw) = env::var(EXPORT_MODE_ENV) {
        let export_mode = matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes");
        if export_mode != config.routes.export_mode {
            info!(export_mode, "EXPORT_MODE overrides routes.export_mode");
        }
        config.routes.export_mode = export_mode;
    }
}
