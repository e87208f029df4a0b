//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (RUTAS_*)
//! 2. TOML config file (if RUTAS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::StorePolicy;

mod validation;

pub use validation::ConfigError;

/// Cache version baked into this build. Bump it on every redeploy so the
/// controller installs a fresh generation and drops the old one.
pub const CACHE_VERSION: &str = "rutasdr-v2";

/// Static assets every generation must contain, relative to the origin.
pub const DEFAULT_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./css/styles.css",
    "./js/app.js",
    "./data/barrios.json",
    "./data/rutas.json",
    "./data/alerts.json",
    "./data/i18n.json",
    "./manifest.json",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (RUTAS_*)
/// 2. TOML config file (if RUTAS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via RUTAS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL of the static site whose assets are cached.
    ///
    /// Set via RUTAS_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the current cache generation.
    ///
    /// Set via RUTAS_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Asset manifest installed into every new generation.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds. Past this the controller falls
    /// back to the cache.
    ///
    /// Set via RUTAS_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Address the caching proxy listens on.
    ///
    /// Set via RUTAS_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Activate a freshly installed generation without waiting.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Start intercepting requests as soon as activation finishes.
    #[serde(default = "default_true")]
    pub claim_clients: bool,

    /// Which network responses are copied into the cache.
    #[serde(default)]
    pub store_policy: StorePolicy,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./rutas-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_cache_version() -> String {
    CACHE_VERSION.into()
}

fn default_assets() -> Vec<String> {
    DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_user_agent() -> String {
    concat!("rutas/", env!("CARGO_PKG_VERSION")).into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_version: default_cache_version(),
            assets: default_assets(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            listen_addr: default_listen_addr(),
            skip_waiting: true,
            claim_clients: true,
            store_policy: StorePolicy::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var("RUTAS_CONFIG_FILE").ok();
        Self::load_from(config_file.as_deref())
    }

    /// Same as [`AppConfig::load`] with an explicit config file path.
    pub fn load_from(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_path) = config_file {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(
            Env::prefixed("RUTAS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
