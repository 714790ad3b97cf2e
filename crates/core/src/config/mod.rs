//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The defaults describe the label generator app as deployed under a
//! GitHub Pages project path.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache store name for this worker version.
    ///
    /// Every store with a different name is deleted on activation.
    #[serde(default = "default_version_id")]
    pub version_id: String,

    /// Origin the worker is served from (scheme, host and optional port).
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix of the worker scope, e.g. `/Gerador-de-etiqueta-pwa`.
    ///
    /// Use `/` for a root-relative deployment.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Assets cached at install, relative to the scope or absolute.
    #[serde(default = "default_asset_manifest")]
    pub asset_manifest: Vec<String>,

    /// Shell page served to document requests while offline.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Only intercept requests on the worker's own origin.
    #[serde(default = "default_true")]
    pub origin_restriction: bool,

    /// Path extensions answered network-first (e.g. `xml` data files).
    #[serde(default)]
    pub network_first_extensions: Vec<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_version_id() -> String {
    "etiquetadora-v1.0.0".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_base_path() -> String {
    "/Gerador-de-etiqueta-pwa".into()
}

fn default_asset_manifest() -> Vec<String> {
    vec![
        "./".into(),
        "./index.html".into(),
        "./manifest.json".into(),
        "https://cdn.tailwindcss.com".into(),
    ]
}

fn default_offline_fallback() -> String {
    "./index.html".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version_id: default_version_id(),
            origin: default_origin(),
            base_path: default_base_path(),
            asset_manifest: default_asset_manifest(),
            offline_fallback: default_offline_fallback(),
            origin_restriction: true,
            network_first_extensions: Vec::new(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
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
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Scope URL string: origin plus base path, always ending in `/`.
    pub fn scope(&self) -> String {
        let origin = self.origin.trim_end_matches('/');
        let path = self.base_path.trim_end_matches('/');
        format!("{origin}{path}/")
    }
}
