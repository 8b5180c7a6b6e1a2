//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PORTAL_OFFLINE_*)
//! 2. TOML config file (if PORTAL_OFFLINE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PORTAL_OFFLINE_*)
/// 2. TOML config file (if PORTAL_OFFLINE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via PORTAL_OFFLINE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the portal is served from. Relative manifest entries resolve
    /// against it and only responses from it are stored.
    ///
    /// Set via PORTAL_OFFLINE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Cache name without the version suffix.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Version suffix. Bumping it invalidates every earlier generation on the
    /// next activation.
    ///
    /// Set via PORTAL_OFFLINE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// URLs fetched and stored at install time, in order.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Document served for failed navigations.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Activate a freshly installed generation without waiting for a reload.
    #[serde(default)]
    pub skip_waiting: bool,

    /// Notification icon and badge.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    /// Window opened when a notification is clicked.
    #[serde(default = "default_open_url")]
    pub open_url: String,

    /// Background sync tags registered at install.
    #[serde(default = "default_sync_tags")]
    pub sync_tags: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via PORTAL_OFFLINE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via PORTAL_OFFLINE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via PORTAL_OFFLINE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./portal-offline-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_name() -> String {
    "irise-trust-portal".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/css/style.css",
        "/js/app.js",
        "/manifest.json",
        "/offline.html",
        "https://cdn.jsdelivr.net/npm/@fortawesome/fontawesome-free@6.4.0/css/all.min.css",
        "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&family=Playfair+Display:wght@600;700&display=swap",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_notification_icon() -> String {
    "/icon-192.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_open_url() -> String {
    "/".into()
}

fn default_sync_tags() -> Vec<String> {
    vec!["sync-forms".into()]
}

fn default_user_agent() -> String {
    "portal-offline/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_name: default_cache_name(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            offline_page: default_offline_page(),
            skip_waiting: false,
            notification_icon: default_notification_icon(),
            vibrate: default_vibrate(),
            open_url: default_open_url(),
            sync_tags: default_sync_tags(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the generation this configuration installs, e.g. `irise-trust-portal-v1`.
    pub fn generation_name(&self) -> String {
        format!("{}-{}", self.cache_name, self.cache_version)
    }

    /// Parsed portal origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PORTAL_OFFLINE_`
    /// 2. TOML file from `PORTAL_OFFLINE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("PORTAL_OFFLINE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PORTAL_OFFLINE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
