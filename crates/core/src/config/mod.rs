//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults for the app selected by SHELLCACHE_APP

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// The application shells shipped with built-in deployment presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellApp {
    #[default]
    Admin,
    Student,
    Trainer,
}

impl ShellApp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellApp::Admin => "admin",
            ShellApp::Student => "student",
            ShellApp::Trainer => "trainer",
        }
    }
}

impl FromStr for ShellApp {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ShellApp::Admin),
            "student" => Ok(ShellApp::Student),
            "trainer" => Ok(ShellApp::Trainer),
            other => Err(ConfigError::Invalid {
                field: "app".into(),
                reason: format!("unknown app '{other}' (expected admin, student or trainer)"),
            }),
        }
    }
}

/// Per-deployment cache policy parameters.
///
/// These are the only values that differ between deployed instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Version tag of the cache generation, e.g. `da360-admin-v1`.
    pub generation_id: String,

    /// Application shell URLs pre-cached on install, resolved against `origin`.
    pub seed_urls: Vec<String>,

    /// Document served when a navigation cannot reach the network.
    pub fallback_document: String,

    /// Body of the placeholder returned for a navigation with no cached fallback.
    #[serde(default = "default_offline_body")]
    pub offline_body: String,

    /// Body of the placeholder returned when a sub-resource misses the cache
    /// and the network is unreachable.
    #[serde(default = "default_offline_body")]
    pub subresource_placeholder: String,

    /// Also fall back when a navigation returns a non-2xx status.
    #[serde(default)]
    pub fallback_on_error_status: bool,

    /// Activate a newly installed generation without waiting for the current
    /// one to be released.
    #[serde(default = "default_skip_waiting")]
    pub skip_waiting: bool,
}

fn default_offline_body() -> String {
    "Offline".into()
}

fn default_skip_waiting() -> bool {
    true
}

impl DeploymentConfig {
    /// Built-in deployment for one of the shipped application shells.
    pub fn preset(app: ShellApp) -> Self {
        let name = app.as_str();
        let subresource_placeholder = match app {
            ShellApp::Trainer => "Network error".to_string(),
            ShellApp::Admin | ShellApp::Student => default_offline_body(),
        };

        Self {
            generation_id: format!("da360-{name}-v1"),
            seed_urls: vec![format!("/{name}/"), format!("/{name}/index.html"), format!("/{name}/manifest.json")],
            fallback_document: format!("/{name}/index.html"),
            offline_body: default_offline_body(),
            subresource_placeholder,
            fallback_on_error_status: false,
            skip_waiting: default_skip_waiting(),
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self::preset(ShellApp::default())
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL of the network origin serving the application shell.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SHELLCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Regular expressions for URLs that always go straight to the network
    /// (the live backend API).
    #[serde(default = "default_passthrough_patterns")]
    pub passthrough_patterns: Vec<String>,

    /// Cache policy for the deployed application shell.
    ///
    /// Nested keys are set via e.g. SHELLCACHE_DEPLOYMENT__GENERATION_ID.
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_passthrough_patterns() -> Vec<String> {
    vec![r"script\.google\.com".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_app(ShellApp::default())
    }
}

impl AppConfig {
    /// Defaults with the deployment preset for `app`.
    pub fn for_app(app: ShellApp) -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            passthrough_patterns: default_passthrough_patterns(),
            deployment: DeploymentConfig::preset(app),
        }
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Defaults for the app named by `SHELLCACHE_APP` (admin if unset)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `SHELLCACHE_APP` names an unknown app
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let app = match std::env::var("SHELLCACHE_APP") {
            Ok(name) => name.parse()?,
            Err(_) => ShellApp::default(),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::for_app(app)));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["APP", "CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
