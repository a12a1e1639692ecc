//! # Client Configuration
//!
//! Where the backend lives, which auth paths it uses and where local state
//! is kept.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TILL_API_URL=https://pos.example.com/api                            │
//! │     TILL_TIMEOUT_SECS=10                                                │
//! │     TILL_LOGIN_PATH=/login                                              │
//! │     TILL_DATA_DIR=/var/lib/till                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/pos/config.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.till.pos/config.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     http://127.0.0.1:5000, /auth/login, 30 s timeout                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://pos.example.com/api"
//! timeout_secs = 30
//!
//! [auth]
//! login_path = "/login"     # older backends
//! verify_path = "/auth/verify"
//! logout_path = "/auth/logout"
//!
//! [storage]
//! data_dir = "/var/lib/till"
//!
//! [notifications]
//! dismiss_after_ms = 3000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};

// =============================================================================
// API Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Auth Settings
// =============================================================================

/// Auth endpoint paths. Deployments differ on the login path
/// (`/auth/login` vs `/login`), so all three are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_verify_path")]
    pub verify_path: String,

    #[serde(default = "default_logout_path")]
    pub logout_path: String,
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_verify_path() -> String {
    "/auth/verify".to_string()
}

fn default_logout_path() -> String {
    "/auth/logout".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            login_path: default_login_path(),
            verify_path: default_verify_path(),
            logout_path: default_logout_path(),
        }
    }
}

// =============================================================================
// Storage & Notification Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for the persisted token and cart. Defaults to the
    /// platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// How long a notification stays up before it is dismissed.
    #[serde(default = "default_dismiss_after")]
    pub dismiss_after_ms: u64,
}

fn default_dismiss_after() -> u64 {
    3000
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            dismiss_after_ms: default_dismiss_after(),
        }
    }
}

// =============================================================================
// Main Client Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl ClientConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (config.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ClientError::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        for (name, path) in [
            ("login_path", &self.auth.login_path),
            ("verify_path", &self.auth.verify_path),
            ("logout_path", &self.auth.logout_path),
        ] {
            if !path.starts_with('/') {
                return Err(ClientError::Config(format!(
                    "{} must start with '/', got: {}",
                    name, path
                )));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TILL_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Ok(timeout) = std::env::var("TILL_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric TILL_TIMEOUT_SECS"),
            }
        }

        if let Ok(path) = std::env::var("TILL_LOGIN_PATH") {
            debug!(path = %path, "Overriding login path from environment");
            self.auth.login_path = path;
        }

        if let Ok(dir) = std::env::var("TILL_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "pos")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.notifications.dismiss_after_ms)
    }

    /// The configured data dir, else the platform data dir.
    pub fn data_dir(&self) -> ClientResult<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        directories::ProjectDirs::from("com", "till", "pos")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| ClientError::Config("no home directory for local data".into()))
    }
}
