//! Configuration loading and config file resolution
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `SPOTLET_CONFIG` environment variable
//! 3. `<platform config dir>/spotlet/config.toml`
//!
//! A missing config file is not an error: a warning is logged and compiled
//! defaults are used. OAuth client settings may additionally be overridden
//! through `SPOTLET_CLIENT_ID`, `SPOTLET_CLIENT_SECRET` and
//! `SPOTLET_REDIRECT_URI`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SPOTLET_CONFIG";
/// Environment override for `[auth] client_id`
pub const CLIENT_ID_ENV_VAR: &str = "SPOTLET_CLIENT_ID";
/// Environment override for `[auth] client_secret`
pub const CLIENT_SECRET_ENV_VAR: &str = "SPOTLET_CLIENT_SECRET";
/// Environment override for `[auth] redirect_uri`
pub const REDIRECT_URI_ENV_VAR: &str = "SPOTLET_REDIRECT_URI";

/// Scopes requested at sign-in unless the config lists its own
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "playlist-modify-public",
    "playlist-read-private",
    "playlist-modify-private",
    "user-follow-read",
    "user-library-modify",
    "user-library-read",
    "user-read-email",
];

pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Upper bound for `[auth] refresh_threshold_secs` (one day)
pub const MAX_REFRESH_THRESHOLD_SECS: u64 = 86_400;
/// Upper bound for `[auth] request_timeout_secs` (ten minutes)
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// What happens to queued token waiters when a refresh exchange fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailurePolicy {
    /// Keep waiters queued; the next successful refresh serves them
    #[default]
    Retain,
    /// Drop waiters so async callers observe the failure
    Reject,
}

/// Top-level TOML configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub auth: AuthConfig,
    pub player: PlayerConfig,
    pub logging: LoggingConfig,
    /// Credential file location (defaults to the platform data dir)
    pub credentials_path: Option<PathBuf>,
}

/// `[auth]` section: OAuth2 client and token lifecycle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub show_dialog: bool,
    /// Look-ahead before expiry at which a token counts as stale
    pub refresh_threshold_secs: u64,
    pub request_timeout_secs: u64,
    pub on_refresh_failure: RefreshFailurePolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            show_dialog: true,
            refresh_threshold_secs: 300,
            request_timeout_secs: 30,
            on_refresh_failure: RefreshFailurePolicy::Retain,
        }
    }
}

impl AuthConfig {
    /// Look-ahead as a signed duration, saturating at `chrono::Duration::MAX`
    pub fn refresh_threshold(&self) -> chrono::Duration {
        i64::try_from(self.refresh_threshold_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `[player]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume applied to every newly started session (0.0-1.0)
    pub default_volume: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { default_volume: 0.5 }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing directive (`RUST_LOG` takes precedence)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve, load and finalize configuration
    ///
    /// Missing file falls back to defaults; a file that exists but cannot be
    /// read or parsed is an error. Environment overrides are applied last.
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::load_from_file(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Self::default()
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Replace client settings from `SPOTLET_CLIENT_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(CLIENT_ID_ENV_VAR) {
            self.auth.client_id = value;
        }
        if let Ok(value) = std::env::var(CLIENT_SECRET_ENV_VAR) {
            self.auth.client_secret = value;
        }
        if let Ok(value) = std::env::var(REDIRECT_URI_ENV_VAR) {
            self.auth.redirect_uri = value;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.player.default_volume) {
            return Err(Error::Config(format!(
                "player.default_volume must be within 0.0-1.0, got {}",
                self.player.default_volume
            )));
        }
        if self.auth.refresh_threshold_secs > MAX_REFRESH_THRESHOLD_SECS {
            return Err(Error::Config(format!(
                "auth.refresh_threshold_secs must be at most {}, got {}",
                MAX_REFRESH_THRESHOLD_SECS, self.auth.refresh_threshold_secs
            )));
        }
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.auth.request_timeout_secs) {
            return Err(Error::Config(format!(
                "auth.request_timeout_secs must be within 1-{}, got {}",
                MAX_REQUEST_TIMEOUT_SECS, self.auth.request_timeout_secs
            )));
        }
        if self.auth.token_url.is_empty() {
            return Err(Error::Config("auth.token_url must not be empty".to_string()));
        }
        if self.auth.authorize_url.is_empty() {
            return Err(Error::Config(
                "auth.authorize_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Credential file path, falling back to the platform default
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(default_credentials_path)
    }
}

/// Determine which config file applies
///
/// Returns `None` only when no argument or env var is set and the platform
/// has no config directory.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    // Priority 3: Platform config directory
    dirs::config_dir().map(|d| d.join("spotlet").join("config.toml"))
}

/// Get OS-dependent default credential file path
pub fn default_credentials_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("spotlet"))
        .unwrap_or_else(|| PathBuf::from("./spotlet_data"))
        .join("credentials.toml")
}
