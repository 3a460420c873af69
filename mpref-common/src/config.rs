//! Bootstrap configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line arguments (clap, each with an environment fallback)
//! 2. TOML configuration file
//! 3. Built-in defaults
//!
//! Catalog credentials are resolved separately: Environment → TOML.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default HTTP bind address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default Spotify Web API base URL
pub const DEFAULT_CATALOG_API_URL: &str = "https://api.spotify.com/v1";

/// Default Spotify accounts token endpoint
pub const DEFAULT_CATALOG_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Environment variable holding the catalog client id
pub const CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";

/// Environment variable holding the catalog client secret
pub const CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";

/// Configuration as read from the TOML file
///
/// Every field is optional; missing values fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Music catalog (Spotify) configuration
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Music catalog client configuration
#[derive(Clone, Deserialize)]
pub struct CatalogConfig {
    /// OAuth client id (overridden by `SPOTIFY_CLIENT_ID`)
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret (overridden by `SPOTIFY_CLIENT_SECRET`)
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Web API base URL
    #[serde(default = "default_api_url")]
    pub api_base_url: String,

    /// Client-credentials token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("token_url", &self.token_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: default_api_url(),
            token_url: default_token_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_url() -> String {
    DEFAULT_CATALOG_API_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_CATALOG_TOKEN_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Values supplied on the command line (or their environment fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub catalog: CatalogConfig,
}

impl ServiceConfig {
    /// Merge CLI overrides over the TOML file over built-in defaults
    pub fn resolve(cli: CliOverrides, toml_config: TomlConfig) -> Self {
        let database_path = cli
            .database_path
            .or(toml_config.database_path)
            .unwrap_or_else(default_database_path);

        let host = cli
            .host
            .or(toml_config.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

        let log_level = cli.log_level.unwrap_or(toml_config.logging.level);

        Self {
            database_path,
            host,
            port,
            log_level,
            catalog: toml_config.catalog,
        }
    }

    /// `host:port` string suitable for binding a listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Default configuration file location (`~/.config/mpref/mpref.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mpref").join("mpref.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mpref").join("mpref.db"))
        .unwrap_or_else(|| PathBuf::from("./mpref_data/mpref.db"))
}

/// Load the TOML configuration file
///
/// A missing file yields the default configuration; a file that exists but
/// cannot be read or parsed is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        debug!("Config file not found at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// OAuth client credentials for the music catalog
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for CatalogCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Resolve catalog credentials from environment, then TOML
///
/// Returns `None` when neither source provides a complete pair; the catalog
/// client then reports an authentication error on first use.
pub fn resolve_catalog_credentials(catalog: &CatalogConfig) -> Option<CatalogCredentials> {
    let env_pair = credential_pair(
        std::env::var(CLIENT_ID_ENV).ok(),
        std::env::var(CLIENT_SECRET_ENV).ok(),
    );
    let toml_pair = credential_pair(catalog.client_id.clone(), catalog.client_secret.clone());

    if env_pair.is_some() && toml_pair.is_some() {
        warn!("Catalog credentials found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(credentials) = env_pair {
        info!("Catalog credentials loaded from environment");
        return Some(credentials);
    }

    if let Some(credentials) = toml_pair {
        info!("Catalog credentials loaded from TOML config");
        return Some(credentials);
    }

    warn!(
        "Catalog credentials not configured. Set {} and {} or the [catalog] section of the config file",
        CLIENT_ID_ENV, CLIENT_SECRET_ENV
    );
    None
}

fn credential_pair(id: Option<String>, secret: Option<String>) -> Option<CatalogCredentials> {
    match (id, secret) {
        (Some(client_id), Some(client_secret)) if is_valid_key(&client_id) && is_valid_key(&client_secret) => {
            Some(CatalogCredentials {
                client_id: client_id.trim().to_string(),
                client_secret: client_secret.trim().to_string(),
            })
        }
        _ => None,
    }
}

/// Validate a credential value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
