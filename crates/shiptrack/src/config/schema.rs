use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::db::default_database_path;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// SQLite file. Defaults to `~/.shiptrack/data/shiptrack.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Admin account created on startup when no admin exists yet.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            database_path: None,
            server: ServerConfig::default(),
            listing: ListingConfig::default(),
            tracking: TrackingConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            bootstrap_admin: None,
        }
    }
}

impl Config {
    /// Effective database location, with `~` expanded.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        match self.database_path.as_deref() {
            Some(path) if path == "~" || path.starts_with("~/") => dirs::home_dir()
                .map(|home| home.join(path.trim_start_matches('~').trim_start_matches('/'))),
            Some(path) => Some(PathBuf::from(path)),
            None => default_database_path(),
        }
    }
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by CORS. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<usize>,
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

fn default_page_size_options() -> Vec<usize> {
    vec![5, 10, 20, 50]
}

fn default_page_size() -> usize {
    5
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size_options: default_page_size_options(),
            default_page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// When false, a status may not move to an earlier stage.
    #[serde(default = "default_true")]
    pub allow_status_regression: bool,
    #[serde(default)]
    pub po_number_matching: PoNumberMatching,
}

fn default_true() -> bool {
    true
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            allow_status_regression: true,
            po_number_matching: PoNumberMatching::default(),
        }
    }
}

/// How public PO-number lookups compare values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoNumberMatching {
    /// Trimmed, lowercased comparison.
    #[default]
    CaseInsensitive,
    /// Byte-for-byte comparison with the stored value.
    Exact,
}

/// Upper bound for session and reset-token lifetimes: one year.
pub const MAX_TTL_MINUTES: u64 = 60 * 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: u64,
    #[serde(default = "default_reset_ttl")]
    pub reset_token_ttl_minutes: u64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

fn default_session_ttl() -> u64 {
    720
}

fn default_reset_ttl() -> u64 {
    60
}

fn default_min_password_length() -> usize {
    8
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: default_session_ttl(),
            reset_token_ttl_minutes: default_reset_ttl(),
            min_password_length: default_min_password_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default)]
    pub password_env_var: Option<String>,
}
