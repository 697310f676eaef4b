use std::path::Path;

use crate::config::schema::{Config, LogFormat, CONFIG_VERSION, MAX_TTL_MINUTES};
use crate::error::ConfigError;
use crate::identity::validate_email;
use crate::secrets::has_secret_source;

pub const ENV_DATABASE: &str = "SHIPTRACK_DATABASE";
pub const ENV_HOST: &str = "SHIPTRACK_HOST";
pub const ENV_PORT: &str = "SHIPTRACK_PORT";
pub const ENV_LOG_FORMAT: &str = "SHIPTRACK_LOG_FORMAT";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the config file if one is given (defaults otherwise), then applies
/// environment overrides and validates the result.
pub fn load_effective_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Applies `SHIPTRACK_*` environment variables on top of a loaded config.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(path) = env_value(ENV_DATABASE) {
        config.database_path = Some(path);
    }

    if let Some(host) = env_value(ENV_HOST) {
        config.server.host = host;
    }

    if let Some(port) = env_value(ENV_PORT) {
        config.server.port = port.parse().map_err(|e| ConfigError::InvalidEnv {
            name: ENV_PORT.to_string(),
            reason: format!("'{}' is not a valid port: {}", port, e),
        })?;
    }

    if let Some(format) = env_value(ENV_LOG_FORMAT) {
        config.logging.format = match format.to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnv {
                    name: ENV_LOG_FORMAT.to_string(),
                    reason: format!("expected 'text' or 'json', got '{}'", other),
                })
            }
        };
    }

    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.server.host.trim().is_empty() {
        return Err(invalid("server.host must not be empty"));
    }

    let listing = &config.listing;
    if listing.page_size_options.is_empty() {
        return Err(invalid("listing.page_size_options must not be empty"));
    }
    if listing.page_size_options.contains(&0) {
        return Err(invalid("listing.page_size_options must be positive"));
    }
    if !listing
        .page_size_options
        .contains(&listing.default_page_size)
    {
        return Err(invalid(format!(
            "listing.default_page_size {} is not one of {:?}",
            listing.default_page_size, listing.page_size_options
        )));
    }

    for (name, minutes) in [
        ("session_ttl_minutes", config.auth.session_ttl_minutes),
        ("reset_token_ttl_minutes", config.auth.reset_token_ttl_minutes),
    ] {
        if minutes == 0 || minutes > MAX_TTL_MINUTES {
            return Err(invalid(format!(
                "auth.{} TTL must be between 1 and {} minutes",
                name, MAX_TTL_MINUTES
            )));
        }
    }
    if config.auth.min_password_length < 6 {
        return Err(invalid("auth.min_password_length must be at least 6"));
    }

    if let Some(admin) = &config.bootstrap_admin {
        validate_email(&admin.email)
            .map_err(|e| invalid(format!("bootstrap_admin.email: {}", e)))?;
        if !has_secret_source(
            admin.password.as_deref(),
            admin.password_file.as_deref(),
            admin.password_env_var.as_deref(),
        ) {
            return Err(invalid(
                "bootstrap_admin needs one of password, password_file or password_env_var",
            ));
        }
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PoNumberMatching;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.listing.page_size_options, vec![5, 10, 20, 50]);
        assert_eq!(config.listing.default_page_size, 5);
        assert!(config.tracking.allow_status_regression);
        assert_eq!(
            config.tracking.po_number_matching,
            PoNumberMatching::CaseInsensitive
        );
        assert_eq!(config.auth.session_ttl_minutes, 720);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "database_path": "/var/lib/shiptrack/db.sqlite",
            "server": { "host": "0.0.0.0", "port": 9000, "allowed_origins": ["https://cbx.test"] },
            "listing": { "page_size_options": [10, 25], "default_page_size": 25 },
            "tracking": { "allow_status_regression": false, "po_number_matching": "exact" },
            "auth": { "session_ttl_minutes": 30, "reset_token_ttl_minutes": 15, "min_password_length": 12 },
            "logging": { "format": "json", "level": "debug" },
            "bootstrap_admin": { "email": "root@cbx.test", "password_env_var": "ADMIN_PW" }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.listing.default_page_size, 25);
        assert!(!config.tracking.allow_status_regression);
        assert_eq!(config.tracking.po_number_matching, PoNumberMatching::Exact);
        assert_eq!(config.auth.min_password_length, 12);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.resolved_database_path().unwrap(),
            Path::new("/var/lib/shiptrack/db.sqlite")
        );
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_default_page_size_must_be_an_option() {
        let result = load_config_from_str(
            r#"{ "listing": { "page_size_options": [10, 20], "default_page_size": 5 } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = load_config_from_str(
            r#"{ "listing": { "page_size_options": [0, 5], "default_page_size": 5 } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bootstrap_admin_needs_password_source() {
        let result = load_config_from_str(r#"{ "bootstrap_admin": { "email": "root@cbx.test" } }"#);
        assert!(result.is_err());

        let result = load_config_from_str(
            r#"{ "bootstrap_admin": { "email": "not-an-email", "password": "x" } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_po_matching_mode() {
        let result =
            load_config_from_str(r#"{ "tracking": { "po_number_matching": "fuzzy" } }"#);
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            load_config_from_str("{ not json"),
            Err(ConfigError::ParseJson(_))
        ));
    }
}
