//! Layered configuration for the sync binary.

use persistence::db::DatabaseConfig;
use serde::Deserialize;

/// Upstream API the public Airsift deployment syncs from.
const DEFAULT_BASE_URL: &str = "https://citizensense.co.uk:7000";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream API endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Loads configuration from `config/default`, an optional
    /// `config/local`, and `AIRSIFT__`-prefixed environment variables, in
    /// that order of precedence.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("AIRSIFT").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.upstream.base_url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "upstream.base_url must not be empty".into(),
            ));
        }
        if self.database.url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "database.url must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds entirely from embedded defaults and overrides, without
    /// touching config files or the process environment.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [upstream]
            base_url = "https://citizensense.co.uk:7000"
            request_timeout_secs = 30

            [database]
            url = "postgres://localhost/airsift_test"

            [logging]
            level = "info"
            format = "pretty"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load_for_test(&[]).unwrap();

        assert_eq!(config.upstream.base_url, "https://citizensense.co.uk:7000");
        assert_eq!(config.upstream.request_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::load_for_test(&[
            ("upstream.base_url", "http://localhost:7000"),
            ("database.max_connections", "12"),
        ])
        .unwrap();

        assert_eq!(config.upstream.base_url, "http://localhost:7000");
        assert_eq!(config.database.max_connections, 12);
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        let result = Config::load_for_test(&[("upstream.base_url", "")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_database_url_is_rejected() {
        let result = Config::load_for_test(&[("database.url", "")]);
        assert!(result.is_err());
    }
}
