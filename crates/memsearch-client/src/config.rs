//! Client configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! Environment variables override file values when loaded via [`ClientConfig::from_env`].

use memsearch_protocol::SocketLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Overrides `connect_timeout_ms`.
pub const CONNECT_TIMEOUT_ENV: &str = "MEMSEARCH_CONNECT_TIMEOUT_MS";
/// Overrides `response_timeout_ms`.
pub const RESPONSE_TIMEOUT_ENV: &str = "MEMSEARCH_RESPONSE_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for [`ClientSession`](crate::ClientSession)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Upper bound on establishing either socket connection, in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Upper bound on waiting for a reply, in milliseconds
    ///
    /// Unset means wait indefinitely: a stalled coordinator stalls the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<u64>,

    /// Socket names inside the workspace
    #[serde(default)]
    pub layout: SocketLayout,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            response_timeout_ms: None,
            layout: SocketLayout::default(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_layout(mut self, layout: SocketLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up through `lookup`; an empty value clears the
    /// response timeout.
    pub fn apply_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(CONNECT_TIMEOUT_ENV) {
            self.connect_timeout_ms = parse_millis(CONNECT_TIMEOUT_ENV, &value)?;
        }
        if let Some(value) = lookup(RESPONSE_TIMEOUT_ENV) {
            self.response_timeout_ms = if value.trim().is_empty() {
                None
            } else {
                Some(parse_millis(RESPONSE_TIMEOUT_ENV, &value)?)
            };
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.response_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "response_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        if self.layout.request_socket_name.is_empty() {
            return Err(ConfigError::Invalid(
                "layout.request_socket_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_millis(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.response_timeout(), None);
        assert_eq!(config.layout, SocketLayout::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = ClientConfig::from_toml_str(
            r#"
            connect_timeout_ms = 250
            response_timeout_ms = 30000

            [layout]
            request_socket_name = "requests.sock"
            "#,
        )
        .unwrap();

        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.response_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.layout.request_socket_name, "requests.sock");
        assert_eq!(
            config.layout.response_socket_prefix,
            memsearch_protocol::RESPONSE_SOCKET_PREFIX
        );
    }

    #[test]
    fn test_zero_connect_timeout_rejected() {
        let result = ClientConfig::from_toml_str("connect_timeout_ms = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memsearch.toml");
        std::fs::write(&path, "connect_timeout_ms = 1000\n").unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.connect_timeout_ms, 1000);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = ClientConfig::load(tmp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (CONNECT_TIMEOUT_ENV, "750"),
            (RESPONSE_TIMEOUT_ENV, "2000"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default()
            .apply_env_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.connect_timeout_ms, 750);
        assert_eq!(config.response_timeout_ms, Some(2000));
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let result = ClientConfig::default().apply_env_overrides(|name| {
            (name == CONNECT_TIMEOUT_ENV).then(|| "soon".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv {
                name: CONNECT_TIMEOUT_ENV,
                ..
            })
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ClientConfig::default().with_response_timeout(Duration::from_secs(3));
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed = ClientConfig::from_toml_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }
}
