//! Console configuration.
//!
//! Values come from three layers, later layers winning:
//! - an optional TOML file
//! - `OBSIDIAN_*` environment variables
//! - explicit `with_*` overrides (the CLI flags)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::channel::ReconnectConfig;
use crate::error::ClientError;
use crate::reconciler::FEED_CAPACITY;

/// Environment variable overriding [`ConsoleConfig::api_url`].
pub const ENV_API_URL: &str = "OBSIDIAN_API_URL";
/// Environment variable overriding [`ConsoleConfig::socket_url`].
pub const ENV_SOCKET_URL: &str = "OBSIDIAN_SOCKET_URL";
/// Environment variable overriding [`ConsoleConfig::credential_path`].
pub const ENV_CREDENTIAL_PATH: &str = "OBSIDIAN_CREDENTIAL_PATH";

/// Reconnection settings as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on the retry delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor between retries.
    pub backoff_multiplier: f64,
    /// Give up after this many failed attempts. Unlimited when absent.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let defaults = ReconnectConfig::default();
        Self {
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            backoff_multiplier: defaults.backoff_multiplier,
            max_attempts: defaults.max_attempts,
        }
    }
}

impl ReconnectSettings {
    /// Convert to the runtime backoff policy.
    #[must_use]
    pub fn to_reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_attempts: self.max_attempts,
        }
    }
}

/// Configuration for a console instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the REST snapshot surface.
    pub api_url: String,
    /// WebSocket endpoint of the push channel.
    pub socket_url: String,
    /// Where the credential is persisted. Defaults to the user config dir.
    pub credential_path: Option<PathBuf>,
    /// Capacity of each event feed.
    pub feed_capacity: usize,
    /// Per-request timeout for snapshot calls, in seconds.
    pub request_timeout_secs: u64,
    /// Push channel reconnection policy.
    pub reconnect: ReconnectSettings,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".to_string(),
            socket_url: "ws://localhost:3001".to_string(),
            credential_path: None,
            feed_capacity: FEED_CAPACITY,
            request_timeout_secs: 10,
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ClientError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ClientError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `OBSIDIAN_*` overrides from a key lookup such as
    /// `|key| std::env::var(key).ok()`. Empty values are ignored.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_url) = lookup(ENV_API_URL) {
            self.api_url = api_url;
        }
        if let Some(socket_url) = lookup(ENV_SOCKET_URL) {
            self.socket_url = socket_url;
        }
        if let Some(path) = lookup(ENV_CREDENTIAL_PATH) {
            self.credential_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Set the REST base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Set the push channel endpoint.
    #[must_use]
    pub fn with_socket_url(mut self, socket_url: impl Into<String>) -> Self {
        self.socket_url = socket_url.into();
        self
    }

    /// Set the credential file location.
    #[must_use]
    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = Some(path.into());
        self
    }

    /// Set the event feed capacity.
    #[must_use]
    pub const fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }

    /// Set the snapshot request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the reconnection policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectSettings) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Snapshot request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolved credential file location.
    ///
    /// Falls back to `<config dir>/obsidian/credential.json`; `None` when the
    /// platform has no config directory.
    #[must_use]
    pub fn credential_path(&self) -> Option<PathBuf> {
        self.credential_path
            .clone()
            .or_else(crate::session::FileCredentialStorage::default_path)
    }

    /// Parsed REST base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or not http(s).
    pub fn api_base(&self) -> Result<Url, ClientError> {
        parse_url("api_url", &self.api_url, &["http", "https"])
    }

    /// Parsed push channel endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or not ws(s).
    pub fn socket_endpoint(&self) -> Result<Url, ClientError> {
        parse_url("socket_url", &self.socket_url, &["ws", "wss"])
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ClientError> {
        self.api_base()?;
        self.socket_endpoint()?;

        if self.feed_capacity == 0 {
            return Err(ClientError::Config(
                "feed_capacity must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.reconnect.backoff_multiplier < 1.0 {
            return Err(ClientError::Config(
                "reconnect.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }

        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(ClientError::Config(
                "reconnect.max_delay_ms cannot be below initial_delay_ms".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_url(field: &str, raw: &str, schemes: &[&str]) -> Result<Url, ClientError> {
    if raw.trim().is_empty() {
        return Err(ClientError::Config(format!("{field} cannot be empty")));
    }

    let url = Url::parse(raw.trim())
        .map_err(|e| ClientError::Config(format!("{field} is not a valid URL: {e}")))?;

    if !schemes.contains(&url.scheme()) {
        return Err(ClientError::Config(format!(
            "{field} must use one of {schemes:?}, got '{}'",
            url.scheme()
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed_capacity, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.reconnect.initial_delay_ms, 1_000);
        assert_eq!(config.reconnect.max_delay_ms, 30_000);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ConsoleConfig::from_toml(
            r#"
            api_url = "https://gateway.example.com/api"
            socket_url = "wss://gateway.example.com"

            [reconnect]
            initial_delay_ms = 250
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "https://gateway.example.com/api");
        assert_eq!(config.feed_capacity, 10);
        assert_eq!(config.reconnect.initial_delay_ms, 250);
        assert_eq!(config.reconnect.max_delay_ms, 30_000);
        assert_eq!(config.reconnect.max_attempts, Some(5));
    }

    #[test]
    fn test_from_toml_rejects_bad_scheme() {
        let err = ConsoleConfig::from_toml(r#"socket_url = "http://localhost:3001""#).unwrap_err();
        assert!(err.to_string().contains("socket_url"));
    }

    #[test]
    fn test_from_toml_rejects_zero_capacity() {
        let err = ConsoleConfig::from_toml("feed_capacity = 0").unwrap_err();
        assert!(err.to_string().contains("feed_capacity"));
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let err = ConsoleConfig::from_toml("api_url = ").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obsidian.toml");
        std::fs::write(&path, "request_timeout_secs = 3\n").unwrap();

        let config = ConsoleConfig::from_file(&path).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(3));

        let missing = ConsoleConfig::from_file(dir.path().join("missing.toml"));
        assert!(missing.is_err());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "http://api.internal:8080"),
            (ENV_SOCKET_URL, ""),
            (ENV_CREDENTIAL_PATH, "/tmp/obsidian/token.json"),
        ]
        .into_iter()
        .collect();

        let config = ConsoleConfig::default()
            .with_overrides_from(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.api_url, "http://api.internal:8080");
        assert_eq!(config.socket_url, "ws://localhost:3001");
        assert_eq!(
            config.credential_path(),
            Some(PathBuf::from("/tmp/obsidian/token.json"))
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConsoleConfig::default()
            .with_api_url("https://a.example.com")
            .with_socket_url("wss://a.example.com/ws")
            .with_feed_capacity(25)
            .with_request_timeout(Duration::from_secs(2));

        assert!(config.validate().is_ok());
        assert_eq!(config.feed_capacity, 25);
        assert_eq!(config.socket_endpoint().unwrap().path(), "/ws");
    }

    #[test]
    fn test_reconnect_settings_conversion() {
        let settings = ReconnectSettings {
            initial_delay_ms: 50,
            max_delay_ms: 400,
            backoff_multiplier: 2.0,
            max_attempts: Some(3),
        };

        let reconnect = settings.to_reconnect_config();
        assert_eq!(reconnect.initial_delay, Duration::from_millis(50));
        assert_eq!(reconnect.max_delay, Duration::from_millis(400));
        assert_eq!(reconnect.max_attempts, Some(3));
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let config = ConsoleConfig::default().with_reconnect(ReconnectSettings {
            initial_delay_ms: 5_000,
            max_delay_ms: 1_000,
            ..ReconnectSettings::default()
        });
        assert!(config.validate().is_err());
    }
}
