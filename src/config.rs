//! Client and connection configuration
//!
//! Loading order for [`ClientConfig::load`]:
//! 1. TOML file
//! 2. Environment overrides (`TAVO_API_KEY`, `TAVO_JWT_TOKEN`,
//!    `TAVO_SESSION_TOKEN`, `TAVO_BASE_URL`)
//! 3. Defaults for anything left unset
//!
//! Durations are written in milliseconds in TOML (`read_timeout_ms = 60000`).
//!
//! ```toml
//! base_url = "https://api.tavo.ai"
//! api_key = "tvo_live_..."
//! timeout_ms = 30000
//!
//! [realtime]
//! max_reconnect_attempts = 5
//! ping_interval_ms = 15000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tavo_shared::{defaults, Credentials};
use tracing::warn;

use crate::error::ConfigError;

/// Immutable settings for one duplex connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Wait before each reconnect attempt (fixed, no backoff)
    #[serde(rename = "reconnect_interval_ms", with = "duration_ms")]
    pub reconnect_interval: Duration,
    /// Attempts before giving up; 0 disables reconnection
    pub max_reconnect_attempts: u32,
    /// Keep-alive ping period
    #[serde(rename = "ping_interval_ms", with = "duration_ms")]
    pub ping_interval: Duration,
    /// Bound on reading one frame
    #[serde(rename = "read_timeout_ms", with = "duration_ms")]
    pub read_timeout: Duration,
    /// Bound on writing one frame
    #[serde(rename = "write_timeout_ms", with = "duration_ms")]
    pub write_timeout: Duration,
    /// Bound on the opening handshake
    #[serde(rename = "handshake_timeout_ms", with = "duration_ms")]
    pub handshake_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_millis(defaults::RECONNECT_INTERVAL_MS),
            max_reconnect_attempts: defaults::MAX_RECONNECT_ATTEMPTS,
            ping_interval: Duration::from_millis(defaults::PING_INTERVAL_MS),
            read_timeout: Duration::from_millis(defaults::READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(defaults::WRITE_TIMEOUT_MS),
            handshake_timeout: Duration::from_millis(defaults::HANDSHAKE_TIMEOUT_MS),
        }
    }
}

impl ConnectionConfig {
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Reject values the connection manager cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("ping_interval_ms", self.ping_interval),
            ("read_timeout_ms", self.read_timeout),
            ("write_timeout_ms", self.write_timeout),
            ("handshake_timeout_ms", self.handshake_timeout),
        ];
        for (field, value) in non_zero {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Settings for the REST client and the realtime channels it opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API host, e.g. `https://api.tavo.ai`
    pub base_url: String,
    /// Version segment in `/api/{version}`
    pub api_version: String,
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Per-request timeout
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Retries for transport failures and 5xx responses
    pub max_retries: u32,
    /// Fixed wait between retries
    #[serde(rename = "retry_delay_ms", with = "duration_ms")]
    pub retry_delay: Duration,
    /// Defaults for realtime connections
    pub realtime: ConnectionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            api_version: defaults::API_VERSION.to_string(),
            credentials: Credentials::default(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            realtime: ConnectionConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials.api_key = Some(key.into());
        self
    }

    pub fn with_jwt_token(mut self, token: impl Into<String>) -> Self {
        self.credentials.bearer_token = Some(token.into());
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.credentials.session_token = Some(token.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_realtime(mut self, realtime: ConnectionConfig) -> Self {
        self.realtime = realtime;
        self
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load a TOML file, apply environment overrides, validate
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file without environment overrides
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parse a TOML string
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Override fields from a key lookup (normally the process environment)
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_opt(&mut self.credentials.api_key, lookup("TAVO_API_KEY"));
        override_opt(&mut self.credentials.bearer_token, lookup("TAVO_JWT_TOKEN"));
        override_opt(
            &mut self.credentials.session_token,
            lookup("TAVO_SESSION_TOKEN"),
        );
        if let Some(url) = lookup("TAVO_BASE_URL").filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(raw) = lookup("TAVO_MAX_RETRIES") {
            match raw.parse::<u32>() {
                Ok(parsed) => self.max_retries = parsed,
                Err(_) => warn!(
                    env_key = "TAVO_MAX_RETRIES",
                    value = raw.as_str(),
                    "failed to parse u32 from env var, ignoring"
                ),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::InvalidValue {
                    field: "base_url".to_string(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    field: "base_url".to_string(),
                    reason: e.to_string(),
                })
            }
        }
        if self.api_version.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_version".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        self.realtime.validate()
    }
}

fn override_opt(target: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        *target = Some(v);
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
