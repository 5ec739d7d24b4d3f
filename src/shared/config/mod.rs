//! Application configuration module
//!
//! Settings are resolved in three layers: built-in defaults, an optional TOML
//! file named by `SOCIAL_HUB_CONFIG`, then individual environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SERVER_HOST` / `SERVER_PORT` | `0.0.0.0` / `8080` |
//! | `DATABASE_URL` | `sqlite://social_network.db?mode=rwc` |
//! | `WS_OUTBOUND_CAPACITY` | `256` |
//! | `HUB_QUEUE_CAPACITY` | `1024` |
//! | `WS_IDLE_TIMEOUT_SECS` | `60` |
//! | `WS_PING_INTERVAL_SECS` | `25` |
//! | `WS_MAX_MESSAGE_LEN` | `4096` |
//! | `ALLOWED_ORIGIN` | unset |

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an optional TOML config file
pub const CONFIG_FILE_ENV: &str = "SOCIAL_HUB_CONFIG";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    /// sqlx connection string for the chat store
    pub database_url: String,
    /// Per-connection outbound queue size; a full queue marks the connection dead
    pub outbound_queue_capacity: usize,
    /// Hub command channel size
    pub hub_queue_capacity: usize,
    /// A connection with no inbound frame for this long is closed
    pub idle_timeout: Duration,
    /// How often the server pings each connection
    pub ping_interval: Duration,
    /// Upper bound on `content` length in bytes
    pub max_message_len: usize,
    /// When set, upgrades from any other `Origin` are refused
    pub allowed_origin: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            database_url: "sqlite://social_network.db?mode=rwc".to_string(),
            outbound_queue_capacity: 256,
            hub_queue_capacity: 1024,
            idle_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(25),
            max_message_len: 4096,
            allowed_origin: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder seeded with defaults
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::Invalid("outbound queue capacity must be positive".into()));
        }
        if self.hub_queue_capacity == 0 {
            return Err(ConfigError::Invalid("hub queue capacity must be positive".into()));
        }
        if self.max_message_len == 0 {
            return Err(ConfigError::Invalid("max message length must be positive".into()));
        }
        if self.ping_interval.is_zero() || self.ping_interval >= self.idle_timeout {
            return Err(ConfigError::Invalid(format!(
                "ping interval ({:?}) must be non-zero and shorter than idle timeout ({:?})",
                self.ping_interval, self.idle_timeout
            )));
        }
        if self.database_url.is_empty() {
            return Err(ConfigError::MissingValue("DATABASE_URL"));
        }
        Ok(())
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = match lookup(CONFIG_FILE_ENV) {
            Some(path) => AppConfigBuilder::from_file(PathBuf::from(path))?,
            None => AppConfig::builder(),
        };

        let host: Option<IpAddr> = parse_var(&lookup, "SERVER_HOST")?;
        let port: Option<u16> = parse_var(&lookup, "SERVER_PORT")?;
        if host.is_some() || port.is_some() {
            let current = builder.config.bind_addr;
            builder = builder.bind_addr(SocketAddr::new(
                host.unwrap_or(current.ip()),
                port.unwrap_or(current.port()),
            ));
        }
        if let Some(url) = lookup("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        if let Some(capacity) = parse_var(&lookup, "WS_OUTBOUND_CAPACITY")? {
            builder = builder.outbound_queue_capacity(capacity);
        }
        if let Some(capacity) = parse_var(&lookup, "HUB_QUEUE_CAPACITY")? {
            builder = builder.hub_queue_capacity(capacity);
        }
        if let Some(secs) = parse_var(&lookup, "WS_IDLE_TIMEOUT_SECS")? {
            builder = builder.idle_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var(&lookup, "WS_PING_INTERVAL_SECS")? {
            builder = builder.ping_interval(Duration::from_secs(secs));
        }
        if let Some(len) = parse_var(&lookup, "WS_MAX_MESSAGE_LEN")? {
            builder = builder.max_message_len(len);
        }
        if let Some(origin) = lookup("ALLOWED_ORIGIN") {
            builder = builder.allowed_origin(origin);
        }

        builder.build()
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(None),
    }
}

/// On-disk TOML layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind_addr: Option<SocketAddr>,
    database_url: Option<String>,
    outbound_queue_capacity: Option<usize>,
    hub_queue_capacity: Option<usize>,
    idle_timeout_secs: Option<u64>,
    ping_interval_secs: Option<u64>,
    max_message_len: Option<usize>,
    allowed_origin: Option<String>,
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Seed a builder from a TOML file
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Seed a builder from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw)?;
        let mut builder = Self::default();
        if let Some(addr) = file.bind_addr {
            builder = builder.bind_addr(addr);
        }
        if let Some(url) = file.database_url {
            builder = builder.database_url(url);
        }
        if let Some(capacity) = file.outbound_queue_capacity {
            builder = builder.outbound_queue_capacity(capacity);
        }
        if let Some(capacity) = file.hub_queue_capacity {
            builder = builder.hub_queue_capacity(capacity);
        }
        if let Some(secs) = file.idle_timeout_secs {
            builder = builder.idle_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = file.ping_interval_secs {
            builder = builder.ping_interval(Duration::from_secs(secs));
        }
        if let Some(len) = file.max_message_len {
            builder = builder.max_message_len(len);
        }
        if let Some(origin) = file.allowed_origin {
            builder = builder.allowed_origin(origin);
        }
        Ok(builder)
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_queue_capacity = capacity;
        self
    }

    pub fn hub_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.hub_queue_capacity = capacity;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = interval;
        self
    }

    pub fn max_message_len(mut self, len: usize) -> Self {
        self.config.max_message_len = len;
        self
    }

    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.allowed_origin = Some(origin.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("cannot read config file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),
}
