//! Configuration for the radar
//!
//! Loaded from a TOML file or from `RADAR_*` environment variables on top of
//! the defaults, then validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LogLevel;
use crate::radar::is_valid_namespace;

mod error;

pub use error::ConfigError;

/// Default name→identity directory endpoint; the name is appended verbatim.
pub const DEFAULT_DIRECTORY_URL: &str = "https://api.mojang.com/users/profiles/minecraft/";

/// Main radar configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub resolver: ResolverConfig,
    pub sync: SyncConfig,
    /// Public lists registered at startup, in registration order
    pub public_lists: Vec<PublicListConfig>,
    pub hosts: HostConfig,
    pub logging: LoggingConfig,
}

/// Where private lists live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub lists_dir: PathBuf,
}

/// Identity resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Base URL of the directory service, name is appended
    pub directory_url: String,

    /// Upper bound for a single directory lookup
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Leading characters that mark non-queryable alias names
    pub alias_markers: Vec<char>,

    /// Leading characters of nicked chat senders; their lines are never decorated
    pub nick_markers: Vec<char>,
}

/// Public list synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Periodic refresh of public lists; `None` fetches once at registration
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Option<Duration>,

    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

/// One remotely mirrored list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicListConfig {
    pub namespace: String,
    pub prefix: String,
    pub url: String,
}

/// Servers the radar is meant to run on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub tracked_suffixes: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    pub with_timestamp: bool,
    pub with_target: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lists_dir: PathBuf::from("communityradar").join("lists"),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            timeout: Duration::from_secs(3),
            alias_markers: vec!['!', '~'],
            nick_markers: vec!['~'],
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval: None,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tracked_suffixes: vec![
                "griefergames.net".to_string(),
                "griefergames.de".to_string(),
                "griefergames.live".to_string(),
            ],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl PublicListConfig {
    pub fn new(
        namespace: impl Into<String>,
        prefix: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            prefix: prefix.into(),
            url: url.into(),
        }
    }
}

impl Config {
    /// Defaults plus the two community lists
    pub fn community() -> Self {
        Self {
            public_lists: vec![
                PublicListConfig::new(
                    "scammer",
                    "&7[&cScammer&7]",
                    "https://lists.community-radar.de/versions/v1/scammer.json",
                ),
                PublicListConfig::new(
                    "trusted",
                    "&7[&aTrusted&7]",
                    "https://lists.community-radar.de/versions/v1/trusted.json",
                ),
            ],
            ..Self::default()
        }
    }

    /// Apply environment overrides on top of [`Config::community`]
    ///
    /// Recognized variables: `RADAR_LISTS_DIR`, `RADAR_DIRECTORY_URL`,
    /// `RADAR_RESOLVE_TIMEOUT`, `RADAR_REFRESH_INTERVAL`, `RADAR_FETCH_TIMEOUT`,
    /// `RADAR_LOG_LEVEL`, `RADAR_LOG_JSON`. Durations use humantime syntax
    /// (`3s`, `15m`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::community();

        if let Ok(dir) = env::var("RADAR_LISTS_DIR") {
            config.storage.lists_dir = PathBuf::from(dir);
        }
        if let Ok(url) = env::var("RADAR_DIRECTORY_URL") {
            config.resolver.directory_url = url;
        }
        if let Ok(timeout) = env::var("RADAR_RESOLVE_TIMEOUT") {
            config.resolver.timeout = parse_duration_var("RADAR_RESOLVE_TIMEOUT", &timeout)?;
        }
        if let Ok(interval) = env::var("RADAR_REFRESH_INTERVAL") {
            config.sync.refresh_interval =
                Some(parse_duration_var("RADAR_REFRESH_INTERVAL", &interval)?);
        }
        if let Ok(timeout) = env::var("RADAR_FETCH_TIMEOUT") {
            config.sync.fetch_timeout = parse_duration_var("RADAR_FETCH_TIMEOUT", &timeout)?;
        }
        if let Ok(level) = env::var("RADAR_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("RADAR_LOG_JSON") {
            config.logging.json_format = json.parse().map_err(|e| ConfigError::InvalidEnv {
                var: "RADAR_LOG_JSON",
                reason: format!("{}", e),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing sections take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "resolver.timeout must be greater than 0".to_string(),
            ));
        }

        if self.sync.fetch_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "sync.fetch_timeout must be greater than 0".to_string(),
            ));
        }

        if matches!(self.sync.refresh_interval, Some(interval) if interval.is_zero()) {
            return Err(ConfigError::ValidationFailed(
                "sync.refresh_interval must be greater than 0 when set".to_string(),
            ));
        }

        if self.resolver.directory_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "resolver.directory_url must not be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for list in &self.public_lists {
            if !is_valid_namespace(&list.namespace) {
                return Err(ConfigError::ValidationFailed(format!(
                    "invalid public list namespace '{}'",
                    list.namespace
                )));
            }
            if !seen.insert(list.namespace.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "public list '{}' configured twice",
                    list.namespace
                )));
            }
            if list.url.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "public list '{}' has no url",
                    list.namespace
                )));
            }
        }

        if LogLevel::parse(&self.logging.level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

fn parse_duration_var(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|e| ConfigError::InvalidEnv {
        var,
        reason: e.to_string(),
    })
}
