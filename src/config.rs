use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    /// Prefix prepended to every store key and channel name, e.g. "radium:".
    /// Empty by default so key names match the authority's wire layout as-is.
    pub key_prefix: String,
    pub connect_timeout_seconds: u64,
    /// Bound on every individual store fetch; a fetch that exceeds it is
    /// treated as a failure and degrades to the type's fallback value.
    pub operation_timeout_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: String::new(),
            connect_timeout_seconds: 5,
            operation_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub profile_ttl_seconds: u64,
    pub rank_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            profile_ttl_seconds: 300,
            rank_ttl_seconds: 300,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_seconds)
    }

    #[must_use]
    pub const fn rank_ttl(&self) -> Duration {
        Duration::from_secs(self.rank_ttl_seconds)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Usernames that bypass permission resolution entirely (compared
    /// case-insensitively against the profile username). Ships empty.
    pub super_admins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (RADIUM__REDIS__URL, etc.)
        builder = builder.add_source(
            Environment::with_prefix("RADIUM")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    #[must_use]
    pub fn redis_url(&self) -> &str {
        &self.redis.url
    }

    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.operation_timeout_seconds)
    }
}
