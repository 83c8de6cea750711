//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Secret used when `JWT_SECRET` is not set. Only suitable for development.
pub const DEV_JWT_SECRET: &str = "warehouse-development-secret-change-me";

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Background cache sweep interval in seconds
    pub cleanup_interval: u64,
    /// Root directory of the file fallback tier
    pub data_dir: PathBuf,
    /// Token signing and lifetime settings
    pub jwt: JwtSettings,
    /// Cache expiry per entity kind
    pub cache: CacheConfig,
    /// Retry policy applied to every store call
    pub retry: RetrySettings,
    /// Deliveries allowed per message before it is dead-lettered
    pub max_deliveries: u32,
}

/// Access/refresh token settings.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_expiration_minutes: i64,
    pub refresh_token_expiration_minutes: i64,
}

/// Cache expiry for one entity kind, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub absolute_expiration: u64,
    pub sliding_expiration: u64,
}

impl CacheSettings {
    pub fn absolute(&self) -> Duration {
        Duration::from_secs(self.absolute_expiration.saturating_mul(60))
    }

    /// Sliding window, or `None` when set to zero.
    pub fn sliding(&self) -> Option<Duration> {
        (self.sliding_expiration > 0)
            .then(|| Duration::from_secs(self.sliding_expiration.saturating_mul(60)))
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            absolute_expiration: 60,
            sliding_expiration: 10,
        }
    }
}

/// Per-kind cache settings.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    pub customer: CacheSettings,
    pub manufacturer: CacheSettings,
    pub product: CacheSettings,
    pub log: CacheSettings,
    pub user: CacheSettings,
    pub refresh_token: CacheSettings,
}

/// Bounded retry settings for store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts, including the first one
    pub retry_count: u32,
    /// Base delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Double the delay after every failed attempt
    pub exponential: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay_ms: 200,
            exponential: true,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn cache_settings_from_env(kind: &str) -> CacheSettings {
    let defaults = CacheSettings::default();
    CacheSettings {
        absolute_expiration: env_or(
            &format!("CACHE_{kind}_ABSOLUTE_EXPIRATION"),
            defaults.absolute_expiration,
        ),
        sliding_expiration: env_or(
            &format!("CACHE_{kind}_SLIDING_EXPIRATION"),
            defaults.sliding_expiration,
        ),
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cache sweep frequency in seconds (default: 1)
    /// - `DATA_DIR` - File fallback root (default: ./data)
    /// - `JWT_SECRET`, `JWT_ISSUER`, `JWT_AUDIENCE`
    /// - `ACCESS_TOKEN_EXPIRATION_MINUTES` (default: 15)
    /// - `REFRESH_TOKEN_EXPIRATION_MINUTES` (default: 10080)
    /// - `CACHE_<KIND>_ABSOLUTE_EXPIRATION` / `CACHE_<KIND>_SLIDING_EXPIRATION`
    ///   minutes, where KIND is CUSTOMER, MANUFACTURER, PRODUCT, LOG, USER or
    ///   REFRESH_TOKEN (default: 60 / 10)
    /// - `RETRY_COUNT` (default: 3), `RETRY_DELAY_MS` (default: 200),
    ///   `RETRY_EXPONENTIAL` (default: true)
    /// - `MAX_DELIVERIES` (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            jwt: JwtSettings {
                secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt.secret),
                issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
                audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt.audience),
                access_token_expiration_minutes: env_or(
                    "ACCESS_TOKEN_EXPIRATION_MINUTES",
                    defaults.jwt.access_token_expiration_minutes,
                ),
                refresh_token_expiration_minutes: env_or(
                    "REFRESH_TOKEN_EXPIRATION_MINUTES",
                    defaults.jwt.refresh_token_expiration_minutes,
                ),
            },
            cache: CacheConfig {
                customer: cache_settings_from_env("CUSTOMER"),
                manufacturer: cache_settings_from_env("MANUFACTURER"),
                product: cache_settings_from_env("PRODUCT"),
                log: cache_settings_from_env("LOG"),
                user: cache_settings_from_env("USER"),
                refresh_token: cache_settings_from_env("REFRESH_TOKEN"),
            },
            retry: RetrySettings {
                retry_count: env_or("RETRY_COUNT", defaults.retry.retry_count),
                retry_delay_ms: env_or("RETRY_DELAY_MS", defaults.retry.retry_delay_ms),
                exponential: env_or("RETRY_EXPONENTIAL", defaults.retry.exponential),
            },
            max_deliveries: env_or("MAX_DELIVERIES", defaults.max_deliveries),
        }
    }

    /// True when the signing secret is still the built-in development value.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt.secret == DEV_JWT_SECRET
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: DEV_JWT_SECRET.to_string(),
            issuer: "warehouse".to_string(),
            audience: "warehouse-clients".to_string(),
            access_token_expiration_minutes: 15,
            refresh_token_expiration_minutes: 7 * 24 * 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: 1,
            data_dir: PathBuf::from("./data"),
            jwt: JwtSettings::default(),
            cache: CacheConfig::default(),
            retry: RetrySettings::default(),
            max_deliveries: 5,
        }
    }
}
