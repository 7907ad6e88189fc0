//! Server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                      | Default                      |
//! |-------------------------------|------------------------------|
//! | `KOPERASI_BIND_ADDR`          | `0.0.0.0:3000`               |
//! | `KOPERASI_DATABASE_PATH`      | `./data/koperasi.db`         |
//! | `KOPERASI_SESSION_SECRET`     | required unless seeding demo |
//! | `KOPERASI_SESSION_TTL_SECS`   | `28800` (8 hours)            |
//! | `KOPERASI_COOKIE_SECURE`      | `false`                      |
//! | `KOPERASI_DEFAULT_TAX_BPS`    | `0`                          |
//! | `KOPERASI_UTC_OFFSET_MINUTES` | `420` (WIB)                  |
//! | `KOPERASI_SEED_DEMO`          | `false`                      |
//! | `KOPERASI_STORE_NAME`         | `Koperasi`                   |
//!
//! A demo install (`KOPERASI_SEED_DEMO=true`) may run on the built-in
//! development secret. Any other install must set its own.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};
use koperasi_core::period::offset_from_minutes;
use koperasi_core::TaxRate;

const DEV_SESSION_SECRET: &str = "koperasi-dev-session-secret-change-in-production";

/// Minimum length of a session secret supplied through the environment.
const MIN_SECRET_LEN: usize = 32;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub database_path: PathBuf,

    /// HMAC key signing the session cookie
    pub session_secret: String,

    /// Session lifetime in seconds
    pub session_ttl_secs: i64,

    /// Adds `Secure` to the session cookie (HTTPS deployments)
    pub cookie_secure: bool,

    /// Tax applied at checkout when the cashier gives none
    pub default_tax: TaxRate,

    /// Store local time, used for "today", week and month periods and CSV times
    pub utc_offset: FixedOffset,

    /// Seed demo accounts and products at startup
    pub seed_demo: bool,

    /// Shown on receipts and the health endpoint
    pub store_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_path: PathBuf::from("./data/koperasi.db"),
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_ttl_secs: 8 * 60 * 60,
            cookie_secure: false,
            default_tax: TaxRate::zero(),
            utc_offset: FixedOffset::east_opt(7 * 60 * 60).unwrap_or_else(|| Utc.fix()),
            seed_demo: false,
            store_name: "Koperasi".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();

        let utc_offset_minutes: i32 = parse_or(&lookup, "KOPERASI_UTC_OFFSET_MINUTES", 420)?;
        let utc_offset = offset_from_minutes(utc_offset_minutes)
            .ok_or_else(|| ConfigError::InvalidValue("KOPERASI_UTC_OFFSET_MINUTES".to_string()))?;

        let seed_demo: bool = parse_or(&lookup, "KOPERASI_SEED_DEMO", false)?;

        let session_secret = match lookup("KOPERASI_SESSION_SECRET") {
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::InvalidValue("KOPERASI_SESSION_SECRET".to_string()))
            }
            Some(secret) => secret,
            None if seed_demo => {
                tracing::warn!("KOPERASI_SESSION_SECRET not set, using the development secret");
                defaults.session_secret
            }
            None => return Err(ConfigError::Missing("KOPERASI_SESSION_SECRET".to_string())),
        };

        let session_ttl_secs: i64 =
            parse_or(&lookup, "KOPERASI_SESSION_TTL_SECS", defaults.session_ttl_secs)?;
        if session_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue("KOPERASI_SESSION_TTL_SECS".to_string()));
        }

        let config = ServerConfig {
            bind_addr: parse_or(&lookup, "KOPERASI_BIND_ADDR", defaults.bind_addr)?,

            database_path: lookup("KOPERASI_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            session_secret,

            session_ttl_secs,

            cookie_secure: parse_or(&lookup, "KOPERASI_COOKIE_SECURE", false)?,

            default_tax: TaxRate::from_bps(parse_or(&lookup, "KOPERASI_DEFAULT_TAX_BPS", 0)?),

            utc_offset,

            seed_demo,

            store_name: lookup("KOPERASI_STORE_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.store_name),
        };

        if config.default_tax.bps() > 10_000 {
            return Err(ConfigError::InvalidValue("KOPERASI_DEFAULT_TAX_BPS".to_string()));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("{0} must be set")]
    Missing(String),
}
