use std::{env, fmt::Display, net::IpAddr, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub db_max_connections: u32,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: try_load("HOST", "127.0.0.1")?,
            port: try_load("PORT", "3000")?,
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_hours: token_ttl(try_load("TOKEN_TTL_HOURS", "8")?)?,
            bcrypt_cost: try_load("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "10")?,
            run_migrations: try_load("RUN_MIGRATIONS", "true")?,
        })
    }

    pub fn token_ttl_seconds(&self) -> usize {
        self.token_ttl_hours.clamp(0, MAX_TOKEN_TTL_HOURS) as usize * 60 * 60
    }
}

/// One year.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

fn token_ttl(hours: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(ConfigError::Invalid {
            key: "TOKEN_TTL_HOURS",
            value: hours.to_string(),
            reason: format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}
