//! Configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::notification::RetryPolicy;

/// Signing secret used when `RENTFLOW_JWT_SECRET` is unset. Development only.
pub const DEFAULT_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Runtime configuration.
///
/// | Env Var                          | Default          |
/// |----------------------------------|------------------|
/// | `RENTFLOW_BIND_ADDR`             | `0.0.0.0:8080`   |
/// | `DATABASE_URL`                   | unset: in-memory |
/// | `RENTFLOW_DB_MAX_CONNECTIONS`    | `10`             |
/// | `RENTFLOW_JWT_SECRET`            | `dev-secret`     |
/// | `RENTFLOW_NOTIFY_MAX_ATTEMPTS`   | `5`              |
/// | `RENTFLOW_NOTIFY_BASE_DELAY_MS`  | `500`            |
/// | `RENTFLOW_NOTIFY_MAX_DELAY_MS`   | `30000`          |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub notification_retry: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment, test map...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(&lookup, "RENTFLOW_BIND_ADDR", "0.0.0.0:8080".parse().ok())?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let db_max_connections = parse_or(&lookup, "RENTFLOW_DB_MAX_CONNECTIONS", Some(10))?;
        let jwt_secret = lookup("RENTFLOW_JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());

        let max_attempts: u32 = parse_or(&lookup, "RENTFLOW_NOTIFY_MAX_ATTEMPTS", Some(5))?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "RENTFLOW_NOTIFY_MAX_ATTEMPTS",
                reason: "must be at least 1".to_string(),
            });
        }
        let base_delay_ms: u64 = parse_or(&lookup, "RENTFLOW_NOTIFY_BASE_DELAY_MS", Some(500))?;
        let max_delay_ms: u64 = parse_or(&lookup, "RENTFLOW_NOTIFY_MAX_DELAY_MS", Some(30_000))?;

        Ok(Self {
            bind_addr,
            database_url,
            db_max_connections,
            jwt_secret,
            notification_retry: RetryPolicy::exponential(
                max_attempts,
                Duration::from_millis(base_delay_ms),
                Duration::from_millis(max_delay_ms),
            ),
        })
    }

    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => default.ok_or_else(|| ConfigError::Invalid {
            key,
            reason: "missing".to_string(),
        }),
    }
}
