/**
 * Server Configuration
 *
 * This module handles loading and validation of server configuration
 * from environment variables (a `.env` file is loaded by the binary).
 *
 * # Variables
 *
 * | Variable                | Default          |
 * |-------------------------|------------------|
 * | `SERVER_HOST`           | `0.0.0.0`        |
 * | `SERVER_PORT`           | `3000`           |
 * | `DATABASE_URL`          | unset (memory)   |
 * | `JWT_SECRET`            | dev fallback     |
 * | `CLIENT_QUEUE_CAPACITY` | `256`            |
 * | `ROOM_QUEUE_CAPACITY`   | `1024`           |
 * | `PING_INTERVAL_SECS`    | `30`             |
 * | `PONG_TIMEOUT_SECS`     | `60`             |
 * | `EVENT_WORKERS`         | `4`              |
 * | `EVENT_QUEUE_CAPACITY`  | `1024`           |
 *
 * # Error Handling
 *
 * A variable that is set but does not parse is an error; the server
 * refuses to start rather than silently using the default.
 */

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::backend::realtime::ClientSettings;

const DEV_JWT_SECRET: &str = "boardsync-dev-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Absent means in-memory stores
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub client_queue_capacity: usize,
    pub room_queue_capacity: usize,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub event_workers: usize,
    pub event_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            client_queue_capacity: 256,
            room_queue_capacity: 1024,
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(60),
            event_workers: 4,
            event_queue_capacity: 1024,
        }
    }
}

fn var(key: &'static str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Like `parse_var`, rejecting zero
fn parse_positive(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    let parsed = parse_var(key, default)?;
    if parsed == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: parsed.to_string(),
        });
    }
    Ok(parsed)
}

impl ServerConfig {
    /// Read the configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                tracing::warn!("[STARTUP] JWT_SECRET not set, using the development secret");
                defaults.jwt_secret.clone()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let config = Self {
            host: var("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_var("SERVER_PORT", defaults.port)?,
            database_url: var("DATABASE_URL"),
            jwt_secret,
            client_queue_capacity: parse_positive("CLIENT_QUEUE_CAPACITY", defaults.client_queue_capacity)?,
            room_queue_capacity: parse_positive("ROOM_QUEUE_CAPACITY", defaults.room_queue_capacity)?,
            ping_interval: Duration::from_secs(parse_var("PING_INTERVAL_SECS", 30)?),
            pong_timeout: Duration::from_secs(parse_var("PONG_TIMEOUT_SECS", 60)?),
            event_workers: parse_positive("EVENT_WORKERS", defaults.event_workers)?,
            event_queue_capacity: parse_positive("EVENT_QUEUE_CAPACITY", defaults.event_queue_capacity)?,
        };

        if config.pong_timeout <= config.ping_interval {
            tracing::warn!(
                "[STARTUP] PONG_TIMEOUT_SECS ({:?}) is not longer than PING_INTERVAL_SECS ({:?})",
                config.pong_timeout,
                config.ping_interval
            );
        }
        Ok(config)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            queue_capacity: self.client_queue_capacity,
            ping_interval: self.ping_interval,
            pong_timeout: self.pong_timeout,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connect to Postgres and run migrations
///
/// Returns `Ok(None)` when `DATABASE_URL` is not configured.
pub async fn load_database(config: &ServerConfig) -> Result<Option<PgPool>, ConfigError> {
    let Some(url) = &config.database_url else {
        tracing::warn!("[STARTUP] DATABASE_URL not set, using in-memory stores");
        return Ok(None);
    };

    tracing::info!("[STARTUP] Connecting to database...");
    let pool = PgPoolOptions::new().max_connections(20).connect(url).await?;

    tracing::info!("[STARTUP] Running database migrations...");
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("[STARTUP] Database ready");

    Ok(Some(pool))
}
