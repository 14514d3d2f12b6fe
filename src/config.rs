use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};
use tracing::info;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("jwt_secret", &"[redacted]")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

impl Config {
    /// Reads the environment, after loading `.env` if one exists.
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let jwt_secret = dotenv::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            return Err(anyhow!("JWT_SECRET must not be empty"));
        }

        Ok(Self {
            port: try_load("PORT", "5000")?,
            database_url: try_load("DATABASE_URL", "sqlite://labmarket.db?mode=rwc")?,
            db_max_connections: positive("DB_MAX_CONNECTIONS", try_load("DB_MAX_CONNECTIONS", "16")?)?,
            jwt_secret,
            token_ttl_hours: positive("TOKEN_TTL_HOURS", try_load("TOKEN_TTL_HOURS", "24")?)?,
        })
    }
}

fn positive<T: PartialOrd + Default + Display>(key: &str, value: T) -> anyhow::Result<T> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(anyhow!("{key} must be greater than zero, got {value}"))
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    raw.parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}
