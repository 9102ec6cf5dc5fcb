//! Environment configuration for the server.

use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use chrono::{Duration, FixedOffset, Offset, Utc};
use tracing::{info, warn};

use crate::database::db::DEFAULT_DATABASE_PATH;
use crate::error::{Error, Result};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:5000";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub token_secret: Vec<u8>,
    /// Lifetime of the token handed out on registration.
    pub register_token_ttl: Duration,
    /// Lifetime of the token handed out on login.
    pub login_token_ttl: Duration,
    pub allowed_origins: Vec<String>,
    /// Offset used to decide where a calendar day starts for statistics.
    pub day_offset: FixedOffset,
    /// Built frontend served for any path the API does not handle.
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let utc_offset_minutes: i32 = try_load("UTC_OFFSET_MINUTES", "0")?;
        let day_offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!("UTC_OFFSET_MINUTES out of range: {utc_offset_minutes}"))
        })?;

        let allowed_origins: String = try_load("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)?;

        Ok(Self {
            port: try_load("PORT", "5000")?,
            database_path: try_load("DATABASE_PATH", DEFAULT_DATABASE_PATH)?,
            token_secret: load_secret("JWT_KEY")?.into_bytes(),
            register_token_ttl: Duration::hours(try_load("REGISTER_TOKEN_TTL_HOURS", "1")?),
            login_token_ttl: Duration::hours(try_load("LOGIN_TOKEN_TTL_HOURS", "168")?),
            allowed_origins: split_list(&allowed_origins),
            day_offset,
            static_dir: var("STATIC_DIR").ok().map(PathBuf::from),
        })
    }

    /// Local settings with the given secret, used by tests and tooling.
    pub fn with_secret(secret: &str) -> Self {
        Self {
            port: 5000,
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            token_secret: secret.as_bytes().to_vec(),
            register_token_ttl: Duration::hours(1),
            login_token_ttl: Duration::days(7),
            allowed_origins: split_list(DEFAULT_ALLOWED_ORIGINS),
            day_offset: Utc.fix(),
            static_dir: None,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn var(key: &str) -> std::result::Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found");
    })
}

pub fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            Error::Config(format!("invalid {key}: {e}"))
        })
}

/// Reads a secret from the environment, falling back to a Docker secret file.
fn load_secret(secret_name: &str) -> Result<String> {
    if let Ok(value) = var(secret_name) {
        return Ok(value);
    }

    let path = format!("/run/secrets/{secret_name}");
    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
            Error::Config(format!("{secret_name} is not set"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" http://a.test , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_with_secret_defaults() {
        let config = Config::with_secret("s3cret");
        assert_eq!(config.token_secret, b"s3cret");
        assert_eq!(config.login_token_ttl, Duration::days(7));
        assert_eq!(config.day_offset.local_minus_utc(), 0);
    }
}
