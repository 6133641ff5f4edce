//! Service configuration loaded from environment variables.
//!
//! - `DATABASE_URL` - PostgreSQL connection string; in-memory store when unset
//! - `NATS_URL` - event broker; events are dropped when unset
//! - `PORT` - listen port (default: 8083)
//! - `CART_DIR` - directory for persisted carts (default: ./data/carts)
//! - `SESSION_TTL_MINUTES` - admin session lifetime (default: 720)
//! - `SHOP_CURRENCY` - currency code for all prices (default: ILS)
//! - `ADMIN_USERNAME` / `ADMIN_PASSWORD` - bootstrap admin created at startup if missing

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("{0} is set but {1} is not")]
    Incomplete(&'static str, &'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub port: u16,
    pub cart_dir: PathBuf,
    pub session_ttl_minutes: i64,
    pub currency: String,
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let port = parse_or(&non_empty, "PORT", 8083u16)?;
        let session_ttl_minutes = parse_or(&non_empty, "SESSION_TTL_MINUTES", 720i64)?;
        if session_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar("SESSION_TTL_MINUTES".into(), "must be positive".into()));
        }
        let bootstrap_admin = match (non_empty("ADMIN_USERNAME"), non_empty("ADMIN_PASSWORD")) {
            (Some(u), Some(p)) => Some((u, p)),
            (Some(_), None) => return Err(ConfigError::Incomplete("ADMIN_USERNAME", "ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("ADMIN_PASSWORD", "ADMIN_USERNAME")),
            (None, None) => None,
        };
        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            nats_url: non_empty("NATS_URL"),
            port,
            cart_dir: non_empty("CART_DIR").map_or_else(|| PathBuf::from("./data/carts"), PathBuf::from),
            session_ttl_minutes,
            currency: non_empty("SHOP_CURRENCY").unwrap_or_else(|| "ILS".to_string()),
            bootstrap_admin,
        })
    }
}

fn parse_or<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 8083);
        assert_eq!(c.currency, "ILS");
        assert_eq!(c.session_ttl_minutes, 720);
        assert!(c.database_url.is_none());
        assert!(c.bootstrap_admin.is_none());
    }

    #[test]
    fn test_overrides_and_errors() {
        let c = config(&[("PORT", "9000"), ("DATABASE_URL", "postgres://x"), ("ADMIN_USERNAME", "a"), ("ADMIN_PASSWORD", "b")]).unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.database_url.as_deref(), Some("postgres://x"));
        assert_eq!(c.bootstrap_admin, Some(("a".into(), "b".into())));

        assert!(matches!(config(&[("PORT", "http")]), Err(ConfigError::InvalidEnvVar(..))));
        assert!(matches!(config(&[("SESSION_TTL_MINUTES", "0")]), Err(ConfigError::InvalidEnvVar(..))));
        assert!(matches!(config(&[("ADMIN_USERNAME", "a")]), Err(ConfigError::Incomplete(..))));
    }
}
