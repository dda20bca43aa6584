//! Service settings, read from the environment (and `.env` when present).
//!
//! | Variable            | Default | Meaning                                 |
//! |---------------------|---------|-----------------------------------------|
//! | `DATABASE_URL`      | unset   | Postgres URL; in-memory store if unset  |
//! | `NATS_URL`          | unset   | NATS server for domain events           |
//! | `PORT`              | `8083`  | HTTP listen port                        |
//! | `VARIANT_MAX_DEPTH` | `3`     | Nesting ceiling for variant trees       |

use thiserror::Error;
use crate::domain::value_objects::MaxDepth;

pub const DEFAULT_PORT: u16 = 8083;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub port: u16,
    pub max_depth: MaxDepth,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),
    #[error("VARIANT_MAX_DEPTH must be a positive integer, got {0:?}")]
    InvalidMaxDepth(String),
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let port = match non_empty("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };
        let max_depth = match non_empty("VARIANT_MAX_DEPTH") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|d| MaxDepth::new(d).ok())
                .ok_or(ConfigError::InvalidMaxDepth(raw))?,
            None => MaxDepth::default(),
        };
        Ok(Self { database_url: non_empty("DATABASE_URL"), nats_url: non_empty("NATS_URL"), port, max_depth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.port, DEFAULT_PORT);
        assert_eq!(s.max_depth, MaxDepth::default());
        assert!(s.database_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[("PORT", "9000"), ("VARIANT_MAX_DEPTH", "4"), ("DATABASE_URL", "postgres://db"), ("NATS_URL", " ")]).unwrap();
        assert_eq!(s.port, 9000);
        assert_eq!(s.max_depth.value(), 4);
        assert_eq!(s.database_url.as_deref(), Some("postgres://db"));
        assert!(s.nats_url.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(settings(&[("PORT", "http")]), Err(ConfigError::InvalidPort("http".into())));
        assert_eq!(settings(&[("VARIANT_MAX_DEPTH", "0")]), Err(ConfigError::InvalidMaxDepth("0".into())));
    }
}
