use std::str::FromStr;
use std::time::{Duration, SystemTime};

use crate::errors::ConfigError;
use crate::exchange::{DEFAULT_NOTE_TTL, MAX_NOTE_TTL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_pool_size: u32,
    pub cleanup_interval: Duration,
    pub note_ttl: Duration,
    pub rate_limit_replenish: Duration,
    pub rate_limit_burst: u32,
}

impl Config {
    /// Reads the process environment. Call `dotenv` first to pick up `.env`.
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let config = Config {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&var, "PORT", 8080)?,
            database_url: var("DATABASE_URL"),
            db_pool_size: parse(&var, "DB_POOL_SIZE", 10)?,
            cleanup_interval: Duration::from_secs(parse(&var, "CLEANUP_INTERVAL", 2700)?),
            note_ttl: Duration::from_secs(parse(&var, "NOTE_TTL_SECS", DEFAULT_NOTE_TTL.as_secs())?),
            rate_limit_replenish: Duration::from_millis(parse(&var, "RATE_LIMIT_REPLENISH_MS", 500)?),
            rate_limit_burst: parse(&var, "RATE_LIMIT_BURST", 120)?,
        };

        for (name, zero) in [
            ("DB_POOL_SIZE", config.db_pool_size == 0),
            ("CLEANUP_INTERVAL", config.cleanup_interval.is_zero()),
            ("NOTE_TTL_SECS", config.note_ttl.is_zero()),
            ("RATE_LIMIT_REPLENISH_MS", config.rate_limit_replenish.is_zero()),
            ("RATE_LIMIT_BURST", config.rate_limit_burst == 0),
        ] {
            if zero {
                return Err(ConfigError::Invalid {
                    var: name,
                    value: "0".to_string(),
                });
            }
        }

        if config.note_ttl > MAX_NOTE_TTL || SystemTime::now().checked_add(config.note_ttl).is_none() {
            return Err(ConfigError::Invalid {
                var: "NOTE_TTL_SECS",
                value: config.note_ttl.as_secs().to_string(),
            });
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var: name,
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, None);
        assert_eq!(config.cleanup_interval, Duration::from_secs(2700));
        assert_eq!(config.note_ttl, DEFAULT_NOTE_TTL);
        assert_eq!(config.rate_limit_burst, 120);
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/kieru"),
            ("NOTE_TTL_SECS", "60"),
            ("CLEANUP_INTERVAL", " 30 "),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/kieru"));
        assert_eq!(config.note_ttl, Duration::from_secs(60));
        assert_eq!(config.cleanup_interval, Duration::from_secs(30));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert_eq!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid {
                var: "PORT",
                value: "eighty".into()
            })
        );
        assert!(config(&[("CLEANUP_INTERVAL", "-5")]).is_err());
        assert!(config(&[("NOTE_TTL_SECS", "0")]).is_err());
    }

    #[test]
    fn unrepresentable_ttl_is_rejected() {
        let max = u64::MAX.to_string();
        assert_eq!(
            config(&[("NOTE_TTL_SECS", &max)]),
            Err(ConfigError::Invalid {
                var: "NOTE_TTL_SECS",
                value: max.clone(),
            })
        );

        let too_long = (MAX_NOTE_TTL.as_secs() + 1).to_string();
        assert!(config(&[("NOTE_TTL_SECS", &too_long)]).is_err());

        let longest = MAX_NOTE_TTL.as_secs().to_string();
        assert_eq!(config(&[("NOTE_TTL_SECS", &longest)]).unwrap().note_ttl, MAX_NOTE_TTL);
    }
}
