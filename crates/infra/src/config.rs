//! Runtime configuration, read from the environment.
//!
//! | Variable | Default | |
//! |----------|---------|-|
//! | `DATABASE_URL` | unset | Postgres when set, in-memory otherwise |
//! | `DATABASE_MAX_CONNECTIONS` | `5` | pool size |
//! | `RUST_LOG` | `info` | `EnvFilter` directives |
//! | `LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `ALMOX_REJECT_COMPLETED` | `true` | allow rejecting completed purchases |
//!
//! A `.env` file in the working directory is loaded first when present.

use thiserror::Error;

use almox_observability::{LogConfig, LogFormat};
use almox_purchasing::RejectionPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `None` selects the in-memory backend.
    pub database: Option<DatabaseConfig>,
    pub log: LogConfig,
    pub rejection_policy: RejectionPolicy,
}

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

impl AppConfig {
    /// Load from the process environment (after an optional `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is the normal case outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        "DATABASE_MAX_CONNECTIONS",
                        &raw,
                        "must be positive",
                    ));
                }
                Ok(n) => n,
                Err(e) => return Err(ConfigError::invalid("DATABASE_MAX_CONNECTIONS", &raw, e)),
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let database = get("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections,
        });

        let format = match get("LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid("LOG_FORMAT", &raw, e))?,
            None => LogFormat::default(),
        };
        let log = LogConfig {
            filter: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            format,
        };

        let rejection_policy = match get("ALMOX_REJECT_COMPLETED") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => RejectionPolicy::AnyState,
                "false" | "0" | "no" => RejectionPolicy::OpenOnly,
                _ => {
                    return Err(ConfigError::invalid(
                        "ALMOX_REJECT_COMPLETED",
                        &raw,
                        "expected true or false",
                    ));
                }
            },
            None => RejectionPolicy::default(),
        };

        Ok(Self {
            database,
            log,
            rejection_policy,
        })
    }
}
