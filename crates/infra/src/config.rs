//! Process configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which storage backend the process wires up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: Backend,
    pub bind_addr: SocketAddr,
}

impl Settings {
    /// Read `USE_PERSISTENT_STORES`, `DATABASE_URL`, `DB_MAX_CONNECTIONS` and
    /// `BIND_ADDR` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let use_persistent = match lookup("USE_PERSISTENT_STORES") {
            Some(raw) => raw.trim().parse::<bool>().map_err(|e| ConfigError::Invalid {
                key: "USE_PERSISTENT_STORES",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => false,
        };

        let backend = if use_persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .ok_or(ConfigError::MissingDatabaseUrl)?;
            let max_connections = match lookup("DB_MAX_CONNECTIONS") {
                Some(raw) => match raw.trim().parse::<u32>() {
                    Ok(0) => {
                        return Err(ConfigError::Invalid {
                            key: "DB_MAX_CONNECTIONS",
                            value: raw,
                            reason: "must be at least 1".to_string(),
                        });
                    }
                    Ok(n) => n,
                    Err(e) => {
                        return Err(ConfigError::Invalid {
                            key: "DB_MAX_CONNECTIONS",
                            value: raw,
                            reason: e.to_string(),
                        });
                    }
                },
                None => DEFAULT_MAX_CONNECTIONS,
            };
            Backend::Postgres {
                database_url,
                max_connections,
            }
        } else {
            Backend::InMemory
        };

        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw_addr.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { backend, bind_addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.backend, Backend::InMemory);
        assert_eq!(s.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
    }

    #[test]
    fn persistent_requires_database_url() {
        assert_eq!(
            settings(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::MissingDatabaseUrl
        );
    }

    #[test]
    fn persistent_backend_reads_pool_size() {
        let s = settings(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/storefront"),
            ("DB_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(
            s.backend,
            Backend::Postgres {
                database_url: "postgres://localhost/storefront".to_string(),
                max_connections: 4,
            }
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            settings(&[("USE_PERSISTENT_STORES", "yes")]),
            Err(ConfigError::Invalid { key: "USE_PERSISTENT_STORES", .. })
        ));
        assert!(matches!(
            settings(&[
                ("USE_PERSISTENT_STORES", "true"),
                ("DATABASE_URL", "postgres://x"),
                ("DB_MAX_CONNECTIONS", "0"),
            ]),
            Err(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. })
        ));
        assert!(matches!(
            settings(&[("BIND_ADDR", "localhost")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
    }
}
