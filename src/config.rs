use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub path: PathBuf,
    /// Maximum number of entries returned by one listing call.
    pub list_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source; `from_env` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "8787");
        let list_limit = var("LIST_LIMIT", "1000");

        let config = Config {
            server: ServerConfig {
                host: var("HOST", "0.0.0.0"),
                port: port
                    .parse()
                    .with_context(|| format!("PORT must be a port number, got {:?}", port))?,
            },
            storage: StorageConfig {
                path: PathBuf::from(var("STORAGE_PATH", "./bucket")),
                list_limit: list_limit.parse().with_context(|| {
                    format!("LIST_LIMIT must be a positive integer, got {:?}", list_limit)
                })?,
            },
        };

        if config.storage.list_limit == 0 {
            bail!("LIST_LIMIT must be at least 1");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.storage.path, PathBuf::from("./bucket"));
        assert_eq!(config.storage.list_limit, 1000);
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("STORAGE_PATH", "/srv/objects"),
            ("LIST_LIMIT", "50"),
        ]))
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.path, PathBuf::from("/srv/objects"));
        assert_eq!(config.storage.list_limit, 50);
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("LIST_LIMIT", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("LIST_LIMIT", "-3")])).is_err());
    }
}
