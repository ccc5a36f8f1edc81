use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Which repository backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => bail!("STORE must be 'postgres' or 'memory', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    /// Required only for the Postgres store.
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub auth_url: String,
    pub auth_anon_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store: StoreKind = optional_env("STORE")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let database_url = match store {
            StoreKind::Postgres => Some(require_env("DATABASE_URL")?),
            StoreKind::Memory => optional_env("DATABASE_URL"),
        };

        Ok(Config {
            store,
            database_url,
            run_migrations: optional_env("RUN_MIGRATIONS")
                .map(|v| parse_bool(&v))
                .transpose()
                .context("RUN_MIGRATIONS must be true or false")?
                .unwrap_or(false),
            auth_url: require_env("AUTH_URL")?,
            auth_anon_key: require_env("AUTH_ANON_KEY")?,
            port: optional_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("not a boolean: '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_parsing() {
        assert_eq!("postgres".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert_eq!(" Memory ".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("sqlite".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
