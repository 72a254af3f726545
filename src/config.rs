//! Process configuration read from the environment (and `.env` via dotenvy).

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://backpack.tf/api";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SYNC_PACING_MS: u64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub database_url: String,
    pub cors_origin: String,
    pub bind_addr: String,
    /// Delay between items during a catalog sync
    pub sync_pacing: Duration,
    /// Enables the in-server scheduled sync when set
    pub sync_interval: Option<Duration>,
    pub provider_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("BACKPACK_TF_API_KEY").ok_or(ConfigError::Missing("BACKPACK_TF_API_KEY"))?;

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => database_url_from_parts(&get)?,
        };

        let sync_pacing = match get("SYNC_PACING_MS") {
            Some(v) => Duration::from_millis(parse_number("SYNC_PACING_MS", &v)?),
            None => Duration::from_millis(DEFAULT_SYNC_PACING_MS),
        };

        let sync_interval = match get("SYNC_INTERVAL_SECS") {
            Some(v) => match parse_number::<u64>("SYNC_INTERVAL_SECS", &v)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        let provider_max_retries = match get("PROVIDER_MAX_RETRIES") {
            Some(v) => parse_number("PROVIDER_MAX_RETRIES", &v)?,
            None => 0,
        };

        Ok(Self {
            api_key,
            base_url: get("BACKPACK_TF_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            database_url,
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            sync_pacing,
            sync_interval,
            provider_max_retries,
        })
    }
}

fn database_url_from_parts<G>(get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let host = get("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL or DB_HOST"))?;
    let port = get("DB_PORT").unwrap_or_else(|| "5432".to_string());
    let user = get("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let password = get("DB_PASSWORD").unwrap_or_default();
    let name = get("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;

    parse_number::<u16>("DB_PORT", &port)?;

    let credentials = if password.is_empty() {
        user
    } else {
        format!("{}:{}", user, password)
    };

    Ok(format!("postgres://{}@{}:{}/{}", credentials, host, port, name))
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
