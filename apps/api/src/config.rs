use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub crm: CrmConfig,
    pub sync: SyncSettings,
    pub port: u16,
    pub rust_log: String,
}

/// Connection settings for the external CRM.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Upper bound for a single RPC round trip.
    pub rpc_timeout: Duration,
}

/// Knobs for the batch synchronization pass.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub batch_size: usize,
    pub batch_deadline: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            batch_deadline: Duration::from_secs(300),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = SyncSettings::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            crm: CrmConfig {
                url: require_env("CRM_URL")?,
                database: require_env("CRM_DATABASE")?,
                username: require_env("CRM_USERNAME")?,
                password: require_env("CRM_PASSWORD")?,
                rpc_timeout: Duration::from_secs(parse_env("CRM_RPC_TIMEOUT_SECS", 30)?),
            },
            sync: SyncSettings {
                batch_size: parse_env("CRM_SYNC_BATCH_SIZE", defaults.batch_size)?.max(1),
                batch_deadline: Duration::from_secs(parse_env(
                    "CRM_BATCH_DEADLINE_SECS",
                    defaults.batch_deadline.as_secs(),
                )?),
            },
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
