//! Environment-sourced pipeline configuration.
//!
//! Every option has a default, so `ghosync run` works out of the box
//! against a local database. Unparseable numeric values are configuration
//! errors, not silent fallbacks.

use std::time::Duration;

use ghosync_types::state::PipelineId;

use crate::errors::PipelineError;

/// Default source endpoint: the WHO GHO OData resource for the life
/// expectancy indicator.
pub const DEFAULT_API_URL: &str = "https://ghoapi.azureedge.net/api/WHOSIS_000001";

const DEFAULT_PIPELINE_NAME: &str = "who_life_expectancy";
const DEFAULT_PAGE_SIZE: u64 = 100;
const DEFAULT_PAGE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// PostgreSQL connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl DatabaseConfig {
    /// Build a `postgres` client config. The password is skipped when
    /// empty so trust/peer auth setups keep working.
    #[must_use]
    pub fn client_config(&self) -> postgres::Config {
        let mut pg = postgres::Config::new();
        pg.host(&self.host);
        pg.port(self.port);
        pg.user(&self.user);
        if !self.password.is_empty() {
            pg.password(&self.password);
        }
        pg.dbname(&self.dbname);
        pg
    }
}

/// Source API paging and retry settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// OData resource URL, queried with `$skip`/`$top` parameters.
    pub base_url: String,
    pub page_size: u64,
    /// Courtesy delay between consecutive page fetches.
    pub page_delay: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
}

/// Fully resolved pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pipeline: PipelineId,
    pub source: SourceConfig,
    pub database: DatabaseConfig,
}

impl PipelineConfig {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when a numeric variable does not
    /// parse.
    pub fn from_env() -> Result<Self, PipelineError> {
        Ok(Self {
            pipeline: PipelineId::new(env_or("PIPELINE_NAME", DEFAULT_PIPELINE_NAME)),
            source: SourceConfig {
                base_url: env_or("GHO_API_URL", DEFAULT_API_URL),
                page_size: env_parse("PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
                page_delay: Duration::from_millis(env_parse(
                    "PAGE_DELAY_MS",
                    DEFAULT_PAGE_DELAY_MS,
                )?),
                max_retries: env_parse("HTTP_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
                timeout: Duration::from_secs(env_parse(
                    "HTTP_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                )?),
            },
            database: DatabaseConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_parse("DB_PORT", 5432)?,
                dbname: env_or("DB_NAME", "who_health"),
                user: env_or("DB_USER", "postgres"),
                password: env_or("DB_PASSWORD", ""),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_parse<T>(key: &str, default: T) -> Result<T, PipelineError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err| PipelineError::Config(format!("{key}={raw}: {err}"))),
        Err(_) => Ok(default),
    }
}
