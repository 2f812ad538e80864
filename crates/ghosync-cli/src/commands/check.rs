use anyhow::{bail, Context, Result};

use ghosync_engine::config::PipelineConfig;
use ghosync_engine::dest::PostgresLoader;
use ghosync_engine::source::{Fetch, HttpFetcher};
use ghosync_state::PostgresCheckpointStore;

/// Execute the `check` command: probe the database and the source API.
pub fn execute() -> Result<()> {
    let config =
        PipelineConfig::from_env().context("failed to load configuration from environment")?;
    let mut failed = false;

    match check_database(&config) {
        Ok(()) => println!(
            "database:   ok ({}:{}/{})",
            config.database.host, config.database.port, config.database.dbname
        ),
        Err(err) => {
            println!("database:   FAILED ({err:#})");
            failed = true;
        }
    }

    match check_source(&config) {
        Ok(records) => println!(
            "source api: ok ({} record(s) in probe page from {})",
            records, config.source.base_url
        ),
        Err(err) => {
            println!("source api: FAILED ({err:#})");
            failed = true;
        }
    }

    if failed {
        bail!("one or more connectivity checks failed");
    }
    Ok(())
}

fn check_database(config: &PipelineConfig) -> Result<()> {
    // Opening the store also exercises DDL, so missing privileges show up
    // here instead of mid-run.
    PostgresCheckpointStore::open(&config.database.client_config())?;
    let mut loader = PostgresLoader::connect(&config.database, config.pipeline.clone())?;
    loader.validate()?;
    Ok(())
}

fn check_source(config: &PipelineConfig) -> Result<usize> {
    // Single attempt, no retries: a probe reports flakiness, it does not
    // ride it out.
    let fetcher = HttpFetcher::new(1, config.source.timeout);
    let url = format!("{}?$skip=0&$top=1", config.source.base_url);
    let body = fetcher.fetch(&url)?;
    Ok(body
        .get("value")
        .and_then(|v| v.as_array())
        .map_or(0, Vec::len))
}
