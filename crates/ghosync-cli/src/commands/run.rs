use anyhow::{Context, Result};

use ghosync_engine::config::PipelineConfig;
use ghosync_engine::dest::PostgresLoader;
use ghosync_engine::runner;
use ghosync_engine::source::HttpFetcher;
use ghosync_state::PostgresCheckpointStore;

/// Execute the `run` command: one full pipeline run.
pub fn execute() -> Result<()> {
    let config =
        PipelineConfig::from_env().context("failed to load configuration from environment")?;

    tracing::info!(
        pipeline = config.pipeline.as_str(),
        source = config.source.base_url.as_str(),
        page_size = config.source.page_size,
        "pipeline configured"
    );

    let store = PostgresCheckpointStore::open(&config.database.client_config())
        .context("failed to open checkpoint store")?;
    let fetcher = HttpFetcher::new(config.source.max_retries, config.source.timeout);
    let mut loader = PostgresLoader::connect(&config.database, config.pipeline.clone())
        .context("failed to connect loader to PostgreSQL")?;

    let summary = runner::run_pipeline(&config, &fetcher, &store, &mut loader)?;

    println!("Pipeline '{}' completed successfully.", config.pipeline);
    println!("  Records fetched: {}", summary.records_fetched);
    println!("  Records clean:   {}", summary.records_clean);
    println!("  Records loaded:  {}", summary.records_loaded);
    println!("  Duration:        {:.2}s", summary.duration_secs);

    Ok(())
}
