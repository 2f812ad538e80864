use anyhow::{Context, Result};

use ghosync_engine::config::PipelineConfig;
use ghosync_state::{CheckpointStore, PostgresCheckpointStore};

/// Execute the `status` command: print the pipeline's state row.
pub fn execute() -> Result<()> {
    let config =
        PipelineConfig::from_env().context("failed to load configuration from environment")?;
    let store = PostgresCheckpointStore::open(&config.database.client_config())
        .context("failed to open checkpoint store")?;

    match store.run_state(&config.pipeline)? {
        Some(state) => {
            println!("pipeline:          {}", config.pipeline);
            println!("status:            {}", state.status);
            match state.checkpoint {
                Some(cp) => println!("checkpoint:        page {}", cp.page),
                None => println!("checkpoint:        (none)"),
            }
            println!("records processed: {}", state.records_processed);
            if let Some(ts) = state.last_run_at {
                println!("last run at:       {ts}");
            }
            if let Some(ts) = state.updated_at {
                println!("updated at:        {ts}");
            }
        }
        None => println!("pipeline '{}' has no recorded runs", config.pipeline),
    }

    Ok(())
}
