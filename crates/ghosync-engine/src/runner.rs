//! Pipeline orchestration.
//!
//! Sequences checkpoint lookup → extract → transform → load. On a step
//! failure the checkpoint known at entry is re-persisted with status
//! `failed` before the error propagates; process-level reporting is the
//! caller's concern.

use std::time::Instant;

use ghosync_state::CheckpointStore;
use ghosync_types::state::RunStatus;

use crate::checkpoint::persist_best_effort;
use crate::config::PipelineConfig;
use crate::dest::Loader;
use crate::errors::PipelineError;
use crate::source::{Extractor, Fetch};
use crate::transform::{transform, TransformStats};

/// What one pipeline run accomplished.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub records_fetched: usize,
    pub records_clean: usize,
    pub records_loaded: u64,
    pub duration_secs: f64,
    pub stats: TransformStats,
}

/// Execute one full pipeline run.
///
/// # Errors
///
/// Returns [`PipelineError`] from the first failing step, after the
/// entry checkpoint has been re-persisted with status `failed`. Note the
/// extractor additionally persists its own, more precise `{page}`
/// checkpoint on the way out; the later write with the entry checkpoint
/// mirrors the pipeline's historical behavior and is kept as documented.
pub fn run_pipeline(
    config: &PipelineConfig,
    fetcher: &dyn Fetch,
    store: &dyn CheckpointStore,
    loader: &mut dyn Loader,
) -> Result<RunSummary, PipelineError> {
    let started = Instant::now();
    let pipeline = &config.pipeline;

    let entry_checkpoint = store.get(pipeline)?;
    match &entry_checkpoint {
        Some(cp) => tracing::info!(
            pipeline = pipeline.as_str(),
            page = cp.page,
            "found checkpoint; resuming"
        ),
        None => tracing::info!(pipeline = pipeline.as_str(), "no checkpoint; starting fresh"),
    }

    let extractor = Extractor::new(fetcher, store, &config.source, pipeline);
    let raw = match extractor.extract(entry_checkpoint.as_ref()) {
        Ok(records) => records,
        Err(err) => {
            persist_best_effort(store, pipeline, entry_checkpoint.as_ref(), RunStatus::Failed);
            return Err(err);
        }
    };
    tracing::info!(records = raw.len(), "extraction complete");

    let output = transform(&raw);
    log_transform_stats(&output.stats);

    let loaded = match loader.load(&output.records) {
        Ok(count) => count,
        Err(err) => {
            persist_best_effort(store, pipeline, entry_checkpoint.as_ref(), RunStatus::Failed);
            return Err(err);
        }
    };

    persist_best_effort(store, pipeline, None, RunStatus::Completed);

    Ok(RunSummary {
        records_fetched: raw.len(),
        records_clean: output.records.len(),
        records_loaded: loaded,
        duration_secs: started.elapsed().as_secs_f64(),
        stats: output.stats,
    })
}

fn log_transform_stats(stats: &TransformStats) {
    if !stats.missing_columns.is_empty() {
        tracing::warn!(
            missing = ?stats.missing_columns,
            input = stats.input,
            "batch rejected: required columns structurally absent"
        );
        return;
    }
    tracing::info!(
        input = stats.input,
        dropped_null = stats.dropped_null,
        dropped_coercion = stats.dropped_coercion,
        dropped_year_range = stats.dropped_year_range,
        dropped_negative = stats.dropped_negative,
        dropped_duplicate = stats.dropped_duplicate,
        with_dimension = stats.with_dimension,
        output = stats.output,
        "transform complete"
    );
}
