//! Destination side of the pipeline: batched upsert into the store.

pub mod postgres;

pub use postgres::PostgresLoader;

use ghosync_types::record::HealthRecord;

use crate::errors::PipelineError;

/// Sink for canonical records.
///
/// One `load` call is one atomic unit: either the whole batch lands (plus
/// the run-metadata bump) or none of it does.
pub trait Loader {
    /// Upsert the batch and return the number of records written.
    ///
    /// Empty input is a no-op returning 0.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Load`] after rolling back the entire
    /// batch.
    fn load(&mut self, records: &[HealthRecord]) -> Result<u64, PipelineError>;
}
