//! Checkpoint store trait definition.
//!
//! [`CheckpointStore`] defines the storage contract for pipeline progress
//! markers and run state. Model types live in [`ghosync_types::state`] and
//! [`ghosync_types::checkpoint`].

use ghosync_types::checkpoint::ExtractionCheckpoint;
use ghosync_types::state::{PipelineId, RunState, RunStatus};

use crate::error;

/// Storage contract for pipeline checkpoints.
///
/// Implementations must be `Send + Sync` so they can sit behind
/// `&dyn CheckpointStore` shared by the extractor and orchestrator.
///
/// Write failures are expected to be *swallowed by the caller*, not by the
/// implementation: checkpoint persistence is best-effort at the pipeline
/// level, but the store itself reports faithfully.
pub trait CheckpointStore: Send + Sync {
    /// Read the current checkpoint for a pipeline.
    ///
    /// Returns `Ok(None)` when no checkpoint has been persisted yet or the
    /// stored value was cleared by a completed run.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn get(&self, pipeline: &PipelineId) -> error::Result<Option<ExtractionCheckpoint>>;

    /// Upsert the checkpoint and status for a pipeline.
    ///
    /// A missing row is inserted; an existing row has its checkpoint,
    /// status, and timestamps overwritten. Passing `None` clears the
    /// stored checkpoint while still recording the status.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn save(
        &self,
        pipeline: &PipelineId,
        checkpoint: Option<&ExtractionCheckpoint>,
        status: RunStatus,
    ) -> error::Result<()>;

    /// Read the full state row for a pipeline, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn run_state(&self, pipeline: &PipelineId) -> error::Result<Option<RunState>>;
}
