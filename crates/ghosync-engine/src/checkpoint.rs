//! Best-effort checkpoint persistence.
//!
//! Checkpoint writes must never take down a run: a lost checkpoint costs
//! at most some refetched pages on the next run, while a propagated write
//! failure would cost the whole batch. Write failures are therefore
//! logged and swallowed here. Reads are *not* wrapped — a store that
//! cannot be read is a real fault.

use ghosync_state::CheckpointStore;
use ghosync_types::checkpoint::ExtractionCheckpoint;
use ghosync_types::state::{PipelineId, RunStatus};

/// Persist a checkpoint, logging instead of propagating on failure.
pub(crate) fn persist_best_effort(
    store: &dyn CheckpointStore,
    pipeline: &PipelineId,
    checkpoint: Option<&ExtractionCheckpoint>,
    status: RunStatus,
) {
    if let Err(err) = store.save(pipeline, checkpoint, status) {
        tracing::warn!(
            pipeline = pipeline.as_str(),
            status = status.as_str(),
            error = %err,
            "checkpoint write failed; continuing without it"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghosync_state::{MemoryCheckpointStore, StateError};

    /// Store whose writes always fail.
    struct BrokenStore;

    impl CheckpointStore for BrokenStore {
        fn get(
            &self,
            _pipeline: &PipelineId,
        ) -> ghosync_state::Result<Option<ExtractionCheckpoint>> {
            Ok(None)
        }

        fn save(
            &self,
            _pipeline: &PipelineId,
            _checkpoint: Option<&ExtractionCheckpoint>,
            _status: RunStatus,
        ) -> ghosync_state::Result<()> {
            Err(StateError::LockPoisoned)
        }

        fn run_state(
            &self,
            _pipeline: &PipelineId,
        ) -> ghosync_state::Result<Option<ghosync_types::state::RunState>> {
            Ok(None)
        }
    }

    #[test]
    fn write_failure_is_swallowed() {
        let pid = PipelineId::new("best_effort");
        // Must not panic or return anything.
        persist_best_effort(
            &BrokenStore,
            &pid,
            Some(&ExtractionCheckpoint::at_page(1)),
            RunStatus::Running,
        );
    }

    #[test]
    fn successful_write_lands_in_store() {
        let store = MemoryCheckpointStore::new();
        let pid = PipelineId::new("best_effort_ok");
        persist_best_effort(
            &store,
            &pid,
            Some(&ExtractionCheckpoint::at_page(2)),
            RunStatus::Running,
        );
        assert_eq!(
            store.get(&pid).unwrap(),
            Some(ExtractionCheckpoint::at_page(2))
        );
    }
}
