//! In-memory implementation of [`CheckpointStore`].
//!
//! Backs engine tests and dry runs where no database is available. State
//! lives in a `Mutex<HashMap>` keyed by pipeline name and dies with the
//! process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use ghosync_types::checkpoint::ExtractionCheckpoint;
use ghosync_types::state::{PipelineId, RunState, RunStatus};

use crate::backend::CheckpointStore;
use crate::error::{self, StateError};

/// Volatile checkpoint storage.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    rows: Mutex<HashMap<String, RunState>>,
}

impl MemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_rows(&self) -> error::Result<MutexGuard<'_, HashMap<String, RunState>>> {
        self.rows.lock().map_err(|_| StateError::LockPoisoned)
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get(&self, pipeline: &PipelineId) -> error::Result<Option<ExtractionCheckpoint>> {
        let rows = self.lock_rows()?;
        Ok(rows.get(pipeline.as_str()).and_then(|row| row.checkpoint))
    }

    fn save(
        &self,
        pipeline: &PipelineId,
        checkpoint: Option<&ExtractionCheckpoint>,
        status: RunStatus,
    ) -> error::Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut rows = self.lock_rows()?;
        let row = rows
            .entry(pipeline.as_str().to_owned())
            .or_insert_with(|| RunState {
                status,
                checkpoint: None,
                records_processed: 0,
                last_run_at: None,
                updated_at: None,
            });
        row.status = status;
        row.checkpoint = checkpoint.copied();
        row.last_run_at = Some(now.clone());
        row.updated_at = Some(now);
        Ok(())
    }

    fn run_state(&self, pipeline: &PipelineId) -> error::Result<Option<RunState>> {
        let rows = self.lock_rows()?;
        Ok(rows.get(pipeline.as_str()).cloned())
    }
}
