//! PostgreSQL-backed implementation of [`CheckpointStore`].
//!
//! Uses the sync `postgres` crate with a single `Mutex<Client>` for
//! thread safety. The `postgres` crate manages its own internal tokio
//! runtime, so this works from any thread.

use std::sync::{Mutex, MutexGuard};

use postgres::{Client, NoTls};

use ghosync_types::checkpoint::ExtractionCheckpoint;
use ghosync_types::state::{PipelineId, RunState, RunStatus};

use crate::backend::CheckpointStore;
use crate::error::{self, StateError};

/// Idempotent DDL for the pipeline state table.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS pipeline_metadata (
    pipeline_name TEXT PRIMARY KEY,
    last_checkpoint JSONB,
    status TEXT NOT NULL DEFAULT 'running',
    records_processed BIGINT NOT NULL DEFAULT 0,
    last_run_at TIMESTAMPTZ,
    updated_at TIMESTAMPTZ
);
";

const SELECT_CHECKPOINT: &str =
    "SELECT last_checkpoint FROM pipeline_metadata WHERE pipeline_name = $1";

const UPSERT_STATE: &str = "INSERT INTO pipeline_metadata \
     (pipeline_name, last_checkpoint, status, last_run_at, updated_at) \
     VALUES ($1, $2, $3, now(), now()) \
     ON CONFLICT (pipeline_name) \
     DO UPDATE SET last_checkpoint = EXCLUDED.last_checkpoint, \
                   status = EXCLUDED.status, \
                   last_run_at = now(), \
                   updated_at = now()";

const SELECT_STATE: &str = "SELECT status, last_checkpoint, records_processed, \
     last_run_at::text, updated_at::text \
     FROM pipeline_metadata WHERE pipeline_name = $1";

/// PostgreSQL-backed checkpoint storage.
///
/// [`open`](PostgresCheckpointStore::open) connects and runs the
/// idempotent state-table DDL, so a fresh database works without a
/// separate bootstrap step.
pub struct PostgresCheckpointStore {
    client: Mutex<Client>,
}

impl PostgresCheckpointStore {
    /// Connect to PostgreSQL and initialize the state table.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Postgres`] if connection or DDL execution fails.
    pub fn open(config: &postgres::Config) -> error::Result<Self> {
        let mut client = config.connect(NoTls)?;
        client.batch_execute(CREATE_TABLES)?;
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    /// Acquire the client lock.
    fn lock_client(&self) -> error::Result<MutexGuard<'_, Client>> {
        self.client.lock().map_err(|_| StateError::LockPoisoned)
    }
}

impl CheckpointStore for PostgresCheckpointStore {
    fn get(&self, pipeline: &PipelineId) -> error::Result<Option<ExtractionCheckpoint>> {
        let mut client = self.lock_client()?;
        let rows = client.query(SELECT_CHECKPOINT, &[&pipeline.as_str()])?;

        match rows.first() {
            Some(row) => {
                let stored: Option<serde_json::Value> = row.get(0);
                match stored {
                    Some(value) => Ok(Some(serde_json::from_value(value)?)),
                    None => Ok(None),
                }
            }
            None => Ok(None),
        }
    }

    fn save(
        &self,
        pipeline: &PipelineId,
        checkpoint: Option<&ExtractionCheckpoint>,
        status: RunStatus,
    ) -> error::Result<()> {
        let payload: Option<serde_json::Value> =
            checkpoint.map(serde_json::to_value).transpose()?;
        let mut client = self.lock_client()?;
        client.execute(UPSERT_STATE, &[&pipeline.as_str(), &payload, &status.as_str()])?;
        Ok(())
    }

    fn run_state(&self, pipeline: &PipelineId) -> error::Result<Option<RunState>> {
        let mut client = self.lock_client()?;
        let rows = client.query(SELECT_STATE, &[&pipeline.as_str()])?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let status: String = row.get(0);
        let status = status.parse::<RunStatus>().map_err(StateError::Invalid)?;
        let checkpoint = row
            .get::<_, Option<serde_json::Value>>(1)
            .map(serde_json::from_value)
            .transpose()?;
        Ok(Some(RunState {
            status,
            checkpoint,
            records_processed: row.get(2),
            last_run_at: row.get(3),
            updated_at: row.get(4),
        }))
    }
}
