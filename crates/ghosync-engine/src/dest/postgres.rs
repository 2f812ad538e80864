//! PostgreSQL loader: multi-value upsert plus run-metadata bump, one
//! transaction.
//!
//! The upsert keys on `(country_code, indicator_code, year)`; a conflict
//! overwrites only `value` and `fetched_at`, leaving other columns (like
//! a separately maintained `country_name`) untouched.

use std::fmt::Write as _;

use postgres::{Client, NoTls};

use ghosync_types::record::HealthRecord;
use ghosync_types::state::PipelineId;

use crate::config::DatabaseConfig;
use crate::dest::Loader;
use crate::errors::PipelineError;

/// Rows per multi-value INSERT statement. Six parameters per row keeps
/// this comfortably under the PG parameter limit.
const CHUNK_ROWS: usize = 1000;

const COLUMNS: &str =
    "country_code, indicator_code, indicator_name, year, value, source_url";

const UPSERT_CLAUSE: &str = " ON CONFLICT (country_code, indicator_code, year) \
     DO UPDATE SET value = EXCLUDED.value, fetched_at = now()";

const BUMP_METADATA: &str = "UPDATE pipeline_metadata \
     SET records_processed = records_processed + $1, updated_at = now() \
     WHERE pipeline_name = $2";

/// Idempotent DDL for the indicator table.
const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS health_indicators (
    country_code TEXT NOT NULL,
    indicator_code TEXT NOT NULL,
    indicator_name TEXT NOT NULL,
    year INTEGER NOT NULL,
    value DOUBLE PRECISION NOT NULL,
    source_url TEXT NOT NULL,
    country_name TEXT,
    fetched_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (country_code, indicator_code, year)
);
";

/// Production [`Loader`] backed by a sync PostgreSQL client.
pub struct PostgresLoader {
    client: Client,
    pipeline: PipelineId,
}

impl PostgresLoader {
    /// Connect and make sure the target table exists.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Load`] if connection or DDL fails.
    pub fn connect(
        config: &DatabaseConfig,
        pipeline: PipelineId,
    ) -> Result<Self, PipelineError> {
        let mut client = config.client_config().connect(NoTls)?;
        client.batch_execute(CREATE_TABLE)?;
        Ok(Self { client, pipeline })
    }

    /// Cheap connectivity probe for the `check` command.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Load`] if the round trip fails.
    pub fn validate(&mut self) -> Result<(), PipelineError> {
        self.client.query_one("SELECT 1", &[])?;
        Ok(())
    }
}

impl Loader for PostgresLoader {
    fn load(&mut self, records: &[HealthRecord]) -> Result<u64, PipelineError> {
        if records.is_empty() {
            tracing::info!("no records to load");
            return Ok(0);
        }

        let mut tx = self.client.transaction()?;
        let mut total: u64 = 0;

        for chunk in records.chunks(CHUNK_ROWS) {
            let mut sql = String::with_capacity(64 + chunk.len() * 30);
            let _ = write!(sql, "INSERT INTO health_indicators ({COLUMNS}) VALUES ");

            let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> =
                Vec::with_capacity(chunk.len() * 6);
            for (row, record) in chunk.iter().enumerate() {
                if row > 0 {
                    sql.push_str(", ");
                }
                let base = row * 6;
                let _ = write!(
                    sql,
                    "(${}, ${}, ${}, ${}, ${}, ${})",
                    base + 1,
                    base + 2,
                    base + 3,
                    base + 4,
                    base + 5,
                    base + 6
                );
                params.push(&record.country_code);
                params.push(&record.indicator_code);
                params.push(&record.indicator_name);
                params.push(&record.year);
                params.push(&record.value);
                params.push(&record.source_url);
            }
            sql.push_str(UPSERT_CLAUSE);

            tx.execute(sql.as_str(), &params)?;
            total += chunk.len() as u64;
        }

        tx.execute(BUMP_METADATA, &[&(total as i64), &self.pipeline.as_str()])?;
        tx.commit()?;

        tracing::info!(records = total, "load committed");
        Ok(total)
    }
}
