//! Pipeline identity and run-state model.
//!
//! Types describing a `pipeline_metadata` row. Storage backends handle
//! timestamp formatting; here they are plain ISO-8601 strings.

use serde::{Deserialize, Serialize};

use crate::checkpoint::ExtractionCheckpoint;

/// Opaque pipeline identifier, the primary key of `pipeline_metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineId(String);

impl PipelineId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for PipelineId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Where a pipeline run stands, as recorded in `pipeline_metadata.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Extraction in progress; the checkpoint marks the next page.
    Running,
    /// Last run finished and cleared its checkpoint.
    Completed,
    /// Last run died; the checkpoint (if any) is the resume point.
    Failed,
}

impl RunStatus {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// Snapshot of a `pipeline_metadata` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    /// Resume point, absent after a completed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<ExtractionCheckpoint>,
    /// Running total of records loaded across all runs.
    pub records_processed: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
