//! Pipeline error model.
//!
//! Only two failures are fatal to a run: an extraction that exhausted its
//! retries and a load whose transaction rolled back. Both are recorded as
//! a `failed` checkpoint before propagating. Checkpoint *writes* are
//! best-effort and never surface here (see [`crate::checkpoint`]); a
//! rejected transform batch is an empty result, not an error.

/// A single fetch operation that could not produce a JSON body.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport or HTTP-status failure that survived every retry.
    #[error("GET {url} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: ureq::Error,
    },

    /// Successful response whose body is not valid JSON. Never retried:
    /// the server answered, it just answered garbage.
    #[error("GET {url} returned a body that is not valid JSON: {source}")]
    MalformedBody {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal pipeline failure, reported to the caller after the failed
/// checkpoint has been written.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Environment-sourced configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Pagination died at `page`; the checkpoint points there for resume.
    #[error("extraction failed at page {page}: {source}")]
    Extract {
        page: u64,
        #[source]
        source: FetchError,
    },

    /// Database failure during connect, upsert, or metadata update. The
    /// load transaction was rolled back in full.
    #[error("database load failed: {0}")]
    Load(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Checkpoint store failure while reading the resume point.
    #[error("checkpoint store failed: {0}")]
    State(#[from] ghosync_state::StateError),
}

impl From<postgres::Error> for PipelineError {
    fn from(err: postgres::Error) -> Self {
        Self::Load(Box::new(err))
    }
}
