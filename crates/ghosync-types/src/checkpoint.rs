//! Extraction progress checkpoint.
//!
//! An [`ExtractionCheckpoint`] records how far pagination got so a failed
//! run can resume without refetching earlier pages. It is serialized as
//! JSON into the `last_checkpoint` column of `pipeline_metadata`; an
//! absent value means a fresh start.

use serde::{Deserialize, Serialize};

/// Progress marker persisted after each successfully fetched page.
///
/// `page` is the next page index to request: after page `n` succeeds the
/// checkpoint reads `n + 1`, and when a fetch of page `n` fails it is
/// rewound to `n` so the next run retries that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionCheckpoint {
    /// Zero-based page index to resume from.
    pub page: u64,
}

impl ExtractionCheckpoint {
    /// Checkpoint pointing at the given page.
    #[must_use]
    pub fn at_page(page: u64) -> Self {
        Self { page }
    }

    /// Record offset this checkpoint corresponds to for a given page size.
    #[must_use]
    pub fn offset(&self, page_size: u64) -> u64 {
        self.page.saturating_mul(page_size)
    }
}
