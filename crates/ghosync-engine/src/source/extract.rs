//! Paginated extraction with per-page checkpointing.
//!
//! Pages are requested with OData `$skip`/`$top` parameters; the URL is
//! assembled by hand so the `$`-prefixed parameter names stay byte-exact.
//! After every successful page a `{page + 1}` checkpoint is persisted
//! best-effort; a failed page rewinds the checkpoint to itself and aborts
//! the whole extraction — no partial batch is ever returned.

use std::thread;

use serde_json::Value;

use ghosync_state::CheckpointStore;
use ghosync_types::checkpoint::ExtractionCheckpoint;
use ghosync_types::record::RawRecord;
use ghosync_types::state::{PipelineId, RunStatus};

use crate::checkpoint::persist_best_effort;
use crate::config::SourceConfig;
use crate::errors::PipelineError;
use crate::source::http::Fetch;

/// Drives repeated fetches and accumulates raw records.
pub struct Extractor<'a> {
    fetcher: &'a dyn Fetch,
    store: &'a dyn CheckpointStore,
    config: &'a SourceConfig,
    pipeline: &'a PipelineId,
}

impl<'a> Extractor<'a> {
    #[must_use]
    pub fn new(
        fetcher: &'a dyn Fetch,
        store: &'a dyn CheckpointStore,
        config: &'a SourceConfig,
        pipeline: &'a PipelineId,
    ) -> Self {
        Self {
            fetcher,
            store,
            config,
            pipeline,
        }
    }

    /// Page through the source API until a short page signals the end.
    ///
    /// A final page of exactly `page_size` records triggers one extra
    /// (empty) fetch; the API exposes no total count to terminate on, so
    /// the short-page rule stands as documented.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Extract`] when a page fetch fails after
    /// the fetcher's own retries; the failing page number has already
    /// been checkpointed with status `failed` by then.
    pub fn extract(
        &self,
        resume_from: Option<&ExtractionCheckpoint>,
    ) -> Result<Vec<RawRecord>, PipelineError> {
        let mut page = resume_from.map_or(0, |cp| cp.page);
        if page > 0 {
            tracing::info!(page, "resuming extraction from checkpoint");
        }

        let mut all_records = Vec::new();
        loop {
            let skip = page.saturating_mul(self.config.page_size);
            let url = format!(
                "{}?$skip={}&$top={}",
                self.config.base_url, skip, self.config.page_size
            );

            tracing::info!(page, skip, top = self.config.page_size, "fetching page");
            let body = match self.fetcher.fetch(&url) {
                Ok(body) => body,
                Err(source) => {
                    persist_best_effort(
                        self.store,
                        self.pipeline,
                        Some(&ExtractionCheckpoint::at_page(page)),
                        RunStatus::Failed,
                    );
                    return Err(PipelineError::Extract { page, source });
                }
            };

            let records = page_records(&body);
            let count = records.len() as u64;
            tracing::info!(page, records = count, "page retrieved");
            all_records.extend(records);

            persist_best_effort(
                self.store,
                self.pipeline,
                Some(&ExtractionCheckpoint::at_page(page + 1)),
                RunStatus::Running,
            );

            if count < self.config.page_size {
                tracing::info!(
                    page,
                    records = count,
                    total = all_records.len(),
                    "short page reached; extraction complete"
                );
                break;
            }

            page += 1;
            thread::sleep(self.config.page_delay);
        }

        Ok(all_records)
    }
}

/// Pull the raw records out of one page body.
///
/// The API wraps each page in `{"value": [...]}`. A missing or non-array
/// `value` counts as an empty page; non-object array entries are skipped
/// (nothing downstream could use them).
fn page_records(body: &Value) -> Vec<RawRecord> {
    let Some(items) = body.get("value").and_then(Value::as_array) else {
        tracing::warn!("page body has no 'value' array; treating as empty page");
        return Vec::new();
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match item {
            Value::Object(fields) => records.push(RawRecord::from(fields.clone())),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "ignored non-object entries in 'value' array");
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use ghosync_state::MemoryCheckpointStore;
    use serde_json::json;

    use crate::errors::FetchError;

    /// Fetcher that replays a scripted sequence of page bodies, recording
    /// every requested URL. `None` entries simulate a fetch failure.
    struct ScriptedFetch {
        pages: Mutex<Vec<Option<Value>>>,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedFetch {
        fn new(pages: Vec<Option<Value>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                urls: Mutex::new(Vec::new()),
            }
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    impl Fetch for ScriptedFetch {
        fn fetch(&self, url: &str) -> Result<Value, FetchError> {
            self.urls.lock().unwrap().push(url.to_owned());
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                panic!("fetch called more times than scripted");
            }
            match pages.remove(0) {
                Some(body) => Ok(body),
                None => Err(FetchError::RetriesExhausted {
                    url: url.to_owned(),
                    attempts: 3,
                    source: ureq::Error::StatusCode(503),
                }),
            }
        }
    }

    fn page_of(count: usize) -> Value {
        let items: Vec<Value> = (0..count)
            .map(|i| json!({"SpatialDim": format!("C{i}"), "TimeDim": 2000 + i, "NumericValue": 70.0}))
            .collect();
        json!({ "value": items })
    }

    fn config(page_size: u64) -> SourceConfig {
        SourceConfig {
            base_url: "http://api.test/WHOSIS_000001".into(),
            page_size,
            page_delay: Duration::ZERO,
            max_retries: 3,
            timeout: Duration::from_secs(5),
        }
    }

    fn pid() -> PipelineId {
        PipelineId::new("extract_test")
    }

    #[test]
    fn full_then_short_page_terminates_in_two_fetches() {
        let fetch = ScriptedFetch::new(vec![Some(page_of(100)), Some(page_of(30))]);
        let store = MemoryCheckpointStore::new();
        let config = config(100);
        let pipeline = pid();
        let extractor = Extractor::new(&fetch, &store, &config, &pipeline);

        let records = extractor.extract(None).unwrap();

        assert_eq!(records.len(), 130);
        assert_eq!(fetch.urls().len(), 2);
        assert!(fetch.urls()[0].ends_with("?$skip=0&$top=100"));
        assert!(fetch.urls()[1].ends_with("?$skip=100&$top=100"));
    }

    #[test]
    fn checkpoint_advances_past_each_fetched_page() {
        let fetch = ScriptedFetch::new(vec![Some(page_of(2)), Some(page_of(1))]);
        let store = MemoryCheckpointStore::new();
        let config = config(2);
        let pipeline = pid();
        let extractor = Extractor::new(&fetch, &store, &config, &pipeline);

        extractor.extract(None).unwrap();

        // Last write was {page: 2} after the terminal page.
        let state = store.run_state(&pipeline).unwrap().unwrap();
        assert_eq!(state.checkpoint, Some(ExtractionCheckpoint::at_page(2)));
        assert_eq!(state.status, RunStatus::Running);
    }

    #[test]
    fn resume_offsets_first_fetch_by_checkpoint_page() {
        let fetch = ScriptedFetch::new(vec![Some(page_of(50))]);
        let store = MemoryCheckpointStore::new();
        let config = config(100);
        let pipeline = pid();
        let extractor = Extractor::new(&fetch, &store, &config, &pipeline);

        extractor
            .extract(Some(&ExtractionCheckpoint::at_page(5)))
            .unwrap();

        assert!(fetch.urls()[0].contains("$skip=500"));
    }

    #[test]
    fn failed_page_is_checkpointed_as_itself() {
        let fetch = ScriptedFetch::new(vec![Some(page_of(2)), None]);
        let store = MemoryCheckpointStore::new();
        let config = config(2);
        let pipeline = pid();
        let extractor = Extractor::new(&fetch, &store, &config, &pipeline);

        let err = extractor.extract(None).unwrap_err();
        assert!(matches!(err, PipelineError::Extract { page: 1, .. }));

        let state = store.run_state(&pipeline).unwrap().unwrap();
        assert_eq!(state.checkpoint, Some(ExtractionCheckpoint::at_page(1)));
        assert_eq!(state.status, RunStatus::Failed);
    }

    #[test]
    fn empty_first_page_yields_no_records() {
        let fetch = ScriptedFetch::new(vec![Some(page_of(0))]);
        let store = MemoryCheckpointStore::new();
        let config = config(100);
        let pipeline = pid();
        let extractor = Extractor::new(&fetch, &store, &config, &pipeline);

        let records = extractor.extract(None).unwrap();
        assert!(records.is_empty());
        assert_eq!(fetch.urls().len(), 1);
    }

    #[test]
    fn body_without_value_array_counts_as_empty_page() {
        let fetch = ScriptedFetch::new(vec![Some(json!({"error": "odd shape"}))]);
        let store = MemoryCheckpointStore::new();
        let config = config(100);
        let pipeline = pid();
        let extractor = Extractor::new(&fetch, &store, &config, &pipeline);

        let records = extractor.extract(None).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let fetch = ScriptedFetch::new(vec![Some(json!({
            "value": [{"SpatialDim": "USA"}, 42, "junk"]
        }))]);
        let store = MemoryCheckpointStore::new();
        let config = config(100);
        let pipeline = pid();
        let extractor = Extractor::new(&fetch, &store, &config, &pipeline);

        let records = extractor.extract(None).unwrap();
        assert_eq!(records.len(), 1);
    }
}
