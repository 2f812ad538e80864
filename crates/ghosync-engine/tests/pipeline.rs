//! End-to-end pipeline runs against scripted collaborators: a canned-page
//! fetcher, the in-memory checkpoint store, and a vec-collecting loader.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use ghosync_engine::config::{DatabaseConfig, PipelineConfig, SourceConfig};
use ghosync_engine::dest::Loader;
use ghosync_engine::errors::{FetchError, PipelineError};
use ghosync_engine::runner::run_pipeline;
use ghosync_engine::source::Fetch;
use ghosync_state::{CheckpointStore, MemoryCheckpointStore};
use ghosync_types::checkpoint::ExtractionCheckpoint;
use ghosync_types::record::HealthRecord;
use ghosync_types::state::{PipelineId, RunStatus};

/// Replays scripted page bodies in order; `None` simulates a fetch whose
/// retries are exhausted.
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
        assert!(!pages.is_empty(), "fetch called more times than scripted");
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

/// Loader that collects batches in memory; optionally fails every call.
#[derive(Default)]
struct CollectingLoader {
    batches: Vec<Vec<HealthRecord>>,
    fail: bool,
}

impl Loader for CollectingLoader {
    fn load(&mut self, records: &[HealthRecord]) -> Result<u64, PipelineError> {
        if self.fail {
            return Err(PipelineError::Load("injected load failure".into()));
        }
        self.batches.push(records.to_vec());
        Ok(records.len() as u64)
    }
}

fn page_of(count: usize, start_year: i32) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "SpatialDim": format!("C{i:03}"),
                "TimeDim": start_year,
                "NumericValue": 60.0 + (i as f64) / 10.0,
            })
        })
        .collect();
    json!({ "value": items })
}

fn config(name: &str, page_size: u64) -> PipelineConfig {
    PipelineConfig {
        pipeline: PipelineId::new(name),
        source: SourceConfig {
            base_url: "http://api.test/WHOSIS_000001".into(),
            page_size,
            page_delay: Duration::ZERO,
            max_retries: 3,
            timeout: Duration::from_secs(5),
        },
        database: DatabaseConfig {
            host: "localhost".into(),
            port: 5432,
            dbname: "unused".into(),
            user: "unused".into(),
            password: String::new(),
        },
    }
}

#[test]
fn happy_path_loads_and_clears_checkpoint() {
    let config = config("happy_path", 100);
    let fetch = ScriptedFetch::new(vec![Some(page_of(100, 2019)), Some(page_of(30, 2020))]);
    let store = MemoryCheckpointStore::new();
    let mut loader = CollectingLoader::default();

    let summary = run_pipeline(&config, &fetch, &store, &mut loader).unwrap();

    assert_eq!(summary.records_fetched, 130);
    assert_eq!(fetch.urls().len(), 2);
    // Page 1 repeats country codes from page 0 at a different year, so no
    // dedup kicks in; page 1's 30 records share year 2020 with distinct
    // countries.
    assert_eq!(summary.records_clean, 130);
    assert_eq!(summary.records_loaded, 130);
    assert_eq!(loader.batches.len(), 1);

    let state = store.run_state(&config.pipeline).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert!(state.checkpoint.is_none());
}

#[test]
fn two_pages_make_exactly_two_fetches() {
    let config = config("two_pages", 100);
    let fetch = ScriptedFetch::new(vec![Some(page_of(100, 2019)), Some(page_of(30, 2020))]);
    let store = MemoryCheckpointStore::new();
    let mut loader = CollectingLoader::default();

    let summary = run_pipeline(&config, &fetch, &store, &mut loader).unwrap();

    assert_eq!(summary.records_fetched, 130);
    let urls = fetch.urls();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("?$skip=0&$top=100"));
    assert!(urls[1].ends_with("?$skip=100&$top=100"));
}

#[test]
fn resume_from_saved_checkpoint_offsets_first_fetch() {
    let config = config("resume", 100);
    let store = MemoryCheckpointStore::new();
    store
        .save(
            &config.pipeline,
            Some(&ExtractionCheckpoint::at_page(5)),
            RunStatus::Failed,
        )
        .unwrap();

    let fetch = ScriptedFetch::new(vec![Some(page_of(10, 2020))]);
    let mut loader = CollectingLoader::default();

    run_pipeline(&config, &fetch, &store, &mut loader).unwrap();

    assert!(fetch.urls()[0].contains("$skip=500"));
    let state = store.run_state(&config.pipeline).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert!(state.checkpoint.is_none());
}

#[test]
fn extraction_failure_restores_entry_checkpoint() {
    let config = config("extract_fail", 100);
    let store = MemoryCheckpointStore::new();
    store
        .save(
            &config.pipeline,
            Some(&ExtractionCheckpoint::at_page(2)),
            RunStatus::Failed,
        )
        .unwrap();

    // Page 2 succeeds, page 3 dies.
    let fetch = ScriptedFetch::new(vec![Some(page_of(100, 2020)), None]);
    let mut loader = CollectingLoader::default();

    let err = run_pipeline(&config, &fetch, &store, &mut loader).unwrap_err();
    assert!(matches!(err, PipelineError::Extract { page: 3, .. }));
    assert!(loader.batches.is_empty(), "no partial batch may reach the loader");

    // The orchestrator re-persists the checkpoint it read at entry.
    let state = store.run_state(&config.pipeline).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.checkpoint, Some(ExtractionCheckpoint::at_page(2)));
}

#[test]
fn fresh_start_extraction_failure_leaves_no_checkpoint() {
    let config = config("fresh_fail", 100);
    let store = MemoryCheckpointStore::new();
    let fetch = ScriptedFetch::new(vec![None]);
    let mut loader = CollectingLoader::default();

    let err = run_pipeline(&config, &fetch, &store, &mut loader).unwrap_err();
    assert!(matches!(err, PipelineError::Extract { page: 0, .. }));

    // The extractor wrote {page: 0}, then the orchestrator overwrote it
    // with the entry state (none). Historical behavior, kept as is.
    let state = store.run_state(&config.pipeline).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert!(state.checkpoint.is_none());
}

#[test]
fn load_failure_marks_run_failed_and_propagates() {
    let config = config("load_fail", 100);
    let store = MemoryCheckpointStore::new();
    let fetch = ScriptedFetch::new(vec![Some(page_of(5, 2020))]);
    let mut loader = CollectingLoader {
        fail: true,
        ..CollectingLoader::default()
    };

    let err = run_pipeline(&config, &fetch, &store, &mut loader).unwrap_err();
    assert!(matches!(err, PipelineError::Load(_)));

    let state = store.run_state(&config.pipeline).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert!(state.checkpoint.is_none());
}

#[test]
fn rejected_batch_loads_nothing_but_completes() {
    let config = config("rejected_batch", 100);
    let store = MemoryCheckpointStore::new();
    // Records exist but the required columns never appear: the batch is
    // rejected, which is a valid (empty) outcome, not a failure.
    let fetch = ScriptedFetch::new(vec![Some(json!({
        "value": [{"Unrelated": 1}, {"Unrelated": 2}]
    }))]);
    let mut loader = CollectingLoader::default();

    let summary = run_pipeline(&config, &fetch, &store, &mut loader).unwrap();

    assert_eq!(summary.records_fetched, 2);
    assert_eq!(summary.records_clean, 0);
    assert_eq!(summary.records_loaded, 0);
    assert_eq!(loader.batches.len(), 1);
    assert!(loader.batches[0].is_empty());

    let state = store.run_state(&config.pipeline).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Completed);
}

#[test]
fn transform_scenario_produces_expected_canonical_record() {
    let config = config("scenario", 100);
    let store = MemoryCheckpointStore::new();
    let fetch = ScriptedFetch::new(vec![Some(json!({
        "value": [{"SpatialDim": "USA", "TimeDim": 2020, "NumericValue": 78.5}]
    }))]);
    let mut loader = CollectingLoader::default();

    run_pipeline(&config, &fetch, &store, &mut loader).unwrap();

    let loaded = &loader.batches[0];
    assert_eq!(loaded.len(), 1);
    let rec = &loaded[0];
    assert_eq!(rec.country_code, "USA");
    assert_eq!(rec.year, 2020);
    assert!((rec.value - 78.5).abs() < f64::EPSILON);
    assert_eq!(rec.indicator_code, "WHOSIS_000001");
    assert_eq!(rec.indicator_name, "Life expectancy at birth (years)");
    assert_eq!(rec.source_url, "https://ghoapi.azureedge.net/api");
}
