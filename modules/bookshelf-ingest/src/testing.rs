// Test doubles for the ingest pipeline.
//
// - MockVolumeSource (VolumeSource): HashMap-based query→page entries, with
//   per-query failures, delays and hangs
// - RecordingObserver (IngestObserver): counts every reported outcome
//
// Plus `volume()` for building search payloads.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use books_api_client::{Volume, VolumeInfo, VolumeItem};

use crate::fetcher::{FetchError, VolumeSource};
use crate::observer::{IngestObserver, RecordOutcome};

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// A search payload with an id, a title derived from it, and the given names.
pub fn volume(id: &str, authors: &[&str], categories: &[&str]) -> Volume {
    Volume {
        id: Some(id.to_string()),
        volume_info: VolumeInfo {
            title: Some(format!("Book {id}")),
            authors: authors.iter().map(|s| s.to_string()).collect(),
            categories: categories.iter().map(|s| s.to_string()).collect(),
            language: Some("en".to_string()),
            ..Default::default()
        },
    }
}

// ---------------------------------------------------------------------------
// MockVolumeSource
// ---------------------------------------------------------------------------

/// Unregistered queries return an empty page, like a search with no hits.
/// Builder pattern: `.on_query()`, `.on_items()`, `.on_failure()`,
/// `.on_delay()`, `.on_hang()`.
#[derive(Default)]
pub struct MockVolumeSource {
    results: HashMap<String, Vec<VolumeItem>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    hanging: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockVolumeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(mut self, query: &str, volumes: Vec<Volume>) -> Self {
        let items = volumes.into_iter().map(VolumeItem::from).collect();
        self.results.insert(query.to_string(), items);
        self
    }

    /// Register a page that may contain malformed entries.
    pub fn on_items(mut self, query: &str, items: Vec<VolumeItem>) -> Self {
        self.results.insert(query.to_string(), items);
        self
    }

    /// The search for `query` answers only after `delay`.
    pub fn on_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn on_failure(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    /// The search for `query` never completes.
    pub fn on_hang(mut self, query: &str) -> Self {
        self.hanging.insert(query.to_string());
        self
    }

    /// Every query searched so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VolumeSource for MockVolumeSource {
    async fn search(&self, query: &str) -> Result<Vec<VolumeItem>> {
        self.calls.lock().unwrap().push(query.to_string());

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.hanging.contains(query) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(query) {
            bail!("MockVolumeSource: injected failure for {query}");
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// RecordingObserver
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorded {
    fetched: Vec<(String, usize)>,
    failed: Vec<String>,
    outcomes: Vec<(Option<String>, RecordOutcome)>,
    /// Every callback in arrival order: `fetched:<query>` or `processed:<id>`.
    timeline: Vec<String>,
}

#[derive(Default)]
pub struct RecordingObserver {
    inner: Mutex<Recorded>,
}

impl RecordingObserver {
    pub fn fetch_failures(&self) -> usize {
        self.inner.lock().unwrap().failed.len()
    }

    pub fn failed_queries(&self) -> Vec<String> {
        let mut queries = self.inner.lock().unwrap().failed.clone();
        queries.sort();
        queries
    }

    pub fn successful_fetches(&self) -> usize {
        self.inner.lock().unwrap().fetched.len()
    }

    pub fn count(&self, outcome: RecordOutcome) -> usize {
        self.inner
            .lock()
            .unwrap()
            .outcomes
            .iter()
            .filter(|(_, o)| *o == outcome)
            .count()
    }

    /// Fetch completions and processed records, interleaved as they happened.
    pub fn timeline(&self) -> Vec<String> {
        self.inner.lock().unwrap().timeline.clone()
    }

    /// External ids in the order the loader processed them.
    pub fn processed_ids(&self) -> Vec<Option<String>> {
        self.inner
            .lock()
            .unwrap()
            .outcomes
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl IngestObserver for RecordingObserver {
    fn fetch_succeeded(&self, query: &str, records: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetched.push((query.to_string(), records));
        inner.timeline.push(format!("fetched:{query}"));
    }

    fn fetch_failed(&self, query: &str, _error: &FetchError) {
        self.inner.lock().unwrap().failed.push(query.to_string());
    }

    fn record_processed(&self, external_id: Option<&str>, outcome: RecordOutcome) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .outcomes
            .push((external_id.map(str::to_string), outcome));
        inner
            .timeline
            .push(format!("processed:{}", external_id.unwrap_or("-")));
    }
}
