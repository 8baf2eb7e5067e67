// One search call per query. Failures become "no results".

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use books_api_client::{BooksClient, VolumeItem};

use crate::observer::IngestObserver;

/// Anything that can answer a search query with a page of volumes.
#[async_trait]
pub trait VolumeSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<VolumeItem>>;
}

#[async_trait]
impl VolumeSource for BooksClient {
    async fn search(&self, query: &str) -> Result<Vec<VolumeItem>> {
        Ok(self.search_volumes(query).await?)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

/// Result of one search call. A failed fetch contributes no records.
#[derive(Debug)]
pub enum FetchOutcome {
    Found(Vec<VolumeItem>),
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    pub fn into_items(self) -> Vec<VolumeItem> {
        match self {
            FetchOutcome::Found(items) => items,
            FetchOutcome::Failed(_) => Vec::new(),
        }
    }
}

pub struct Fetcher {
    source: Arc<dyn VolumeSource>,
    observer: Arc<dyn IngestObserver>,
    timeout: Option<Duration>,
}

impl Fetcher {
    pub fn new(
        source: Arc<dyn VolumeSource>,
        observer: Arc<dyn IngestObserver>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            source,
            observer,
            timeout,
        }
    }

    /// Search once. Not retried; a failure is reported to the observer and
    /// comes back as `FetchOutcome::Failed`.
    pub async fn fetch(&self, query: &str) -> FetchOutcome {
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.source.search(query)).await {
                Ok(result) => result.map_err(FetchError::from),
                Err(_) => Err(FetchError::Timeout(limit)),
            },
            None => self.source.search(query).await.map_err(FetchError::from),
        };

        match result {
            Ok(items) => {
                self.observer.fetch_succeeded(query, items.len());
                FetchOutcome::Found(items)
            }
            Err(e) => {
                self.observer.fetch_failed(query, &e);
                FetchOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::TracingObserver;
    use crate::testing::{volume, MockVolumeSource, RecordingObserver};

    fn fetcher(source: MockVolumeSource, observer: Arc<RecordingObserver>) -> Fetcher {
        Fetcher::new(Arc::new(source), observer, Some(Duration::from_millis(200)))
    }

    #[tokio::test]
    async fn returns_volumes_in_api_order() {
        let source = MockVolumeSource::new().on_query(
            "golang",
            vec![volume("A1", &["Doe"], &[]), volume("A2", &["Roe"], &[])],
        );
        let observer = Arc::new(RecordingObserver::default());
        let outcome = fetcher(source, observer.clone()).fetch("golang").await;

        let items = outcome.into_items();
        let ids: Vec<_> = items.iter().filter_map(|item| item.id()).collect();
        assert_eq!(ids, vec!["A1", "A2"]);
        assert_eq!(observer.fetch_failures(), 0);
        assert_eq!(observer.successful_fetches(), 1);
    }

    #[tokio::test]
    async fn source_error_is_swallowed_and_reported() {
        let source = MockVolumeSource::new().on_failure("broken");
        let observer = Arc::new(RecordingObserver::default());
        let outcome = fetcher(source, observer.clone()).fetch("broken").await;

        assert!(outcome.is_failed());
        assert!(outcome.into_items().is_empty());
        assert_eq!(observer.failed_queries(), vec!["broken"]);
    }

    #[tokio::test]
    async fn hung_fetch_times_out() {
        let source = MockVolumeSource::new().on_hang("slow");
        let observer = Arc::new(RecordingObserver::default());
        let outcome = fetcher(source, observer.clone()).fetch("slow").await;

        assert!(matches!(outcome, FetchOutcome::Failed(FetchError::Timeout(_))));
        assert_eq!(observer.fetch_failures(), 1);
    }

    #[tokio::test]
    async fn no_timeout_still_reports_success() {
        let source = MockVolumeSource::new().on_query("rust", vec![volume("R1", &[], &[])]);
        let fetcher = Fetcher::new(Arc::new(source), Arc::new(TracingObserver), None);
        assert_eq!(fetcher.fetch("rust").await.into_items().len(), 1);
    }
}
