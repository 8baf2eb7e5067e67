//! Per-invocation ingestion pipeline.
//!
//! A `Pipeline` is cheap to clone and holds no queue of its own between
//! calls: every cycle builds a fresh queue and loader task and tears both down
//! before returning.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use typed_builder::TypedBuilder;

use bookshelf_store::CatalogStore;

use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::expansion::{ExpansionBudget, ExpansionController, ExpansionReport};
use crate::fetcher::{Fetcher, VolumeSource};
use crate::loader::{Loader, LoaderStats};
use crate::observer::{IngestObserver, TracingObserver};
use crate::queue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub dispatch: DispatchReport,
    pub loader: LoaderStats,
}

#[derive(Clone, TypedBuilder)]
pub struct Pipeline {
    source: Arc<dyn VolumeSource>,
    catalog: Arc<dyn CatalogStore>,
    #[builder(default = Arc::new(TracingObserver))]
    observer: Arc<dyn IngestObserver>,
    #[builder(default)]
    fetch_timeout: Option<Duration>,
    #[builder(default)]
    expansion: ExpansionBudget,
}

impl Pipeline {
    /// Fetch every query and persist what comes back. Returns once the loader
    /// has processed the last record.
    pub async fn ingest(&self, queries: &[String]) -> Result<CycleReport> {
        self.ingest_in(queries, Arc::clone(&self.catalog)).await
    }

    /// Same as `ingest`, writing through a caller-supplied catalog handle.
    pub async fn ingest_in(
        &self,
        queries: &[String],
        catalog: Arc<dyn CatalogStore>,
    ) -> Result<CycleReport> {
        let fetcher = Arc::new(Fetcher::new(
            Arc::clone(&self.source),
            Arc::clone(&self.observer),
            self.fetch_timeout,
        ));
        let (producer, consumer) = queue::channel();

        let in_flight = Dispatcher::new(fetcher).spawn(queries, &producer);
        let loader = tokio::spawn(Loader::new(catalog, Arc::clone(&self.observer)).run(consumer));

        // The marker goes in only after every fetch task is done, so it is the
        // last item the loader sees.
        let dispatch = in_flight.join().await;
        producer.finish();

        let loader = loader.await.context("Loader task panicked")?;
        info!(
            queries = dispatch.queries,
            fetch_failures = dispatch.failed,
            inserted = loader.inserted,
            "Ingestion cycle complete"
        );
        Ok(CycleReport { dispatch, loader })
    }

    /// Initial cycle for `queries`, then expansion within the pipeline's budget.
    pub async fn ingest_and_expand(
        &self,
        queries: &[String],
    ) -> Result<(CycleReport, ExpansionReport)> {
        let initial = self.ingest(queries).await?;
        let expansion =
            ExpansionController::new(self, Arc::clone(&self.catalog), self.expansion)
                .exclude(queries.iter().cloned())
                .run()
                .await?;
        Ok((initial, expansion))
    }
}
