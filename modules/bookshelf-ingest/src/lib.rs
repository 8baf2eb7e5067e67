//! Concurrent ingestion of Google Books search results into the catalog.
//!
//! One cycle: the dispatcher fans out one fetch task per query, every task
//! pushes its volumes onto an unbounded queue, and a single loader task drains
//! the queue and writes to the catalog. The orchestrator pushes the terminal
//! marker only after every fetch task has finished.

pub mod dispatcher;
pub mod expansion;
pub mod fetcher;
pub mod loader;
pub mod observer;
pub mod pipeline;
pub mod queue;
pub mod resolver;
pub mod reviews;
pub mod seeds;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use expansion::{ExpansionBudget, ExpansionController, ExpansionReport};
pub use fetcher::{FetchError, FetchOutcome, Fetcher, VolumeSource};
pub use loader::{Loader, LoaderStats};
pub use observer::{IngestObserver, RecordOutcome, TracingObserver};
pub use pipeline::{CycleReport, Pipeline};
