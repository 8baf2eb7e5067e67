//! Outcome reporting for fetches and records.
//!
//! Fetch failures and skipped records never fail a cycle. They are reported
//! here instead, so callers can count them without the pipeline erroring.

use tracing::{debug, warn};

use crate::fetcher::FetchError;

/// What the loader did with one dequeued payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordOutcome {
    /// New book persisted with its relations.
    Inserted,
    /// A book with this external id already existed.
    Duplicate,
    /// The insert lost a uniqueness race at commit; treated as done.
    Conflict,
    /// The payload carried no external id.
    MissingId,
    /// The payload carried no title; books require one.
    MissingTitle,
    /// The page entry could not be decoded as a volume.
    Malformed,
    /// Any other persistence error; the record was dropped.
    Failed,
}

pub trait IngestObserver: Send + Sync {
    fn fetch_succeeded(&self, _query: &str, _records: usize) {}

    fn fetch_failed(&self, _query: &str, _error: &FetchError) {}

    fn record_processed(&self, _external_id: Option<&str>, _outcome: RecordOutcome) {}
}

/// Default observer: everything goes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl IngestObserver for TracingObserver {
    fn fetch_succeeded(&self, query: &str, records: usize) {
        debug!(query, records, "Fetch complete");
    }

    fn fetch_failed(&self, query: &str, error: &FetchError) {
        warn!(query, error = %error, "Fetch failed, treating as no results");
    }

    fn record_processed(&self, external_id: Option<&str>, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Inserted => debug!(external_id, "Book stored"),
            RecordOutcome::Duplicate | RecordOutcome::Conflict => {
                debug!(external_id, ?outcome, "Book already present")
            }
            RecordOutcome::MissingId => warn!("Payload without external id skipped"),
            RecordOutcome::MissingTitle => warn!(external_id, "Payload without title skipped"),
            RecordOutcome::Malformed => warn!(external_id, "Malformed search entry skipped"),
            RecordOutcome::Failed => warn!(external_id, "Book dropped after store error"),
        }
    }
}
