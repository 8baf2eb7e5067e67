// Fan-out: one concurrent fetch task per query.

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::fetcher::Fetcher;
use crate::queue::QueueProducer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub queries: usize,
    pub failed: usize,
    pub records_enqueued: usize,
}

/// Per-task result: records pushed, and whether the fetch failed.
struct TaskResult {
    pushed: usize,
    failed: bool,
}

pub struct Dispatcher {
    fetcher: Arc<Fetcher>,
}

/// Fetch tasks that are already running.
pub struct InFlight {
    tasks: Vec<JoinHandle<TaskResult>>,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Start one task per query. Each task pushes its page entries onto the queue in
    /// the order the API returned them. Returns immediately.
    pub fn spawn(&self, queries: &[String], producer: &QueueProducer) -> InFlight {
        let tasks = queries
            .iter()
            .cloned()
            .map(|query| {
                let fetcher = Arc::clone(&self.fetcher);
                let sender = producer.sender();
                tokio::spawn(async move {
                    let outcome = fetcher.fetch(&query).await;
                    let failed = outcome.is_failed();
                    let mut pushed = 0;
                    for item in outcome.into_items() {
                        if !sender.push(item) {
                            break;
                        }
                        pushed += 1;
                    }
                    TaskResult { pushed, failed }
                })
            })
            .collect();

        InFlight { tasks }
    }
}

impl InFlight {
    /// Wait for every fetch task, however many records each produced.
    pub async fn join(self) -> DispatchReport {
        let mut report = DispatchReport {
            queries: self.tasks.len(),
            ..Default::default()
        };

        for result in join_all(self.tasks).await {
            match result {
                Ok(task) => {
                    report.records_enqueued += task.pushed;
                    if task.failed {
                        report.failed += 1;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Fetch task panicked");
                    report.failed += 1;
                }
            }
        }

        info!(
            queries = report.queries,
            failed = report.failed,
            records = report.records_enqueued,
            "Dispatch complete"
        );
        report
    }
}
