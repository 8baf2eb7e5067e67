//! The single consumer of the ingestion queue and the only catalog writer in
//! a cycle.
//!
//! For each payload: skip it if it cannot be decoded or lacks an id or title,
//! or if its external id is already stored. Otherwise resolve its authors and
//! categories and persist the book with its relation rows. A failed record is
//! logged and dropped; the loader keeps draining.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use books_api_client::{Volume, VolumeItem};
use bookshelf_common::{EntityKind, NewBook};
use bookshelf_store::{CatalogStore, StoreError};

use crate::observer::{IngestObserver, RecordOutcome};
use crate::queue::QueueConsumer;
use crate::resolver::EntityResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoaderState {
    Running,
    Stopped,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoaderStats {
    pub seen: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub conflicts: usize,
    pub missing_id: usize,
    pub missing_title: usize,
    pub malformed: usize,
    pub failed: usize,
}

impl LoaderStats {
    fn record(&mut self, outcome: RecordOutcome) {
        self.seen += 1;
        match outcome {
            RecordOutcome::Inserted => self.inserted += 1,
            RecordOutcome::Duplicate => self.duplicates += 1,
            RecordOutcome::Conflict => self.conflicts += 1,
            RecordOutcome::MissingId => self.missing_id += 1,
            RecordOutcome::MissingTitle => self.missing_title += 1,
            RecordOutcome::Malformed => self.malformed += 1,
            RecordOutcome::Failed => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &LoaderStats) {
        self.seen += other.seen;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.conflicts += other.conflicts;
        self.missing_id += other.missing_id;
        self.missing_title += other.missing_title;
        self.malformed += other.malformed;
        self.failed += other.failed;
    }
}

impl fmt::Display for LoaderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records seen:     {}", self.seen)?;
        writeln!(f, "Books inserted:   {}", self.inserted)?;
        writeln!(f, "Duplicates:       {}", self.duplicates)?;
        writeln!(f, "Commit conflicts: {}", self.conflicts)?;
        writeln!(f, "Missing id:       {}", self.missing_id)?;
        writeln!(f, "Missing title:    {}", self.missing_title)?;
        writeln!(f, "Malformed:        {}", self.malformed)?;
        writeln!(f, "Failed:           {}", self.failed)
    }
}

pub struct Loader {
    catalog: Arc<dyn CatalogStore>,
    observer: Arc<dyn IngestObserver>,
}

impl Loader {
    pub fn new(catalog: Arc<dyn CatalogStore>, observer: Arc<dyn IngestObserver>) -> Self {
        Self { catalog, observer }
    }

    /// Drain the queue until the terminal marker.
    pub async fn run(self, mut queue: QueueConsumer) -> LoaderStats {
        let mut resolver = EntityResolver::new(Arc::clone(&self.catalog));
        let mut stats = LoaderStats::default();
        let mut state = LoaderState::Running;

        while state == LoaderState::Running {
            match queue.next().await {
                Some(item) => {
                    let external_id = item.id().map(str::to_string);
                    let outcome = self.process(&mut resolver, item).await;
                    self.observer
                        .record_processed(external_id.as_deref(), outcome);
                    stats.record(outcome);
                }
                None => state = LoaderState::Stopped,
            }
        }

        info!(
            seen = stats.seen,
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            failed = stats.failed,
            "Loader stopped"
        );
        stats
    }

    async fn process(&self, resolver: &mut EntityResolver, item: VolumeItem) -> RecordOutcome {
        let volume = match item {
            VolumeItem::Parsed(volume) => volume,
            VolumeItem::Malformed { id, reason } => {
                debug!(
                    external_id = id.as_deref(),
                    reason = reason.as_str(),
                    "Undecodable search entry"
                );
                return RecordOutcome::Malformed;
            }
        };
        let book = match book_from_volume(volume) {
            Ok(book) => book,
            Err(skip) => return skip.into(),
        };

        match self.store(resolver, &book).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_unique_violation() => RecordOutcome::Conflict,
            Err(e) => {
                warn!(external_id = book.external_id.as_str(), error = %e, "Failed to store book");
                RecordOutcome::Failed
            }
        }
    }

    async fn store(
        &self,
        resolver: &mut EntityResolver,
        book: &NewBook,
    ) -> Result<RecordOutcome, StoreError> {
        if self.catalog.book_exists(&book.external_id).await? {
            return Ok(RecordOutcome::Duplicate);
        }

        for kind in [EntityKind::Author, EntityKind::Category] {
            for name in book.names(kind) {
                resolver.resolve(kind, name).await?;
            }
        }

        self.catalog.insert_book(book).await?;
        Ok(RecordOutcome::Inserted)
    }
}

/// Why a decoded payload cannot become a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incomplete {
    MissingId,
    MissingTitle,
}

impl From<Incomplete> for RecordOutcome {
    fn from(value: Incomplete) -> Self {
        match value {
            Incomplete::MissingId => RecordOutcome::MissingId,
            Incomplete::MissingTitle => RecordOutcome::MissingTitle,
        }
    }
}

/// Build a book from a search payload. Both the id and the title must be
/// present and non-blank.
///
/// Author and category names are kept verbatim in payload order; repeats
/// within the payload collapse to one.
pub fn book_from_volume(volume: Volume) -> Result<NewBook, Incomplete> {
    let external_id = volume
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or(Incomplete::MissingId)?;
    let info = volume.volume_info;
    let title = info
        .title
        .filter(|title| !title.trim().is_empty())
        .ok_or(Incomplete::MissingTitle)?;
    let (small_thumbnail, thumbnail) = match info.image_links {
        Some(links) => (links.small_thumbnail, links.thumbnail),
        None => (None, None),
    };

    Ok(NewBook {
        external_id,
        title,
        publisher: info.publisher,
        published_date: info.published_date,
        description: info.description,
        page_count: info.page_count,
        maturity_rating: info.maturity_rating,
        small_thumbnail,
        thumbnail,
        language: info.language,
        authors: distinct_names(info.authors),
        categories: distinct_names(info.categories),
    })
}

fn distinct_names(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue;
    use crate::testing::{volume, RecordingObserver};
    use books_api_client::{ImageLinks, VolumeInfo};
    use bookshelf_store::MemoryCatalog;

    async fn load(catalog: Arc<MemoryCatalog>, volumes: Vec<Volume>) -> LoaderStats {
        load_items(catalog, volumes.into_iter().map(VolumeItem::from).collect()).await
    }

    async fn load_items(catalog: Arc<MemoryCatalog>, items: Vec<VolumeItem>) -> LoaderStats {
        let (producer, consumer) = queue::channel();
        let sender = producer.sender();
        for item in items {
            sender.push(item);
        }
        drop(sender);
        producer.finish();
        Loader::new(catalog, Arc::new(RecordingObserver::default()))
            .run(consumer)
            .await
    }

    #[test]
    fn book_fields_come_from_volume_info() {
        let v = Volume {
            id: Some("zyTCAlFPjgYC".to_string()),
            volume_info: VolumeInfo {
                title: Some("The Google Story".to_string()),
                authors: vec!["David A. Vise".to_string(), "Mark Malseed".to_string()],
                publisher: Some("Random House".to_string()),
                published_date: Some("2005-11-15".to_string()),
                page_count: Some(207),
                maturity_rating: Some("NOT_MATURE".to_string()),
                image_links: Some(ImageLinks {
                    small_thumbnail: Some("s.jpg".to_string()),
                    thumbnail: Some("t.jpg".to_string()),
                }),
                language: Some("en".to_string()),
                ..Default::default()
            },
        };
        let book = book_from_volume(v).unwrap();
        assert_eq!(book.external_id, "zyTCAlFPjgYC");
        assert_eq!(book.title, "The Google Story");
        assert_eq!(book.published_date.as_deref(), Some("2005-11-15"));
        assert_eq!(book.small_thumbnail.as_deref(), Some("s.jpg"));
        assert_eq!(book.thumbnail.as_deref(), Some("t.jpg"));
        assert_eq!(book.authors, vec!["David A. Vise", "Mark Malseed"]);
        assert!(book.categories.is_empty());
    }

    #[test]
    fn payload_without_id_is_rejected() {
        assert_eq!(
            book_from_volume(Volume::default()),
            Err(Incomplete::MissingId)
        );
        let blank = Volume {
            id: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(book_from_volume(blank), Err(Incomplete::MissingId));
    }

    #[test]
    fn payload_without_title_is_rejected() {
        let untitled = Volume {
            id: Some("NT1".to_string()),
            ..Default::default()
        };
        assert_eq!(book_from_volume(untitled), Err(Incomplete::MissingTitle));

        let mut blank = volume("NT2", &["Doe"], &[]);
        blank.volume_info.title = Some("   ".to_string());
        assert_eq!(book_from_volume(blank), Err(Incomplete::MissingTitle));
    }

    #[test]
    fn repeated_names_collapse_and_blanks_are_kept() {
        let book = book_from_volume(volume("A1", &["Doe", "", "Doe", "doe", ""], &[])).unwrap();
        assert_eq!(book.authors, vec!["Doe", "", "doe"]);
    }

    #[tokio::test]
    async fn duplicate_external_id_is_skipped() {
        let catalog = Arc::new(MemoryCatalog::new());
        let stats = load(
            catalog.clone(),
            vec![volume("A1", &["Doe"], &[]), volume("A1", &["Roe"], &[])],
        )
        .await;

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(catalog.book_insert_attempts(), 1);
        let books = catalog.books();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].authors, vec!["Doe"]);
        // The duplicate never reached entity resolution.
        assert_eq!(
            catalog.entity_names(EntityKind::Author).await.unwrap(),
            vec!["Doe"]
        );
    }

    #[tokio::test]
    async fn commit_conflict_is_a_no_op() {
        let catalog = Arc::new(MemoryCatalog::new().race_book("A1"));
        let stats = load(
            catalog.clone(),
            vec![volume("A1", &[], &[]), volume("A2", &[], &[])],
        )
        .await;

        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn failed_record_does_not_stop_the_loader() {
        let catalog = Arc::new(MemoryCatalog::new().fail_book("A2"));
        let stats = load(
            catalog.clone(),
            vec![
                volume("A1", &["Doe"], &[]),
                volume("A2", &["Roe"], &[]),
                volume("A3", &["Poe"], &[]),
            ],
        )
        .await;

        assert_eq!(stats.seen, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.inserted, 2);
        let ids: Vec<_> = catalog.books().into_iter().map(|b| b.external_id).collect();
        assert_eq!(ids, vec!["A1", "A3"]);
    }

    #[tokio::test]
    async fn missing_id_is_counted_and_skipped() {
        let catalog = Arc::new(MemoryCatalog::new());
        let stats = load(catalog.clone(), vec![Volume::default()]).await;
        assert_eq!(stats.missing_id, 1);
        assert_eq!(catalog.count_books().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn untitled_payload_is_not_stored() {
        let catalog = Arc::new(MemoryCatalog::new());
        let mut untitled = volume("NT1", &["Doe"], &[]);
        untitled.volume_info.title = None;

        let stats = load(catalog.clone(), vec![untitled, volume("A1", &[], &[])]).await;

        assert_eq!(stats.missing_title, 1);
        assert_eq!(stats.inserted, 1);
        assert!(catalog.find_book("NT1").await.unwrap().is_none());
        // Rejected before entity resolution.
        assert!(catalog.entity_names(EntityKind::Author).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_entry_is_skipped_alone() {
        let catalog = Arc::new(MemoryCatalog::new());
        let items = vec![
            VolumeItem::Malformed {
                id: Some("BAD1".to_string()),
                reason: "invalid type: string \"n/a\", expected i32".to_string(),
            },
            volume("A1", &["Doe"], &[]).into(),
        ];

        let stats = load_items(catalog.clone(), items).await;

        assert_eq!(stats.seen, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.inserted, 1);
        assert_eq!(catalog.books().len(), 1);
    }

    #[tokio::test]
    async fn empty_queue_stops_immediately() {
        let stats = load(Arc::new(MemoryCatalog::new()), vec![]).await;
        assert_eq!(stats, LoaderStats::default());
    }
}
