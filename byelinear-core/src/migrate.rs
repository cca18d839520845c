//! Migration driver
//!
//! Two phases, one per run:
//! - fetch: page through the source newest-first, staging every record and
//!   checkpointing as it goes
//! - export: walk staged records in discovery order and push each unexported
//!   one to the destination, flagging it exported once every step succeeded
//!
//! Work is strictly sequential. Remote failures are retried forever with a
//! fixed backoff; store failures abort the phase. Cancellation (interrupt or
//! deadline) is observed only at pauses and backoff waits.

use async_trait::async_trait;
use byelinear_store::{key_has_number, DestinationCache, StagingStore};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{Config, RepoRef};
use crate::model::CanonicalRecord;
use crate::retry::{pause, retry_until_cancelled, with_deadline, Backoff};
use crate::transform::{transform, Draft};
use crate::{Error, Result};

/// Opaque remote failure; always retried
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One page of source records, newest first
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<CanonicalRecord>,
    /// Id of the last record on the page; `None` when the page is empty
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        let next_cursor = records.last().map(|r| r.id.clone());
        Self {
            records,
            next_cursor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads the source dataset page by page
#[async_trait]
pub trait SourcePaginator: Send + Sync {
    /// Fetch the page that follows `cursor` (`None` starts at the newest record)
    ///
    /// An empty page means the dataset is exhausted.
    async fn fetch_page(&self, cursor: Option<&str>, page_size: usize) -> std::result::Result<Page, BoxError>;
}

/// Performs the remote side effects for one record
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Export a draft and return the destination URL
    ///
    /// `cache` holds destination lookups and is persisted with the checkpoint.
    async fn export(
        &self,
        key: &str,
        draft: &Draft,
        cache: &mut DestinationCache,
    ) -> std::result::Result<String, BoxError>;
}

/// Outcome of a fetch phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub pages: usize,
    pub records: usize,
    /// Records on a page that were already staged
    pub duplicates: usize,
    pub retries: u32,
}

/// Outcome of an export phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub exported: usize,
    pub skipped_synthetic: usize,
    pub skipped_exported: usize,
    pub retries: u32,
}

/// Drives both phases against one staging store
pub struct Migration<'a> {
    config: &'a Config,
    store: &'a mut StagingStore,
    cancel: CancellationToken,
}

impl<'a> Migration<'a> {
    pub fn new(config: &'a Config, store: &'a mut StagingStore, cancel: CancellationToken) -> Self {
        Self {
            config,
            store,
            cancel,
        }
    }

    /// Where fetching resumes: explicit cursor, else the last staged record
    ///
    /// A single-record fetch starts from the newest record.
    pub fn resume_cursor(&self) -> Option<String> {
        if self.config.cursor.is_some() {
            return self.config.cursor.clone();
        }
        if self.config.issue_number.is_some() {
            return None;
        }
        self.store
            .checkpoint()
            .last_record()
            .map(|r| r.remote_id.clone())
    }

    /// Fetch phase
    pub async fn fetch<P>(&mut self, source: &P) -> Result<FetchReport>
    where
        P: SourcePaginator + ?Sized,
    {
        let timing = &self.config.timing;
        let backoff = Backoff::fixed(timing.retry_backoff);
        let (cancel, _deadline) = with_deadline(&self.cancel, timing.deadline);
        let page_size = self.config.page_size;
        let number = self.config.issue_number;

        let mut report = FetchReport::default();
        let mut cursor = self.resume_cursor();

        loop {
            match (number, cursor.as_deref()) {
                (Some(n), _) => info!(number = n, "Fetching single record"),
                (None, Some(c)) => info!(cursor = c, page_size, "Fetching page"),
                (None, None) => info!(page_size, "Fetching newest page"),
            }

            let after = cursor.as_deref();
            let page = retry_until_cancelled("fetch page", &backoff, &cancel, move || async move {
                source.fetch_page(after, page_size).await
            })
            .await?;
            report.retries += page.failures;
            let page = page.value;

            if page.is_empty() {
                info!(
                    pages = report.pages,
                    records = report.records,
                    "All records fetched"
                );
                return Ok(report);
            }

            let mut found = false;
            for record in &page.records {
                if number.is_some_and(|n| key_has_number(&record.identifier, n)) {
                    found = true;
                }
                if self.store.contains_remote(&record.id) {
                    debug!(key = %record.identifier, "Already staged");
                    report.duplicates += 1;
                    continue;
                }
                self.store.append(&record.id, &record.identifier, record)?;
                report.records += 1;
            }
            self.store.persist()?;
            report.pages += 1;

            let last = page.records.last().map(|r| r.identifier.as_str()).unwrap_or_default();
            info!(count = page.records.len(), last, "Staged page");

            if found {
                info!(number = number.unwrap_or_default(), "Fetched requested record");
                return Ok(report);
            }

            cursor = page.next_cursor.or_else(|| page.records.last().map(|r| r.id.clone()));

            if !pause(timing.page_pause, &cancel).await {
                return Err(Error::Interrupted);
            }
        }
    }

    /// Export phase
    pub async fn export<E>(&mut self, exporter: &E, destination: &RepoRef) -> Result<ExportReport>
    where
        E: Exporter + ?Sized,
    {
        let timing = &self.config.timing;
        let backoff = Backoff::fixed(timing.retry_backoff);
        let (cancel, _deadline) = with_deadline(&self.cancel, timing.deadline);

        let mut report = ExportReport::default();
        let staged = self.store.checkpoint().records.clone();

        for entry in staged {
            let key = entry.human_key.as_str();
            if let Some(n) = self.config.issue_number {
                if !entry.matches_number(n) {
                    continue;
                }
            }
            if entry.exported {
                info!(key, "Skipped already exported record");
                report.skipped_exported += 1;
                continue;
            }

            let record: CanonicalRecord = self.store.load(key)?;
            if record.is_synthetic() {
                info!(key, "Skipped synthetic record");
                report.skipped_synthetic += 1;
                continue;
            }

            info!(key, "Exporting");
            let draft = transform(&record, &self.config.identities, destination);

            let cache = Mutex::new(self.store.cache().clone());
            let (cache_ref, draft_ref) = (&cache, &draft);
            let outcome = retry_until_cancelled(key, &backoff, &cancel, move || async move {
                let mut cache = cache_ref.lock().await;
                exporter.export(key, draft_ref, &mut *cache).await
            })
            .await;
            // Lookups made by failed attempts are still valid
            self.store.replace_cache(cache.into_inner());
            let exported = outcome?;

            self.store.mark_exported(key)?;
            report.exported += 1;
            report.retries += exported.failures;
            info!(key, url = %exported.value, "Exported");

            if !pause(timing.record_pause, &cancel).await {
                return Err(Error::Interrupted);
            }
        }

        info!(
            exported = report.exported,
            skipped_synthetic = report.skipped_synthetic,
            skipped_exported = report.skipped_exported,
            "Export finished"
        );
        Ok(report)
    }
}
