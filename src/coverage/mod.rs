//! Coverage synchronization with the metadata wrangler.
//!
//! A [`CoverageProvider`] runs one [`SyncOperation`] over one collection:
//!
//! 1. reconcile stale records (Register only)
//! 2. select identifiers that need coverage
//! 3. send them to the wrangler in fixed-size batches, one batch at a time
//! 4. record an outcome for every identifier in every batch
//!
//! Outcomes are stored as coverage records, so an interrupted run picks up
//! where it left off and a repeated run with nothing new to do selects
//! nothing.

pub mod importer;
pub mod lookup;
pub mod opds;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::coverage::METADATA_WRANGLER_DATA_SOURCE;
use crate::model::{
    normalize_urn, Collection, CollectionId, CoverageKey, CoverageRecord, CoverageStatus, Goal, Identifier, IdentifierId,
    IdentifierType, Operation, Protocol, Work,
};
use crate::store::{CatalogStore, StoreError};

use importer::{interpret_feed, ItemOutcome};
use lookup::{LookupClient, LookupError};

pub use lookup::MetadataWranglerLookup;

/// Identifiers sent to the wrangler per request.
pub const DEFAULT_BATCH_SIZE: usize = 25;

#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown sync operation: {0}")]
    UnknownOperation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CoverageError>;

/// The three ways a collection is kept in step with the wrangler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    /// Add licensed identifiers to the remote collection.
    Register,

    /// Remove identifiers the collection no longer licenses.
    Reap,

    /// Retry pushing local metadata that failed to upload.
    Upload,
}

impl SyncOperation {
    /// The coverage record operation this writes.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Register => Operation::Sync,
            Self::Reap => Operation::Reap,
            Self::Upload => Operation::MetadataUpload,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Reap => "reap",
            Self::Upload => "upload",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "register" => Ok(Self::Register),
            "reap" => Ok(Self::Reap),
            "upload" => Ok(Self::Upload),
            other => Err(CoverageError::UnknownOperation(other.to_string())),
        }
    }
}

/// Immutable settings for a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub batch_size: usize,

    /// Message status codes that mean the wrangler accepted an identifier.
    pub register_success_codes: Vec<u16>,
    pub reap_success_codes: Vec<u16>,
    pub upload_success_codes: Vec<u16>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            register_success_codes: vec![201, 202],
            reap_success_codes: vec![200, 404],
            upload_success_codes: vec![200, 201, 202],
        }
    }
}

impl SyncConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn success_codes(&self, operation: SyncOperation) -> &[u16] {
        match operation {
            SyncOperation::Register => &self.register_success_codes,
            SyncOperation::Reap => &self.reap_success_codes,
            SyncOperation::Upload => &self.upload_success_codes,
        }
    }
}

/// Result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub collection: String,
    pub operation: String,

    /// Stale Reap records removed before selection.
    pub reconciled: usize,

    pub selected: usize,
    pub batches: usize,
    pub successes: usize,
    pub transient_failures: usize,
    pub persistent_failures: usize,

    /// Every recorded outcome, in batch order.
    pub outcomes: Vec<(IdentifierId, CoverageStatus)>,
}

impl SyncReport {
    fn record(&mut self, identifier: IdentifierId, status: CoverageStatus) {
        match status {
            CoverageStatus::Success => self.successes += 1,
            CoverageStatus::TransientFailure => self.transient_failures += 1,
            CoverageStatus::PersistentFailure => self.persistent_failures += 1,
        }
        self.outcomes.push((identifier, status));
    }
}

/// Runs one operation over one collection.
pub struct CoverageProvider {
    lookup: Arc<dyn LookupClient>,
    collection: Collection,
    operation: SyncOperation,
    config: SyncConfig,
}

impl fmt::Debug for CoverageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverageProvider")
            .field("collection", &self.collection.name)
            .field("operation", &self.operation)
            .field("config", &self.config)
            .finish()
    }
}

impl CoverageProvider {
    /// Fails when the lookup client has no credentials.
    pub fn new(
        lookup: Arc<dyn LookupClient>,
        collection: Collection,
        operation: SyncOperation,
        config: SyncConfig,
    ) -> Result<Self> {
        if !lookup.authenticated() {
            return Err(CoverageError::Configuration(
                "Authentication for the Library Simplified Metadata Wrangler is not set up. \
                 You can't sync a collection without it."
                    .to_string(),
            ));
        }
        Ok(Self {
            lookup,
            collection,
            operation,
            config,
        })
    }

    pub fn operation(&self) -> SyncOperation {
        self.operation
    }

    fn key(&self, identifier: IdentifierId, operation: Operation) -> CoverageKey {
        CoverageKey::wrangler(identifier, operation, self.collection.id)
    }

    fn status(&self, store: &dyn CatalogStore, identifier: IdentifierId, operation: Operation) -> Option<CoverageStatus> {
        store.coverage_record(&self.key(identifier, operation)).map(|r| r.status)
    }

    /// Delete Reap records for identifiers that are licensed again.
    ///
    /// Only Register runs reconcile; other operations return 0.
    pub fn reconcile_relicensed<S: CatalogStore + ?Sized>(&self, store: &mut S) -> Result<usize> {
        if self.operation != SyncOperation::Register {
            return Ok(0);
        }
        let mut removed = 0;
        for pool in store.license_pools(self.collection.id) {
            if pool.is_licensed() && store.delete_coverage(&self.key(pool.identifier, Operation::Reap))? {
                debug!(identifier = %pool.identifier, "Removed stale reap record");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Identifiers this run should send, ordered by id. Reads only.
    pub fn items_that_need_coverage<S: CatalogStore>(&self, store: &S) -> Vec<IdentifierId> {
        let store: &dyn CatalogStore = store;
        let mut selected: Vec<IdentifierId> = match self.operation {
            SyncOperation::Register => store
                .license_pools(self.collection.id)
                .into_iter()
                .filter(|pool| pool.is_licensed())
                .map(|pool| pool.identifier)
                .filter(|id| {
                    let sync = self.status(store, *id, Operation::Sync);
                    !matches!(
                        sync,
                        Some(CoverageStatus::Success) | Some(CoverageStatus::PersistentFailure)
                    ) && self.status(store, *id, Operation::Reap).is_none()
                })
                .collect(),
            SyncOperation::Reap => store
                .license_pools(self.collection.id)
                .into_iter()
                .filter(|pool| pool.licenses_owned == 0 && !pool.open_access)
                .map(|pool| pool.identifier)
                .filter(|id| {
                    self.status(store, *id, Operation::Sync) == Some(CoverageStatus::Success)
                        && self.status(store, *id, Operation::Reap) != Some(CoverageStatus::PersistentFailure)
                })
                .collect(),
            SyncOperation::Upload => store
                .coverage_records(self.collection.id, Operation::MetadataUpload)
                .into_iter()
                .filter(|r| {
                    r.status == CoverageStatus::TransientFailure
                        && r.key.data_source == METADATA_WRANGLER_DATA_SOURCE
                })
                .map(|r| r.key.identifier)
                .collect(),
        };
        selected.sort();
        selected.dedup();
        selected
    }

    /// Identifier to send in place of `identifier`.
    ///
    /// Vendor ids the wrangler cannot resolve are swapped for their first
    /// ISBN equivalent. Without one the original is sent.
    fn wrangler_identifier(store: &dyn CatalogStore, identifier: &Identifier) -> Identifier {
        if !identifier.identifier_type.needs_isbn_mapping() {
            return identifier.clone();
        }
        identifier
            .equivalents
            .iter()
            .filter_map(|id| store.identifier(*id).ok())
            .find(|eq| eq.identifier_type == IdentifierType::Isbn)
            .unwrap_or_else(|| identifier.clone())
    }

    /// Run the operation to completion.
    pub async fn run<S: CatalogStore>(&self, store: &mut S) -> Result<SyncReport> {
        let mut report = SyncReport {
            collection: self.collection.name.clone(),
            operation: self.operation.to_string(),
            ..Default::default()
        };

        report.reconciled = self.reconcile_relicensed(store)?;
        if report.reconciled > 0 {
            store.commit()?;
        }
        let selected = self.items_that_need_coverage(store);
        report.selected = selected.len();

        info!(
            collection = %self.collection.name,
            operation = %self.operation,
            selected = selected.len(),
            reconciled = report.reconciled,
            "Starting coverage sync"
        );

        for batch in selected.chunks(self.config.batch_size.max(1)) {
            report.batches += 1;
            self.process_batch(store, batch, &mut report).await?;
            // Each finished batch is durable before the next request goes out.
            store.commit()?;
        }

        info!(
            collection = %self.collection.name,
            operation = %self.operation,
            batches = report.batches,
            successes = report.successes,
            transient_failures = report.transient_failures,
            persistent_failures = report.persistent_failures,
            "Coverage sync finished"
        );
        Ok(report)
    }

    async fn process_batch<S: CatalogStore>(
        &self,
        store: &mut S,
        batch: &[IdentifierId],
        report: &mut SyncReport,
    ) -> Result<()> {
        // (local id, urn sent for it)
        let mut sent: Vec<(IdentifierId, String)> = Vec::with_capacity(batch.len());
        for id in batch {
            let urn = match store.identifier(*id) {
                Ok(identifier) => Self::wrangler_identifier(&*store, &identifier).urn(),
                Err(e) => {
                    warn!(identifier = %id, error = %e, "Identifier vanished before sync");
                    self.record(store, *id, ItemOutcome::Failure {
                        transient: false,
                        message: e.to_string(),
                    }, report)?;
                    continue;
                }
            };
            sent.push((*id, urn));
        }
        if sent.is_empty() {
            return Ok(());
        }

        let mut urns: Vec<String> = Vec::with_capacity(sent.len());
        for (_, urn) in &sent {
            if !urns.contains(urn) {
                urns.push(urn.clone());
            }
        }

        let outcomes = match self.operation {
            SyncOperation::Upload => self.upload(store, &sent).await,
            SyncOperation::Register | SyncOperation::Reap => {
                let response = match self.operation {
                    SyncOperation::Register => self.lookup.register(&self.collection, &urns).await,
                    _ => self.lookup.remove(&self.collection, &urns).await,
                };
                response.and_then(|r| r.into_feed()).map(|feed| {
                    let by_urn: HashMap<String, ItemOutcome> =
                        interpret_feed(&feed, self.config.success_codes(self.operation))
                            .into_iter()
                            .map(|(urn, outcome)| (normalize_urn(&urn), outcome))
                            .collect();
                    sent.iter()
                        .map(|(id, urn)| {
                            let outcome = by_urn
                                .get(urn)
                                .cloned()
                                .unwrap_or_else(|| ItemOutcome::transient("No response from the metadata wrangler"));
                            (*id, outcome)
                        })
                        .collect::<Vec<_>>()
                })
            }
        };

        match outcomes {
            Ok(outcomes) => {
                for (id, outcome) in outcomes {
                    self.record(store, id, outcome, report)?;
                }
            }
            Err(e) => {
                warn!(
                    collection = %self.collection.name,
                    operation = %self.operation,
                    batch = report.batches,
                    error = %e,
                    "Batch failed, will retry"
                );
                for (id, _) in &sent {
                    self.record(store, *id, ItemOutcome::transient(e.to_string()), report)?;
                }
            }
        }
        Ok(())
    }

    async fn upload<S: CatalogStore>(
        &self,
        store: &S,
        sent: &[(IdentifierId, String)],
    ) -> std::result::Result<Vec<(IdentifierId, ItemOutcome)>, LookupError> {
        let works: Vec<(IdentifierId, String, Option<Work>)> = sent
            .iter()
            .map(|(id, urn)| (*id, urn.clone(), store.work_for_identifier(*id)))
            .collect();
        let entries: Vec<(String, &Work)> = works
            .iter()
            .filter_map(|(_, urn, work)| work.as_ref().map(|w| (urn.clone(), w)))
            .collect();

        if !entries.is_empty() {
            let feed = opds::write_metadata_feed(
                &format!("urn:uuid:metadata-upload/{}", self.collection.id),
                &format!("Metadata for {}", self.collection.name),
                &entries,
            );
            let response = self.lookup.add_with_metadata(&self.collection, feed).await?.ensure_success()?;
            if !self.config.success_codes(SyncOperation::Upload).contains(&response.status) {
                return Err(LookupError::UnexpectedStatus {
                    status: response.status,
                    body: response.body,
                });
            }
        }

        Ok(works
            .into_iter()
            .map(|(id, _, work)| {
                let outcome = if work.is_some() {
                    ItemOutcome::Success
                } else {
                    ItemOutcome::transient("No work to upload metadata for")
                };
                (id, outcome)
            })
            .collect())
    }

    fn record<S: CatalogStore>(
        &self,
        store: &mut S,
        identifier: IdentifierId,
        outcome: ItemOutcome,
        report: &mut SyncReport,
    ) -> Result<()> {
        let key = self.key(identifier, self.operation.operation());
        let record = match outcome {
            ItemOutcome::Success => CoverageRecord::success(key),
            ItemOutcome::Failure { transient, message } => CoverageRecord::failure(key, transient, message),
        };
        let status = record.status;
        store.upsert_coverage(record)?;

        if status == CoverageStatus::Success {
            match self.operation {
                SyncOperation::Register => {
                    if let Some(work) = store.work_for_identifier(identifier) {
                        if !work.presentation_ready {
                            store.mark_presentation_ready(work.id)?;
                        }
                    }
                }
                SyncOperation::Reap => {
                    store.delete_coverage(&self.key(identifier, Operation::Sync))?;
                }
                SyncOperation::Upload => {}
            }
        }

        report.record(identifier, status);
        Ok(())
    }
}

/// Lookup client for the site's metadata wrangler integration.
pub fn wrangler_lookup<S: CatalogStore + ?Sized>(store: &S, timeout: Duration) -> Result<MetadataWranglerLookup> {
    let integration = store
        .integrations()
        .into_iter()
        .find(|i| i.protocol == Protocol::MetadataWrangler && i.goal == Goal::Metadata)
        .ok_or_else(|| CoverageError::Configuration("No metadata wrangler integration is configured".to_string()))?;
    MetadataWranglerLookup::from_integration(&integration, timeout)
        .map_err(|e| CoverageError::Configuration(e.to_string()))
}

/// Convenience for callers holding only ids.
pub async fn synchronize<S: CatalogStore>(
    store: &mut S,
    lookup: Arc<dyn LookupClient>,
    collection: CollectionId,
    operation: SyncOperation,
    config: SyncConfig,
) -> Result<SyncReport> {
    let collection = store.collection(collection)?;
    let provider = CoverageProvider::new(lookup, collection, operation, config)?;
    provider.run(store).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LicensePool, WorkId};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use lookup::LookupResponse;
    use std::sync::Mutex;

    /// Answers every request from a canned status per URN.
    #[derive(Default)]
    struct MockLookup {
        authenticated: bool,
        /// urn -> status code, reported as a message.
        codes: Mutex<Vec<(String, u16)>>,
        /// urns answered with a full entry.
        entries: Mutex<Vec<String>>,
        fail_transport: bool,
        /// urn sent -> urn written back, to answer in another spelling.
        aliases: Mutex<Vec<(String, String)>>,
        /// Requests after this many never get an answer.
        stall_after: Option<usize>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl MockLookup {
        fn new() -> Self {
            Self {
                authenticated: true,
                ..Default::default()
            }
        }

        fn respond(&self, urn: &str, code: u16) {
            self.codes.lock().unwrap().push((urn.to_string(), code));
        }

        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        fn feed(&self, urns: &[String]) -> LookupResponse {
            let codes = self.codes.lock().unwrap();
            let entries = self.entries.lock().unwrap();
            let aliases = self.aliases.lock().unwrap();
            let mut body = String::from(
                r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:simplified="http://librarysimplified.org/terms/">"#,
            );
            for sent in urns {
                let urn = aliases
                    .iter()
                    .find(|(from, _)| from == sent)
                    .map(|(_, to)| to)
                    .unwrap_or(sent);
                if entries.contains(sent) {
                    body.push_str(&format!("<entry><id>{}</id><title>A Book</title></entry>", urn));
                } else if let Some((_, code)) = codes.iter().find(|(u, _)| u == sent) {
                    body.push_str(&format!(
                        "<simplified:message><id>{}</id><simplified:status_code>{}</simplified:status_code></simplified:message>",
                        urn, code
                    ));
                }
            }
            body.push_str("</feed>");
            LookupResponse {
                status: 200,
                content_type: Some("application/atom+xml".to_string()),
                body,
            }
        }

        fn handle(&self, endpoint: &str, urns: &[String]) -> std::result::Result<LookupResponse, LookupError> {
            self.calls.lock().unwrap().push((endpoint.to_string(), urns.to_vec()));
            if self.fail_transport {
                return Err(LookupError::UnexpectedStatus {
                    status: 503,
                    body: "down".to_string(),
                });
            }
            Ok(self.feed(urns))
        }
    }

    #[async_trait]
    impl LookupClient for MockLookup {
        fn authenticated(&self) -> bool {
            self.authenticated
        }

        async fn lookup(&self, _c: &Collection, urns: &[String]) -> std::result::Result<LookupResponse, LookupError> {
            self.handle("lookup", urns)
        }

        async fn register(&self, _c: &Collection, urns: &[String]) -> std::result::Result<LookupResponse, LookupError> {
            if let Some(limit) = self.stall_after {
                let made = self.calls.lock().unwrap().len();
                if made >= limit {
                    std::future::pending::<()>().await;
                }
            }
            self.handle("add", urns)
        }

        async fn remove(&self, _c: &Collection, urns: &[String]) -> std::result::Result<LookupResponse, LookupError> {
            self.handle("remove", urns)
        }

        async fn add_with_metadata(&self, _c: &Collection, feed: String) -> std::result::Result<LookupResponse, LookupError> {
            self.calls.lock().unwrap().push(("add_with_metadata".to_string(), vec![feed]));
            if self.fail_transport {
                return Err(LookupError::UnexpectedStatus {
                    status: 503,
                    body: "down".to_string(),
                });
            }
            Ok(LookupResponse {
                status: 200,
                content_type: None,
                body: String::new(),
            })
        }
    }

    fn collection() -> Collection {
        Collection {
            id: CollectionId(1),
            name: "Main".to_string(),
            protocol: "Overdrive".to_string(),
            external_account_id: Some("acct".to_string()),
            libraries: vec![],
        }
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_collection(collection());
        store
    }

    /// Add an Overdrive identifier with a license pool and a work.
    fn add_title(store: &mut MemoryStore, n: u64, owned: u32, open_access: bool) -> String {
        let identifier = Identifier::new(IdentifierId(n), IdentifierType::Overdrive, format!("od-{}", n));
        let urn = identifier.urn();
        store.add_identifier(identifier);
        store.set_license_pool(LicensePool {
            identifier: IdentifierId(n),
            collection: CollectionId(1),
            licenses_owned: owned,
            open_access,
        });
        store.add_work(Work::new(WorkId(n), IdentifierId(n), format!("Title {}", n)));
        urn
    }

    fn provider(lookup: &Arc<MockLookup>, operation: SyncOperation) -> CoverageProvider {
        let lookup: Arc<dyn LookupClient> = lookup.clone();
        CoverageProvider::new(lookup, collection(), operation, SyncConfig::default()).unwrap()
    }

    fn status(store: &MemoryStore, n: u64, operation: Operation) -> Option<CoverageStatus> {
        store
            .coverage_record(&CoverageKey::wrangler(IdentifierId(n), operation, CollectionId(1)))
            .map(|r| r.status)
    }

    #[test]
    fn test_unauthenticated_lookup_is_a_configuration_error() {
        let lookup: Arc<dyn LookupClient> = Arc::new(MockLookup::default());
        let result = CoverageProvider::new(lookup, collection(), SyncOperation::Register, SyncConfig::default());
        assert!(matches!(result, Err(CoverageError::Configuration(_))));
    }

    #[test]
    fn test_sync_operation_from_str() {
        assert_eq!("reap".parse::<SyncOperation>().unwrap(), SyncOperation::Reap);
        assert!(matches!(
            "sideload".parse::<SyncOperation>(),
            Err(CoverageError::UnknownOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_records_outcomes_and_marks_ready() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        let a = add_title(&mut store, 1, 1, false);
        let b = add_title(&mut store, 2, 0, true);
        let c = add_title(&mut store, 3, 1, false);
        add_title(&mut store, 4, 0, false);
        lookup.respond(&a, 201);
        lookup.respond(&b, 202);
        lookup.respond(&c, 400);

        let report = provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();

        assert_eq!(report.selected, 3);
        assert_eq!(report.successes, 2);
        assert_eq!(report.persistent_failures, 1);
        assert_eq!(status(&store, 1, Operation::Sync), Some(CoverageStatus::Success));
        assert_eq!(status(&store, 2, Operation::Sync), Some(CoverageStatus::Success));
        assert_eq!(status(&store, 3, Operation::Sync), Some(CoverageStatus::PersistentFailure));
        assert_eq!(status(&store, 4, Operation::Sync), None);
        assert!(store.work(WorkId(1)).unwrap().presentation_ready);
        assert!(!store.work(WorkId(3)).unwrap().presentation_ready);
    }

    #[tokio::test]
    async fn test_rerun_without_changes_writes_nothing() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        let a = add_title(&mut store, 1, 1, false);
        let b = add_title(&mut store, 2, 1, false);
        lookup.respond(&a, 201);
        lookup.respond(&b, 404);

        provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();
        let writes = store.write_count();
        let calls = lookup.calls().len();

        let report = provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();
        assert_eq!(report.selected, 0);
        assert_eq!(store.write_count(), writes);
        assert_eq!(lookup.calls().len(), calls);
    }

    #[tokio::test]
    async fn test_batches_are_bounded_and_sequential() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        for n in 1..=60 {
            let urn = add_title(&mut store, n, 1, false);
            lookup.respond(&urn, 201);
        }

        let report = provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();
        let sizes: Vec<usize> = lookup.calls().iter().map(|(_, urns)| urns.len()).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
        assert_eq!(report.batches, 3);
        assert_eq!(report.successes, 60);
        let order: Vec<IdentifierId> = report.outcomes.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, (1..=60).map(IdentifierId).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient_for_whole_batch() {
        let mut store = store();
        let lookup = Arc::new(MockLookup {
            fail_transport: true,
            ..MockLookup::new()
        });
        add_title(&mut store, 1, 1, false);
        add_title(&mut store, 2, 1, false);

        let report = provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();
        assert_eq!(report.transient_failures, 2);
        assert_eq!(status(&store, 1, Operation::Sync), Some(CoverageStatus::TransientFailure));

        // Transient failures are picked up again.
        assert_eq!(
            provider(&lookup, SyncOperation::Register).items_that_need_coverage(&store),
            vec![IdentifierId(1), IdentifierId(2)]
        );
    }

    #[tokio::test]
    async fn test_missing_response_is_transient() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        add_title(&mut store, 1, 1, false);

        provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();
        assert_eq!(status(&store, 1, Operation::Sync), Some(CoverageStatus::TransientFailure));
    }

    #[tokio::test]
    async fn test_entry_with_data_is_success() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        let urn = add_title(&mut store, 1, 1, false);
        lookup.entries.lock().unwrap().push(urn);

        provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();
        assert_eq!(status(&store, 1, Operation::Sync), Some(CoverageStatus::Success));
    }

    #[tokio::test]
    async fn test_response_urns_are_normalized() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        let urn = add_title(&mut store, 1, 1, false);
        lookup.respond(&urn, 201);
        lookup.aliases.lock().unwrap().push((
            urn.clone(),
            "urn:librarysimplified.org/terms/id/Overdrive ID/od-1".to_string(),
        ));

        let report = provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();
        assert_eq!(report.successes, 1);
        assert_eq!(status(&store, 1, Operation::Sync), Some(CoverageStatus::Success));
    }

    #[tokio::test]
    async fn test_vendor_ids_are_sent_as_isbn() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());

        let isbn = Identifier::new(IdentifierId(100), IdentifierType::Isbn, "9780000000001");
        let mut axis = Identifier::new(IdentifierId(1), IdentifierType::Axis360, "ax-1");
        axis.equivalents = vec![IdentifierId(100)];
        let lonely = Identifier::new(IdentifierId(2), IdentifierType::Bibliotheca, "bib-2");
        let lonely_urn = lonely.urn();
        store.add_identifier(isbn);
        store.add_identifier(axis);
        store.add_identifier(lonely);
        for n in [1, 2] {
            store.set_license_pool(LicensePool {
                identifier: IdentifierId(n),
                collection: CollectionId(1),
                licenses_owned: 1,
                open_access: false,
            });
        }
        lookup.respond("urn:isbn:9780000000001", 201);
        lookup.respond(&lonely_urn, 201);

        provider(&lookup, SyncOperation::Register).run(&mut store).await.unwrap();

        let calls = lookup.calls();
        assert_eq!(calls[0].1, vec!["urn:isbn:9780000000001".to_string(), lonely_urn]);
        assert_eq!(status(&store, 1, Operation::Sync), Some(CoverageStatus::Success));
        assert_eq!(status(&store, 2, Operation::Sync), Some(CoverageStatus::Success));
    }

    #[tokio::test]
    async fn test_reap_removes_sync_record() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        let a = add_title(&mut store, 1, 0, false);
        let b = add_title(&mut store, 2, 0, false);
        add_title(&mut store, 3, 0, false);
        add_title(&mut store, 4, 2, false);
        for n in [1, 2, 4] {
            store
                .upsert_coverage(CoverageRecord::success(CoverageKey::wrangler(
                    IdentifierId(n),
                    Operation::Sync,
                    CollectionId(1),
                )))
                .unwrap();
        }
        lookup.respond(&a, 200);
        lookup.respond(&b, 404);

        let reaper = provider(&lookup, SyncOperation::Reap);
        assert_eq!(reaper.items_that_need_coverage(&store), vec![IdentifierId(1), IdentifierId(2)]);

        let report = reaper.run(&mut store).await.unwrap();
        assert_eq!(report.successes, 2);
        for n in [1, 2] {
            assert_eq!(status(&store, n, Operation::Reap), Some(CoverageStatus::Success));
            assert_eq!(status(&store, n, Operation::Sync), None);
        }
        assert_eq!(status(&store, 4, Operation::Sync), Some(CoverageStatus::Success));
    }

    #[tokio::test]
    async fn test_relicensed_identifier_is_registered_once() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        let urn = add_title(&mut store, 1, 0, false);
        lookup.respond(&urn, 201);
        store
            .upsert_coverage(CoverageRecord::success(CoverageKey::wrangler(
                IdentifierId(1),
                Operation::Reap,
                CollectionId(1),
            )))
            .unwrap();

        // Reaped and unlicensed: nothing to register.
        let registrar = provider(&lookup, SyncOperation::Register);
        let report = registrar.run(&mut store).await.unwrap();
        assert_eq!(report.selected, 0);

        // Licensed again.
        store.set_license_pool(LicensePool {
            identifier: IdentifierId(1),
            collection: CollectionId(1),
            licenses_owned: 3,
            open_access: false,
        });
        assert_eq!(registrar.items_that_need_coverage(&store), Vec::<IdentifierId>::new());

        let report = registrar.run(&mut store).await.unwrap();
        assert_eq!(report.reconciled, 1);
        assert_eq!(report.selected, 1);
        assert_eq!(status(&store, 1, Operation::Reap), None);
        assert_eq!(status(&store, 1, Operation::Sync), Some(CoverageStatus::Success));

        let report = registrar.run(&mut store).await.unwrap();
        assert_eq!(report.selected, 0);
    }

    #[tokio::test]
    async fn test_upload_retries_only_transient_failures() {
        let mut store = store();
        let lookup = Arc::new(MockLookup::new());
        add_title(&mut store, 1, 1, false);
        add_title(&mut store, 2, 1, false);
        add_title(&mut store, 3, 1, false);
        let upload_key = |n| CoverageKey::wrangler(IdentifierId(n), Operation::MetadataUpload, CollectionId(1));
        store
            .upsert_coverage(CoverageRecord::failure(upload_key(1), true, "timeout"))
            .unwrap();
        store
            .upsert_coverage(CoverageRecord::failure(upload_key(2), false, "rejected"))
            .unwrap();

        let uploader = provider(&lookup, SyncOperation::Upload);
        assert_eq!(uploader.items_that_need_coverage(&store), vec![IdentifierId(1)]);

        let report = uploader.run(&mut store).await.unwrap();
        assert_eq!(report.successes, 1);
        assert_eq!(status(&store, 1, Operation::MetadataUpload), Some(CoverageStatus::Success));
        assert_eq!(status(&store, 2, Operation::MetadataUpload), Some(CoverageStatus::PersistentFailure));
        assert_eq!(status(&store, 3, Operation::MetadataUpload), None);

        let calls = lookup.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "add_with_metadata");
        assert!(calls[0].1[0].contains("Title 1"));
    }

    #[test]
    fn test_wrangler_lookup_needs_integration() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            wrangler_lookup(&store, Duration::from_secs(1)),
            Err(CoverageError::Configuration(_))
        ));

        let mut integration = crate::model::ExternalIntegration::new(
            crate::model::IntegrationId(1),
            Protocol::MetadataWrangler,
            Goal::Metadata,
        );
        integration.url = Some("http://wrangler.example/".to_string());
        store.save_integration(integration.clone()).unwrap();
        let lookup = wrangler_lookup(&store, Duration::from_secs(1)).unwrap();
        assert_eq!(lookup.base_url(), "http://wrangler.example");
        assert!(!lookup.authenticated());

        integration.username = Some("client".to_string());
        integration.password = Some("secret".to_string());
        store.save_integration(integration).unwrap();
        assert!(wrangler_lookup(&store, Duration::from_secs(1)).unwrap().authenticated());
    }

    #[tokio::test]
    async fn test_completed_batches_survive_an_interrupted_run() {
        let temp = tempfile::TempDir::new().unwrap();
        let lookup = Arc::new(MockLookup {
            stall_after: Some(1),
            ..MockLookup::new()
        });

        {
            let mut store = MemoryStore::open(temp.path()).unwrap();
            store.add_collection(collection());
            for n in 1..=30 {
                let urn = add_title(&mut store, n, 1, false);
                lookup.respond(&urn, 201);
            }
            store.commit().unwrap();

            let registrar = provider(&lookup, SyncOperation::Register);
            let run = registrar.run(&mut store);
            assert!(tokio::time::timeout(Duration::from_millis(200), run).await.is_err());
        }

        let store = MemoryStore::open(temp.path()).unwrap();
        for n in 1..=25 {
            assert_eq!(status(&store, n, Operation::Sync), Some(CoverageStatus::Success));
        }
        for n in 26..=30 {
            assert_eq!(status(&store, n, Operation::Sync), None);
        }

        // The next run picks up where the interrupted one stopped.
        let registrar = provider(&lookup, SyncOperation::Register);
        assert_eq!(
            registrar.items_that_need_coverage(&store),
            (26..=30).map(IdentifierId).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_synchronize_unknown_collection() {
        let mut store = MemoryStore::new();
        let lookup: Arc<dyn LookupClient> = Arc::new(MockLookup::new());
        let result = synchronize(&mut store, lookup, CollectionId(5), SyncOperation::Reap, SyncConfig::default()).await;
        assert!(matches!(result, Err(CoverageError::Store(StoreError::NotFound { .. }))));
    }
}
