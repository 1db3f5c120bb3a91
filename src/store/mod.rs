//! Persistence for the catalog.
//!
//! [`CatalogStore`] is the seam between the lane builder, the coverage
//! engine and the admin controllers on one side and storage on the other.
//! [`MemoryStore`] keeps everything in memory and snapshots it to a JSON
//! file in the data directory.
//!
//! Methods are synchronous. Callers that share a store across tasks wrap it
//! in a `tokio::sync::RwLock`, the same way the API shares its node.

pub mod memory;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::{
    Collection, CollectionId, CoverageKey, CoverageRecord, CustomList, CustomListId,
    ExternalIntegration, Identifier, IdentifierId, IntegrationId, Lane, LaneSettings, Library,
    LibraryId, LicensePool, Operation, Work, WorkId,
};

pub use memory::MemoryStore;

/// Errors raised by store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage for libraries, license pools, coverage records, lanes and
/// integrations.
pub trait CatalogStore: Send + Sync {
    // --- Libraries and collections ---

    fn library(&self, id: LibraryId) -> Result<Library>;

    fn library_by_short_name(&self, short_name: &str) -> Result<Library>;

    fn libraries(&self) -> Vec<Library>;

    fn save_lane_settings(&mut self, library: LibraryId, settings: LaneSettings) -> Result<()>;

    fn collection(&self, id: CollectionId) -> Result<Collection>;

    fn collections_for_library(&self, library: LibraryId) -> Vec<Collection>;

    fn custom_list(&self, id: CustomListId) -> Result<CustomList>;

    // --- Identifiers, license pools and works ---

    fn identifier(&self, id: IdentifierId) -> Result<Identifier>;

    /// License pools in a collection, ordered by identifier.
    fn license_pools(&self, collection: CollectionId) -> Vec<LicensePool>;

    fn work_for_identifier(&self, identifier: IdentifierId) -> Option<Work>;

    fn mark_presentation_ready(&mut self, work: WorkId) -> Result<()>;

    /// Count of licensed works in a library's collections, by language.
    fn estimated_holdings_by_language(&self, library: LibraryId) -> BTreeMap<String, u64>;

    // --- Coverage records ---

    fn coverage_record(&self, key: &CoverageKey) -> Option<CoverageRecord>;

    /// Records for one operation in one collection.
    fn coverage_records(&self, collection: CollectionId, operation: Operation) -> Vec<CoverageRecord>;

    /// Insert or replace the record with the same key.
    fn upsert_coverage(&mut self, record: CoverageRecord) -> Result<()>;

    /// Returns whether a record was removed.
    fn delete_coverage(&mut self, key: &CoverageKey) -> Result<bool>;

    // --- Lanes ---

    /// Replace a library's whole lane tree. Ids are freshly assigned.
    fn replace_lanes(&mut self, library: LibraryId, lanes: Vec<Lane>) -> Result<()>;

    /// A library's top-level lanes ordered by priority, children attached.
    fn lanes(&self, library: LibraryId) -> Vec<Lane>;

    // --- External integrations ---

    fn integrations(&self) -> Vec<ExternalIntegration>;

    fn integration(&self, id: IntegrationId) -> Result<ExternalIntegration>;

    fn next_integration_id(&mut self) -> IntegrationId;

    /// Insert or replace the integration with the same id.
    fn save_integration(&mut self, integration: ExternalIntegration) -> Result<()>;

    fn delete_integration(&mut self, id: IntegrationId) -> Result<()>;

    // --- Durability ---

    /// Make all writes so far durable.
    fn commit(&mut self) -> Result<()>;
}
