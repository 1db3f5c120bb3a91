//! In-memory catalog store with JSON snapshots.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CatalogStore, Result, StoreError};
use crate::model::{
    Audience, Collection, CollectionId, CoverageKey, CoverageRecord, CustomList, CustomListId,
    ExternalIntegration, Identifier, IdentifierId, IntegrationId, Lane, LaneId, LaneSettings,
    Library, LibraryId, LicensePool, Medium, Operation, Work, WorkId,
};

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "catalog.json";

/// A lane row: one lane with a pointer to its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LaneRow {
    id: LaneId,
    library: LibraryId,
    parent: Option<LaneId>,
    display_name: String,
    fiction: Option<bool>,
    audiences: Vec<Audience>,
    languages: Vec<String>,
    media: Option<Vec<Medium>>,
    genres: Vec<String>,
    priority: u32,
    visible: bool,
    list_datasource: Option<String>,
}

impl LaneRow {
    fn into_lane(self) -> Lane {
        Lane {
            id: Some(self.id),
            display_name: self.display_name,
            fiction: self.fiction,
            audiences: self.audiences.into_iter().collect(),
            languages: self.languages,
            media: self.media,
            genres: self.genres,
            priority: self.priority,
            visible: self.visible,
            list_datasource: self.list_datasource,
            children: Vec::new(),
        }
    }
}

/// Everything the store holds. This is what gets written to disk.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Catalog {
    #[serde(default)]
    libraries: Vec<Library>,
    #[serde(default)]
    collections: Vec<Collection>,
    #[serde(default)]
    custom_lists: Vec<CustomList>,
    #[serde(default)]
    identifiers: Vec<Identifier>,
    #[serde(default)]
    license_pools: Vec<LicensePool>,
    #[serde(default)]
    works: Vec<Work>,
    #[serde(default)]
    coverage: Vec<CoverageRecord>,
    #[serde(default)]
    lanes: Vec<LaneRow>,
    #[serde(default)]
    integrations: Vec<ExternalIntegration>,
    #[serde(default)]
    next_lane_id: u64,
    #[serde(default)]
    next_integration_id: u64,
}

/// In-memory [`CatalogStore`].
///
/// Constructed with [`MemoryStore::open`] it loads and saves a snapshot in
/// the given directory; constructed with [`MemoryStore::new`] it never
/// touches disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: Catalog,
    snapshot_path: Option<PathBuf>,
    writes: u64,
}

impl MemoryStore {
    /// Create an empty store that is never written to disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store in `data_dir`, loading the snapshot if one exists.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(SNAPSHOT_FILE);

        let catalog = if path.exists() {
            let bytes = fs::read(&path)?;
            let catalog: Catalog = serde_json::from_slice(&bytes)?;
            info!(
                path = %path.display(),
                libraries = catalog.libraries.len(),
                collections = catalog.collections.len(),
                coverage_records = catalog.coverage.len(),
                "Loaded catalog snapshot"
            );
            catalog
        } else {
            info!(path = %path.display(), "Starting with an empty catalog");
            Catalog::default()
        };

        Ok(Self {
            catalog,
            snapshot_path: Some(path),
            writes: 0,
        })
    }

    /// Number of mutating calls made since the store was opened.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    fn record_write(&mut self) {
        self.writes += 1;
    }

    // --- Seeding ---

    pub fn add_library(&mut self, library: Library) {
        self.record_write();
        self.catalog.libraries.retain(|l| l.id != library.id);
        self.catalog.libraries.push(library);
    }

    pub fn add_collection(&mut self, collection: Collection) {
        self.record_write();
        self.catalog.collections.retain(|c| c.id != collection.id);
        self.catalog.collections.push(collection);
    }

    pub fn add_custom_list(&mut self, list: CustomList) {
        self.record_write();
        self.catalog.custom_lists.retain(|l| l.id != list.id);
        self.catalog.custom_lists.push(list);
    }

    pub fn add_identifier(&mut self, identifier: Identifier) {
        self.record_write();
        self.catalog.identifiers.retain(|i| i.id != identifier.id);
        self.catalog.identifiers.push(identifier);
    }

    /// Insert or replace the pool for the same (identifier, collection).
    pub fn set_license_pool(&mut self, pool: LicensePool) {
        self.record_write();
        self.catalog
            .license_pools
            .retain(|p| !(p.identifier == pool.identifier && p.collection == pool.collection));
        self.catalog.license_pools.push(pool);
    }

    pub fn add_work(&mut self, work: Work) {
        self.record_write();
        self.catalog.works.retain(|w| w.id != work.id);
        self.catalog.works.push(work);
    }

    pub fn work(&self, id: WorkId) -> Option<&Work> {
        self.catalog.works.iter().find(|w| w.id == id)
    }

    fn lane_subtree(rows: &[LaneRow], parent: Option<LaneId>) -> Vec<Lane> {
        let mut level: Vec<&LaneRow> = rows.iter().filter(|r| r.parent == parent).collect();
        level.sort_by_key(|r| r.priority);
        level
            .into_iter()
            .map(|row| {
                let children = Self::lane_subtree(rows, Some(row.id));
                let mut lane = row.clone().into_lane();
                lane.children = children;
                lane
            })
            .collect()
    }

    fn flatten_lane(&mut self, library: LibraryId, parent: Option<LaneId>, lane: Lane, rows: &mut Vec<LaneRow>) {
        self.catalog.next_lane_id += 1;
        let id = LaneId(self.catalog.next_lane_id);
        rows.push(LaneRow {
            id,
            library,
            parent,
            display_name: lane.display_name,
            fiction: lane.fiction,
            audiences: lane.audiences.into_iter().collect(),
            languages: lane.languages,
            media: lane.media,
            genres: lane.genres,
            priority: lane.priority,
            visible: lane.visible,
            list_datasource: lane.list_datasource,
        });
        for child in lane.children {
            self.flatten_lane(library, Some(id), child, rows);
        }
    }
}

impl CatalogStore for MemoryStore {
    fn library(&self, id: LibraryId) -> Result<Library> {
        self.catalog
            .libraries
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Library", id))
    }

    fn library_by_short_name(&self, short_name: &str) -> Result<Library> {
        self.catalog
            .libraries
            .iter()
            .find(|l| l.short_name == short_name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Library", short_name))
    }

    fn libraries(&self) -> Vec<Library> {
        self.catalog.libraries.clone()
    }

    fn save_lane_settings(&mut self, library: LibraryId, settings: LaneSettings) -> Result<()> {
        let target = self
            .catalog
            .libraries
            .iter_mut()
            .find(|l| l.id == library)
            .ok_or_else(|| StoreError::not_found("Library", library))?;
        target.lane_settings = settings;
        self.record_write();
        Ok(())
    }

    fn collection(&self, id: CollectionId) -> Result<Collection> {
        self.catalog
            .collections
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Collection", id))
    }

    fn collections_for_library(&self, library: LibraryId) -> Vec<Collection> {
        self.catalog
            .collections
            .iter()
            .filter(|c| c.libraries.contains(&library))
            .cloned()
            .collect()
    }

    fn custom_list(&self, id: CustomListId) -> Result<CustomList> {
        self.catalog
            .custom_lists
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Custom list", id))
    }

    fn identifier(&self, id: IdentifierId) -> Result<Identifier> {
        self.catalog
            .identifiers
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Identifier", id))
    }

    fn license_pools(&self, collection: CollectionId) -> Vec<LicensePool> {
        let mut pools: Vec<LicensePool> = self
            .catalog
            .license_pools
            .iter()
            .filter(|p| p.collection == collection)
            .cloned()
            .collect();
        pools.sort_by_key(|p| p.identifier);
        pools
    }

    fn work_for_identifier(&self, identifier: IdentifierId) -> Option<Work> {
        self.catalog.works.iter().find(|w| w.identifier == identifier).cloned()
    }

    fn mark_presentation_ready(&mut self, work: WorkId) -> Result<()> {
        let target = self
            .catalog
            .works
            .iter_mut()
            .find(|w| w.id == work)
            .ok_or_else(|| StoreError::not_found("Work", work))?;
        target.presentation_ready = true;
        self.record_write();
        Ok(())
    }

    fn estimated_holdings_by_language(&self, library: LibraryId) -> BTreeMap<String, u64> {
        let collections: Vec<CollectionId> = self
            .collections_for_library(library)
            .into_iter()
            .map(|c| c.id)
            .collect();

        let mut counted: Vec<WorkId> = Vec::new();
        let mut holdings = BTreeMap::new();
        for pool in &self.catalog.license_pools {
            if !collections.contains(&pool.collection) || !pool.is_licensed() {
                continue;
            }
            let Some(work) = self.catalog.works.iter().find(|w| w.identifier == pool.identifier) else {
                continue;
            };
            let Some(language) = &work.language else {
                continue;
            };
            if counted.contains(&work.id) {
                continue;
            }
            counted.push(work.id);
            *holdings.entry(language.clone()).or_insert(0) += 1;
        }
        holdings
    }

    fn coverage_record(&self, key: &CoverageKey) -> Option<CoverageRecord> {
        self.catalog.coverage.iter().find(|r| &r.key == key).cloned()
    }

    fn coverage_records(&self, collection: CollectionId, operation: Operation) -> Vec<CoverageRecord> {
        self.catalog
            .coverage
            .iter()
            .filter(|r| r.key.collection == Some(collection) && r.key.operation == operation)
            .cloned()
            .collect()
    }

    fn upsert_coverage(&mut self, record: CoverageRecord) -> Result<()> {
        self.record_write();
        match self.catalog.coverage.iter_mut().find(|r| r.key == record.key) {
            Some(existing) => *existing = record,
            None => self.catalog.coverage.push(record),
        }
        Ok(())
    }

    fn delete_coverage(&mut self, key: &CoverageKey) -> Result<bool> {
        let before = self.catalog.coverage.len();
        self.catalog.coverage.retain(|r| &r.key != key);
        let removed = self.catalog.coverage.len() != before;
        if removed {
            self.record_write();
        }
        Ok(removed)
    }

    fn replace_lanes(&mut self, library: LibraryId, lanes: Vec<Lane>) -> Result<()> {
        // Fail before touching anything if the library is unknown.
        self.library(library)?;

        let mut rows = Vec::new();
        for lane in lanes {
            self.flatten_lane(library, None, lane, &mut rows);
        }
        self.catalog.lanes.retain(|row| row.library != library);
        debug!(library = %library, lanes = rows.len(), "Replaced lane tree");
        self.catalog.lanes.extend(rows);
        self.record_write();
        Ok(())
    }

    fn lanes(&self, library: LibraryId) -> Vec<Lane> {
        let rows: Vec<LaneRow> = self
            .catalog
            .lanes
            .iter()
            .filter(|row| row.library == library)
            .cloned()
            .collect();
        Self::lane_subtree(&rows, None)
    }

    fn integrations(&self) -> Vec<ExternalIntegration> {
        self.catalog.integrations.clone()
    }

    fn integration(&self, id: IntegrationId) -> Result<ExternalIntegration> {
        self.catalog
            .integrations
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Integration", id))
    }

    fn next_integration_id(&mut self) -> IntegrationId {
        let highest = self.catalog.integrations.iter().map(|i| i.id.0).max().unwrap_or(0);
        self.catalog.next_integration_id = self.catalog.next_integration_id.max(highest) + 1;
        IntegrationId(self.catalog.next_integration_id)
    }

    fn save_integration(&mut self, integration: ExternalIntegration) -> Result<()> {
        self.record_write();
        match self.catalog.integrations.iter_mut().find(|i| i.id == integration.id) {
            Some(existing) => *existing = integration,
            None => self.catalog.integrations.push(integration),
        }
        Ok(())
    }

    fn delete_integration(&mut self, id: IntegrationId) -> Result<()> {
        let before = self.catalog.integrations.len();
        self.catalog.integrations.retain(|i| i.id != id);
        if self.catalog.integrations.len() == before {
            return Err(StoreError::not_found("Integration", id));
        }
        self.record_write();
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.catalog)?)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "Catalog snapshot written");
        Ok(())
    }
}
