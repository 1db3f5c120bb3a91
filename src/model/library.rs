//! Libraries, their collections and the license pools in them.

use serde::{Deserialize, Serialize};

use super::{CollectionId, CustomListId, IdentifierId, LibraryId};

/// Per-library language bucket settings that drive lane creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSettings {
    pub large_collections: Option<Vec<String>>,
    pub small_collections: Option<Vec<String>>,
    pub tiny_collections: Option<Vec<String>>,
}

impl LaneSettings {
    /// True when no bucket has been configured.
    pub fn is_unset(&self) -> bool {
        [&self.large_collections, &self.small_collections, &self.tiny_collections]
            .iter()
            .all(|bucket| bucket.as_ref().map_or(true, Vec::is_empty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: LibraryId,

    pub name: String,

    /// URL-safe name used in admin routes.
    pub short_name: String,

    /// Language used when holdings are unknown.
    #[serde(default)]
    pub default_language: Option<String>,

    #[serde(default)]
    pub lane_settings: LaneSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,

    pub name: String,

    /// Licensing protocol, e.g. "Overdrive" or "OPDS Import".
    pub protocol: String,

    pub external_account_id: Option<String>,

    #[serde(default)]
    pub libraries: Vec<LibraryId>,
}

impl Collection {
    /// Token naming this collection on the metadata wrangler.
    pub fn metadata_identifier(&self) -> String {
        let account = self.external_account_id.as_deref().unwrap_or(&self.name);
        urlencoding::encode(&format!("{}:{}", self.protocol, account)).into_owned()
    }
}

/// Licenses for one identifier in one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePool {
    pub identifier: IdentifierId,
    pub collection: CollectionId,
    pub licenses_owned: u32,
    pub open_access: bool,
}

impl LicensePool {
    /// Whether patrons could borrow through this pool.
    pub fn is_licensed(&self) -> bool {
        self.open_access || self.licenses_owned > 0
    }
}

/// A staff-curated list of titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomList {
    pub id: CustomListId,
    pub name: String,
    pub library: Option<LibraryId>,
}
