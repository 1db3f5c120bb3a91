//! Catalog data model.
//!
//! Everything here is plain serde data. Relationships are expressed with the
//! id newtypes below and resolved through [`crate::store::CatalogStore`].

pub mod coverage;
pub mod identifier;
pub mod integration;
pub mod lane;
pub mod library;
pub mod work;

use serde::{Deserialize, Serialize};

pub use coverage::{CoverageKey, CoverageRecord, CoverageStatus, Operation};
pub use identifier::{normalize_urn, Identifier, IdentifierError, IdentifierType};
pub use integration::{ExternalIntegration, Goal, Protocol};
pub use lane::{Audience, Lane, Medium};
pub use library::{Collection, CustomList, LaneSettings, Library, LicensePool};
pub use work::{Contribution, Contributor, Work};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Primary key of an [`Identifier`].
    IdentifierId
);
id_type!(
    /// Primary key of a [`Collection`].
    CollectionId
);
id_type!(
    /// Primary key of a [`Library`].
    LibraryId
);
id_type!(
    /// Primary key of a persisted [`Lane`].
    LaneId
);
id_type!(
    /// Primary key of an [`ExternalIntegration`].
    IntegrationId
);
id_type!(WorkId);
id_type!(ContributorId);
id_type!(CustomListId);
