//! Lanes: the browsable hierarchy of a library's catalog.
//!
//! - [`classify`] sorts languages into large/small/tiny buckets by holdings
//! - [`builder`] turns buckets plus the [`genres`] taxonomy into a lane tree
//! - [`worklist`] and [`related`] describe lanes derived on the fly
//! - [`facets`] narrows and orders a lane's works into a search [`Filter`]

pub mod builder;
pub mod classify;
pub mod facets;
pub mod genres;
pub mod languages;
pub mod related;
pub mod worklist;

use thiserror::Error;

use crate::model::WorkId;
use crate::store::StoreError;

pub use builder::{build_lane_tree, create_default_lanes, load_lanes, LaneTreeBuilder};
pub use classify::{classify_holdings, lane_configuration_from_collection_sizes, LaneConfiguration};
pub use facets::{EntryPoint, Facets, Filter};
pub use genres::{GenreNode, GenreTaxonomy};
pub use related::{related_books, RecommendationProvider, RelatedBooksLane};
pub use worklist::WorkList;

/// Errors building or deriving lanes.
#[derive(Error, Debug)]
pub enum LaneError {
    #[error("Malformed genre name {name:?}: {reason}")]
    MalformedGenre { name: String, reason: &'static str },

    #[error("No related books for work {0}")]
    NoRelatedBooks(WorkId),

    #[error("SeriesLane can't be created without series")]
    MissingSeries,

    #[error("ContributorLane can't be created without contributor")]
    MissingContributor,

    #[error("Recommendations unavailable: {0}")]
    Recommendations(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
