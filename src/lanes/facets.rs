//! Facets: how a lane's works are narrowed and ordered for one request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Audience, CollectionId, CustomListId, IdentifierId, Medium};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionFacet {
    Full,
    Featured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityFacet {
    All,
    Now,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetOrder {
    Title,
    Author,
    AddedToCollection,
    LastUpdate,
    SeriesPosition,
    WorkId,
    Random,
}

/// Top-level split of a catalog by medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    Everything,
    EBooks,
    AudioBooks,
}

impl EntryPoint {
    fn media(&self) -> Option<Vec<Medium>> {
        match self {
            Self::Everything => None,
            Self::EBooks => Some(vec![Medium::Book]),
            Self::AudioBooks => Some(vec![Medium::Audio]),
        }
    }
}

/// Which kind of lane the facets belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetKind {
    Standard,
    /// Works in the named series.
    Series(String),
    /// Works by the contributor with this key.
    Contributor(String),
    /// Machine-crawlable feeds: everything, most recently changed first.
    Crawlable,
}

/// The search query a lane produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub collections: Vec<CollectionId>,
    pub languages: Vec<String>,
    pub audiences: BTreeSet<Audience>,
    pub media: Option<Vec<Medium>>,
    pub fiction: Option<bool>,
    pub genres: Vec<String>,
    pub series: Option<String>,
    pub author: Option<String>,
    pub identifiers: Vec<IdentifierId>,
    pub customlists: Vec<CustomListId>,
    pub list_datasource: Option<String>,
    pub availability: AvailabilityFacet,
    pub collection_facet: CollectionFacet,
    pub order: FacetOrder,
    pub order_ascending: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            collections: Vec::new(),
            languages: Vec::new(),
            audiences: BTreeSet::new(),
            media: None,
            fiction: None,
            genres: Vec::new(),
            series: None,
            author: None,
            identifiers: Vec::new(),
            customlists: Vec::new(),
            list_datasource: None,
            availability: AvailabilityFacet::All,
            collection_facet: CollectionFacet::Full,
            order: FacetOrder::Author,
            order_ascending: true,
        }
    }
}

/// Facet values a client may switch between, per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledFacets {
    pub orders: Vec<FacetOrder>,
    pub availabilities: Vec<AvailabilityFacet>,
    pub collections: Vec<CollectionFacet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub collection: CollectionFacet,
    pub availability: AvailabilityFacet,
    pub order: FacetOrder,
    pub order_ascending: bool,
    pub entrypoint: EntryPoint,
    pub kind: FacetKind,
}

impl Default for Facets {
    fn default() -> Self {
        Self::standard()
    }
}

impl Facets {
    pub fn standard() -> Self {
        Self {
            collection: CollectionFacet::Full,
            availability: AvailabilityFacet::All,
            order: FacetOrder::Author,
            order_ascending: true,
            entrypoint: EntryPoint::Everything,
            kind: FacetKind::Standard,
        }
    }

    /// Series facets sort by position in the series unless told otherwise.
    pub fn series(series: impl Into<String>) -> Self {
        Self {
            order: FacetOrder::SeriesPosition,
            kind: FacetKind::Series(series.into()),
            ..Self::standard()
        }
    }

    pub fn contributor(key: impl Into<String>) -> Self {
        Self {
            order: FacetOrder::Title,
            kind: FacetKind::Contributor(key.into()),
            ..Self::standard()
        }
    }

    pub fn crawlable() -> Self {
        Self {
            collection: CollectionFacet::Full,
            availability: AvailabilityFacet::All,
            order: FacetOrder::LastUpdate,
            order_ascending: false,
            entrypoint: EntryPoint::Everything,
            kind: FacetKind::Crawlable,
        }
    }

    /// Orders this kind of facet supports, the default first.
    pub fn available_orders(&self) -> Vec<FacetOrder> {
        match self.kind {
            FacetKind::Standard => vec![
                FacetOrder::Author,
                FacetOrder::Title,
                FacetOrder::AddedToCollection,
                FacetOrder::Random,
            ],
            FacetKind::Series(_) => vec![
                FacetOrder::SeriesPosition,
                FacetOrder::Title,
                FacetOrder::Author,
                FacetOrder::AddedToCollection,
                FacetOrder::Random,
            ],
            FacetKind::Contributor(_) => vec![
                FacetOrder::Title,
                FacetOrder::Author,
                FacetOrder::AddedToCollection,
                FacetOrder::Random,
            ],
            FacetKind::Crawlable => vec![FacetOrder::LastUpdate],
        }
    }

    pub fn default_order(&self) -> FacetOrder {
        self.available_orders()[0]
    }

    /// Switch ordering. Orders this kind does not support select the default.
    pub fn with_order(mut self, order: FacetOrder, ascending: bool) -> Self {
        self.order = if self.available_orders().contains(&order) {
            order
        } else {
            self.default_order()
        };
        self.order_ascending = ascending;
        self
    }

    pub fn enabled_facets(&self) -> EnabledFacets {
        match self.kind {
            FacetKind::Crawlable => EnabledFacets {
                orders: vec![FacetOrder::LastUpdate],
                availabilities: vec![AvailabilityFacet::All],
                collections: vec![CollectionFacet::Full],
            },
            _ => EnabledFacets {
                orders: self.available_orders(),
                availabilities: vec![AvailabilityFacet::All, AvailabilityFacet::Now, AvailabilityFacet::Always],
                collections: vec![CollectionFacet::Full, CollectionFacet::Featured],
            },
        }
    }

    /// Same facets under a different entry point.
    pub fn navigate(&self, entrypoint: EntryPoint) -> Self {
        Self {
            entrypoint,
            ..self.clone()
        }
    }

    pub fn modify_search_filter(&self, filter: &mut Filter) {
        filter.availability = self.availability;
        filter.collection_facet = self.collection;
        filter.order = self.order;
        filter.order_ascending = self.order_ascending;

        if let Some(entry_media) = self.entrypoint.media() {
            filter.media = Some(match filter.media.take() {
                None => entry_media,
                Some(mut media) => {
                    media.retain(|m| entry_media.contains(m));
                    media
                }
            });
        }

        match &self.kind {
            FacetKind::Series(series) => filter.series = Some(series.clone()),
            FacetKind::Contributor(key) => filter.author = Some(key.clone()),
            FacetKind::Standard | FacetKind::Crawlable => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_facets_default_to_series_position() {
        let facets = Facets::series("Discworld");
        assert_eq!(facets.order, FacetOrder::SeriesPosition);
        assert_eq!(facets.available_orders()[0], FacetOrder::SeriesPosition);

        let mut filter = Filter::default();
        facets.modify_search_filter(&mut filter);
        assert_eq!(filter.series.as_deref(), Some("Discworld"));
        assert_eq!(filter.order, FacetOrder::SeriesPosition);
    }

    #[test]
    fn test_unsupported_order_falls_back_to_default() {
        let facets = Facets::series("Discworld").with_order(FacetOrder::LastUpdate, false);
        assert_eq!(facets.order, FacetOrder::SeriesPosition);

        let facets = Facets::standard().with_order(FacetOrder::Title, true);
        assert_eq!(facets.order, FacetOrder::Title);
    }

    #[test]
    fn test_crawlable_defaults() {
        let facets = Facets::crawlable();
        assert_eq!(facets.collection, CollectionFacet::Full);
        assert_eq!(facets.availability, AvailabilityFacet::All);
        assert_eq!(facets.order, FacetOrder::LastUpdate);
        assert!(!facets.order_ascending);

        let enabled = facets.enabled_facets();
        assert_eq!(enabled.orders.len(), 1);
        assert_eq!(enabled.availabilities.len(), 1);
        assert_eq!(enabled.collections.len(), 1);
    }

    #[test]
    fn test_navigate_keeps_kind() {
        let facets = Facets::contributor("Jane Doe").navigate(EntryPoint::AudioBooks);
        assert_eq!(facets.kind, FacetKind::Contributor("Jane Doe".to_string()));
        assert_eq!(facets.entrypoint, EntryPoint::AudioBooks);

        let mut filter = Filter {
            media: Some(vec![Medium::Book, Medium::Audio]),
            ..Default::default()
        };
        facets.modify_search_filter(&mut filter);
        assert_eq!(filter.media, Some(vec![Medium::Audio]));
        assert_eq!(filter.author.as_deref(), Some("Jane Doe"));
    }
}
