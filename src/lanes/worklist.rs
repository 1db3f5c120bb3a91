//! The closed set of lane variants a feed can be generated from.
//!
//! Every variant answers the same three questions: what it is restricted to
//! ([`WorkList::restrictions`]), what search it runs
//! ([`WorkList::build_query`]) and how to link to it
//! ([`WorkList::url_arguments`]).

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use super::facets::{Facets, Filter};
use super::related::RelatedBooksLane;
use super::LaneError;
use crate::model::{
    Audience, Collection, CollectionId, Contributor, CustomList, CustomListId, IdentifierId, Lane,
    Library, Medium, Work, WorkId,
};

pub const FEED_ROUTE: &str = "feed";
pub const RELATED_BOOKS_ROUTE: &str = "related_books";
pub const SERIES_ROUTE: &str = "series";
pub const CONTRIBUTOR_ROUTE: &str = "contributor";
pub const RECOMMENDATIONS_ROUTE: &str = "recommendations";
pub const CRAWLABLE_LIBRARY_ROUTE: &str = "crawlable_library_feed";
pub const CRAWLABLE_COLLECTION_ROUTE: &str = "crawlable_collection_feed";
pub const CRAWLABLE_LIST_ROUTE: &str = "crawlable_list_feed";

/// Route name plus query arguments for linking to a lane.
pub type UrlArguments = (&'static str, BTreeMap<String, String>);

/// What a lane limits its works to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Restrictions {
    pub languages: Vec<String>,
    pub audiences: BTreeSet<Audience>,
    pub media: Option<Vec<Medium>>,
    pub fiction: Option<bool>,
    pub genres: Vec<String>,
}

/// Audiences a reader of a work with `source` audience may be shown.
pub fn audiences_for(source: Option<Audience>) -> BTreeSet<Audience> {
    match source {
        Some(Audience::Children) => [Audience::Children].into_iter().collect(),
        Some(Audience::YoungAdult) => Audience::juvenile(),
        _ => Audience::all(),
    }
}

/// Language and audience scope shared by lanes derived from one work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkScope {
    pub languages: Vec<String>,
    pub audiences: BTreeSet<Audience>,
}

impl WorkScope {
    pub fn new(languages: Vec<String>, audiences: BTreeSet<Audience>) -> Self {
        Self { languages, audiences }
    }

    pub fn for_work(work: &Work) -> Self {
        Self {
            languages: work.language.iter().cloned().collect(),
            audiences: audiences_for(work.audience),
        }
    }

    fn restrictions(&self) -> Restrictions {
        Restrictions {
            languages: self.languages.clone(),
            audiences: self.audiences.clone(),
            ..Default::default()
        }
    }

    fn url_arguments(&self) -> BTreeMap<String, String> {
        let mut languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();
        languages.sort_unstable();
        let mut audiences: Vec<&str> = self.audiences.iter().map(Audience::as_str).collect();
        audiences.sort_unstable();

        let mut args = BTreeMap::new();
        args.insert("languages".to_string(), languages.join(","));
        args.insert("audiences".to_string(), audiences.join(","));
        args
    }
}

/// Works in one series, in series order by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLane {
    pub series: String,
    pub scope: WorkScope,
}

impl SeriesLane {
    pub fn new(series: Option<&str>, scope: WorkScope) -> Result<Self, LaneError> {
        let series = series.map(str::trim).filter(|s| !s.is_empty()).ok_or(LaneError::MissingSeries)?;
        Ok(Self {
            series: series.to_string(),
            scope,
        })
    }
}

/// Works by one contributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorLane {
    pub contributor: Contributor,
    pub scope: WorkScope,
}

impl ContributorLane {
    pub fn new(contributor: Option<Contributor>, scope: WorkScope) -> Result<Self, LaneError> {
        let contributor = contributor
            .filter(|c| c.key().is_some())
            .ok_or(LaneError::MissingContributor)?;
        Ok(Self { contributor, scope })
    }

    /// Display name, else sort name.
    pub fn contributor_key(&self) -> &str {
        self.contributor.key().unwrap_or_default()
    }
}

/// Works a recommendation service suggested for a work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationLane {
    pub work: WorkId,
    pub display_name: String,
    pub recommendations: Vec<IdentifierId>,
    pub scope: WorkScope,
}

impl RecommendationLane {
    pub fn new(work: &Work, recommendations: Vec<IdentifierId>, scope: WorkScope) -> Self {
        Self {
            work: work.id,
            display_name: format!("Recommendations for {}", work.title),
            recommendations,
            scope,
        }
    }
}

/// Everything in a library, or in an explicit set of collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlableCollectionLane {
    /// Set when the feed covers a whole library.
    pub library_name: Option<String>,

    /// (id, name), sorted by name.
    pub collections: Vec<(CollectionId, String)>,
}

impl CrawlableCollectionLane {
    pub const MAX_CACHE_AGE: Duration = Duration::from_secs(2 * 60 * 60);

    pub fn for_library(library: &Library, collections: &[Collection]) -> Self {
        Self {
            library_name: Some(library.name.clone()),
            collections: sorted_collections(collections),
        }
    }

    pub fn for_collections(collections: &[Collection]) -> Self {
        Self {
            library_name: None,
            collections: sorted_collections(collections),
        }
    }
}

fn sorted_collections(collections: &[Collection]) -> Vec<(CollectionId, String)> {
    let mut pairs: Vec<(CollectionId, String)> = collections.iter().map(|c| (c.id, c.name.clone())).collect();
    pairs.sort_by(|a, b| a.1.cmp(&b.1));
    pairs
}

/// Everything on one custom list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlableCustomListLane {
    pub list: CustomList,
}

impl CrawlableCustomListLane {
    pub const MAX_CACHE_AGE: Duration = Duration::from_secs(12 * 60 * 60);

    pub fn new(list: CustomList) -> Self {
        Self { list }
    }
}

/// A lane a feed can be generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkList {
    Lane(Lane),
    RelatedBooks(RelatedBooksLane),
    Series(SeriesLane),
    Contributor(ContributorLane),
    Recommendation(RecommendationLane),
    CrawlableCollection(CrawlableCollectionLane),
    CrawlableCustomList(CrawlableCustomListLane),
}

impl WorkList {
    pub fn display_name(&self) -> String {
        match self {
            Self::Lane(lane) => lane.display_name.clone(),
            Self::RelatedBooks(_) => "Related Books".to_string(),
            Self::Series(lane) => lane.series.clone(),
            Self::Contributor(lane) => lane.contributor_key().to_string(),
            Self::Recommendation(lane) => lane.display_name.clone(),
            Self::CrawlableCollection(lane) => match &lane.library_name {
                Some(library) => format!("Crawlable feed: {}", library),
                None => format!(
                    "Crawlable feed: {}",
                    lane.collections.iter().map(|(_, n)| n.as_str()).collect::<Vec<_>>().join(" / ")
                ),
            },
            Self::CrawlableCustomList(lane) => format!("Crawlable feed: {}", lane.list.name),
        }
    }

    /// Whether the lane shows up in navigation.
    pub fn visible(&self) -> bool {
        match self {
            Self::Lane(lane) => lane.visible,
            Self::RelatedBooks(_) => false,
            _ => true,
        }
    }

    pub fn restrictions(&self) -> Restrictions {
        match self {
            Self::Lane(lane) => Restrictions {
                languages: lane.languages.clone(),
                audiences: lane.audiences.clone(),
                media: lane.media.clone(),
                fiction: lane.fiction,
                genres: lane.genres.clone(),
            },
            Self::RelatedBooks(lane) => lane.scope().restrictions(),
            Self::Series(lane) => lane.scope.restrictions(),
            Self::Contributor(lane) => lane.scope.restrictions(),
            Self::Recommendation(lane) => lane.scope.restrictions(),
            Self::CrawlableCollection(_) | Self::CrawlableCustomList(_) => Restrictions::default(),
        }
    }

    /// Facets used when a request does not specify any.
    pub fn default_facets(&self) -> Facets {
        match self {
            Self::Series(lane) => Facets::series(lane.series.clone()),
            Self::Contributor(lane) => Facets::contributor(lane.contributor_key()),
            Self::CrawlableCollection(_) | Self::CrawlableCustomList(_) => Facets::crawlable(),
            _ => Facets::standard(),
        }
    }

    /// Build the search filter for this lane.
    ///
    /// `collections` are the requesting library's collections. Crawlable
    /// collection lanes search their own collections instead.
    pub fn build_query(&self, collections: &[CollectionId], facets: Option<&Facets>) -> Filter {
        let restrictions = self.restrictions();
        let mut filter = Filter {
            collections: collections.to_vec(),
            languages: restrictions.languages,
            audiences: restrictions.audiences,
            media: restrictions.media,
            fiction: restrictions.fiction,
            genres: restrictions.genres,
            ..Default::default()
        };

        match self {
            Self::Lane(lane) => filter.list_datasource = lane.list_datasource.clone(),
            Self::Series(lane) => filter.series = Some(lane.series.clone()),
            Self::Contributor(lane) => filter.author = Some(lane.contributor_key().to_string()),
            Self::Recommendation(lane) => filter.identifiers = lane.recommendations.clone(),
            Self::CrawlableCollection(lane) => {
                filter.collections = lane.collections.iter().map(|(id, _)| *id).collect();
            }
            Self::CrawlableCustomList(lane) => filter.customlists = vec![lane.list.id],
            Self::RelatedBooks(_) => {}
        }

        let default_facets;
        let facets = match facets {
            Some(facets) => facets,
            None => {
                default_facets = self.default_facets();
                &default_facets
            }
        };
        facets.modify_search_filter(&mut filter);
        filter
    }

    pub fn url_arguments(&self) -> UrlArguments {
        match self {
            Self::Lane(lane) => {
                let mut args = BTreeMap::new();
                if let Some(id) = lane.id {
                    args.insert("lane_identifier".to_string(), id.to_string());
                }
                (FEED_ROUTE, args)
            }
            Self::RelatedBooks(lane) => (RELATED_BOOKS_ROUTE, work_arguments(lane.work())),
            Self::Series(lane) => {
                let mut args = lane.scope.url_arguments();
                args.insert("series_name".to_string(), lane.series.clone());
                (SERIES_ROUTE, args)
            }
            Self::Contributor(lane) => {
                let mut args = lane.scope.url_arguments();
                args.insert("contributor_name".to_string(), lane.contributor_key().to_string());
                (CONTRIBUTOR_ROUTE, args)
            }
            Self::Recommendation(lane) => (RECOMMENDATIONS_ROUTE, work_arguments(lane.work)),
            Self::CrawlableCollection(lane) => match (&lane.library_name, lane.collections.first()) {
                (None, Some((_, name))) => {
                    let mut args = BTreeMap::new();
                    args.insert("collection_name".to_string(), name.clone());
                    (CRAWLABLE_COLLECTION_ROUTE, args)
                }
                _ => (CRAWLABLE_LIBRARY_ROUTE, BTreeMap::new()),
            },
            Self::CrawlableCustomList(lane) => {
                let mut args = BTreeMap::new();
                args.insert("list_name".to_string(), lane.list.name.clone());
                (CRAWLABLE_LIST_ROUTE, args)
            }
        }
    }

    /// How long a generated feed may be cached, for variants that say.
    pub fn max_cache_age(&self) -> Option<Duration> {
        match self {
            Self::CrawlableCollection(_) => Some(CrawlableCollectionLane::MAX_CACHE_AGE),
            Self::CrawlableCustomList(_) => Some(CrawlableCustomListLane::MAX_CACHE_AGE),
            _ => None,
        }
    }

    /// Scope of lanes derived from a work, for narrowing under a parent.
    pub(crate) fn scope_mut(&mut self) -> Option<&mut WorkScope> {
        match self {
            Self::Series(lane) => Some(&mut lane.scope),
            Self::Contributor(lane) => Some(&mut lane.scope),
            Self::Recommendation(lane) => Some(&mut lane.scope),
            _ => None,
        }
    }
}

fn work_arguments(work: WorkId) -> BTreeMap<String, String> {
    let mut args = BTreeMap::new();
    args.insert("work_id".to_string(), work.to_string());
    args
}

/// Look up a crawlable custom list lane's list, failing cleanly when gone.
pub fn crawlable_list_lane<S: crate::store::CatalogStore + ?Sized>(
    store: &S,
    list: CustomListId,
) -> Result<WorkList, LaneError> {
    Ok(WorkList::CrawlableCustomList(CrawlableCustomListLane::new(store.custom_list(list)?)))
}
