//! Building a library's lane tree from its language buckets.
//!
//! Layout of the generated tree:
//!
//! ```text
//! Best Sellers                      (only with an NYT integration, always first)
//! Fiction                           ─┐
//! Nonfiction                         │ one block for all large
//! Young Adult Fiction                │ languages, genre sublanes
//! Young Adult Nonfiction             │ mirror the taxonomy
//! Children and Middle Grade         ─┘
//! World Languages                   (only with small or tiny languages)
//!   <small language>                  Fiction / Nonfiction / Children & Young Adult
//!   <tiny languages>                  leaf
//! ```

use tracing::info;

use super::classify::{classify_holdings, LaneConfiguration, DEFAULT_LANGUAGE};
use super::genres::{GenreNode, GenreTaxonomy};
use super::languages::name_for_languageset;
use super::LaneError;
use crate::model::integration::NYT_DATA_SOURCE;
use crate::model::{Audience, Goal, Lane, LibraryId, Medium, Protocol};
use crate::store::CatalogStore;

pub const BEST_SELLERS: &str = "Best Sellers";
pub const WORLD_LANGUAGES: &str = "World Languages";

/// Builds lane trees. Pure: nothing here touches the store.
#[derive(Debug, Clone)]
pub struct LaneTreeBuilder<'a> {
    taxonomy: &'a GenreTaxonomy,

    /// Data source of the best-seller list, when one is configured.
    best_sellers: Option<String>,
}

impl<'a> LaneTreeBuilder<'a> {
    pub fn new(taxonomy: &'a GenreTaxonomy) -> Self {
        Self {
            taxonomy,
            best_sellers: None,
        }
    }

    pub fn with_best_sellers(mut self, list_datasource: Option<String>) -> Self {
        self.best_sellers = list_datasource;
        self
    }

    /// Build the whole tree. Fails without side effects on a bad taxonomy.
    pub fn build(&self, buckets: &LaneConfiguration) -> Result<Vec<Lane>, LaneError> {
        self.taxonomy.validate()?;

        let (mut lanes, mut priority) = self.create_lanes_for_large_collection(&buckets.large, 0);

        // The large block carries its own Best Sellers lane; without one the
        // list still leads the tree.
        if lanes.is_empty() {
            if let Some(source) = &self.best_sellers {
                let languages: Vec<String> = buckets.small.iter().chain(&buckets.tiny).cloned().collect();
                lanes.push(best_sellers_lane(source).with_languages(languages).with_priority(priority));
                priority += 1;
            }
        }

        // Tiny languages share a single lane.
        let tiny_groups: Vec<Vec<String>> = if buckets.tiny.is_empty() {
            Vec::new()
        } else {
            vec![buckets.tiny.clone()]
        };
        if let Some((world, _)) = self.create_world_languages_lane(&buckets.small, &tiny_groups, priority) {
            lanes.push(world);
        }

        Ok(lanes)
    }

    /// Top-level lanes for the large languages. Returns the next free priority.
    pub fn create_lanes_for_large_collection(&self, languages: &[String], mut priority: u32) -> (Vec<Lane>, u32) {
        if languages.is_empty() {
            return (Vec::new(), priority);
        }

        let mut lanes = Vec::new();
        if let Some(source) = &self.best_sellers {
            lanes.push(
                best_sellers_lane(source)
                    .with_languages(languages.to_vec())
                    .with_priority(priority),
            );
            priority += 1;
        }

        let blocks = [
            ("Fiction", Some(true), Audience::adult(), vec![true]),
            ("Nonfiction", Some(false), Audience::adult(), vec![false]),
            ("Young Adult Fiction", Some(true), single(Audience::YoungAdult), vec![true]),
            ("Young Adult Nonfiction", Some(false), single(Audience::YoungAdult), vec![false]),
            ("Children and Middle Grade", None, single(Audience::Children), vec![true, false]),
        ];

        for (name, fiction, audiences, sides) in blocks {
            let mut lane = Lane::new(name)
                .with_fiction(fiction)
                .with_audiences(audiences)
                .with_languages(languages.to_vec())
                .with_priority(priority);
            priority += 1;

            if let Some(source) = &self.best_sellers {
                lane.add_sublane(best_sellers_lane(source));
            }
            for side in sides {
                for genre in self.taxonomy.top_level(side) {
                    lane.add_sublane(genre_lane(genre));
                }
            }
            lanes.push(lane);
        }

        (lanes, priority)
    }

    /// One lane for a small language set with three flat sublanes.
    pub fn create_lane_for_small_collection(&self, languages: &[String], priority: u32) -> (Lane, u32) {
        let mut lane = Lane::new(name_for_languageset(languages))
            .with_languages(languages.to_vec())
            .with_media(Some(vec![Medium::Book]))
            .with_priority(priority);

        lane.add_sublane(
            Lane::new("Fiction")
                .with_fiction(Some(true))
                .with_audiences(Audience::adult()),
        );
        lane.add_sublane(
            Lane::new("Nonfiction")
                .with_fiction(Some(false))
                .with_audiences(Audience::adult()),
        );
        lane.add_sublane(Lane::new("Children & Young Adult").with_audiences(Audience::juvenile()));

        (lane, priority + 1)
    }

    /// A leaf lane for a tiny language set. `None` without languages.
    pub fn create_lane_for_tiny_collection(&self, languages: &[String], priority: u32) -> Option<(Lane, u32)> {
        if languages.is_empty() {
            return None;
        }
        let lane = Lane::new(name_for_languageset(languages))
            .with_languages(languages.to_vec())
            .with_media(Some(vec![Medium::Book]))
            .with_priority(priority);
        Some((lane, priority + 1))
    }

    /// Wrap small and tiny languages in a single top-level lane.
    ///
    /// The returned priority is advanced by one for the lane itself and one
    /// for each wrapped language lane.
    pub fn create_world_languages_lane(
        &self,
        small: &[String],
        tiny: &[Vec<String>],
        priority: u32,
    ) -> Option<(Lane, u32)> {
        let mut languages: Vec<String> = Vec::new();
        for language in small.iter().chain(tiny.iter().flatten()) {
            if !languages.contains(language) {
                languages.push(language.clone());
            }
        }
        if languages.is_empty() {
            return None;
        }

        let mut world = Lane::new(WORLD_LANGUAGES)
            .with_languages(languages)
            .with_media(Some(vec![Medium::Book]))
            .with_priority(priority);

        for language in small {
            let (lane, _) = self.create_lane_for_small_collection(std::slice::from_ref(language), 0);
            world.add_sublane(lane);
        }
        for group in tiny {
            if let Some((lane, _)) = self.create_lane_for_tiny_collection(group, 0) {
                world.add_sublane(lane);
            }
        }
        let wrapped = world.children.len() as u32;

        if let Some(source) = &self.best_sellers {
            world.prepend_sublane(best_sellers_lane(source));
        }

        Some((world, priority + 1 + wrapped))
    }
}

fn single(audience: Audience) -> std::collections::BTreeSet<Audience> {
    std::iter::once(audience).collect()
}

fn best_sellers_lane(list_datasource: &str) -> Lane {
    let mut lane = Lane::new(BEST_SELLERS);
    lane.list_datasource = Some(list_datasource.to_string());
    lane
}

fn genre_lane(genre: &GenreNode) -> Lane {
    let mut lane = Lane::new(genre.name.clone())
        .with_genres(vec![genre.name.clone()])
        .with_fiction(Some(genre.fiction));
    for sub in &genre.subgenres {
        lane.add_sublane(genre_lane(sub));
    }
    lane
}

/// Data source of the configured best-seller list, if any.
pub fn best_sellers_source<S: CatalogStore + ?Sized>(store: &S) -> Option<String> {
    store
        .integrations()
        .iter()
        .any(|i| i.protocol == Protocol::Nyt && i.goal == Goal::Metadata)
        .then(|| NYT_DATA_SOURCE.to_string())
}

/// Build the lane tree for `taxonomy` and buckets, without touching storage.
pub fn build_lane_tree(
    taxonomy: &GenreTaxonomy,
    buckets: &LaneConfiguration,
    best_sellers: Option<String>,
) -> Result<Vec<Lane>, LaneError> {
    LaneTreeBuilder::new(taxonomy).with_best_sellers(best_sellers).build(buckets)
}

/// Rebuild and persist a library's lanes.
///
/// Uses the library's stored bucket settings. When none are stored they are
/// derived from the library's holdings and saved. The old tree is replaced
/// only after the new one has been built.
pub fn create_default_lanes<S: CatalogStore + ?Sized>(
    store: &mut S,
    library: LibraryId,
    taxonomy: &GenreTaxonomy,
) -> Result<Vec<Lane>, LaneError> {
    let library = store.library(library)?;

    let derived = library.lane_settings.is_unset();
    let buckets = if derived {
        let holdings = store.estimated_holdings_by_language(library.id);
        let fallback = library.default_language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
        classify_holdings(&holdings, fallback)
    } else {
        LaneConfiguration::from_settings(&library.lane_settings)
    };

    let lanes = build_lane_tree(taxonomy, &buckets, best_sellers_source(store))?;
    let top_level = lanes.len();
    let total: usize = lanes.iter().map(Lane::count).sum();

    if derived {
        store.save_lane_settings(library.id, buckets.to_settings())?;
    }
    store.replace_lanes(library.id, lanes)?;
    store.commit()?;

    info!(
        library = %library.short_name,
        large = ?buckets.large,
        small = ?buckets.small,
        tiny = ?buckets.tiny,
        top_level,
        total,
        "Rebuilt lanes"
    );

    Ok(store.lanes(library.id))
}

/// A library's persisted lane tree.
pub fn load_lanes<S: CatalogStore + ?Sized>(store: &S, library: LibraryId) -> Vec<Lane> {
    store.lanes(library)
}
