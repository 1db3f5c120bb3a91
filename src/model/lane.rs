//! Lanes: named, filtered browse categories in a library's catalog.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::LaneId;

/// Intended readership of a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Audience {
    Children,
    #[serde(rename = "Young Adult")]
    YoungAdult,
    Adult,
    #[serde(rename = "Adults Only")]
    AdultsOnly,
}

impl Audience {
    pub const ALL: [Audience; 4] = [
        Audience::Children,
        Audience::YoungAdult,
        Audience::Adult,
        Audience::AdultsOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Children => "Children",
            Self::YoungAdult => "Young Adult",
            Self::Adult => "Adult",
            Self::AdultsOnly => "Adults Only",
        }
    }

    pub fn adult() -> BTreeSet<Audience> {
        [Audience::Adult, Audience::AdultsOnly].into_iter().collect()
    }

    pub fn juvenile() -> BTreeSet<Audience> {
        [Audience::Children, Audience::YoungAdult].into_iter().collect()
    }

    pub fn all() -> BTreeSet<Audience> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("Unknown audience: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Medium {
    Book,
    Audio,
}

/// A configured lane. Children are owned by their parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    /// Assigned when the lane is persisted.
    pub id: Option<LaneId>,

    pub display_name: String,

    /// `None` means fiction and nonfiction.
    pub fiction: Option<bool>,

    /// Empty means unrestricted.
    pub audiences: BTreeSet<Audience>,

    /// ISO 639-2 codes. Empty means unrestricted.
    pub languages: Vec<String>,

    /// `None` means unrestricted.
    pub media: Option<Vec<Medium>>,

    /// Genre names this lane is restricted to.
    pub genres: Vec<String>,

    /// Position among siblings, starting at 0.
    pub priority: u32,

    pub visible: bool,

    /// Data source of the best-seller list this lane shows, if any.
    pub list_datasource: Option<String>,

    pub children: Vec<Lane>,
}

impl Lane {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            fiction: None,
            audiences: BTreeSet::new(),
            languages: Vec::new(),
            media: None,
            genres: Vec::new(),
            priority: 0,
            visible: true,
            list_datasource: None,
            children: Vec::new(),
        }
    }

    pub fn with_fiction(mut self, fiction: Option<bool>) -> Self {
        self.fiction = fiction;
        self
    }

    pub fn with_audiences(mut self, audiences: BTreeSet<Audience>) -> Self {
        self.audiences = audiences;
        self
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_media(mut self, media: Option<Vec<Medium>>) -> Self {
        self.media = media;
        self
    }

    pub fn with_genres(mut self, genres: Vec<String>) -> Self {
        self.genres = genres;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a sublane, narrowing it to this lane's restrictions.
    ///
    /// Restrictions the child leaves open are inherited; restrictions it sets
    /// are intersected with the parent's so a child never shows more than its
    /// parent. An empty intersection falls back to the parent's set, since an
    /// empty set would read as unrestricted. The child's priority is its
    /// position among its siblings.
    pub fn add_sublane(&mut self, mut child: Lane) {
        if !self.languages.is_empty() {
            child.languages.retain(|l| self.languages.contains(l));
            if child.languages.is_empty() {
                child.languages = self.languages.clone();
            }
        }
        if !self.audiences.is_empty() {
            child.audiences = child.audiences.intersection(&self.audiences).copied().collect();
            if child.audiences.is_empty() {
                child.audiences = self.audiences.clone();
            }
        }
        if let Some(parent_media) = &self.media {
            let mut media = child.media.take().unwrap_or_default();
            media.retain(|m| parent_media.contains(m));
            if media.is_empty() {
                media = parent_media.clone();
            }
            child.media = Some(media);
        }
        if child.fiction.is_none() {
            child.fiction = self.fiction;
        }
        child.priority = self.children.len() as u32;
        self.children.push(child);
    }

    /// Insert a sublane ahead of all existing ones, renumbering priorities.
    pub fn prepend_sublane(&mut self, child: Lane) {
        let mut existing = std::mem::take(&mut self.children);
        self.add_sublane(child);
        for (offset, sibling) in existing.iter_mut().enumerate() {
            sibling.priority = offset as u32 + 1;
        }
        self.children.append(&mut existing);
    }

    pub fn sublane_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.display_name.as_str()).collect()
    }

    /// Whether this lane's restrictions fall within `parent`'s.
    pub fn restricted_within(&self, parent: &Lane) -> bool {
        let languages_ok = parent.languages.is_empty()
            || (!self.languages.is_empty() && self.languages.iter().all(|l| parent.languages.contains(l)));
        let audiences_ok = parent.audiences.is_empty()
            || (!self.audiences.is_empty() && self.audiences.is_subset(&parent.audiences));
        let media_ok = match (&parent.media, &self.media) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(p), Some(c)) => c.iter().all(|m| p.contains(m)),
        };
        languages_ok && audiences_ok && media_ok
    }

    /// Total number of lanes in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Lane::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sublane_inherits_restrictions() {
        let mut parent = Lane::new("English")
            .with_languages(vec!["eng".to_string()])
            .with_audiences(Audience::adult())
            .with_media(Some(vec![Medium::Book]));

        parent.add_sublane(Lane::new("Fiction").with_fiction(Some(true)));

        let child = &parent.children[0];
        assert_eq!(child.languages, vec!["eng".to_string()]);
        assert_eq!(child.audiences, Audience::adult());
        assert_eq!(child.media, Some(vec![Medium::Book]));
        assert!(child.restricted_within(&parent));
    }

    #[test]
    fn test_sublane_is_narrowed_to_parent() {
        let mut parent = Lane::new("Juvenile").with_audiences(Audience::juvenile());
        parent.add_sublane(Lane::new("Everyone").with_audiences(Audience::all()));

        assert_eq!(parent.children[0].audiences, Audience::juvenile());
        assert!(parent.children[0].restricted_within(&parent));
    }

    #[test]
    fn test_disjoint_sublane_falls_back_to_parent() {
        let mut parent = Lane::new("Children")
            .with_languages(vec!["eng".to_string()])
            .with_audiences([Audience::Children].into_iter().collect())
            .with_media(Some(vec![Medium::Book]));
        parent.add_sublane(
            Lane::new("Spanish Adult")
                .with_languages(vec!["spa".to_string()])
                .with_audiences(Audience::adult())
                .with_media(Some(vec![Medium::Audio])),
        );

        let child = &parent.children[0];
        assert_eq!(child.languages, vec!["eng".to_string()]);
        assert_eq!(child.audiences, parent.audiences);
        assert_eq!(child.media, Some(vec![Medium::Book]));
        assert!(child.restricted_within(&parent));
    }

    #[test]
    fn test_prepend_sublane_renumbers() {
        let mut parent = Lane::new("Fiction");
        parent.add_sublane(Lane::new("Mystery"));
        parent.add_sublane(Lane::new("Romance"));
        parent.prepend_sublane(Lane::new("Best Sellers"));

        assert_eq!(parent.sublane_names(), vec!["Best Sellers", "Mystery", "Romance"]);
        let priorities: Vec<u32> = parent.children.iter().map(|c| c.priority).collect();
        assert_eq!(priorities, vec![0, 1, 2]);
    }

    #[test]
    fn test_each_lane_owns_its_children() {
        let mut a = Lane::new("A");
        let b = Lane::new("B");
        a.add_sublane(Lane::new("child"));
        assert_eq!(a.children.len(), 1);
        assert!(b.children.is_empty());
    }

    #[test]
    fn test_audience_round_trips_display_name() {
        for audience in Audience::ALL {
            assert_eq!(audience.as_str().parse::<Audience>().unwrap(), audience);
        }
        assert!("Grown Ups".parse::<Audience>().is_err());
    }
}
