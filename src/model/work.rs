//! Works and the people who made them.

use serde::{Deserialize, Serialize};

use super::{Audience, ContributorId, IdentifierId, Medium, WorkId};

/// Role names that count as authorship.
pub const AUTHOR_ROLES: &[&str] = &["Primary Author", "Author"];

/// Secondary roles shown in place of an author when a work has none.
pub const AUTHOR_SUBSTITUTE_ROLES: &[&str] = &[
    "Editor",
    "Compiler",
    "Translator",
    "Adapter",
    "Contributor",
    "Illustrator",
    "Artist",
    "Photographer",
    "Composer",
    "Lyricist",
    "Director",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: ContributorId,
    pub sort_name: Option<String>,
    pub display_name: Option<String>,
}

impl Contributor {
    /// Name used to look the contributor up in the search index.
    pub fn key(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .or(self.sort_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub contributor: Contributor,
    pub role: String,
}

/// Presentation data for a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub id: WorkId,

    pub title: String,

    /// Primary identifier of the title.
    pub identifier: IdentifierId,

    pub language: Option<String>,

    pub audience: Option<Audience>,

    pub fiction: Option<bool>,

    #[serde(default)]
    pub medium: Option<Medium>,

    pub series: Option<String>,

    pub series_position: Option<u32>,

    #[serde(default)]
    pub contributions: Vec<Contribution>,

    /// Ready to show to patrons.
    #[serde(default)]
    pub presentation_ready: bool,
}

impl Work {
    pub fn new(id: WorkId, identifier: IdentifierId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            identifier,
            language: None,
            audience: None,
            fiction: None,
            medium: None,
            series: None,
            series_position: None,
            contributions: Vec::new(),
            presentation_ready: false,
        }
    }

    /// Contributors credited with an author role, or when there are none,
    /// every contributor credited in a displayable secondary role.
    pub fn author_contributors(&self) -> Vec<&Contributor> {
        let authors = self.contributors_in(AUTHOR_ROLES);
        if !authors.is_empty() {
            return authors;
        }
        self.contributors_in(AUTHOR_SUBSTITUTE_ROLES)
    }

    /// Distinct contributors holding any of `roles`, in credit order.
    fn contributors_in(&self, roles: &[&str]) -> Vec<&Contributor> {
        let mut found: Vec<&Contributor> = Vec::new();
        for contribution in &self.contributions {
            if roles.contains(&contribution.role.as_str())
                && !found.iter().any(|c| c.id == contribution.contributor.id)
            {
                found.push(&contribution.contributor);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributor(id: u64, name: &str) -> Contributor {
        Contributor {
            id: ContributorId(id),
            sort_name: None,
            display_name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_editor_only_without_author() {
        let mut work = Work::new(WorkId(1), IdentifierId(1), "Anthology");
        work.contributions.push(Contribution {
            contributor: contributor(1, "Ed"),
            role: "Editor".to_string(),
        });
        assert_eq!(work.author_contributors()[0].key(), Some("Ed"));

        work.contributions.push(Contribution {
            contributor: contributor(2, "Ann"),
            role: "Author".to_string(),
        });
        work.contributions.push(Contribution {
            contributor: contributor(2, "Ann"),
            role: "Primary Author".to_string(),
        });
        let authors = work.author_contributors();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].key(), Some("Ann"));
    }

    #[test]
    fn test_all_secondary_roles_without_author() {
        let mut work = Work::new(WorkId(1), IdentifierId(1), "Collected Stories");
        for (id, name, role) in [(1, "Ed", "Editor"), (2, "Cam", "Compiler"), (3, "Narrator", "Narrator")] {
            work.contributions.push(Contribution {
                contributor: contributor(id, name),
                role: role.to_string(),
            });
        }

        let ids: Vec<ContributorId> = work.author_contributors().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ContributorId(1), ContributorId(2)]);
    }

    #[test]
    fn test_contributor_key_falls_back_to_sort_name() {
        let mut c = Contributor {
            id: ContributorId(1),
            sort_name: Some("Doe, Jane".to_string()),
            display_name: None,
        };
        assert_eq!(c.key(), Some("Doe, Jane"));
        c.display_name = Some("Jane Doe".to_string());
        assert_eq!(c.key(), Some("Jane Doe"));
        c.display_name = None;
        c.sort_name = None;
        assert_eq!(c.key(), None);
    }
}
