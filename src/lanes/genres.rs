//! The genre taxonomy lanes are built from.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::LaneError;

/// One genre and the genres nested under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreNode {
    pub name: String,
    pub fiction: bool,
    #[serde(default)]
    pub subgenres: Vec<GenreNode>,
}

impl GenreNode {
    fn leaf(name: &str, fiction: bool) -> Self {
        Self {
            name: name.to_string(),
            fiction,
            subgenres: Vec::new(),
        }
    }

    fn branch(name: &str, fiction: bool, subgenres: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            fiction,
            subgenres: subgenres.iter().map(|s| Self::leaf(s, fiction)).collect(),
        }
    }
}

/// A read-only genre tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreTaxonomy {
    pub genres: Vec<GenreNode>,
}

const FICTION: &[(&str, &[&str])] = &[
    ("Adventure", &[]),
    ("Classics", &[]),
    ("Comics & Graphic Novels", &[]),
    ("Drama", &[]),
    ("Fantasy", &["Epic Fantasy", "Historical Fantasy", "Urban Fantasy"]),
    ("Folklore", &[]),
    ("Historical Fiction", &[]),
    ("Horror", &["Gothic Horror", "Ghost Stories", "Vampires", "Werewolves", "Occult Horror"]),
    ("Humorous Fiction", &[]),
    ("Literary Fiction", &[]),
    ("LGBTQ Fiction", &[]),
    (
        "Mystery",
        &[
            "Crime & Detective Stories",
            "Hard-Boiled Mystery",
            "Police Procedural",
            "Cozy Mystery",
            "Historical Mystery",
            "Paranormal Mystery",
            "Women Detectives",
        ],
    ),
    ("Poetry", &[]),
    ("Religious Fiction", &[]),
    (
        "Romance",
        &[
            "Contemporary Romance",
            "Historical Romance",
            "Paranormal Romance",
            "Regency Romance",
            "Romantic Suspense",
        ],
    ),
    (
        "Science Fiction",
        &[
            "Dystopian SF",
            "Space Opera",
            "Cyberpunk",
            "Military SF",
            "Alternative History",
            "Steampunk",
            "Time Travel",
        ],
    ),
    ("Short Stories", &[]),
    (
        "Suspense/Thriller",
        &[
            "Historical Thriller",
            "Espionage",
            "Supernatural Thriller",
            "Medical Thriller",
            "Political Thriller",
            "Psychological Thriller",
            "Technothriller",
            "Legal Thriller",
            "Military Thriller",
        ],
    ),
    ("Urban Fiction", &[]),
    ("Westerns", &[]),
    ("Women's Fiction", &[]),
];

const NONFICTION: &[(&str, &[&str])] = &[
    (
        "Art & Design",
        &["Architecture", "Art", "Art Criticism & Theory", "Art History", "Design", "Fashion", "Photography"],
    ),
    ("Biography & Memoir", &[]),
    ("Education", &[]),
    (
        "Personal Finance & Business",
        &["Business", "Economics", "Management & Leadership", "Personal Finance & Investing", "Real Estate"],
    ),
    ("Parenting & Family", &["Family & Relationships", "Parenting"]),
    ("Food & Health", &["Bartending & Cocktails", "Cooking", "Health & Diet", "Vegetarian & Vegan"]),
    (
        "History",
        &[
            "African History",
            "Ancient History",
            "Asian History",
            "Civil War History",
            "European History",
            "Latin American History",
            "Medieval History",
            "Middle East History",
            "Military History",
            "Modern History",
            "Renaissance & Early Modern History",
            "United States History",
            "World History",
        ],
    ),
    (
        "Hobbies & Home",
        &["Antiques & Collectibles", "Crafts & Hobbies", "Gardening", "Games", "House & Home", "Pets"],
    ),
    ("Humorous Nonfiction", &[]),
    ("Entertainment", &["Film & TV", "Music", "Performing Arts"]),
    ("Life Strategies", &[]),
    ("Literary Criticism", &[]),
    ("Periodicals", &[]),
    ("Philosophy", &[]),
    ("Political Science", &[]),
    ("Reference & Study Aids", &["Dictionaries", "Foreign Language Study", "Law", "Study Aids"]),
    (
        "Religion & Spirituality",
        &["Body, Mind & Spirit", "Buddhism", "Christianity", "Hinduism", "Islam", "Judaism"],
    ),
    (
        "Science & Technology",
        &["Computers", "Mathematics", "Medical", "Nature", "Psychology", "Science", "Social Sciences", "Technology"],
    ),
    ("Self-Help", &[]),
    ("Travel, Adventure & Sports", &["Sports", "Travel"]),
    ("True Crime", &[]),
];

impl Default for GenreTaxonomy {
    fn default() -> Self {
        let fiction = FICTION.iter().map(|(name, subs)| GenreNode::branch(name, true, subs));
        let nonfiction = NONFICTION.iter().map(|(name, subs)| GenreNode::branch(name, false, subs));
        Self {
            genres: fiction.chain(nonfiction).collect(),
        }
    }
}

impl GenreTaxonomy {
    pub fn new(genres: Vec<GenreNode>) -> Self {
        Self { genres }
    }

    /// Top-level genres on one side of the fiction line.
    pub fn top_level(&self, fiction: bool) -> impl Iterator<Item = &GenreNode> {
        self.genres.iter().filter(move |g| g.fiction == fiction)
    }

    /// Reject names that would make an unusable lane.
    pub fn validate(&self) -> Result<(), LaneError> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&GenreNode> = self.genres.iter().collect();
        while let Some(node) = stack.pop() {
            let name = node.name.as_str();
            let problem = if name.is_empty() {
                Some("empty genre name")
            } else if name.trim() != name {
                Some("leading or trailing whitespace")
            } else if name.chars().any(char::is_control) {
                Some("control character")
            } else if !seen.insert(name) {
                Some("duplicate genre name")
            } else {
                None
            };
            if let Some(reason) = problem {
                return Err(LaneError::MalformedGenre {
                    name: name.to_string(),
                    reason,
                });
            }
            stack.extend(node.subgenres.iter());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_taxonomy_is_valid() {
        let taxonomy = GenreTaxonomy::default();
        taxonomy.validate().unwrap();

        let science_fiction = taxonomy.top_level(true).find(|g| g.name == "Science Fiction").unwrap();
        assert!(science_fiction.subgenres.iter().any(|g| g.name == "Space Opera"));
        assert!(taxonomy.top_level(false).any(|g| g.name == "Periodicals"));
        assert!(taxonomy.top_level(true).all(|g| g.subgenres.iter().all(|s| s.fiction)));
    }

    #[test]
    fn test_malformed_names_rejected() {
        for bad in ["", " Mystery", "Mys\ntery"] {
            let taxonomy = GenreTaxonomy::new(vec![GenreNode::leaf(bad, true)]);
            assert!(matches!(taxonomy.validate(), Err(LaneError::MalformedGenre { .. })), "{:?}", bad);
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let taxonomy = GenreTaxonomy::new(vec![
            GenreNode::branch("Horror", true, &["Vampires"]),
            GenreNode::leaf("Vampires", true),
        ]);
        assert!(matches!(
            taxonomy.validate(),
            Err(LaneError::MalformedGenre { reason: "duplicate genre name", .. })
        ));
    }
}
