//! Configured connections to external services.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{IntegrationId, LibraryId};

/// Data source name attached to best-seller list lanes.
pub const NYT_DATA_SOURCE: &str = "NYT";

/// Setting key holding the metadata wrangler shared secret.
pub const SHARED_SECRET_SETTING: &str = "shared_secret";

/// What an integration is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Metadata,
    Licenses,
    Search,
}

/// Metadata service protocols the admin interface can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "New York Times")]
    Nyt,
    #[serde(rename = "NoveList Select")]
    NoveList,
    #[serde(rename = "Metadata Wrangler")]
    MetadataWrangler,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Nyt, Protocol::NoveList, Protocol::MetadataWrangler];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nyt => "New York Times",
            Self::NoveList => "NoveList Select",
            Self::MetadataWrangler => "Metadata Wrangler",
        }
    }

    /// Human readable label for the admin interface.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nyt => "NYT Best Seller API",
            Self::NoveList => "NoveList Select",
            Self::MetadataWrangler => "Library Simplified Metadata Wrangler",
        }
    }

    /// Whether the integration is configured per library.
    pub fn per_library(&self) -> bool {
        matches!(self, Self::NoveList)
    }

    /// Only one integration of this protocol may exist on the site.
    pub fn sitewide(&self) -> bool {
        matches!(self, Self::Nyt | Self::MetadataWrangler)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A configured external service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIntegration {
    pub id: IntegrationId,

    pub name: Option<String>,

    pub protocol: Protocol,

    pub goal: Goal,

    pub url: Option<String>,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Free-form protocol settings.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,

    /// Libraries this integration is attached to.
    #[serde(default)]
    pub libraries: Vec<LibraryId>,
}

impl ExternalIntegration {
    pub fn new(id: IntegrationId, protocol: Protocol, goal: Goal) -> Self {
        Self {
            id,
            name: None,
            protocol,
            goal,
            url: None,
            username: None,
            password: None,
            settings: BTreeMap::new(),
            libraries: Vec::new(),
        }
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}
