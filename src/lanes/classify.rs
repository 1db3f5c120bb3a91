//! Sorting a library's languages into large, small and tiny buckets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::LaneSettings;

/// Language used when nothing is known about a collection.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Languages grouped by how much of the collection they make up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneConfiguration {
    /// Ordered by holdings, largest first.
    pub large: Vec<String>,
    pub small: Vec<String>,
    pub tiny: Vec<String>,
}

impl LaneConfiguration {
    pub fn from_settings(settings: &LaneSettings) -> Self {
        Self {
            large: settings.large_collections.clone().unwrap_or_default(),
            small: settings.small_collections.clone().unwrap_or_default(),
            tiny: settings.tiny_collections.clone().unwrap_or_default(),
        }
    }

    pub fn to_settings(&self) -> LaneSettings {
        LaneSettings {
            large_collections: Some(self.large.clone()),
            small_collections: Some(self.small.clone()),
            tiny_collections: Some(self.tiny.clone()),
        }
    }
}

/// Classify languages with the default fallback language.
pub fn lane_configuration_from_collection_sizes(holdings: &BTreeMap<String, u64>) -> LaneConfiguration {
    classify_holdings(holdings, DEFAULT_LANGUAGE)
}

/// Classify each language by its share of the largest language's holdings.
///
/// A language is large at 10% of the maximum or more, small at 1% or more,
/// and tiny below that. With no holdings at all the fallback language is the
/// single large language.
pub fn classify_holdings(holdings: &BTreeMap<String, u64>, fallback: &str) -> LaneConfiguration {
    let max = holdings.values().copied().max().unwrap_or(0);
    if max == 0 {
        return LaneConfiguration {
            large: vec![fallback.to_string()],
            ..Default::default()
        };
    }

    // Largest first; ties broken by language code so the result is stable.
    let mut by_size: Vec<(&String, u64)> = holdings.iter().map(|(lang, count)| (lang, *count)).collect();
    by_size.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut config = LaneConfiguration::default();
    for (language, count) in by_size {
        let bucket = if count * 10 >= max {
            &mut config.large
        } else if count * 100 >= max {
            &mut config.small
        } else {
            &mut config.tiny
        };
        bucket.push(language.clone());
    }
    config
}
