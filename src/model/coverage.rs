//! Coverage records: durable per-identifier sync outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CollectionId, IdentifierId};

/// Data source name under which metadata wrangler coverage is recorded.
pub const METADATA_WRANGLER_DATA_SOURCE: &str = "Library Simplified metadata wrangler";

/// Operation a coverage record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Identifier is registered with the remote collection.
    Sync,

    /// Identifier has been removed from the remote collection.
    Reap,

    /// Local metadata has been pushed to the remote service.
    MetadataUpload,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Reap => "reap",
            Self::MetadataUpload => "metadata-upload",
        }
    }
}

/// Outcome of the last attempt at an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Success,

    /// Worth retrying on the next run.
    TransientFailure,

    /// Will not be retried.
    PersistentFailure,
}

/// Identity of a coverage record. At most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoverageKey {
    pub identifier: IdentifierId,
    pub data_source: String,
    pub operation: Operation,
    pub collection: Option<CollectionId>,
}

impl CoverageKey {
    /// Key for a metadata wrangler operation in a collection.
    pub fn wrangler(identifier: IdentifierId, operation: Operation, collection: CollectionId) -> Self {
        Self {
            identifier,
            data_source: METADATA_WRANGLER_DATA_SOURCE.to_string(),
            operation,
            collection: Some(collection),
        }
    }
}

/// Durable record of whether an identifier was processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRecord {
    #[serde(flatten)]
    pub key: CoverageKey,

    pub status: CoverageStatus,

    pub timestamp: DateTime<Utc>,

    /// Failure detail, if the record is a failure.
    pub exception: Option<String>,
}

impl CoverageRecord {
    pub fn success(key: CoverageKey) -> Self {
        Self {
            key,
            status: CoverageStatus::Success,
            timestamp: Utc::now(),
            exception: None,
        }
    }

    pub fn failure(key: CoverageKey, transient: bool, exception: impl Into<String>) -> Self {
        Self {
            key,
            status: if transient {
                CoverageStatus::TransientFailure
            } else {
                CoverageStatus::PersistentFailure
            },
            timestamp: Utc::now(),
            exception: Some(exception.into()),
        }
    }
}
