//! Circulation - catalog configuration for a library circulation service.
//!
//! Two jobs live here:
//!
//! - building a library's **lanes**, the browsable genre/audience/language
//!   hierarchy of its catalog, from how many titles it holds per language
//! - keeping the catalog's **coverage** in step with the metadata wrangler,
//!   registering licensed titles and reaping ones the library lost
//!
//! ```text
//! ┌──────────────┐   form posts    ┌──────────────┐
//! │  admin (api) │ ──────────────► │    admin     │  validate, save integrations
//! └──────┬───────┘                 └──────────────┘
//!        │ reset lanes / sync
//!        ▼
//! ┌──────────────┐                 ┌──────────────┐   OPDS    ┌───────────┐
//! │    lanes     │                 │   coverage   │ ◄───────► │ wrangler  │
//! └──────┬───────┘                 └──────┬───────┘           └───────────┘
//!        │                                │
//!        └──────────────► store ◄─────────┘
//! ```

// === Core Modules ===

/// Catalog data model.
pub mod model;

/// Catalog persistence.
pub mod store;

/// Lane building and derived lanes.
pub mod lanes;

/// Coverage sync with the metadata wrangler.
pub mod coverage;

/// Metadata wrangler credentials.
pub mod auth;

// === Admin Surface ===

/// Settings validation and the metadata services controller.
pub mod admin;

/// REST API.
pub mod api;

/// Service configuration.
pub mod config;

// === Re-exports ===

pub use config::ServiceConfig;
pub use coverage::{CoverageError, CoverageProvider, SyncConfig, SyncOperation, SyncReport};
pub use lanes::{create_default_lanes, LaneError, LaneTreeBuilder, WorkList};
pub use store::{CatalogStore, MemoryStore, StoreError};
