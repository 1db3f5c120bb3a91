//! Status and health check handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::ApiState;
use crate::model::{Goal, Protocol};
use crate::store::CatalogStore;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,

    /// Crate version.
    pub version: String,

    /// Number of libraries served.
    pub libraries: usize,

    /// Number of configured metadata services.
    pub metadata_services: usize,

    /// Whether a metadata wrangler integration exists.
    pub wrangler_configured: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let store = state.store.read().await;
    let integrations = store.integrations();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        libraries: store.libraries().len(),
        metadata_services: integrations.iter().filter(|i| i.goal == Goal::Metadata).count(),
        wrangler_configured: integrations.iter().any(|i| i.protocol == Protocol::MetadataWrangler),
    })
}
