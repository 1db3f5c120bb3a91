//! Coverage sync trigger.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::ApiState;
use crate::coverage::{synchronize, wrangler_lookup, CoverageError, SyncOperation, SyncReport};
use crate::model::CollectionId;
use crate::store::StoreError;

fn coverage_error(e: CoverageError) -> (StatusCode, String) {
    let status = match &e {
        CoverageError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        CoverageError::Configuration(_) | CoverageError::UnknownOperation(_) => StatusCode::BAD_REQUEST,
        CoverageError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

/// Run one sync operation over a collection to completion.
pub async fn run_sync(
    State(state): State<Arc<ApiState>>,
    Path((collection, operation)): Path<(u64, String)>,
) -> Result<Json<SyncReport>, (StatusCode, String)> {
    let operation: SyncOperation = operation.parse().map_err(coverage_error)?;

    // Runs hold the write lock so only one batch writer exists at a time.
    let mut store = state.store.write().await;
    let lookup = wrangler_lookup(&*store, state.config.http_timeout).map_err(coverage_error)?;

    let report = synchronize(
        &mut *store,
        Arc::new(lookup),
        CollectionId(collection),
        operation,
        state.config.sync_config(),
    )
    .await
    .map_err(coverage_error)?;

    Ok(Json(report))
}
