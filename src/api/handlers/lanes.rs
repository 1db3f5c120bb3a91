//! Lane handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::ApiState;
use crate::lanes::{create_default_lanes, load_lanes, LaneError};
use crate::model::Lane;
use crate::store::{CatalogStore, StoreError};

fn lane_error(e: LaneError) -> (StatusCode, String) {
    let status = match &e {
        LaneError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        LaneError::MalformedGenre { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

/// A library's lane tree.
pub async fn list_lanes(
    State(state): State<Arc<ApiState>>,
    Path(short_name): Path<String>,
) -> Result<Json<Vec<Lane>>, (StatusCode, String)> {
    let store = state.store.read().await;
    let library = store
        .library_by_short_name(&short_name)
        .map_err(|e| lane_error(e.into()))?;
    Ok(Json(load_lanes(&*store, library.id)))
}

/// Throw away a library's lanes and build the defaults.
pub async fn reset_lanes(
    State(state): State<Arc<ApiState>>,
    Path(short_name): Path<String>,
) -> Result<Json<Vec<Lane>>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    let library = store
        .library_by_short_name(&short_name)
        .map_err(|e| lane_error(e.into()))?;
    let lanes = create_default_lanes(&mut *store, library.id, &state.taxonomy).map_err(lane_error)?;
    Ok(Json(lanes))
}

#[cfg(test)]
mod tests {
    use crate::api::{router, test_support};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_reset_then_list() {
        let state = test_support::state();

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/libraries/main/lanes/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reset = test_support::body_json(response).await;
        assert!(!reset.as_array().unwrap().is_empty());

        let response = router(state)
            .oneshot(Request::builder().uri("/admin/libraries/main/lanes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed = test_support::body_json(response).await;
        assert_eq!(listed, reset);
        assert_eq!(listed[0]["display_name"], "Fiction");
    }

    #[tokio::test]
    async fn test_unknown_library() {
        let response = router(test_support::state())
            .oneshot(Request::builder().uri("/admin/libraries/nowhere/lanes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
