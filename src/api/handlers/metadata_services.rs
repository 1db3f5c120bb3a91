//! Metadata service administration handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Form, Json,
};

use crate::admin::metadata_services::{MetadataServices, Saved};
use crate::admin::{FormData, ProblemDetail, SubmittedContent};
use crate::api::ApiState;
use crate::model::IntegrationId;

/// List metadata services and the protocols that can be configured.
pub async fn list_services(State(state): State<Arc<ApiState>>) -> Json<MetadataServices> {
    let store = state.store.read().await;
    Json(state.metadata_services.process_get(&*store))
}

/// Create or edit a metadata service from a form submission.
///
/// Responds with the service id: 201 when created, 200 when edited.
pub async fn save_service(
    State(state): State<Arc<ApiState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<(StatusCode, String), ProblemDetail> {
    let content = SubmittedContent::from_form(FormData::new(fields));
    let mut store = state.store.write().await;

    match state.metadata_services.process_post(&mut *store, &content).await? {
        Saved::Created(id) => Ok((StatusCode::CREATED, id.to_string())),
        Saved::Updated(id) => Ok((StatusCode::OK, id.to_string())),
    }
}

/// Delete a metadata service.
pub async fn delete_service(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<u64>,
) -> Result<(StatusCode, &'static str), ProblemDetail> {
    let mut store = state.store.write().await;
    state.metadata_services.process_delete(&mut *store, IntegrationId(id))?;
    Ok((StatusCode::OK, "Deleted"))
}
