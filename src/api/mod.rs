//! REST API for the circulation daemon.
//!
//! Provides HTTP endpoints for:
//! - Metadata service administration
//! - Lane inspection and rebuilds
//! - Coverage sync runs against the metadata wrangler

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::admin::{MetadataServicesController, SiteRegistrar, WranglerRegistrar};
use crate::config::ServiceConfig;
use crate::lanes::GenreTaxonomy;
use crate::store::MemoryStore;

/// Shared state for API handlers.
pub struct ApiState {
    /// The catalog.
    pub store: Arc<RwLock<MemoryStore>>,

    pub config: ServiceConfig,

    pub taxonomy: GenreTaxonomy,

    pub metadata_services: MetadataServicesController,
}

impl ApiState {
    /// Site registration with the wrangler needs a public URL; without one
    /// the controller refuses to create wrangler integrations.
    pub fn new(store: MemoryStore, config: ServiceConfig) -> Self {
        let registrar = config.public_url.as_ref().map(|url| {
            Arc::new(WranglerRegistrar::new(url.clone(), config.http_timeout)) as Arc<dyn SiteRegistrar>
        });
        Self::with_registrar(store, config, registrar)
    }

    pub fn with_registrar(store: MemoryStore, config: ServiceConfig, registrar: Option<Arc<dyn SiteRegistrar>>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            config,
            taxonomy: GenreTaxonomy::default(),
            metadata_services: MetadataServicesController::new(registrar),
        }
    }
}

/// Build the API router with all routes.
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status/health
        .route("/api/v1/status", get(handlers::status::health))
        // Metadata services
        .route(
            "/admin/metadata_services",
            get(handlers::metadata_services::list_services).post(handlers::metadata_services::save_service),
        )
        .route(
            "/admin/metadata_service/:id",
            delete(handlers::metadata_services::delete_service),
        )
        // Lanes
        .route("/admin/libraries/:short_name/lanes", get(handlers::lanes::list_lanes))
        .route("/admin/libraries/:short_name/lanes/reset", post(handlers::lanes::reset_lanes))
        // Coverage
        .route(
            "/admin/collections/:id/sync/:operation",
            post(handlers::sync::run_sync),
        )
        // Middleware
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                // Only log responses that are not successful
                .on_request(())
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    let status = response.status();
                    if !status.is_success() {
                        tracing::warn!(
                            status = %status,
                            latency_ms = latency.as_millis(),
                            "request failed"
                        );
                    }
                }),
        )
        .with_state(state)
}

/// Start the API server.
pub async fn serve(state: Arc<ApiState>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("Circulation API listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::{Collection, CollectionId, Library, LibraryId};

    pub fn state() -> Arc<ApiState> {
        let mut store = MemoryStore::new();
        store.add_library(Library {
            id: LibraryId(1),
            name: "Main Library".to_string(),
            short_name: "main".to_string(),
            default_language: None,
            lane_settings: Default::default(),
        });
        store.add_collection(Collection {
            id: CollectionId(1),
            name: "Main".to_string(),
            protocol: "Overdrive".to_string(),
            external_account_id: Some("acct".to_string()),
            libraries: vec![LibraryId(1)],
        });
        Arc::new(ApiState::with_registrar(
            store,
            ServiceConfig::new(std::path::PathBuf::from("unused")),
            None,
        ))
    }

    pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
