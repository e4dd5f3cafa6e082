//! REST API surface.
//!
//! Every endpoint responds with the same envelope: `success`, `data`,
//! `error`. Handlers stay thin; eligibility, validation and diffing live
//! in the workflow crate and writes go through the database services.

pub mod agent_routes;
pub mod document_routes;
pub mod onboarding_routes;
pub mod quote_routes;
pub mod session_store;
pub mod workflow_routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use ib_agentic::SqlGenerator;
use ib_ingest::IngestPipeline;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::database::{
    BrokerService, ClaimService, CommitExecutor, DocumentMetadataService, FacilityService,
    PolicyService, QuotationService, WarehouseService,
};

pub use session_store::SessionStore;

/// Shared handler state. Services are pool handles and clone freely.
#[derive(Clone)]
pub struct AppState {
    pub policies: PolicyService,
    pub claims: ClaimService,
    pub brokers: BrokerService,
    pub facilities: FacilityService,
    pub quotes: QuotationService,
    pub documents: DocumentMetadataService,
    pub warehouse: WarehouseService,
    pub executor: CommitExecutor,
    pub sessions: SessionStore,
    pub pipeline: Arc<IngestPipeline>,
    /// Absent when no LLM key is configured; the agent endpoint then
    /// reports unavailable instead of failing requests downstream.
    pub generator: Option<Arc<SqlGenerator>>,
}

/// Standard response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    })
}

/// Uploads can carry scanned documents; give them headroom.
const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Transaction workflow
        .route("/api/workflow", post(workflow_routes::start))
        .route("/api/workflow/:id", get(workflow_routes::view))
        .route("/api/workflow/:id/fetch", post(workflow_routes::fetch))
        .route("/api/workflow/:id/submit", post(workflow_routes::submit))
        .route("/api/workflow/:id/confirm", post(workflow_routes::confirm))
        .route("/api/workflow/:id/back", post(workflow_routes::back))
        // Onboarding
        .route(
            "/api/onboarding/brokers",
            get(onboarding_routes::list_brokers).post(onboarding_routes::onboard_broker),
        )
        .route(
            "/api/onboarding/facilities",
            get(onboarding_routes::list_facilities).post(onboarding_routes::onboard_facility),
        )
        .route(
            "/api/onboarding/facilities/:id",
            get(onboarding_routes::facility_detail),
        )
        // Document ingestion
        .route(
            "/api/documents",
            get(document_routes::list_documents)
                .post(document_routes::upload)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Quotations
        .route(
            "/api/quotes",
            get(quote_routes::list_quotes).post(quote_routes::save_quote),
        )
        .route("/api/quotes/:id", get(quote_routes::get_quote))
        .route("/api/quotes/:id/convert", post(quote_routes::convert_quote))
        // Warehouse agent
        .route("/api/agent/query", post(agent_routes::query))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

async fn health_check() -> Json<ApiResponse<String>> {
    ok("OK".to_string())
}
