//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for Quorum, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `POST /api/orchestrate` - Orchestrate a request across providers
//! - `GET /api/providers` - Provider catalog
//! - `GET /api/providers/check` - Live connectivity check of every provider
//! - `GET /api/health` - Health check endpoint
//! - `GET /api-docs/openapi.json` - OpenAPI document
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::AppState;
use crate::types::{
    HealthResponse, OrchestrateRequest, OrchestrateResponse, OrchestrationMode, PerTaskEntry,
    ProviderCheck, ProviderSummary, ResultStatus,
};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    info(title = "Quorum", description = "Multi-provider inference orchestration"),
    paths(
        handlers::orchestrate::orchestrate,
        handlers::providers::list_providers,
        handlers::providers::check_providers,
        handlers::health::health,
    ),
    components(schemas(
        OrchestrateRequest,
        OrchestrateResponse,
        PerTaskEntry,
        ProviderSummary,
        ProviderCheck,
        HealthResponse,
        ResultStatus,
        OrchestrationMode,
        crate::llm::Capability,
    )),
    tags(
        (name = "orchestration", description = "Multi-provider orchestration"),
        (name = "providers", description = "Provider catalog"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Build the complete application: API routes, OpenAPI document and layers.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes::create_router())
        .merge(docs_router())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    use utoipa_swagger_ui::SwaggerUi;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    use axum::{Json, routing::get};

    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
