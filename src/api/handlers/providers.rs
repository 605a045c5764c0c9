use crate::{
    AppState,
    types::{ProviderCheck, ProviderSummary},
};
use axum::{Json, extract::State};

/// List the provider catalog in candidate order
#[utoipa::path(
    get,
    path = "/api/providers",
    responses(
        (status = 200, description = "Registered providers", body = Vec<ProviderSummary>)
    ),
    tag = "providers"
)]
pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderSummary>> {
    Json(state.service.provider_summaries())
}

/// Live connectivity check: send a minimal task to every provider
#[utoipa::path(
    get,
    path = "/api/providers/check",
    responses(
        (status = 200, description = "Check outcome per provider", body = Vec<ProviderCheck>)
    ),
    tag = "providers"
)]
pub async fn check_providers(State(state): State<AppState>) -> Json<Vec<ProviderCheck>> {
    Json(state.service.check_providers().await)
}
