use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/orchestrate",
            post(crate::api::handlers::orchestrate::orchestrate),
        )
        .route(
            "/providers",
            get(crate::api::handlers::providers::list_providers),
        )
        .route(
            "/providers/check",
            get(crate::api::handlers::providers::check_providers),
        )
        .route("/health", get(crate::api::handlers::health::health))
}
