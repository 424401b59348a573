pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::sync::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // CRM sync API
        .route(
            "/api/v1/crm/sync/engagements/:id",
            post(handlers::handle_sync_engagement),
        )
        .route("/api/v1/crm/sync/all", post(handlers::handle_sync_all))
        .route("/api/v1/crm/sync/status", get(handlers::handle_sync_status))
        .route(
            "/api/v1/crm/test-connection",
            get(handlers::handle_test_connection),
        )
        .route(
            "/api/v1/crm/opportunities/:id/status",
            post(handlers::handle_update_opportunity_status),
        )
        .route(
            "/api/v1/crm/session/refresh",
            post(handlers::handle_refresh_session),
        )
        .with_state(state)
}
