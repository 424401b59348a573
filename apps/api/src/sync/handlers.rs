//! Axum route handlers for the CRM sync API.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;

use crate::crm::{OpportunityId, SessionCredential};
use crate::errors::AppError;
use crate::state::AppState;
use crate::sync::engine::{BatchReport, StatusAck, StatusUpdate, SyncOutcome};
use crate::sync::status::{ConnectionReport, SyncStatusReport};

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub limit: Option<usize>,
}

/// POST /api/v1/crm/sync/engagements/:id
pub async fn handle_sync_engagement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SyncOutcome>, AppError> {
    Ok(Json(state.engine.sync_engagement(&id).await?))
}

/// POST /api/v1/crm/sync/all
pub async fn handle_sync_all(
    State(state): State<AppState>,
    query: Result<Query<BatchQuery>, QueryRejection>,
) -> Result<Json<BatchReport>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.engine.sync_all(query.limit).await?))
}

/// GET /api/v1/crm/sync/status
pub async fn handle_sync_status(
    State(state): State<AppState>,
) -> Result<Json<SyncStatusReport>, AppError> {
    Ok(Json(state.engine.sync_status().await?))
}

/// GET /api/v1/crm/test-connection
pub async fn handle_test_connection(State(state): State<AppState>) -> Json<ConnectionReport> {
    Json(state.engine.test_connection().await)
}

/// POST /api/v1/crm/opportunities/:id/status
pub async fn handle_update_opportunity_status(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    update: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<StatusAck>, AppError> {
    let Path(id) = id?;
    let Json(update) = update?;
    let ack = state
        .engine
        .update_opportunity_status(OpportunityId(id), &update)
        .await?;
    Ok(Json(ack))
}

/// POST /api/v1/crm/session/refresh
pub async fn handle_refresh_session(
    State(state): State<AppState>,
) -> Result<Json<SessionCredential>, AppError> {
    Ok(Json(state.engine.crm().session().reauthenticate().await?))
}
