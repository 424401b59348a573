use std::sync::Arc;

use crate::sync::SyncEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the CRM client (and its cached session) and the engagement store.
    pub engine: Arc<SyncEngine>,
}
