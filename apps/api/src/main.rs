mod config;
mod crm;
mod db;
mod errors;
mod models;
mod routes;
mod state;
mod store;
mod sync;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::crm::{CrmClient, HttpEndpoint};
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgEngagementStore;
use crate::sync::SyncEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting StaffOps CRM sync v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgEngagementStore::new(db));

    // Initialize CRM client; authentication happens lazily on first call
    let endpoint = Arc::new(HttpEndpoint::new(&config.crm.url, config.crm.rpc_timeout)?);
    let crm = CrmClient::new(endpoint, &config.crm);
    info!(
        "CRM client initialized ({} / database '{}', rpc timeout {}s)",
        config.crm.url,
        config.crm.database,
        config.crm.rpc_timeout.as_secs()
    );

    let engine = SyncEngine::new(store, crm, config.sync.clone());
    info!(
        "Sync engine ready (batch size {}, batch deadline {}s)",
        config.sync.batch_size,
        config.sync.batch_deadline.as_secs()
    );

    let state = AppState {
        engine: Arc::new(engine),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the ops dashboard host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
