// SPDX-License-Identifier: MIT

//! Profile Portal server.
//!
//! Delegated login against an external OIDC provider, a locally mirrored
//! user record, and a server-rendered profile form protected by per-session
//! anti-forgery tokens.

use profile_portal::{
    config::Config, db::Database, services::OidcClient, session::SessionStore, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Profile Portal");

    // Open the user record store, creating the table on first start
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to open database");
    db.init_schema().await.expect("Failed to create schema");

    // Resolve the provider endpoints (discovery with conventional fallback)
    let oidc = OidcClient::discover(&config)
        .await
        .expect("Failed to initialize OIDC client");
    tracing::info!(domain = %config.oidc_domain, "OIDC client initialized");

    // Session store shared across all requests in this instance
    let sessions = SessionStore::new(&config.session_secret);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        oidc,
        sessions,
    });

    // Build router
    let app = profile_portal::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("profile_portal=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
