//! Marketplace admin console
//!
//! HTTP front end over the session, data-access and workflow crates: public
//! auth pages, the private-route guard and one handler module per page.

pub mod config;
pub mod context;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod preferences;
pub mod routes;
pub mod state;
pub mod view;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::GatewayConfig;
use crate::context::AppContext;
use crate::routes::create_router;
use crate::state::AppState;

/// Run the HTTP server with the given configuration.
///
/// Returns after ctrl-c, once the application context has been disposed.
pub async fn run_server_with_config(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Create application context
    let context = Arc::new(AppContext::init(config).await?);
    let state = AppState::new(context.clone());

    // Build router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Admin console listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    context.dispose().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
