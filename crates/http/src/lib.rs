//! HTTP server facade for blogsmith: router assembly, middleware, and error
//! mapping.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};

use blogsmith_authz::OriginPolicy;
use blogsmith_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod middleware;
pub mod router;

use router::RouterBuilder;

pub const LIVENESS_MESSAGE: &str = "Server is running!";

/// Start the HTTP server and serve until a shutdown signal arrives
pub async fn start_server(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    let app = build_router(registry, settings);

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {address}"))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes merged in
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let policy = Arc::new(OriginPolicy::new(
        settings.cors.allowed_origins.iter().cloned(),
        settings.cors.allow_missing_origin,
    ));

    let mut router_builder = RouterBuilder::new().route("/", get(liveness));

    for module in registry.modules() {
        tracing::info!(module = module.name(), "mounting module routes");
        router_builder = router_builder.merge_module(module.routes());
    }

    router_builder
        .with_cors(&policy)
        .with_origin_guard(policy)
        .with_tracing()
        .with_request_id()
        .build()
}

/// Liveness check endpoint
async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
