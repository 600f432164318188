//! HTTP API (axum router + server loop).
//!
//! - `routes.rs`: handlers, one per operation
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: `AppError` to JSON error responses
//! - `middleware.rs`: bearer token authentication

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::application::Services;

pub mod dto;
pub mod errors;
pub mod middleware;
pub mod routes;

/// Build the full HTTP router.
pub fn build_app(services: Arc<Services>) -> Router {
    // Protected routes: require a valid session token.
    let protected = Router::new()
        .route("/profile", get(routes::show_profile))
        .route("/statements/balance", get(routes::get_balance))
        .route("/statements/deposit", post(routes::create_deposit))
        .route("/statements/withdraw", post(routes::create_withdraw))
        .route("/statements/:statement_id", get(routes::get_statement))
        .route_layer(axum::middleware::from_fn_with_state(
            services.clone(),
            middleware::auth_middleware,
        ));

    let public = Router::new()
        .route("/users", post(routes::register))
        .route("/sessions", post(routes::authenticate));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/v1", public.merge(protected))
        .with_state(services)
}

/// Serve the API on an already-bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, services: Arc<Services>) -> Result<()> {
    let app = build_app(services);

    tracing::info!(
        "listening on {}",
        listener.local_addr().context("Listener has no local address")?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
