//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, health, invoices, payments, usage};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts (user auth)
/// - `POST /v1/accounts` - Register account with trial grant
/// - `GET /v1/accounts/me` - Get account state and balances
///
/// ## Credits
/// - `POST /v1/credits/debit` - Authorize and apply a usage debit (service auth)
/// - `POST /v1/credits/add` - Grant purchased credits (service auth)
/// - `GET /v1/credits/entries` - List ledger history (user auth)
///
/// ## Invoices
/// - `POST /v1/invoices` - Consolidate deferred balance into an invoice (user auth)
/// - `GET /v1/invoices` - List invoices (user auth)
/// - `POST /v1/invoices/:invoice_id/payments` - Reconcile a payment (service auth)
///
/// ## Usage
/// - `GET /v1/usage/estimate` - Monthly cost estimate (user auth)
///
/// ## Operations (service auth)
/// - `POST /v1/sweep` - Run one overdue sweep pass
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Accounts
        .route("/v1/accounts", post(accounts::create_account))
        .route("/v1/accounts/me", get(accounts::get_account))
        // Credits
        .route("/v1/credits/debit", post(credits::debit))
        .route("/v1/credits/add", post(credits::add_credits))
        .route("/v1/credits/entries", get(credits::list_entries))
        // Invoices
        .route("/v1/invoices", post(invoices::create_invoice))
        .route("/v1/invoices", get(invoices::list_invoices))
        .route(
            "/v1/invoices/:invoice_id/payments",
            post(payments::process_payment),
        )
        // Usage
        .route("/v1/usage/estimate", get(usage::estimate))
        // Operations
        .route("/v1/sweep", post(invoices::run_sweep))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
