//! Tally HTTP API service.
//!
//! This crate provides the HTTP API for the tally billing ledger:
//!
//! - Account registration with trial grants
//! - Credit debits and grants
//! - Invoice generation and listing
//! - Payment reconciliation
//! - Usage estimation
//! - The background overdue sweeper
//!
//! # Authentication
//!
//! Two authentication methods are supported:
//!
//! 1. **User principals** - For end-user requests, injected by the gateway
//!    in front of this service
//! 2. **Service API keys** - For service-to-service requests (the metering
//!    endpoints and the payment-gateway integration)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Some handlers are async only for routing

pub mod auth;
pub mod config;
pub mod error;
pub mod fx;
pub mod handlers;
pub mod notify;
pub mod routes;
pub mod state;
pub mod sweeper;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use fx::{FxClient, FxError};
pub use notify::{Notifier, NotifyEvent};
pub use routes::create_router;
pub use state::AppState;
