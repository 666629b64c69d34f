//! Core types and logic for the tally billing ledger.
//!
//! This crate provides the domain model shared by the tally services:
//!
//! - **Identifiers**: `UserId`, `InvoiceId`, `EntryId`
//! - **Accounts**: `CreditAccount`, `BillingMode`
//! - **Ledger**: `LedgerEntry`, `EntryKind`, `EntryStatus`
//! - **Pricing**: `RateTable`, `ServiceKind`, `ServiceRate`
//! - **Invoices**: `Invoice`, `InvoiceStatus`, `SweepAction`
//! - **Summaries**: `UsageSummary`, `ServiceUsage`
//! - **Configuration**: `BillingConfig`
//!
//! # Credit Unit
//!
//! **1 credit = `credit_price_cents` of the ledger currency** (1 cent by
//! default).
//!
//! - A user's trial grants 1000 credits → $10.00 of usage headroom
//! - A chat message costs 1 credit → 1 cent of deferred balance post-trial
//! - All monetary amounts are stored as `i64` integer cents; credits are
//!   whole `i64` units. No floating point touches the ledger.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod config;
pub mod error;
pub mod ids;
pub mod invoice;
pub mod ledger;
pub mod pricing;
pub mod summary;

pub use account::{BillingMode, CreditAccount};
pub use config::BillingConfig;
pub use error::{BillingError, Result};
pub use ids::{EntryId, IdError, InvoiceId, UserId};
pub use invoice::{Invoice, InvoiceStatus, SweepAction};
pub use ledger::{EntryKind, EntryStatus, LedgerEntry};
pub use pricing::{RateTable, ServiceKind, ServiceRate};
pub use summary::{ServiceUsage, UsageSummary};
