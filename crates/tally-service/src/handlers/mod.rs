//! API handlers.

// Allow precision loss in handlers - formatted amounts are well within f64 precision
#![allow(clippy::cast_precision_loss)]

pub mod accounts;
pub mod credits;
pub mod health;
pub mod invoices;
pub mod payments;
pub mod usage;
