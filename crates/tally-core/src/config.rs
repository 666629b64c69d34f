//! Billing configuration.
//!
//! The knobs that govern pricing, trials, and the invoice lifecycle. Loaded
//! once at startup and handed to services by reference; the rate table can
//! be hot-swapped by replacing the whole config snapshot.

use serde::{Deserialize, Serialize};

use crate::pricing::RateTable;

/// Configuration for the billing ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Monetary value of one credit, in cents of the ledger currency.
    pub credit_price_cents: i64,

    /// Credits granted to a new account's trial.
    pub trial_credits: i64,

    /// Length of the trial window in days. 0 disables the trial entirely
    /// (new accounts start in deferred billing immediately).
    pub trial_days: i64,

    /// Days after a billing period's end before an invoice falls due.
    pub grace_days: i64,

    /// Minimum deferred balance (in cents) required to issue an invoice.
    pub min_deferred_cents: i64,

    /// Late fee applied once an invoice is more than 7 days overdue, as a
    /// percentage of the invoice principal.
    pub late_fee_percent: u8,

    /// The single ledger currency all amounts are kept in.
    pub currency: String,

    /// Per-service credit rates.
    pub rates: RateTable,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            credit_price_cents: 1,
            trial_credits: 1000,
            trial_days: 30,
            grace_days: 7,
            min_deferred_cents: 1000, // $10.00
            late_fee_percent: 5,
            currency: "USD".into(),
            rates: RateTable::default(),
        }
    }
}

impl BillingConfig {
    /// Monetary value of a credit amount, in cents.
    #[must_use]
    pub const fn credits_to_cents(&self, credits: i64) -> i64 {
        credits * self.credit_price_cents
    }
}
