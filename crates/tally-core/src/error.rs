//! Error types for the tally ledger.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Insufficient credits for a debit.
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Credits currently available.
        available: i64,
        /// Credits required by the debit.
        required: i64,
    },

    /// Account not found.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user id that was not found.
        user_id: String,
    },

    /// Invoice not found.
    #[error("invoice not found: {invoice_id}")]
    InvoiceNotFound {
        /// The invoice id that was not found.
        invoice_id: String,
    },

    /// Deferred balance below the invoicing minimum.
    #[error("deferred balance {balance_cents} below minimum {minimum_cents}")]
    BelowMinimum {
        /// Current deferred balance in cents.
        balance_cents: i64,
        /// Configured minimum in cents.
        minimum_cents: i64,
    },

    /// Payment amount outside the matching tolerance.
    #[error("amount mismatch: expected {expected_cents}, got {got_cents}")]
    AmountMismatch {
        /// Invoice total in cents.
        expected_cents: i64,
        /// Converted payment amount in cents.
        got_cents: i64,
    },

    /// The invoice was already settled; paid is terminal.
    #[error("invoice already paid: {invoice_number}")]
    AlreadyPaid {
        /// The invoice number.
        invoice_number: String,
    },

    /// Concurrent-modification signal from the persistence layer; retried
    /// internally with bounded backoff before surfacing.
    #[error("persistence conflict: {0}")]
    Conflict(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Invalid amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
