//! Error types for tally storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The entity kind ("account", "invoice", "entry").
        entity: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// Record already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// The entity kind.
        entity: &'static str,
        /// The id that already exists.
        id: String,
    },

    /// Insufficient credits for a debit.
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Credits currently available.
        available: i64,
        /// Credits required by the debit.
        required: i64,
    },

    /// Deferred balance below the invoicing minimum.
    #[error("deferred balance {balance_cents} below minimum {minimum_cents}")]
    BelowMinimum {
        /// Current deferred balance in cents.
        balance_cents: i64,
        /// Configured minimum in cents.
        minimum_cents: i64,
    },

    /// The invoice was already settled.
    #[error("invoice already paid: {invoice_number}")]
    AlreadyPaid {
        /// The invoice number.
        invoice_number: String,
    },

    /// Payment amount outside the matching tolerance.
    #[error("amount mismatch: expected {expected_cents}, got {got_cents}")]
    AmountMismatch {
        /// Invoice total in cents.
        expected_cents: i64,
        /// Paid amount in cents.
        got_cents: i64,
    },

    /// A compound operation was handed an entry of the wrong shape.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    /// Transient write conflict that exhausted its retries.
    #[error("persistence conflict: {0}")]
    Conflict(String),
}
