//! `RocksDB` storage layer for the tally billing ledger.
//!
//! This crate persists accounts, ledger entries, and invoices using
//! `RocksDB` with column families, and exposes the *compound* operations
//! the ledger's invariants depend on: debit, grant, invoice issue, sweep,
//! and settlement. Each compound operation runs its check-then-mutate
//! sequence under a per-account (or per-invoice) lock and commits all of
//! its writes in a single `WriteBatch`, so a crash or a concurrent request
//! can never observe a half-applied mutation.
//!
//! # Architecture
//!
//! Column families:
//!
//! - `accounts`: account records, keyed by `user_id`
//! - `entries`: ledger entries, keyed by `entry_id` (ULID)
//! - `entries_by_account`: index for listing an account's entries in time
//!   order
//! - `invoices`: invoice records, keyed by `invoice_id`
//! - `invoices_by_account`: index for listing an account's invoices
//! - `invoice_numbers`: uniqueness index for human-readable invoice numbers
//!
//! # Example
//!
//! ```no_run
//! use tally_store::{RocksStore, Store};
//! use tally_core::{CreditAccount, UserId};
//!
//! let store = RocksStore::open("/tmp/tally-db").unwrap();
//!
//! let user_id = UserId::generate();
//! let account = CreditAccount::new(user_id);
//! store.create_account(&account, None).unwrap();
//!
//! let loaded = store.get_account(&user_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
mod locks;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::NaiveDate;

use tally_core::{
    CreditAccount, EntryId, Invoice, InvoiceId, LedgerEntry, SweepAction, UserId,
};

/// Result of a successful debit.
#[derive(Debug, Clone, Copy)]
pub struct DebitOutcome {
    /// The ledger entry recorded for the debit.
    pub entry_id: EntryId,

    /// Credits remaining after the debit. May be negative while the trial
    /// override is in effect.
    pub remaining_credits: i64,

    /// Deferred balance after the debit, in cents.
    pub deferred_balance_cents: i64,
}

/// Result of a successful credit grant.
#[derive(Debug, Clone, Copy)]
pub struct GrantOutcome {
    /// The ledger entry recorded for the grant.
    pub entry_id: EntryId,

    /// Cumulative credits granted after this grant.
    pub total_credits: i64,

    /// Credits available after this grant.
    pub available_credits: i64,
}

/// Terms governing invoice issue.
#[derive(Debug, Clone)]
pub struct InvoiceTerms {
    /// The day the invoice is issued.
    pub today: NaiveDate,

    /// Override for the period start; defaults to the account's current
    /// billing period start.
    pub period_start: Option<NaiveDate>,

    /// Override for the period end; defaults to yesterday.
    pub period_end: Option<NaiveDate>,

    /// Days after the period end before payment falls due.
    pub grace_days: i64,

    /// Minimum deferred balance (in cents) required to issue.
    pub min_deferred_cents: i64,

    /// The ledger currency the invoice is denominated in.
    pub currency: String,
}

/// What one sweep pass did to one invoice.
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// The invoice state after the sweep.
    pub invoice: Invoice,

    /// The transition the sweep performed.
    pub action: SweepAction,
}

/// A payment fact asserted by the external gateway integration, already
/// converted to the invoice currency.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    /// Paid amount in cents of the invoice currency.
    pub paid_cents: i64,

    /// The settlement date.
    pub today: NaiveDate,

    /// Payment method (e.g. "card", "bank_transfer").
    pub payment_method: String,

    /// Gateway payment reference.
    pub payment_reference: String,
}

/// The storage trait defining all database operations.
///
/// Abstracts the storage layer so handlers and the sweeper can be exercised
/// against alternative implementations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Create an account, optionally recording its trial grant entry in the
    /// same atomic write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the account exists.
    fn create_account(
        &self,
        account: &CreditAccount,
        grant: Option<&LedgerEntry>,
    ) -> Result<()>;

    /// Get an account by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>>;

    /// Insert or overwrite an account record.
    ///
    /// Bypasses the compound-operation invariants; intended for
    /// administrative repair and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &CreditAccount) -> Result<()>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Get a ledger entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>>;

    /// List an account's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    /// List an account's completed usage entries whose creation date falls
    /// within `[from, to]` (inclusive), oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_usage_between(
        &self,
        user_id: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerEntry>>;

    // =========================================================================
    // Invoice Operations
    // =========================================================================

    /// Get an invoice by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Invoice>>;

    /// List an account's invoices ordered by due date. With
    /// `include_paid == false` only open (pending/overdue) invoices are
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_invoices(&self, user_id: &UserId, include_paid: bool) -> Result<Vec<Invoice>>;

    /// List ids of open invoices whose due date is before `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_due_invoices(&self, today: NaiveDate) -> Result<Vec<InvoiceId>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Authorize and apply a usage debit atomically.
    ///
    /// Runs the balance check, the account mutation, and the ledger append
    /// under the account's lock as one write batch. The deferred balance
    /// accrues when the account is past its trial in deferred mode.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientCredits` if the balance doesn't cover the
    ///   debit and the trial override doesn't apply.
    /// - `StoreError::InvalidEntry` if `entry` is not a usage entry.
    fn debit_usage(&self, entry: &LedgerEntry, today: NaiveDate) -> Result<DebitOutcome>;

    /// Apply a credit grant atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InvalidEntry` if `entry` is not a grant entry.
    fn add_credits(&self, entry: &LedgerEntry) -> Result<GrantOutcome>;

    /// Consolidate the account's deferred balance into a new invoice.
    ///
    /// The balance snapshot, the balance reset, and the invoice creation
    /// happen under the account's lock as one write batch; a crash between
    /// them cannot lose the billed amount.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::BelowMinimum` if the deferred balance is under the
    ///   configured minimum.
    fn issue_invoice(&self, user_id: &UserId, terms: &InvoiceTerms) -> Result<Invoice>;

    /// Run one sweep step against one invoice.
    ///
    /// Returns `Ok(None)` when the sweep had nothing to do (paid, not yet
    /// due, or already swept today), making repeated same-day sweeps
    /// no-ops.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the invoice doesn't exist.
    fn sweep_invoice(
        &self,
        invoice_id: &InvoiceId,
        today: NaiveDate,
        late_fee_percent: u8,
    ) -> Result<Option<SweepReport>>;

    /// Settle an invoice with an asserted payment, appending the payment
    /// ledger entry and updating the account's payment dates atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the invoice or its account doesn't
    ///   exist.
    /// - `StoreError::AlreadyPaid` if the invoice was settled before.
    /// - `StoreError::AmountMismatch` if the paid amount is outside the
    ///   matching tolerance.
    fn settle_invoice(&self, invoice_id: &InvoiceId, payment: &PaymentRecord) -> Result<Invoice>;
}
