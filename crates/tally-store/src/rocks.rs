//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use tally_core::{
    BillingError, CreditAccount, EntryId, Invoice, InvoiceId, LedgerEntry, UsageSummary, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::ShardedLocks;
use crate::schema::{all_column_families, cf};
use crate::{DebitOutcome, GrantOutcome, InvoiceTerms, PaymentRecord, Store, SweepReport};

/// Number of mutexes in each lock pool.
const LOCK_SHARDS: usize = 64;

/// Attempts for a write batch before a transient failure surfaces.
const MAX_WRITE_ATTEMPTS: u64 = 3;

/// Attempts to generate a collision-free invoice number.
const MAX_NUMBER_ATTEMPTS: usize = 8;

/// RocksDB-backed storage implementation.
///
/// Compound operations take a per-account (or per-invoice) lock for their
/// whole check-then-mutate sequence, so concurrent requests against the
/// same record serialize while unrelated records proceed in parallel.
/// Cross-record operations always lock invoice before account, which keeps
/// the lock order acyclic.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    account_locks: ShardedLocks,
    invoice_locks: ShardedLocks,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            account_locks: ShardedLocks::new(LOCK_SHARDS),
            invoice_locks: ShardedLocks::new(LOCK_SHARDS),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read and deserialize one record.
    fn get_record<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Write a set of puts as one batch, retrying transient failures with
    /// bounded backoff before surfacing `StoreError::Conflict`.
    fn write_all(&self, puts: &[(Arc<BoundColumnFamily<'_>>, Vec<u8>, Vec<u8>)]) -> Result<()> {
        let mut attempt: u64 = 0;
        loop {
            let mut batch = WriteBatch::default();
            for (cf, key, value) in puts {
                batch.put_cf(cf, key, value);
            }

            match self.db.write(batch) {
                Ok(()) => return Ok(()),
                Err(e) if is_transient(&e) => {
                    attempt += 1;
                    if attempt >= MAX_WRITE_ATTEMPTS {
                        return Err(StoreError::Conflict(e.to_string()));
                    }
                    std::thread::sleep(Duration::from_millis(10 * attempt));
                }
                Err(e) => return Err(StoreError::Database(e.to_string())),
            }
        }
    }

    /// Load an account or fail with `NotFound`.
    fn load_account(&self, user_id: &UserId) -> Result<CreditAccount> {
        self.get_account(user_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "account",
            id: user_id.to_string(),
        })
    }

    /// Load an invoice or fail with `NotFound`.
    fn load_invoice(&self, invoice_id: &InvoiceId) -> Result<Invoice> {
        self.get_invoice(invoice_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "invoice",
                id: invoice_id.to_string(),
            })
    }

    /// Allocate an invoice number that is absent from the uniqueness index.
    fn allocate_invoice_number(&self) -> Result<String> {
        let cf_numbers = self.cf(cf::INVOICE_NUMBERS)?;
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let number = Invoice::generate_number(Utc::now());
            let taken = self
                .db
                .get_cf(&cf_numbers, keys::invoice_number_key(&number))
                .map_err(|e| StoreError::Database(e.to_string()))?
                .is_some();
            if !taken {
                return Ok(number);
            }
        }
        Err(StoreError::Conflict(
            "could not allocate a unique invoice number".into(),
        ))
    }
}

fn is_transient(e: &rocksdb::Error) -> bool {
    matches!(
        e.kind(),
        rocksdb::ErrorKind::Busy | rocksdb::ErrorKind::TryAgain | rocksdb::ErrorKind::TimedOut
    )
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn create_account(&self, account: &CreditAccount, grant: Option<&LedgerEntry>) -> Result<()> {
        let key = keys::account_key(&account.user_id);
        let _guard = self.account_locks.lock(&key);

        if self.get_account(&account.user_id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "account",
                id: account.user_id.to_string(),
            });
        }

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let mut puts = vec![(cf_accounts, key, Self::serialize(account)?)];

        if let Some(entry) = grant {
            let cf_entries = self.cf(cf::ENTRIES)?;
            let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;
            puts.push((cf_entries, keys::entry_key(&entry.id), Self::serialize(entry)?));
            puts.push((
                cf_index,
                keys::account_entry_key(&account.user_id, &entry.id),
                Vec::new(),
            ));
        }

        self.write_all(&puts)
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        self.get_record(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    fn put_account(&self, account: &CreditAccount) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.user_id);
        let value = Self::serialize(account)?;
        self.write_all(&[(cf, key, value)])
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>> {
        self.get_record(cf::ENTRIES, &keys::entry_key(entry_id))
    }

    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;
        let prefix = keys::account_entries_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_index,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        // ULID keys scan oldest-first; collect and reverse for newest-first
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }
        all_keys.reverse();

        let mut entries = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if entries.len() >= limit {
                break;
            }
            let entry_id = keys::extract_entry_id(&key);
            if let Some(entry) = self.get_entry(&entry_id)? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    fn list_usage_between(
        &self,
        user_id: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerEntry>> {
        let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;
        let prefix = keys::account_entries_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_index,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut entries = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let entry_id = keys::extract_entry_id(&key);
            if let Some(entry) = self.get_entry(&entry_id)? {
                let date = entry.created_at.date_naive();
                if entry.kind == tally_core::EntryKind::Usage
                    && entry.status == tally_core::EntryStatus::Completed
                    && date >= from
                    && date <= to
                {
                    entries.push(entry);
                }
            }
        }

        Ok(entries)
    }

    // =========================================================================
    // Invoice Operations
    // =========================================================================

    fn get_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Invoice>> {
        self.get_record(cf::INVOICES, &keys::invoice_key(invoice_id))
    }

    fn list_invoices(&self, user_id: &UserId, include_paid: bool) -> Result<Vec<Invoice>> {
        let cf_index = self.cf(cf::INVOICES_BY_ACCOUNT)?;
        let prefix = keys::account_invoices_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_index,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut invoices = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let invoice_id = keys::extract_invoice_id(&key);
            if let Some(invoice) = self.get_invoice(&invoice_id)? {
                if include_paid || invoice.status.is_open() {
                    invoices.push(invoice);
                }
            }
        }

        invoices.sort_by_key(|inv| inv.payment_due_date);
        Ok(invoices)
    }

    fn list_due_invoices(&self, today: NaiveDate) -> Result<Vec<InvoiceId>> {
        let cf_invoices = self.cf(cf::INVOICES)?;

        // Full scan; the open-invoice population is small compared to the
        // ledger and the sweeper runs on a relaxed cadence.
        let mut due = Vec::new();
        for item in self.db.iterator_cf(&cf_invoices, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let invoice: Invoice = Self::deserialize(&value)?;
            if invoice.status.is_open() && invoice.payment_due_date < today {
                due.push(invoice.id);
            }
        }

        Ok(due)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn debit_usage(&self, entry: &LedgerEntry, today: NaiveDate) -> Result<DebitOutcome> {
        if !entry.kind.is_debit() {
            return Err(StoreError::InvalidEntry(format!(
                "debit_usage requires a usage entry, got {:?}",
                entry.kind
            )));
        }
        let credits = entry.credits_used();
        if credits <= 0 {
            return Err(StoreError::InvalidEntry(
                "usage entry must consume a positive credit amount".into(),
            ));
        }

        let account_key = keys::account_key(&entry.account_id);
        let _guard = self.account_locks.lock(&account_key);

        let mut account = self.load_account(&entry.account_id)?;

        if !account.can_debit(credits, today) {
            return Err(StoreError::InsufficientCredits {
                available: account.available_credits(),
                required: credits,
            });
        }

        let cost_cents = entry.cost_cents();
        account.used_credits += credits;
        account.total_spent_cents += cost_cents;
        if account.accrues_deferred(today) {
            account.deferred_balance_cents += cost_cents;
        }
        account.updated_at = Utc::now();

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;

        self.write_all(&[
            (cf_accounts, account_key, Self::serialize(&account)?),
            (cf_entries, keys::entry_key(&entry.id), Self::serialize(entry)?),
            (
                cf_index,
                keys::account_entry_key(&entry.account_id, &entry.id),
                Vec::new(),
            ),
        ])?;

        Ok(DebitOutcome {
            entry_id: entry.id,
            remaining_credits: account.available_credits(),
            deferred_balance_cents: account.deferred_balance_cents,
        })
    }

    fn add_credits(&self, entry: &LedgerEntry) -> Result<GrantOutcome> {
        if !entry.kind.is_grant() {
            return Err(StoreError::InvalidEntry(format!(
                "add_credits requires a grant entry, got {:?}",
                entry.kind
            )));
        }
        if entry.credit_delta <= 0 {
            return Err(StoreError::InvalidEntry(
                "grant entry must add a positive credit amount".into(),
            ));
        }

        let account_key = keys::account_key(&entry.account_id);
        let _guard = self.account_locks.lock(&account_key);

        let mut account = self.load_account(&entry.account_id)?;

        account.total_credits += entry.credit_delta;
        if entry.kind == tally_core::EntryKind::TrialGrant {
            account.trial_credits += entry.credit_delta;
        }
        account.updated_at = Utc::now();

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;

        self.write_all(&[
            (cf_accounts, account_key, Self::serialize(&account)?),
            (cf_entries, keys::entry_key(&entry.id), Self::serialize(entry)?),
            (
                cf_index,
                keys::account_entry_key(&entry.account_id, &entry.id),
                Vec::new(),
            ),
        ])?;

        Ok(GrantOutcome {
            entry_id: entry.id,
            total_credits: account.total_credits,
            available_credits: account.available_credits(),
        })
    }

    fn issue_invoice(&self, user_id: &UserId, terms: &InvoiceTerms) -> Result<Invoice> {
        let account_key = keys::account_key(user_id);
        let _guard = self.account_locks.lock(&account_key);

        let mut account = self.load_account(user_id)?;

        // The deferred balance is the running unbilled total; the invoice
        // amount is this snapshot, not a ledger recomputation.
        let total_cents = account.deferred_balance_cents;
        if total_cents < terms.min_deferred_cents {
            return Err(StoreError::BelowMinimum {
                balance_cents: total_cents,
                minimum_cents: terms.min_deferred_cents,
            });
        }

        let period_start = terms
            .period_start
            .unwrap_or_else(|| account.billing_period_start());
        let period_end = terms
            .period_end
            .unwrap_or_else(|| terms.today.pred_opt().unwrap_or(terms.today));

        let usage = self.list_usage_between(user_id, period_start, period_end)?;
        let summary = UsageSummary::from_entries(period_start, period_end, &usage);

        let invoice_number = self.allocate_invoice_number()?;
        let payment_due_date = period_end
            .checked_add_days(chrono::Days::new(terms.grace_days.unsigned_abs()))
            .unwrap_or(period_end);

        let invoice = Invoice::issue(
            *user_id,
            invoice_number,
            total_cents,
            terms.currency.clone(),
            period_start,
            period_end,
            summary,
            payment_due_date,
        );

        account.deferred_balance_cents = 0;
        account.next_payment_due_date = Some(payment_due_date);
        account.updated_at = Utc::now();

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_invoices = self.cf(cf::INVOICES)?;
        let cf_by_account = self.cf(cf::INVOICES_BY_ACCOUNT)?;
        let cf_numbers = self.cf(cf::INVOICE_NUMBERS)?;

        self.write_all(&[
            (cf_accounts, account_key, Self::serialize(&account)?),
            (
                cf_invoices,
                keys::invoice_key(&invoice.id),
                Self::serialize(&invoice)?,
            ),
            (
                cf_by_account,
                keys::account_invoice_key(user_id, &invoice.id),
                Vec::new(),
            ),
            (
                cf_numbers,
                keys::invoice_number_key(&invoice.invoice_number),
                invoice.id.as_bytes().to_vec(),
            ),
        ])?;

        Ok(invoice)
    }

    fn sweep_invoice(
        &self,
        invoice_id: &InvoiceId,
        today: NaiveDate,
        late_fee_percent: u8,
    ) -> Result<Option<SweepReport>> {
        let invoice_key = keys::invoice_key(invoice_id);
        let _guard = self.invoice_locks.lock(&invoice_key);

        let mut invoice = self.load_invoice(invoice_id)?;

        let Some(action) = invoice.sweep(today, late_fee_percent) else {
            return Ok(None);
        };

        let cf_invoices = self.cf(cf::INVOICES)?;
        self.write_all(&[(cf_invoices, invoice_key, Self::serialize(&invoice)?)])?;

        Ok(Some(SweepReport { invoice, action }))
    }

    fn settle_invoice(&self, invoice_id: &InvoiceId, payment: &PaymentRecord) -> Result<Invoice> {
        let invoice_key = keys::invoice_key(invoice_id);
        let _invoice_guard = self.invoice_locks.lock(&invoice_key);

        let mut invoice = self.load_invoice(invoice_id)?;

        invoice
            .settle(
                payment.paid_cents,
                payment.today,
                &payment.payment_method,
                &payment.payment_reference,
            )
            .map_err(|e| match e {
                BillingError::AlreadyPaid { invoice_number } => {
                    StoreError::AlreadyPaid { invoice_number }
                }
                BillingError::AmountMismatch {
                    expected_cents,
                    got_cents,
                } => StoreError::AmountMismatch {
                    expected_cents,
                    got_cents,
                },
                other => StoreError::InvalidEntry(other.to_string()),
            })?;

        // Lock order is invoice -> account everywhere; no cycle.
        let account_key = keys::account_key(&invoice.account_id);
        let _account_guard = self.account_locks.lock(&account_key);

        let mut account = self.load_account(&invoice.account_id)?;
        account.last_payment_date = Some(payment.today);
        account.next_payment_due_date = None;
        account.updated_at = Utc::now();

        let entry = LedgerEntry::payment(
            invoice.account_id,
            invoice.total_amount_cents,
            &invoice.invoice_number,
            &payment.payment_method,
            &payment.payment_reference,
        );

        let cf_invoices = self.cf(cf::INVOICES)?;
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;

        self.write_all(&[
            (cf_invoices, invoice_key, Self::serialize(&invoice)?),
            (cf_accounts, account_key, Self::serialize(&account)?),
            (cf_entries, keys::entry_key(&entry.id), Self::serialize(&entry)?),
            (
                cf_index,
                keys::account_entry_key(&invoice.account_id, &entry.id),
                Vec::new(),
            ),
        ])?;

        Ok(invoice)
    }
}
