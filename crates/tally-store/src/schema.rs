//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Ledger entries, keyed by `entry_id` (ULID).
    pub const ENTRIES: &str = "entries";

    /// Index: entries by account, keyed by `user_id || entry_id`.
    /// Value is empty (index only); ULID ordering makes the scan
    /// chronological.
    pub const ENTRIES_BY_ACCOUNT: &str = "entries_by_account";

    /// Invoice records, keyed by `invoice_id`.
    pub const INVOICES: &str = "invoices";

    /// Index: invoices by account, keyed by `user_id || invoice_id`.
    pub const INVOICES_BY_ACCOUNT: &str = "invoices_by_account";

    /// Uniqueness index for invoice numbers, keyed by the number string.
    pub const INVOICE_NUMBERS: &str = "invoice_numbers";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::ENTRIES,
        cf::ENTRIES_BY_ACCOUNT,
        cf::INVOICES,
        cf::INVOICES_BY_ACCOUNT,
        cf::INVOICE_NUMBERS,
    ]
}
