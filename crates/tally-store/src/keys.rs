//! Key encoding utilities for `RocksDB`.

use tally_core::{EntryId, InvoiceId, UserId};

/// Create an account key from a user id.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a ledger entry key from an entry id.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create an account-entry index key.
///
/// Format: `user_id (16 bytes) || entry_id (16 bytes)`.
///
/// ULIDs are time-ordered, so a prefix scan yields an account's entries in
/// chronological order.
#[must_use]
pub fn account_entry_key(user_id: &UserId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all entries for an account.
#[must_use]
pub fn account_entries_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the entry id from an account-entry index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id(key: &[u8]) -> EntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    EntryId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create an invoice key from an invoice id.
#[must_use]
pub fn invoice_key(invoice_id: &InvoiceId) -> Vec<u8> {
    invoice_id.as_bytes().to_vec()
}

/// Create an account-invoice index key.
///
/// Format: `user_id (16 bytes) || invoice_id (16 bytes)`.
#[must_use]
pub fn account_invoice_key(user_id: &UserId, invoice_id: &InvoiceId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(invoice_id.as_bytes());
    key
}

/// Create a prefix for iterating all invoices for an account.
#[must_use]
pub fn account_invoices_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the invoice id from an account-invoice index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_invoice_id(key: &[u8]) -> InvoiceId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    InvoiceId::from_uuid(uuid::Uuid::from_bytes(bytes))
}

/// Create an invoice-number uniqueness key.
#[must_use]
pub fn invoice_number_key(invoice_number: &str) -> Vec<u8> {
    invoice_number.as_bytes().to_vec()
}
