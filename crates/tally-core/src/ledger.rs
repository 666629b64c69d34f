//! Ledger entry types.
//!
//! Every balance-affecting event appends one immutable `LedgerEntry`. The
//! ledger is the source of truth the account counters are reconciled
//! against: summing `credit_delta` over an account's completed entries
//! always reproduces `total_credits - used_credits`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::ServiceKind;
use crate::{EntryId, UserId};

/// A ledger entry recording one balance-affecting event.
///
/// Sign conventions: `credit_delta` is the change to the available credit
/// balance (grants positive, usage negative, payments zero).
/// `amount_cents` is the monetary value of the event with grants and
/// payments positive and usage negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry id (ULID, time-ordered).
    pub id: EntryId,

    /// The account this entry belongs to.
    pub account_id: UserId,

    /// What kind of event this records.
    pub kind: EntryKind,

    /// Signed change to the available credit balance.
    pub credit_delta: i64,

    /// Signed monetary amount in cents.
    pub amount_cents: i64,

    /// Monetary value of one credit at the time of the event, in cents.
    pub unit_price_cents: i64,

    /// The service the usage was metered for, if any.
    pub service: Option<ServiceKind>,

    /// The resource (twin, file, task, ...) the usage was attached to.
    pub resource_id: Option<uuid::Uuid>,

    /// Whether the event completed. Failed entries are kept for audit but
    /// excluded from summaries.
    pub status: EntryStatus,

    /// Human-readable description.
    pub description: String,

    /// Additional context (`payment_method`, `request_id`, ...).
    pub metadata: serde_json::Value,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a purchase entry granting `credits`.
    #[must_use]
    pub fn purchase(
        account_id: UserId,
        credits: i64,
        unit_price_cents: i64,
        description: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            account_id,
            kind: EntryKind::Purchase,
            credit_delta: credits,
            amount_cents: credits * unit_price_cents,
            unit_price_cents,
            service: None,
            resource_id: None,
            status: EntryStatus::Completed,
            description,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Create a trial grant entry.
    #[must_use]
    pub fn trial_grant(account_id: UserId, credits: i64, unit_price_cents: i64) -> Self {
        Self {
            id: EntryId::generate(),
            account_id,
            kind: EntryKind::TrialGrant,
            credit_delta: credits,
            amount_cents: 0, // granted, not paid for
            unit_price_cents,
            service: None,
            resource_id: None,
            status: EntryStatus::Completed,
            description: format!("Trial grant of {credits} credits"),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Create a usage entry consuming `credits`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn usage(
        account_id: UserId,
        credits: i64,
        unit_price_cents: i64,
        service: ServiceKind,
        resource_id: Option<uuid::Uuid>,
        description: String,
        metadata: serde_json::Value,
    ) -> Self {
        let credits = credits.abs();
        Self {
            id: EntryId::generate(),
            account_id,
            kind: EntryKind::Usage,
            credit_delta: -credits,
            amount_cents: -(credits * unit_price_cents),
            unit_price_cents,
            service: Some(service),
            resource_id,
            status: EntryStatus::Completed,
            description,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Create a payment entry settling an invoice.
    ///
    /// Payments move money, not credits, so `credit_delta` is zero.
    #[must_use]
    pub fn payment(
        account_id: UserId,
        amount_cents: i64,
        invoice_number: &str,
        payment_method: &str,
        payment_reference: &str,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            account_id,
            kind: EntryKind::Payment,
            credit_delta: 0,
            amount_cents,
            unit_price_cents: 0,
            service: None,
            resource_id: None,
            status: EntryStatus::Completed,
            description: format!("Payment for invoice {invoice_number}"),
            metadata: serde_json::json!({
                "invoice_number": invoice_number,
                "payment_method": payment_method,
                "payment_reference": payment_reference,
            }),
            created_at: Utc::now(),
        }
    }

    /// The number of credits this entry consumed (0 for non-usage entries).
    #[must_use]
    pub const fn credits_used(&self) -> i64 {
        match self.kind {
            EntryKind::Usage => -self.credit_delta,
            _ => 0,
        }
    }

    /// The monetary cost of this entry in cents, as a positive number
    /// (0 for non-usage entries).
    #[must_use]
    pub const fn cost_cents(&self) -> i64 {
        match self.kind {
            EntryKind::Usage => -self.amount_cents,
            _ => 0,
        }
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Credits bought by the user.
    Purchase,

    /// Credits granted by the trial.
    TrialGrant,

    /// Credits consumed by service usage.
    Usage,

    /// An invoice settlement.
    Payment,
}

impl EntryKind {
    /// Get the kind name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::TrialGrant => "trial_grant",
            Self::Usage => "usage",
            Self::Payment => "payment",
        }
    }

    /// Whether this entry kind grants credits.
    #[must_use]
    pub const fn is_grant(&self) -> bool {
        matches!(self, Self::Purchase | Self::TrialGrant)
    }

    /// Whether this entry kind consumes credits.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Usage)
    }
}

/// Completion status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// The event completed and counts toward balances.
    Completed,

    /// The event failed; kept for audit only.
    Failed,
}

impl EntryStatus {
    /// Get the status name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_entry_is_positive() {
        let entry = LedgerEntry::purchase(
            UserId::generate(),
            500,
            1,
            "Purchased 500 credits".into(),
            serde_json::Value::Null,
        );
        assert_eq!(entry.credit_delta, 500);
        assert_eq!(entry.amount_cents, 500);
        assert_eq!(entry.kind, EntryKind::Purchase);
        assert!(entry.kind.is_grant());
    }

    #[test]
    fn usage_entry_is_negative() {
        let entry = LedgerEntry::usage(
            UserId::generate(),
            100,
            1,
            ServiceKind::Chat,
            None,
            "Chat usage".into(),
            serde_json::json!({"messages": 100}),
        );
        assert_eq!(entry.credit_delta, -100);
        assert_eq!(entry.amount_cents, -100);
        assert_eq!(entry.credits_used(), 100);
        assert_eq!(entry.cost_cents(), 100);
        assert!(entry.kind.is_debit());
    }

    #[test]
    fn usage_entry_normalizes_sign() {
        // A negative credits argument still produces a debit
        let entry = LedgerEntry::usage(
            UserId::generate(),
            -40,
            2,
            ServiceKind::Voice,
            None,
            "Voice usage".into(),
            serde_json::Value::Null,
        );
        assert_eq!(entry.credit_delta, -40);
        assert_eq!(entry.amount_cents, -80);
    }

    #[test]
    fn trial_grant_has_no_monetary_amount() {
        let entry = LedgerEntry::trial_grant(UserId::generate(), 1000, 1);
        assert_eq!(entry.credit_delta, 1000);
        assert_eq!(entry.amount_cents, 0);
    }

    #[test]
    fn payment_entry_moves_no_credits() {
        let entry = LedgerEntry::payment(
            UserId::generate(),
            1500,
            "INV-20250301120000-123456",
            "card",
            "ch_123",
        );
        assert_eq!(entry.credit_delta, 0);
        assert_eq!(entry.amount_cents, 1500);
        assert_eq!(entry.metadata["payment_method"], "card");
    }
}
