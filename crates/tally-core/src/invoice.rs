//! Invoice lifecycle.
//!
//! An `Invoice` consolidates an account's deferred balance for one billing
//! period. Its status walks `Pending -> Overdue -> Paid` (or straight to
//! `Paid`); `Paid` is terminal. The transitions live here as pure methods
//! so the storage layer only has to persist whatever state they produce.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BillingError;
use crate::summary::UsageSummary;
use crate::{InvoiceId, UserId};

/// Days an invoice must be overdue before the late fee applies.
pub const LATE_FEE_THRESHOLD_DAYS: i64 = 7;

/// Cadence, in overdue days, of overdue reminders.
pub const REMINDER_CADENCE_DAYS: i64 = 7;

/// Absolute tolerance when matching a payment against an invoice, in cents.
pub const PAYMENT_TOLERANCE_CENTS: i64 = 1;

/// Status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued, not yet due or not yet past due.
    Pending,

    /// Past the due date and unpaid.
    Overdue,

    /// Settled. Terminal.
    Paid,
}

impl InvoiceStatus {
    /// Get the status name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
        }
    }

    /// Whether the invoice still awaits payment.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Overdue)
    }
}

/// A billed, time-boxed aggregation of deferred balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique invoice id.
    pub id: InvoiceId,

    /// The billed account.
    pub account_id: UserId,

    /// Globally unique human-readable number (`INV-<timestamp>-<suffix>`).
    pub invoice_number: String,

    /// Amount owed in cents, including any late fee.
    pub total_amount_cents: i64,

    /// The ledger currency the amount is denominated in.
    pub currency: String,

    /// First day of the billed period (inclusive).
    pub period_start: NaiveDate,

    /// Last day of the billed period (inclusive).
    pub period_end: NaiveDate,

    /// Usage snapshot for the billed period.
    pub usage_summary: UsageSummary,

    /// Current lifecycle status.
    pub status: InvoiceStatus,

    /// Date payment falls due.
    pub payment_due_date: NaiveDate,

    /// Days past due as of the last sweep.
    pub overdue_days: i64,

    /// Late fee in cents, once applied.
    pub late_fee_cents: i64,

    /// Guard: the late fee is computed once against the original principal
    /// and never re-applied by later sweeps.
    pub late_fee_applied: bool,

    /// Date of the last sweep that processed this invoice. Re-sweeping on
    /// the same day is a no-op.
    pub swept_on: Option<NaiveDate>,

    /// Date the invoice was paid.
    pub payment_date: Option<NaiveDate>,

    /// Payment method asserted by the gateway integration.
    pub payment_method: Option<String>,

    /// Gateway payment reference.
    pub payment_reference: Option<String>,

    /// When the invoice was created.
    pub created_at: DateTime<Utc>,
}

/// What a sweep did to one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepAction {
    /// Days past due as of the sweep.
    pub overdue_days: i64,

    /// Whether this sweep moved the invoice from `Pending` to `Overdue`.
    pub became_overdue: bool,

    /// The late fee applied by this sweep, if it crossed the threshold.
    pub late_fee_cents: Option<i64>,

    /// Whether the reminder cadence fired on this sweep.
    pub remind: bool,
}

impl Invoice {
    /// Create a pending invoice.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        account_id: UserId,
        invoice_number: String,
        total_amount_cents: i64,
        currency: String,
        period_start: NaiveDate,
        period_end: NaiveDate,
        usage_summary: UsageSummary,
        payment_due_date: NaiveDate,
    ) -> Self {
        Self {
            id: InvoiceId::generate(),
            account_id,
            invoice_number,
            total_amount_cents,
            currency,
            period_start,
            period_end,
            usage_summary,
            status: InvoiceStatus::Pending,
            payment_due_date,
            overdue_days: 0,
            late_fee_cents: 0,
            late_fee_applied: false,
            swept_on: None,
            payment_date: None,
            payment_method: None,
            payment_reference: None,
            created_at: Utc::now(),
        }
    }

    /// Generate an invoice number from a timestamp and a random suffix.
    ///
    /// Collisions are improbable but not impossible; the storage layer
    /// checks the number against the existing index and regenerates on a
    /// hit.
    #[must_use]
    pub fn generate_number(now: DateTime<Utc>) -> String {
        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..6];
        format!("INV-{}-{}", now.format("%Y%m%d%H%M%S"), suffix)
    }

    /// Run one sweep step against this invoice.
    ///
    /// Returns `None` when there is nothing to do: the invoice is paid, not
    /// yet past due, or was already swept today. Otherwise marks the invoice
    /// overdue, applies the late fee exactly once when `overdue_days`
    /// crosses [`LATE_FEE_THRESHOLD_DAYS`], and reports whether the
    /// reminder cadence fired.
    pub fn sweep(&mut self, today: NaiveDate, late_fee_percent: u8) -> Option<SweepAction> {
        if self.status == InvoiceStatus::Paid {
            return None;
        }
        if self.payment_due_date >= today {
            return None;
        }
        if self.swept_on == Some(today) {
            return None;
        }

        let overdue_days = (today - self.payment_due_date).num_days();
        let became_overdue = self.status == InvoiceStatus::Pending;

        self.status = InvoiceStatus::Overdue;
        self.overdue_days = overdue_days;
        self.swept_on = Some(today);

        let late_fee_cents = if overdue_days > LATE_FEE_THRESHOLD_DAYS && !self.late_fee_applied {
            // total_amount_cents is still the original principal here
            let fee = self.total_amount_cents * i64::from(late_fee_percent) / 100;
            self.late_fee_cents = fee;
            self.total_amount_cents += fee;
            self.late_fee_applied = true;
            Some(fee)
        } else {
            None
        };

        let remind = overdue_days % REMINDER_CADENCE_DAYS == 0;

        Some(SweepAction {
            overdue_days,
            became_overdue,
            late_fee_cents,
            remind,
        })
    }

    /// Settle this invoice with a payment already converted to the invoice
    /// currency.
    ///
    /// # Errors
    ///
    /// - `AlreadyPaid` when the invoice was settled before; the paid state
    ///   is terminal and a repeat payment is never silently re-applied.
    /// - `AmountMismatch` when the converted amount differs from the total
    ///   by more than [`PAYMENT_TOLERANCE_CENTS`].
    pub fn settle(
        &mut self,
        paid_cents: i64,
        today: NaiveDate,
        payment_method: &str,
        payment_reference: &str,
    ) -> Result<(), BillingError> {
        if self.status == InvoiceStatus::Paid {
            return Err(BillingError::AlreadyPaid {
                invoice_number: self.invoice_number.clone(),
            });
        }

        if (paid_cents - self.total_amount_cents).abs() > PAYMENT_TOLERANCE_CENTS {
            return Err(BillingError::AmountMismatch {
                expected_cents: self.total_amount_cents,
                got_cents: paid_cents,
            });
        }

        self.status = InvoiceStatus::Paid;
        self.payment_date = Some(today);
        self.payment_method = Some(payment_method.to_string());
        self.payment_reference = Some(payment_reference.to_string());
        Ok(())
    }
}
