//! Credit account state.
//!
//! One `CreditAccount` exists per user. Both credit counters are cumulative
//! (`total_credits` ever granted, `used_credits` ever consumed) so the
//! available balance is always the difference and individual ledger entries
//! never need to be replayed to answer a balance query.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// How usage beyond the trial is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    /// Pay-later: post-trial usage accrues a deferred monetary balance that
    /// is periodically consolidated into invoices.
    Deferred,

    /// Billed through an external subscription; no deferred accrual.
    Subscription,
}

/// A user's credit account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    /// The owning user.
    pub user_id: UserId,

    /// Cumulative credits ever granted (purchases + trial grant).
    pub total_credits: i64,

    /// Cumulative credits ever consumed.
    pub used_credits: i64,

    /// The portion of `total_credits` that came from the trial grant.
    ///
    /// Tracked as its own counter so purchased credits never extend the
    /// trial override window.
    pub trial_credits: i64,

    /// Last day of the trial window. The trial is active while
    /// `today <= trial_end_date`. `None` means no trial.
    pub trial_end_date: Option<NaiveDate>,

    /// How post-trial usage is billed.
    pub billing_mode: BillingMode,

    /// Monetary amount owed but not yet invoiced, in cents.
    pub deferred_balance_cents: i64,

    /// Lifetime monetary value of usage, in cents.
    pub total_spent_cents: i64,

    /// Date of the most recent settled payment.
    pub last_payment_date: Option<NaiveDate>,

    /// Due date of the most recently issued, still-outstanding invoice.
    pub next_payment_due_date: Option<NaiveDate>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// Create an account with no credits and no trial.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            total_credits: 0,
            used_credits: 0,
            trial_credits: 0,
            trial_end_date: None,
            billing_mode: BillingMode::Deferred,
            deferred_balance_cents: 0,
            total_spent_cents: 0,
            last_payment_date: None,
            next_payment_due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an account with a trial grant.
    ///
    /// With `trial_days == 0` no trial window is opened and the grant (if
    /// any) is treated as ordinary credits.
    #[must_use]
    pub fn with_trial(user_id: UserId, trial_credits: i64, trial_days: i64, today: NaiveDate) -> Self {
        let mut account = Self::new(user_id);
        if trial_days > 0 {
            account.total_credits = trial_credits;
            account.trial_credits = trial_credits;
            account.trial_end_date =
                today.checked_add_days(Days::new(trial_days.unsigned_abs()));
        }
        account
    }

    /// Credits currently available to spend.
    ///
    /// May be negative while the trial override is in effect (see
    /// [`Self::can_debit`]).
    #[must_use]
    pub const fn available_credits(&self) -> i64 {
        self.total_credits - self.used_credits
    }

    /// Whether the trial window is active on `today`.
    #[must_use]
    pub fn trial_active(&self, today: NaiveDate) -> bool {
        self.trial_end_date.is_some_and(|end| today <= end)
    }

    /// Whether the trial override still applies: the trial window is open
    /// and fewer credits have been consumed than the trial granted.
    #[must_use]
    pub fn trial_headroom(&self, today: NaiveDate) -> bool {
        self.trial_active(today) && self.used_credits < self.trial_credits
    }

    /// Whether a debit of `amount` credits is allowed on `today`.
    ///
    /// A debit is allowed if the available balance covers it, or if the
    /// trial override applies (in which case the balance may go negative).
    #[must_use]
    pub fn can_debit(&self, amount: i64, today: NaiveDate) -> bool {
        self.available_credits() >= amount || self.trial_headroom(today)
    }

    /// Whether usage on `today` accrues to the deferred monetary balance.
    #[must_use]
    pub fn accrues_deferred(&self, today: NaiveDate) -> bool {
        !self.trial_active(today) && self.billing_mode == BillingMode::Deferred
    }

    /// Start of the current (unbilled) billing period.
    ///
    /// The period opens at the last payment, or the day after the trial
    /// ended, or account creation, whichever applies first.
    #[must_use]
    pub fn billing_period_start(&self) -> NaiveDate {
        if let Some(last) = self.last_payment_date {
            last
        } else if let Some(trial_end) = self.trial_end_date {
            trial_end.succ_opt().unwrap_or(trial_end)
        } else {
            self.created_at.date_naive()
        }
    }
}
