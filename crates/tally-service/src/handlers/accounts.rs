//! Account handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use tally_core::{CreditAccount, LedgerEntry};
use tally_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account state response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// The user id.
    pub user_id: String,
    /// Cumulative credits ever granted.
    pub total_credits: i64,
    /// Cumulative credits ever consumed.
    pub used_credits: i64,
    /// Credits available to spend.
    pub available_credits: i64,
    /// Credits granted by the trial.
    pub trial_credits: i64,
    /// Last day of the trial window, if any.
    pub trial_end_date: Option<String>,
    /// Whether the trial is active today.
    pub trial_active: bool,
    /// Deferred balance in cents.
    pub deferred_balance_cents: i64,
    /// Deferred balance formatted as currency.
    pub deferred_balance_formatted: String,
    /// Due date of the outstanding invoice, if any.
    pub next_payment_due_date: Option<String>,
    /// The ledger currency.
    pub currency: String,
}

impl AccountResponse {
    fn from_account(account: &CreditAccount, currency: &str) -> Self {
        let today = chrono::Utc::now().date_naive();
        Self {
            user_id: account.user_id.to_string(),
            total_credits: account.total_credits,
            used_credits: account.used_credits,
            available_credits: account.available_credits(),
            trial_credits: account.trial_credits,
            trial_end_date: account.trial_end_date.map(|d| d.to_string()),
            trial_active: account.trial_active(today),
            deferred_balance_cents: account.deferred_balance_cents,
            deferred_balance_formatted: format!(
                "${:.2}",
                account.deferred_balance_cents as f64 / 100.0
            ),
            next_payment_due_date: account.next_payment_due_date.map(|d| d.to_string()),
            currency: currency.to_string(),
        }
    }
}

/// Register the caller's account, granting the configured trial.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let billing = &state.config.billing;
    let today = chrono::Utc::now().date_naive();

    let account = CreditAccount::with_trial(
        auth.user_id,
        billing.trial_credits,
        billing.trial_days,
        today,
    );

    let grant = (account.trial_credits > 0).then(|| {
        LedgerEntry::trial_grant(auth.user_id, account.trial_credits, billing.credit_price_cents)
    });

    state.store.create_account(&account, grant.as_ref())?;

    tracing::info!(
        user_id = %auth.user_id,
        trial_credits = %account.trial_credits,
        trial_end = ?account.trial_end_date,
        "Account created"
    );

    Ok(Json(AccountResponse::from_account(&account, &billing.currency)))
}

/// Get the caller's account state.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from_account(
        &account,
        &state.config.billing.currency,
    )))
}
