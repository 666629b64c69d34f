//! Overdue invoice sweeper.
//!
//! A periodic background job that reclassifies unpaid invoices past their
//! due date, applies late fees, and fires reminder notifications on the
//! overdue cadence. Each invoice transitions atomically in the store; the
//! per-invoice guards there make the whole pass idempotent, so a missed
//! run can safely catch up in one late pass and a double run changes
//! nothing.

use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::MissedTickBehavior;

use tally_store::{Store, StoreError};

use crate::notify::NotifyEvent;
use crate::state::AppState;

/// Run the sweeper loop on the configured interval. Never returns.
pub async fn run(state: AppState) {
    let period = Duration::from_secs(state.config.sweep_interval_seconds.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_seconds = %period.as_secs(), "overdue sweeper started");

    loop {
        ticker.tick().await;
        let today = chrono::Utc::now().date_naive();
        match sweep_once(&state, today) {
            Ok(swept) => tracing::info!(swept, "sweep pass complete"),
            Err(e) => tracing::error!(error = %e, "sweep pass failed"),
        }
    }
}

/// Run one sweep pass over all due invoices.
///
/// A single invoice's failure is logged and skipped rather than aborting
/// the batch. Returns the number of invoices transitioned.
///
/// # Errors
///
/// Returns an error only when the due-invoice listing itself fails.
pub fn sweep_once(state: &AppState, today: NaiveDate) -> Result<usize, StoreError> {
    let due = state.store.list_due_invoices(today)?;
    let late_fee_percent = state.config.billing.late_fee_percent;

    let mut swept = 0;
    for invoice_id in due {
        match state.store.sweep_invoice(&invoice_id, today, late_fee_percent) {
            Ok(Some(report)) => {
                swept += 1;

                if let Some(fee) = report.action.late_fee_cents {
                    tracing::info!(
                        invoice_number = %report.invoice.invoice_number,
                        late_fee_cents = %fee,
                        overdue_days = %report.action.overdue_days,
                        "late fee applied"
                    );
                }

                if report.action.remind {
                    state.notifier.dispatch(NotifyEvent::InvoiceOverdue {
                        user_id: report.invoice.account_id.to_string(),
                        invoice_number: report.invoice.invoice_number.clone(),
                        amount_cents: report.invoice.total_amount_cents,
                        currency: report.invoice.currency.clone(),
                        overdue_days: report.action.overdue_days,
                    });
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    invoice_id = %invoice_id,
                    error = %e,
                    "failed to sweep invoice, continuing"
                );
            }
        }
    }

    Ok(swept)
}
