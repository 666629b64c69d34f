//! Invoice handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tally_core::Invoice;
use tally_store::{InvoiceTerms, Store};

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::notify::NotifyEvent;
use crate::state::AppState;
use crate::sweeper;

/// Invoice generation request.
#[derive(Debug, Default, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Override for the billing period start.
    pub period_start: Option<NaiveDate>,
    /// Override for the billing period end.
    pub period_end: Option<NaiveDate>,
}

/// Invoice response.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    /// Invoice id.
    pub invoice_id: String,
    /// Human-readable invoice number.
    pub invoice_number: String,
    /// Amount owed in cents, fee-inclusive.
    pub amount_cents: i64,
    /// Amount formatted as currency.
    pub amount_formatted: String,
    /// Invoice currency.
    pub currency: String,
    /// Lifecycle status.
    pub status: String,
    /// First day of the billed period.
    pub period_start: String,
    /// Last day of the billed period.
    pub period_end: String,
    /// Payment due date.
    pub payment_due_date: String,
    /// Days past due as of the last sweep.
    pub overdue_days: i64,
    /// Late fee in cents, once applied.
    pub late_fee_cents: i64,
    /// Date the invoice was paid, if settled.
    pub payment_date: Option<String>,
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            invoice_id: invoice.id.to_string(),
            invoice_number: invoice.invoice_number.clone(),
            amount_cents: invoice.total_amount_cents,
            amount_formatted: format!("${:.2}", invoice.total_amount_cents as f64 / 100.0),
            currency: invoice.currency.clone(),
            status: invoice.status.as_str().to_string(),
            period_start: invoice.period_start.to_string(),
            period_end: invoice.period_end.to_string(),
            payment_due_date: invoice.payment_due_date.to_string(),
            overdue_days: invoice.overdue_days,
            late_fee_cents: invoice.late_fee_cents,
            payment_date: invoice.payment_date.map(|d| d.to_string()),
        }
    }
}

/// Consolidate the caller's deferred balance into an invoice.
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Option<Json<CreateInvoiceRequest>>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let body = body.map_or_else(CreateInvoiceRequest::default, |Json(b)| b);
    let billing = &state.config.billing;

    let terms = InvoiceTerms {
        today: chrono::Utc::now().date_naive(),
        period_start: body.period_start,
        period_end: body.period_end,
        grace_days: billing.grace_days,
        min_deferred_cents: billing.min_deferred_cents,
        currency: billing.currency.clone(),
    };

    let invoice = state.store.issue_invoice(&auth.user_id, &terms)?;

    tracing::info!(
        user_id = %auth.user_id,
        invoice_number = %invoice.invoice_number,
        amount_cents = %invoice.total_amount_cents,
        due = %invoice.payment_due_date,
        "Invoice generated"
    );

    state.notifier.dispatch(NotifyEvent::InvoiceGenerated {
        user_id: auth.user_id.to_string(),
        invoice_number: invoice.invoice_number.clone(),
        amount_cents: invoice.total_amount_cents,
        currency: invoice.currency.clone(),
        due_date: invoice.payment_due_date,
    });

    Ok(Json(InvoiceResponse::from(&invoice)))
}

/// Invoice list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    /// Include settled invoices (default: false).
    #[serde(default)]
    pub include_paid: bool,
}

/// Invoice list response.
#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
    /// Invoices ordered by due date.
    pub invoices: Vec<InvoiceResponse>,
}

/// List the caller's invoices, outstanding ones by default.
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<ListInvoicesResponse>, ApiError> {
    let invoices = state
        .store
        .list_invoices(&auth.user_id, query.include_paid)?;

    Ok(Json(ListInvoicesResponse {
        invoices: invoices.iter().map(InvoiceResponse::from).collect(),
    }))
}

/// Sweep response.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    /// Invoices transitioned by this pass.
    pub swept: usize,
}

/// Run one overdue sweep pass now.
///
/// The background sweeper runs the same pass on its own cadence; this
/// endpoint lets operators catch up after downtime without waiting for it.
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<SweepResponse>, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let swept = sweeper::sweep_once(&state, today)?;
    Ok(Json(SweepResponse { swept }))
}
