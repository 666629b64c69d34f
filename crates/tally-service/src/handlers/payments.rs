//! Payment reconciliation handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::InvoiceId;
use tally_store::{PaymentRecord, Store};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::notify::NotifyEvent;
use crate::state::AppState;

/// Payment fact asserted by the gateway integration.
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    /// Payment method (e.g. "card", "bank_transfer").
    pub payment_method: String,
    /// Gateway payment reference.
    pub payment_reference: String,
    /// Paid amount in minor units of `currency`.
    pub amount_cents: i64,
    /// Currency the payment was made in.
    pub currency: String,
}

/// Payment response.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// The settled invoice's number.
    pub invoice_number: String,
    /// Amount credited against the invoice, in the invoice currency.
    pub amount_paid_cents: i64,
    /// The invoice currency.
    pub currency: String,
    /// Settlement date.
    pub payment_date: String,
    /// Invoice status after settlement.
    pub status: String,
}

/// Apply an asserted payment against an invoice.
///
/// Cross-currency payments are normalized through the FX collaborator
/// before the invoice is touched, keeping network I/O off the
/// reconciliation path.
pub async fn process_payment(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(invoice_id): Path<String>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let invoice_id: InvoiceId = invoice_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid invoice ID".into()))?;

    if body.amount_cents <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }

    let invoice = state
        .store
        .get_invoice(&invoice_id)?
        .ok_or_else(|| ApiError::NotFound(format!("invoice not found: {invoice_id}")))?;

    let paid_cents = if body.currency.eq_ignore_ascii_case(&invoice.currency) {
        body.amount_cents
    } else {
        let fx = state.fx.as_ref().ok_or_else(|| {
            ApiError::ExternalService("currency conversion not configured".into())
        })?;
        fx.convert_cents(body.amount_cents, &body.currency, &invoice.currency)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "currency conversion failed");
                ApiError::ExternalService(format!("currency conversion failed: {e}"))
            })?
    };

    let today = chrono::Utc::now().date_naive();
    let settled = state.store.settle_invoice(
        &invoice_id,
        &PaymentRecord {
            paid_cents,
            today,
            payment_method: body.payment_method,
            payment_reference: body.payment_reference,
        },
    )?;

    tracing::info!(
        caller = %auth.service_name,
        invoice_number = %settled.invoice_number,
        amount_cents = %settled.total_amount_cents,
        "Payment reconciled"
    );

    state.notifier.dispatch(NotifyEvent::PaymentReceived {
        user_id: settled.account_id.to_string(),
        invoice_number: settled.invoice_number.clone(),
        amount_cents: settled.total_amount_cents,
        currency: settled.currency.clone(),
    });

    Ok(Json(PaymentResponse {
        invoice_number: settled.invoice_number.clone(),
        amount_paid_cents: settled.total_amount_cents,
        currency: settled.currency.clone(),
        payment_date: today.to_string(),
        status: settled.status.as_str().to_string(),
    }))
}
