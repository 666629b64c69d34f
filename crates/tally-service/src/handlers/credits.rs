//! Credit debit, grant, and history handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::{LedgerEntry, ServiceKind, UserId};
use tally_store::Store;

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::notify::NotifyEvent;
use crate::state::AppState;

/// Debit request from a metering caller.
#[derive(Debug, Deserialize)]
pub struct DebitRequest {
    /// User to charge.
    pub user_id: String,
    /// Service the usage belongs to (e.g. "voice", "chat").
    pub service: String,
    /// Quantity of metered units (default: 1).
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Duration in seconds, for duration-metered services.
    pub duration_secs: Option<i64>,
    /// Negotiated per-unit rate overriding the rate table.
    pub custom_rate_credits: Option<i64>,
    /// Explicit cost in credits; skips cost calculation entirely.
    pub amount_credits: Option<i64>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Resource the usage is attached to.
    pub resource_id: Option<String>,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn default_quantity() -> i64 {
    1
}

/// Debit response.
#[derive(Debug, Serialize)]
pub struct DebitResponse {
    /// Whether any credits were deducted. `false` for unpriced services.
    pub charged: bool,
    /// Cost in credits.
    pub cost_credits: i64,
    /// Credits remaining after the debit.
    pub remaining_credits: i64,
    /// Deferred balance after the debit, in cents.
    pub deferred_balance_cents: i64,
    /// The ledger entry recorded, when a charge was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

/// Authorize and apply a usage debit.
pub async fn debit(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<DebitRequest>,
) -> Result<Json<DebitResponse>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let resource_id = body
        .resource_id
        .as_deref()
        .map(str::parse::<uuid::Uuid>)
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid resource ID".into()))?;

    if body.quantity <= 0 {
        return Err(ApiError::BadRequest("Quantity must be positive".into()));
    }

    let service = ServiceKind::from(body.service.as_str());
    let billing = &state.config.billing;

    let cost_credits = match body.amount_credits {
        Some(amount) if amount < 0 => {
            return Err(ApiError::BadRequest("Amount must not be negative".into()))
        }
        Some(amount) => amount,
        None => billing.rates.cost(
            &service,
            body.quantity,
            body.duration_secs,
            body.custom_rate_credits,
        ),
    };

    // Services without a price never block usage: report the zero cost and
    // leave the ledger untouched.
    if cost_credits == 0 {
        let account = state
            .store
            .get_account(&user_id)?
            .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

        tracing::debug!(
            service = %service,
            user_id = %user_id,
            "usage reported for unpriced service, no charge"
        );

        return Ok(Json(DebitResponse {
            charged: false,
            cost_credits: 0,
            remaining_credits: account.available_credits(),
            deferred_balance_cents: account.deferred_balance_cents,
            entry_id: None,
        }));
    }

    let description = body
        .description
        .unwrap_or_else(|| format!("{service} usage via {}", auth.service_name));

    let entry = LedgerEntry::usage(
        user_id,
        cost_credits,
        billing.credit_price_cents,
        service.clone(),
        resource_id,
        description,
        body.metadata,
    );

    let today = chrono::Utc::now().date_naive();
    let outcome = state.store.debit_usage(&entry, today)?;

    tracing::info!(
        service = %service,
        caller = %auth.service_name,
        user_id = %user_id,
        cost_credits = %cost_credits,
        remaining = %outcome.remaining_credits,
        "Usage debited"
    );

    if outcome.remaining_credits < state.config.low_balance_credits {
        state.notifier.dispatch(NotifyEvent::LowBalance {
            user_id: user_id.to_string(),
            remaining_credits: outcome.remaining_credits,
        });
    }

    Ok(Json(DebitResponse {
        charged: true,
        cost_credits,
        remaining_credits: outcome.remaining_credits,
        deferred_balance_cents: outcome.deferred_balance_cents,
        entry_id: Some(outcome.entry_id.to_string()),
    }))
}

/// Credit grant request.
#[derive(Debug, Deserialize)]
pub struct AddCreditsRequest {
    /// User to credit.
    pub user_id: String,
    /// Credits to add.
    pub credits: i64,
    /// Payment method behind the purchase, if any.
    pub payment_method: Option<String>,
    /// Payment reference behind the purchase, if any.
    pub payment_reference: Option<String>,
    /// Reason for the grant.
    pub reason: Option<String>,
}

/// Credit grant response.
#[derive(Debug, Serialize)]
pub struct AddCreditsResponse {
    /// Credits added.
    pub credits_added: i64,
    /// Cumulative credits after the grant.
    pub total_credits: i64,
    /// Credits available after the grant.
    pub available_credits: i64,
    /// The ledger entry recorded.
    pub entry_id: String,
}

/// Add purchased credits to an account.
pub async fn add_credits(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<AddCreditsRequest>,
) -> Result<Json<AddCreditsResponse>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    if body.credits <= 0 {
        return Err(ApiError::BadRequest("Credits must be positive".into()));
    }

    let description = body
        .reason
        .unwrap_or_else(|| format!("Added {} credits", body.credits));

    let entry = LedgerEntry::purchase(
        user_id,
        body.credits,
        state.config.billing.credit_price_cents,
        description,
        serde_json::json!({
            "payment_method": body.payment_method,
            "payment_reference": body.payment_reference,
            "via": auth.service_name,
        }),
    );

    let outcome = state.store.add_credits(&entry)?;

    tracing::info!(
        user_id = %user_id,
        credits = %body.credits,
        total = %outcome.total_credits,
        "Credits added"
    );

    Ok(Json(AddCreditsResponse {
        credits_added: body.credits,
        total_credits: outcome.total_credits,
        available_credits: outcome.available_credits,
        entry_id: outcome.entry_id.to_string(),
    }))
}

/// Entry list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// Maximum number of entries to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Ledger entry response.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry id.
    pub id: String,
    /// Entry kind.
    pub kind: String,
    /// Signed credit change.
    pub credit_delta: i64,
    /// Signed monetary amount in cents.
    pub amount_cents: i64,
    /// The metered service, if any.
    pub service: Option<String>,
    /// Completion status.
    pub status: String,
    /// Description.
    pub description: String,
    /// Timestamp.
    pub created_at: String,
}

impl From<&LedgerEntry> for EntryResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            kind: entry.kind.as_str().to_string(),
            credit_delta: entry.credit_delta,
            amount_cents: entry.amount_cents,
            service: entry.service.as_ref().map(|s| s.as_str().to_string()),
            status: entry.status.as_str().to_string(),
            description: entry.description.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Entry list response.
#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    /// Entries, newest first.
    pub entries: Vec<EntryResponse>,
    /// Whether more entries exist past this page.
    pub has_more: bool,
}

/// List the caller's ledger entries.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<ListEntriesResponse>, ApiError> {
    // Verify account exists
    state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let entries = state
        .store
        .list_entries(&auth.user_id, limit + 1, query.offset)?;

    let has_more = entries.len() > limit;
    let entries: Vec<_> = entries.iter().take(limit).map(EntryResponse::from).collect();

    Ok(Json(ListEntriesResponse { entries, has_more }))
}
