//! Usage estimation handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Days;
use serde::{Deserialize, Serialize};

use tally_core::{ServiceUsage, UsageSummary};
use tally_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Usage estimate query parameters.
#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    /// Trailing window in days the estimate is based on (default: 30).
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

/// Usage estimate response.
#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    /// Window the estimate is based on, in days.
    pub period_days: i64,
    /// Actual spend in the window, in cents.
    pub actual_cost_cents: i64,
    /// Average daily spend in cents.
    pub daily_average_cents: i64,
    /// Projected 30-day spend in cents.
    pub monthly_estimate_cents: i64,
    /// Spend broken down by service.
    pub by_service: HashMap<String, ServiceUsage>,
    /// The ledger currency.
    pub currency: String,
}

/// Estimate monthly cost from recent usage patterns.
pub async fn estimate(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<EstimateResponse>, ApiError> {
    if !(1..=365).contains(&query.days) {
        return Err(ApiError::BadRequest(
            "days must be between 1 and 365".into(),
        ));
    }

    state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let today = chrono::Utc::now().date_naive();
    let from = today
        .checked_sub_days(Days::new(query.days.unsigned_abs()))
        .unwrap_or(today);

    let entries = state.store.list_usage_between(&auth.user_id, from, today)?;
    let summary = UsageSummary::from_entries(from, today, &entries);

    let daily_average_cents = summary.total_cost_cents / query.days;
    let monthly_estimate_cents = daily_average_cents * 30;

    Ok(Json(EstimateResponse {
        period_days: query.days,
        actual_cost_cents: summary.total_cost_cents,
        daily_average_cents,
        monthly_estimate_cents,
        by_service: summary.by_service,
        currency: state.config.billing.currency.clone(),
    }))
}
