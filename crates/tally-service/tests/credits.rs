//! Credit debit and grant integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

// ============================================================================
// Debit
// ============================================================================

#[tokio::test]
async fn debit_deducts_calculated_cost() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // 5 chat messages at 1 credit each
    let body = harness
        .debit(json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
            "quantity": 5,
        }))
        .await;

    assert_eq!(body["charged"], true);
    assert_eq!(body["cost_credits"], 5);
    assert_eq!(body["remaining_credits"], 995);
    assert_eq!(body["deferred_balance_cents"], 0); // in trial
    assert!(body["entry_id"].is_string());
}

#[tokio::test]
async fn debit_voice_uses_duration() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // 90 seconds at 10 credits/minute
    let body = harness
        .debit(json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "voice",
            "duration_secs": 90,
        }))
        .await;

    assert_eq!(body["cost_credits"], 15);
    assert_eq!(body["remaining_credits"], 985);
}

#[tokio::test]
async fn debit_unpriced_service_is_no_charge() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let body = harness
        .debit(json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "holograms",
            "quantity": 50,
        }))
        .await;

    assert_eq!(body["charged"], false);
    assert_eq!(body["cost_credits"], 0);
    assert_eq!(body["remaining_credits"], 1000);
    assert!(body["entry_id"].is_null());

    // Nothing was written to the ledger beyond the trial grant
    let response = harness
        .server
        .get("/v1/credits/entries")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let entries: serde_json::Value = response.json();
    assert_eq!(entries["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn debit_custom_rate() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let body = harness
        .debit(json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
            "quantity": 10,
            "custom_rate_credits": 3,
        }))
        .await;

    assert_eq!(body["cost_credits"], 30);
}

#[tokio::test]
async fn debit_beyond_trial_cap_fails_with_402() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // The trial override lets the balance go negative once
    let body = harness
        .debit(json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
            "amount_credits": 1500,
        }))
        .await;
    assert_eq!(body["remaining_credits"], -500);

    // With the trial grant consumed, further debits fail
    let response = harness
        .server
        .post("/v1/credits/debit")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
            "amount_credits": 1,
        }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["available"], -500);
    assert_eq!(body["error"]["details"]["required"], 1);
}

#[tokio::test]
async fn debit_requires_service_key() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/credits/debit")
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
        }))
        .await;

    response.assert_status_unauthorized();

    let response = harness
        .server
        .post("/v1/credits/debit")
        .add_header("x-api-key", "wrong-key")
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
        }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn debit_unknown_account_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/debit")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
        }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn debit_rejects_bad_input() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/credits/debit")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": "not-a-uuid",
            "service": "chat",
        }))
        .await;
    response.assert_status_bad_request();

    let response = harness
        .server
        .post("/v1/credits/debit")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
            "quantity": 0,
        }))
        .await;
    response.assert_status_bad_request();
}

// ============================================================================
// Grants
// ============================================================================

#[tokio::test]
async fn add_credits_increases_balance() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/credits/add")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "credits": 2500,
            "payment_method": "card",
            "payment_reference": "ch_123",
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits_added"], 2500);
    assert_eq!(body["total_credits"], 3500);
    assert_eq!(body["available_credits"], 3500);
}

#[tokio::test]
async fn add_credits_rejects_non_positive() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/credits/add")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "credits": 0,
        }))
        .await;

    response.assert_status_bad_request();
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn entries_paginate_newest_first() {
    let harness = TestHarness::new();
    harness.create_account().await;

    for quantity in [1, 2, 3] {
        harness
            .debit(json!({
                "user_id": harness.test_user_id.to_string(),
                "service": "chat",
                "quantity": quantity,
            }))
            .await;
    }

    let response = harness
        .server
        .get("/v1/credits/entries?limit=2&offset=0")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(body["has_more"], true);
    assert_eq!(entries[0]["credit_delta"], -3); // newest first
    assert_eq!(entries[1]["credit_delta"], -2);
}

// ============================================================================
// Usage estimation
// ============================================================================

#[tokio::test]
async fn estimate_projects_monthly_cost() {
    let harness = TestHarness::deferred();
    harness.create_account().await;
    harness.add_credits(3000).await;

    harness
        .debit(json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
            "quantity": 1500,
        }))
        .await;

    let response = harness
        .server
        .get("/v1/usage/estimate?days=30")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["period_days"], 30);
    assert_eq!(body["actual_cost_cents"], 1500);
    assert_eq!(body["daily_average_cents"], 50);
    assert_eq!(body["monthly_estimate_cents"], 1500);
    assert_eq!(body["by_service"]["chat"]["credits"], 1500);
    assert_eq!(body["currency"], "USD");
}

#[tokio::test]
async fn estimate_rejects_invalid_window() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .get("/v1/usage/estimate?days=0")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_bad_request();
}
