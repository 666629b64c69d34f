//! Account integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;

#[tokio::test]
async fn create_account_grants_trial() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_credits"], 1000);
    assert_eq!(body["available_credits"], 1000);
    assert_eq!(body["trial_credits"], 1000);
    assert_eq!(body["trial_active"], true);
    assert_eq!(body["deferred_balance_cents"], 0);

    // The trial grant shows up in the ledger
    let response = harness
        .server
        .get("/v1/credits/entries")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["kind"], "trial_grant");
    assert_eq!(entries[0]["credit_delta"], 1000);
}

#[tokio::test]
async fn create_account_twice_conflicts() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_account_without_trial_config() {
    let harness = TestHarness::deferred();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_credits"], 0);
    assert_eq!(body["trial_active"], false);
    assert!(body["trial_end_date"].is_null());
}

#[tokio::test]
async fn get_account_without_account_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn account_routes_require_auth() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/accounts/me")
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", "Bearer garbage")
        .await
        .assert_status_unauthorized();
}
