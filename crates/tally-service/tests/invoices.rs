//! Invoice lifecycle integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

/// Set up an account with the trial disabled and a deferred balance of
/// `cents` (credit price is 1 cent, so credits == cents).
async fn harness_with_deferred_balance(cents: i64) -> TestHarness {
    let harness = TestHarness::deferred();
    harness.create_account().await;
    harness.add_credits(cents + 1000).await;

    let body = harness
        .debit(json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
            "quantity": cents,
        }))
        .await;
    assert_eq!(body["deferred_balance_cents"], cents);

    harness
}

#[tokio::test]
async fn generate_invoice_below_minimum_fails() {
    // $5.00 deferred against the $10.00 minimum
    let harness = harness_with_deferred_balance(500).await;

    let response = harness
        .server
        .post("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "below_minimum");
    assert_eq!(body["error"]["details"]["balance_cents"], 500);
    assert_eq!(body["error"]["details"]["minimum_cents"], 1000);
}

#[tokio::test]
async fn generate_invoice_snapshots_and_resets_balance() {
    let harness = harness_with_deferred_balance(1500).await;

    let response = harness
        .server
        .post("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["amount_cents"], 1500);
    assert_eq!(body["amount_formatted"], "$15.00");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["currency"], "USD");
    assert!(body["invoice_number"]
        .as_str()
        .unwrap()
        .starts_with("INV-"));

    // The account's deferred balance was reset in the same step
    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let account: serde_json::Value = response.json();
    assert_eq!(account["deferred_balance_cents"], 0);
    assert_eq!(
        account["next_payment_due_date"],
        body["payment_due_date"].clone()
    );

    // With the balance at zero, a second invoice fails the minimum
    let response = harness
        .server
        .post("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn list_invoices_shows_outstanding() {
    let harness = harness_with_deferred_balance(1500).await;

    harness
        .server
        .post("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let invoices = body["invoices"].as_array().unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0]["status"], "pending");
    assert_eq!(invoices[0]["overdue_days"], 0);
    assert_eq!(invoices[0]["late_fee_cents"], 0);
}

#[tokio::test]
async fn sweep_endpoint_reports_count() {
    // A freshly issued invoice is due in the future, so the pass sweeps
    // nothing
    let harness = harness_with_deferred_balance(1500).await;
    harness
        .server
        .post("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/sweep")
        .add_header("x-api-key", harness.service_api_key.clone())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["swept"], 0);
}

#[tokio::test]
async fn sweep_requires_service_key() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/sweep")
        .await
        .assert_status_unauthorized();
}
