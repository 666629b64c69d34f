//! Payment reconciliation integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

/// Issue a $15.00 invoice for the harness user and return its id.
async fn issued_invoice(harness: &TestHarness) -> String {
    harness.create_account().await;
    harness.add_credits(2500).await;
    harness
        .debit(json!({
            "user_id": harness.test_user_id.to_string(),
            "service": "chat",
            "quantity": 1500,
        }))
        .await;

    let response = harness
        .server
        .post("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    body["invoice_id"].as_str().unwrap().to_string()
}

fn payment_body(amount_cents: i64, currency: &str) -> serde_json::Value {
    json!({
        "payment_method": "card",
        "payment_reference": "ch_test_1",
        "amount_cents": amount_cents,
        "currency": currency,
    })
}

#[tokio::test]
async fn exact_payment_settles_invoice() {
    let harness = TestHarness::deferred();
    let invoice_id = issued_invoice(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/invoices/{invoice_id}/payments"))
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&payment_body(1500, "USD"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "paid");
    assert_eq!(body["amount_paid_cents"], 1500);

    // The invoice drops out of the outstanding listing
    let response = harness
        .server
        .get("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert!(body["invoices"].as_array().unwrap().is_empty());

    // The settlement landed in the ledger
    let response = harness
        .server
        .get("/v1/credits/entries")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["entries"][0]["kind"], "payment");
    assert_eq!(body["entries"][0]["amount_cents"], 1500);
}

#[tokio::test]
async fn payment_within_tolerance_settles() {
    let harness = TestHarness::deferred();
    let invoice_id = issued_invoice(&harness).await;

    // One cent over: inside the matching tolerance
    let response = harness
        .server
        .post(&format!("/v1/invoices/{invoice_id}/payments"))
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&payment_body(1501, "USD"))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn payment_outside_tolerance_fails() {
    let harness = TestHarness::deferred();
    let invoice_id = issued_invoice(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/invoices/{invoice_id}/payments"))
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&payment_body(1400, "USD"))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "amount_mismatch");
    assert_eq!(body["error"]["details"]["expected_cents"], 1500);
    assert_eq!(body["error"]["details"]["got_cents"], 1400);

    // The invoice stays open
    let response = harness
        .server
        .get("/v1/invoices")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["invoices"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn second_payment_is_rejected() {
    let harness = TestHarness::deferred();
    let invoice_id = issued_invoice(&harness).await;

    harness
        .server
        .post(&format!("/v1/invoices/{invoice_id}/payments"))
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&payment_body(1500, "USD"))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&format!("/v1/invoices/{invoice_id}/payments"))
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&payment_body(1500, "USD"))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "already_paid");
}

#[tokio::test]
async fn unknown_invoice_fails() {
    let harness = TestHarness::deferred();

    let missing = tally_core::InvoiceId::generate();
    let response = harness
        .server
        .post(&format!("/v1/invoices/{missing}/payments"))
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&payment_body(1500, "USD"))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn cross_currency_without_fx_fails() {
    let harness = TestHarness::deferred();
    let invoice_id = issued_invoice(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/invoices/{invoice_id}/payments"))
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&payment_body(1385, "EUR"))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn payment_requires_service_key() {
    let harness = TestHarness::deferred();
    let invoice_id = issued_invoice(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/invoices/{invoice_id}/payments"))
        .json(&payment_body(1500, "USD"))
        .await;

    response.assert_status_unauthorized();
}
