//! Common test utilities for tally-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use tally_core::UserId;
use tally_service::{create_router, AppState, ServiceConfig};
use tally_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with the default trial configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness with the trial disabled, so usage accrues to the
    /// deferred balance immediately.
    pub fn deferred() -> Self {
        Self::with_config(|config| {
            config.billing.trial_credits = 0;
            config.billing.trial_days = 0;
        })
    }

    /// Create a harness with a customized configuration.
    pub fn with_config(customize: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(service_api_key.clone()),
            ..ServiceConfig::default()
        };
        customize(&mut config);

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            test_user_id,
            service_api_key,
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer uid:{}", self.test_user_id)
    }

    /// Create the caller's account, panicking on failure.
    pub async fn create_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("authorization", self.user_auth_header())
            .await
            .assert_status_ok();
    }

    /// Grant purchased credits to the test user via the service API.
    pub async fn add_credits(&self, credits: i64) {
        self.server
            .post("/v1/credits/add")
            .add_header("x-api-key", self.service_api_key.clone())
            .json(&serde_json::json!({
                "user_id": self.test_user_id.to_string(),
                "credits": credits,
            }))
            .await
            .assert_status_ok();
    }

    /// Debit the test user via the service API, returning the response body.
    pub async fn debit(&self, body: serde_json::Value) -> serde_json::Value {
        let response = self
            .server
            .post("/v1/credits/debit")
            .add_header("x-api-key", self.service_api_key.clone())
            .add_header("x-service-name", "test-meter")
            .json(&body)
            .await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
