//! Currency-conversion client.
//!
//! The ledger keeps all amounts in one currency; payments asserted in a
//! different currency are normalized through this external collaborator
//! before reconciliation. Conversion is the only network call on the
//! payment path and happens before any lock is taken.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

/// Error type for FX operations.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The FX API returned an error.
    #[error("FX API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },
}

/// Response from the conversion endpoint.
#[derive(Debug, Deserialize)]
struct ConvertResponse {
    /// Converted amount in minor units of the target currency.
    amount_cents: i64,
}

/// Currency-conversion API client.
#[derive(Debug, Clone)]
pub struct FxClient {
    client: Client,
    base_url: String,
}

impl FxClient {
    /// Create a new FX client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Convert `amount_cents` from one currency's minor units to another's.
    ///
    /// Matching currencies short-circuit without a network call.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the API rejects it.
    pub async fn convert_cents(
        &self,
        amount_cents: i64,
        from: &str,
        to: &str,
    ) -> Result<i64, FxError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount_cents);
        }

        let url = format!("{}/v1/convert", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("from", from),
                ("to", to),
                ("amount_cents", &amount_cents.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FxError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ConvertResponse = response.json().await?;
        Ok(body.amount_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn same_currency_skips_the_network() {
        // Deliberately unroutable: a request would fail loudly
        let client = FxClient::new("http://127.0.0.1:1");
        let converted = client.convert_cents(1500, "USD", "usd").await.unwrap();
        assert_eq!(converted, 1500);
    }

    #[tokio::test]
    async fn converts_through_the_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/convert"))
            .and(query_param("from", "EUR"))
            .and(query_param("to", "USD"))
            .and(query_param("amount_cents", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "amount_cents": 1083
            })))
            .mount(&server)
            .await;

        let client = FxClient::new(server.uri());
        let converted = client.convert_cents(1000, "EUR", "USD").await.unwrap();
        assert_eq!(converted, 1083);
    }

    #[tokio::test]
    async fn api_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/convert"))
            .respond_with(ResponseTemplate::new(422).set_body_string("unsupported currency"))
            .mount(&server)
            .await;

        let client = FxClient::new(server.uri());
        let err = client.convert_cents(1000, "EUR", "XXX").await.unwrap_err();
        assert!(matches!(err, FxError::Api { status: 422, .. }));
    }
}
