//! Notification dispatch.
//!
//! The ledger never delivers notifications itself; it dispatches events to
//! an external webhook and moves on. Dispatch is fire-and-forget on a
//! spawned task, so ledger mutation latency is independent of delivery
//! latency.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;

/// A billing event dispatched to the notification collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// A debit left the account under the low-balance threshold.
    LowBalance {
        /// The account.
        user_id: String,
        /// Credits remaining after the debit.
        remaining_credits: i64,
    },

    /// An invoice was issued.
    InvoiceGenerated {
        /// The billed account.
        user_id: String,
        /// Invoice number.
        invoice_number: String,
        /// Invoice total in cents.
        amount_cents: i64,
        /// Invoice currency.
        currency: String,
        /// Payment due date.
        due_date: NaiveDate,
    },

    /// A payment settled an invoice.
    PaymentReceived {
        /// The account.
        user_id: String,
        /// Invoice number.
        invoice_number: String,
        /// Paid amount in cents.
        amount_cents: i64,
        /// Invoice currency.
        currency: String,
    },

    /// An invoice crossed a reminder point of its overdue cadence.
    InvoiceOverdue {
        /// The account.
        user_id: String,
        /// Invoice number.
        invoice_number: String,
        /// Outstanding amount in cents (fee-inclusive).
        amount_cents: i64,
        /// Invoice currency.
        currency: String,
        /// Days past due.
        overdue_days: i64,
    },
}

impl NotifyEvent {
    /// The event name, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LowBalance { .. } => "low_balance",
            Self::InvoiceGenerated { .. } => "invoice_generated",
            Self::PaymentReceived { .. } => "payment_received",
            Self::InvoiceOverdue { .. } => "invoice_overdue",
        }
    }
}

/// Webhook delivery client.
#[derive(Debug)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    /// Create a new webhook client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            url: url.into(),
        }
    }

    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the receiver rejects it.
    pub async fn send(&self, event: &NotifyEvent) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Notification dispatcher.
///
/// With no webhook configured, events are logged and dropped.
#[derive(Clone, Default)]
pub struct Notifier {
    webhook: Option<Arc<WebhookClient>>,
}

impl Notifier {
    /// Create a dispatcher, enabled when a webhook URL is configured.
    #[must_use]
    pub fn new(webhook_url: Option<&str>) -> Self {
        Self {
            webhook: webhook_url.map(|url| Arc::new(WebhookClient::new(url))),
        }
    }

    /// Create a disabled dispatcher (tests, local development).
    #[must_use]
    pub fn disabled() -> Self {
        Self { webhook: None }
    }

    /// Dispatch an event, fire-and-forget.
    ///
    /// Delivery runs on a spawned task; failures are logged, never
    /// propagated to the mutation path that raised the event.
    pub fn dispatch(&self, event: NotifyEvent) {
        let Some(client) = &self.webhook else {
            tracing::debug!(event = event.name(), "notification dropped (no webhook)");
            return;
        };

        let client = Arc::clone(client);
        tokio::spawn(async move {
            if let Err(e) = client.send(&event).await {
                tracing::warn!(
                    event = event.name(),
                    error = %e,
                    "failed to deliver notification"
                );
            }
        });
    }
}
