//! Application state.

use std::sync::Arc;

use tally_store::RocksStore;

use crate::config::ServiceConfig;
use crate::fx::FxClient;
use crate::notify::Notifier;

/// Application state shared across handlers and the sweeper.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Currency-conversion client (optional).
    pub fx: Option<Arc<FxClient>>,

    /// Notification dispatcher.
    pub notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let fx = config.fx_api_url.as_ref().map(|url| {
            tracing::info!(fx_url = %url, "currency conversion enabled");
            Arc::new(FxClient::new(url))
        });

        if fx.is_none() {
            tracing::warn!("FX not configured - cross-currency payments will be rejected");
        }

        let notifier = Notifier::new(config.notify_webhook_url.as_deref());
        if config.notify_webhook_url.is_none() {
            tracing::warn!("notification webhook not configured - events will be dropped");
        }

        Self {
            store,
            config,
            fx,
            notifier,
        }
    }
}
