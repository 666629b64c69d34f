//! Service configuration.

use std::str::FromStr;

use tally_core::BillingConfig;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/tally").
    pub data_dir: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Base URL of the currency-conversion collaborator (optional).
    pub fx_api_url: Option<String>,

    /// Webhook URL notifications are dispatched to (optional).
    pub notify_webhook_url: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Seconds between overdue sweep passes.
    pub sweep_interval_seconds: u64,

    /// Dispatch a low-balance notification when a debit leaves fewer
    /// credits than this.
    pub low_balance_credits: i64,

    /// Billing configuration (pricing, trial, invoice policy).
    pub billing: BillingConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/tally".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            fx_api_url: std::env::var("FX_API_URL").ok(),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES", 1024 * 1024), // 1MB
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS", 30),
            sweep_interval_seconds: env_parse("SWEEP_INTERVAL_SECONDS", 3600),
            low_balance_credits: env_parse("LOW_BALANCE_CREDITS", 100),
            billing: billing_from_env(),
        }
    }
}

/// Billing knobs with environment overrides on top of the defaults.
fn billing_from_env() -> BillingConfig {
    let defaults = BillingConfig::default();
    BillingConfig {
        credit_price_cents: env_parse("CREDIT_PRICE_CENTS", defaults.credit_price_cents),
        trial_credits: env_parse("TRIAL_CREDITS", defaults.trial_credits),
        trial_days: env_parse("TRIAL_DAYS", defaults.trial_days),
        grace_days: env_parse("DEFERRED_GRACE_DAYS", defaults.grace_days),
        min_deferred_cents: env_parse("MIN_DEFERRED_CENTS", defaults.min_deferred_cents),
        late_fee_percent: env_parse("LATE_FEE_PERCENT", defaults.late_fee_percent),
        currency: std::env::var("LEDGER_CURRENCY").unwrap_or(defaults.currency),
        rates: defaults.rates,
    }
}

/// Parse an environment variable, falling back to `default` when unset or
/// malformed.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/tally".into(),
            service_api_key: None,
            fx_api_url: None,
            notify_webhook_url: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            sweep_interval_seconds: 3600,
            low_balance_credits: 100,
            billing: BillingConfig::default(),
        }
    }
}
