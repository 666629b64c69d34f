//! Service rate table and cost calculation.
//!
//! Costs are computed in whole credits from a read-only snapshot of the
//! rate table. The table is plain data and can be swapped out wholesale
//! when configuration is reloaded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A billable service category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Voice synthesis, metered per minute of audio.
    Voice,

    /// Chat inference, metered per message.
    Chat,

    /// Face processing, metered per image.
    Face,

    /// File storage, metered per GB-month.
    Storage,

    /// Scheduled-task execution, metered per run.
    Tasks,

    /// A service with no built-in rate. Prices at zero unless the rate
    /// table carries an entry for it.
    Custom(String),
}

impl ServiceKind {
    /// Get the service name as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Voice => "voice",
            Self::Chat => "chat",
            Self::Face => "face",
            Self::Storage => "storage",
            Self::Tasks => "tasks",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ServiceKind {
    fn from(s: &str) -> Self {
        match s {
            "voice" => Self::Voice,
            "chat" => Self::Chat,
            "face" => Self::Face,
            "storage" => Self::Storage,
            "tasks" => Self::Tasks,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Rates for one service, in credits.
///
/// The unit behind `per_unit_credits` depends on the service: minutes for
/// voice, messages for chat, images for face, GB-months for storage, runs
/// for tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServiceRate {
    /// Credits per metered unit.
    pub per_unit_credits: i64,

    /// Credits for a one-off model-training job, where the service offers
    /// one (0 otherwise).
    pub training_credits: i64,
}

/// The rate table mapping services to their credit rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<ServiceKind, ServiceRate>,
}

impl Default for RateTable {
    fn default() -> Self {
        let mut rates = HashMap::new();
        rates.insert(
            ServiceKind::Voice,
            ServiceRate {
                per_unit_credits: 10, // per minute of synthesized audio
                training_credits: 100,
            },
        );
        rates.insert(
            ServiceKind::Chat,
            ServiceRate {
                per_unit_credits: 1, // per message
                training_credits: 0,
            },
        );
        rates.insert(
            ServiceKind::Face,
            ServiceRate {
                per_unit_credits: 5, // per image
                training_credits: 200,
            },
        );
        rates.insert(
            ServiceKind::Storage,
            ServiceRate {
                per_unit_credits: 100, // per GB-month
                training_credits: 0,
            },
        );
        rates.insert(
            ServiceKind::Tasks,
            ServiceRate {
                per_unit_credits: 5, // per execution
                training_credits: 0,
            },
        );
        Self { rates }
    }
}

impl RateTable {
    /// Create an empty rate table (everything prices at zero).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    /// Look up the rate for a service.
    #[must_use]
    pub fn rate(&self, service: &ServiceKind) -> Option<&ServiceRate> {
        self.rates.get(service)
    }

    /// Insert or replace the rate for a service.
    pub fn set_rate(&mut self, service: ServiceKind, rate: ServiceRate) {
        self.rates.insert(service, rate);
    }

    /// Calculate the cost in credits for a unit of service work.
    ///
    /// - `custom_rate_credits` overrides the table entirely (negotiated
    ///   pricing): cost is `custom_rate * quantity`.
    /// - With `duration_secs` present the per-unit rate is treated as a
    ///   per-minute rate and prorated, rounding half-up to whole credits.
    /// - A service with no table entry costs 0. Callers must treat that as
    ///   "no charge", not an error; unpriced services never block usage.
    /// - Prorated usage of a priced service never rounds down to zero: any
    ///   non-zero duration costs at least 1 credit.
    #[must_use]
    pub fn cost(
        &self,
        service: &ServiceKind,
        quantity: i64,
        duration_secs: Option<i64>,
        custom_rate_credits: Option<i64>,
    ) -> i64 {
        if let Some(rate) = custom_rate_credits {
            return rate * quantity;
        }

        let Some(rate) = self.rate(service) else {
            return 0;
        };

        match duration_secs {
            Some(secs) if secs > 0 => {
                let raw = secs * rate.per_unit_credits * quantity;
                let credits = (raw + 30) / 60;
                if credits == 0 && rate.per_unit_credits > 0 {
                    1
                } else {
                    credits
                }
            }
            _ => rate.per_unit_credits * quantity,
        }
    }

    /// Cost in credits for a one-off training job on a service.
    #[must_use]
    pub fn training_cost(&self, service: &ServiceKind) -> i64 {
        self.rate(service).map_or(0, |r| r.training_credits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_kind_from_str() {
        assert_eq!(ServiceKind::from("voice"), ServiceKind::Voice);
        assert_eq!(ServiceKind::from("tasks"), ServiceKind::Tasks);
        assert_eq!(
            ServiceKind::from("holograms"),
            ServiceKind::Custom("holograms".into())
        );
    }

    #[test]
    fn chat_cost_per_message() {
        let table = RateTable::default();
        assert_eq!(table.cost(&ServiceKind::Chat, 1, None, None), 1);
        assert_eq!(table.cost(&ServiceKind::Chat, 25, None, None), 25);
    }

    #[test]
    fn voice_cost_prorated_by_duration() {
        let table = RateTable::default();

        // 90 seconds at 10 credits/minute = 15 credits
        assert_eq!(table.cost(&ServiceKind::Voice, 1, Some(90), None), 15);
        // 60 seconds = exactly one minute
        assert_eq!(table.cost(&ServiceKind::Voice, 1, Some(60), None), 10);
        // Two clips of 30 seconds each
        assert_eq!(table.cost(&ServiceKind::Voice, 2, Some(30), None), 10);
    }

    #[test]
    fn voice_cost_short_clip_charges_minimum() {
        let table = RateTable::default();

        // 2 seconds at 10/minute rounds to 0, clamped to the 1-credit minimum
        assert_eq!(table.cost(&ServiceKind::Voice, 1, Some(2), None), 1);
    }

    #[test]
    fn unknown_service_costs_nothing() {
        let table = RateTable::default();
        let unknown = ServiceKind::Custom("telepathy".into());
        assert_eq!(table.cost(&unknown, 100, None, None), 0);
    }

    #[test]
    fn custom_rate_overrides_table() {
        let table = RateTable::default();
        assert_eq!(table.cost(&ServiceKind::Chat, 10, None, Some(7)), 70);

        // Custom rate applies even for services the table has no entry for
        let unknown = ServiceKind::Custom("telepathy".into());
        assert_eq!(table.cost(&unknown, 3, None, Some(50)), 150);
    }

    #[test]
    fn training_cost_lookup() {
        let table = RateTable::default();
        assert_eq!(table.training_cost(&ServiceKind::Voice), 100);
        assert_eq!(table.training_cost(&ServiceKind::Face), 200);
        assert_eq!(table.training_cost(&ServiceKind::Chat), 0);
        assert_eq!(table.training_cost(&ServiceKind::Custom("x".into())), 0);
    }

    #[test]
    fn storage_cost_per_gb_month() {
        let table = RateTable::default();
        assert_eq!(table.cost(&ServiceKind::Storage, 3, None, None), 300);
    }
}
