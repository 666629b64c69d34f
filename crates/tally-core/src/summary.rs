//! Usage summaries.
//!
//! A `UsageSummary` is a point-in-time snapshot of a billing period's usage,
//! grouped by service. Invoices embed one so the billed period stays
//! auditable even after the ledger grows past it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ledger::{EntryKind, EntryStatus, LedgerEntry};

/// Aggregated usage for one service within a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUsage {
    /// Credits consumed.
    pub credits: i64,

    /// Monetary cost in cents.
    pub cost_cents: i64,

    /// Number of usage entries.
    pub entries: u64,
}

/// Snapshot of a billing period's usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    /// First day of the period (inclusive).
    pub period_start: NaiveDate,

    /// Last day of the period (inclusive).
    pub period_end: NaiveDate,

    /// Total credits consumed in the period.
    pub total_credits: i64,

    /// Total monetary cost in cents.
    pub total_cost_cents: i64,

    /// Number of usage entries in the period.
    pub entry_count: u64,

    /// Per-service breakdown, keyed by service name.
    pub by_service: HashMap<String, ServiceUsage>,
}

impl UsageSummary {
    /// Build a summary from an account's ledger entries.
    ///
    /// Only completed `Usage` entries contribute; grants, payments, and
    /// failed entries are ignored. The caller is responsible for passing
    /// entries restricted to the period.
    #[must_use]
    pub fn from_entries(
        period_start: NaiveDate,
        period_end: NaiveDate,
        entries: &[LedgerEntry],
    ) -> Self {
        let mut summary = Self {
            period_start,
            period_end,
            total_credits: 0,
            total_cost_cents: 0,
            entry_count: 0,
            by_service: HashMap::new(),
        };

        for entry in entries {
            if entry.kind != EntryKind::Usage || entry.status != EntryStatus::Completed {
                continue;
            }

            let service = entry
                .service
                .as_ref()
                .map_or_else(|| "other".to_string(), |s| s.as_str().to_string());

            let bucket = summary.by_service.entry(service).or_default();
            bucket.credits += entry.credits_used();
            bucket.cost_cents += entry.cost_cents();
            bucket.entries += 1;

            summary.total_credits += entry.credits_used();
            summary.total_cost_cents += entry.cost_cents();
            summary.entry_count += 1;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::ServiceKind;
    use crate::UserId;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usage(account: UserId, credits: i64, service: ServiceKind) -> LedgerEntry {
        LedgerEntry::usage(
            account,
            credits,
            1,
            service,
            None,
            String::new(),
            serde_json::Value::Null,
        )
    }

    #[test]
    fn summary_groups_by_service() {
        let account = UserId::generate();
        let entries = vec![
            usage(account, 10, ServiceKind::Chat),
            usage(account, 30, ServiceKind::Voice),
            usage(account, 5, ServiceKind::Chat),
        ];

        let summary = UsageSummary::from_entries(day(2025, 4, 1), day(2025, 4, 30), &entries);

        assert_eq!(summary.total_credits, 45);
        assert_eq!(summary.total_cost_cents, 45);
        assert_eq!(summary.entry_count, 3);
        assert_eq!(summary.by_service["chat"].credits, 15);
        assert_eq!(summary.by_service["chat"].entries, 2);
        assert_eq!(summary.by_service["voice"].credits, 30);
    }

    #[test]
    fn summary_skips_grants_and_failed_entries() {
        let account = UserId::generate();
        let mut failed = usage(account, 100, ServiceKind::Face);
        failed.status = EntryStatus::Failed;

        let entries = vec![
            LedgerEntry::trial_grant(account, 1000, 1),
            failed,
            usage(account, 20, ServiceKind::Tasks),
        ];

        let summary = UsageSummary::from_entries(day(2025, 4, 1), day(2025, 4, 30), &entries);

        assert_eq!(summary.total_credits, 20);
        assert_eq!(summary.entry_count, 1);
        assert!(!summary.by_service.contains_key("face"));
    }

    #[test]
    fn empty_summary() {
        let summary = UsageSummary::from_entries(day(2025, 4, 1), day(2025, 4, 30), &[]);
        assert_eq!(summary.total_credits, 0);
        assert_eq!(summary.entry_count, 0);
        assert!(summary.by_service.is_empty());
    }
}
