use crate::models::{Claim, ClaimStatus, Denial, DenialStatus};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// How many days ahead a pending denial counts as approaching its deadline
const DEADLINE_WINDOW_DAYS: i64 = 7;

/// How many reason codes the ranking keeps
const TOP_REASONS: usize = 10;

/// Claims per current status; a claim counts toward exactly one bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub submitted: usize,
    pub under_review: usize,
    pub authorized: usize,
    pub partially_denied: usize,
    pub fully_denied: usize,
    pub paid: usize,
    pub withdrawn: usize,
}

/// Denied value grouped by reason code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonTotal {
    pub code: String,
    pub total_value: Decimal,
    pub count: usize,
}

/// Financial and operational metrics derived from the raw collections.
/// Recomputed on every read; holds no identity of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingStats {
    pub status_counts: StatusCounts,
    pub total_billed: Decimal,
    pub total_denied: Decimal,
    pub total_recovered: Decimal,
    /// Recovered over denied as a fraction (0.4, not 40); `0/0` is `0`
    pub recovery_rate: Decimal,
    /// Pending denials with today <= deadline <= today + 7 days, inclusive
    pub approaching_deadline: usize,
    /// Pending denials already past their deadline
    pub overdue: usize,
    /// Top reason codes by summed denied value, ties broken by code
    pub top_reasons: Vec<ReasonTotal>,
}

/// Derive statistics from in-memory collections. Pure: no I/O, inputs are
/// not mutated, and `today` is passed explicitly so deadline buckets are
/// deterministic.
pub fn compute_stats(claims: &[Claim], denials: &[Denial], today: NaiveDate) -> BillingStats {
    let mut status_counts = StatusCounts::default();
    let mut total_billed = Decimal::ZERO;
    for claim in claims {
        total_billed += claim.total_billed;
        match claim.status {
            ClaimStatus::Draft => status_counts.draft += 1,
            ClaimStatus::Submitted => status_counts.submitted += 1,
            ClaimStatus::UnderReview => status_counts.under_review += 1,
            ClaimStatus::Authorized => status_counts.authorized += 1,
            ClaimStatus::PartiallyDenied => status_counts.partially_denied += 1,
            ClaimStatus::FullyDenied => status_counts.fully_denied += 1,
            ClaimStatus::Paid => status_counts.paid += 1,
            ClaimStatus::Withdrawn => status_counts.withdrawn += 1,
        }
    }

    let window_end = today + Duration::days(DEADLINE_WINDOW_DAYS);
    let mut total_denied = Decimal::ZERO;
    let mut total_recovered = Decimal::ZERO;
    let mut approaching_deadline = 0;
    let mut overdue = 0;
    let mut by_reason: HashMap<&str, (Decimal, usize)> = HashMap::new();

    for denial in denials {
        total_denied += denial.denied_amount;
        if denial.status == DenialStatus::Resolved {
            if let Some(approved) = denial.approved_amount {
                total_recovered += approved;
            }
        }
        if denial.status == DenialStatus::Pending {
            if denial.appeal_deadline < today {
                overdue += 1;
            } else if denial.appeal_deadline <= window_end {
                approaching_deadline += 1;
            }
        }
        for item in &denial.reason_items {
            let entry = by_reason
                .entry(item.code.as_str())
                .or_insert((Decimal::ZERO, 0));
            entry.0 += item.denied_value;
            entry.1 += 1;
        }
    }

    let recovery_rate = if total_denied.is_zero() {
        Decimal::ZERO
    } else {
        total_recovered / total_denied
    };

    let mut top_reasons: Vec<ReasonTotal> = by_reason
        .into_iter()
        .map(|(code, (total_value, count))| ReasonTotal {
            code: code.to_string(),
            total_value,
            count,
        })
        .collect();
    top_reasons.sort_by(|a, b| {
        b.total_value
            .cmp(&a.total_value)
            .then_with(|| a.code.cmp(&b.code))
    });
    top_reasons.truncate(TOP_REASONS);

    BillingStats {
        status_counts,
        total_billed,
        total_denied,
        total_recovered,
        recovery_rate,
        approaching_deadline,
        overdue,
        top_reasons,
    }
}
