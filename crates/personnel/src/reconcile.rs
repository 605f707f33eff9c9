//! Rebuilds an employee's salary timeline from the hire salary, the stored
//! salary changes and the live current salary.
//!
//! The output is strictly ordered by `effective_at` and chained: every row's
//! `previous_amount` equals the `new_amount` of the row before it. Stored
//! `previous_amount` values are overwritten to establish that chain.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::salary::{
    CURRENT_SALARY_REASON, INITIAL_SALARY_REASON, SalaryBaseline, SalaryChange, SalaryEntryId,
    SalaryHistoryEntry,
};

/// Reconciled salary timeline, oldest entry first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalaryTimeline(Vec<SalaryHistoryEntry>);

/// One point of the salary charts: the cumulative line (`amount`) and the
/// per-step bars (`delta`, `percent`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryChartPoint {
    pub effective_at: DateTime<Utc>,
    pub amount: Decimal,
    pub delta: Decimal,
    pub percent: Decimal,
}

/// Percent change between two salaries.
///
/// From zero, any positive salary counts as exactly 100% and zero to zero is 0%.
/// A change too large for `Decimal` saturates at `Decimal::MAX` (or `MIN`).
pub fn percent_change(previous: Decimal, new: Decimal) -> Decimal {
    if previous > Decimal::ZERO {
        new.checked_div(previous)
            .and_then(|ratio| ratio.checked_sub(Decimal::ONE))
            .and_then(|growth| growth.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(if new.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            })
    } else if new > Decimal::ZERO {
        Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Build the salary timeline.
///
/// `now` stamps the trailing "current salary" row; nothing else depends on
/// the wall clock, so equal inputs give equal output.
pub fn reconcile(
    baseline: &SalaryBaseline,
    changes: &[SalaryChange],
    now: DateTime<Utc>,
) -> SalaryTimeline {
    let initial = baseline.hire_salary.map(|amount| SalaryHistoryEntry {
        id: SalaryEntryId::Initial,
        employee_id: baseline.employee_id,
        previous_amount: amount,
        new_amount: amount,
        effective_at: initial_date(baseline, changes, now),
        reason: INITIAL_SALARY_REASON.to_string(),
    });

    if changes.is_empty() {
        return SalaryTimeline(initial.into_iter().collect());
    }

    // Stable: same-day changes keep the order they were stored in.
    let mut sorted: Vec<&SalaryChange> = changes.iter().collect();
    sorted.sort_by_key(|c| c.effective_at);

    let mut entries = Vec::with_capacity(changes.len() + 2);
    entries.extend(initial);

    for change in sorted {
        let previous_amount = entries
            .last()
            .map(|prior: &SalaryHistoryEntry| prior.new_amount)
            .unwrap_or(change.previous_amount);

        entries.push(SalaryHistoryEntry {
            id: SalaryEntryId::Recorded(change.id),
            employee_id: change.employee_id,
            previous_amount,
            new_amount: change.new_amount,
            effective_at: change.effective_at,
            reason: change.reason.clone(),
        });
    }

    let trailing = match (baseline.current_salary, entries.last()) {
        (Some(current), Some(last)) if current != last.new_amount => Some(SalaryHistoryEntry {
            id: SalaryEntryId::Current,
            employee_id: baseline.employee_id,
            previous_amount: last.new_amount,
            new_amount: current,
            effective_at: now,
            reason: CURRENT_SALARY_REASON.to_string(),
        }),
        _ => None,
    };
    entries.extend(trailing);

    SalaryTimeline(entries)
}

/// Hire date at midnight UTC; without one, the earliest change, else `now`.
fn initial_date(
    baseline: &SalaryBaseline,
    changes: &[SalaryChange],
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match baseline.hire_date {
        Some(date) => Utc.from_utc_datetime(&date.and_time(NaiveTime::default())),
        None => changes
            .iter()
            .map(|c| c.effective_at)
            .min()
            .unwrap_or(now),
    }
}

impl SalaryTimeline {
    pub fn entries(&self) -> &[SalaryHistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn latest(&self) -> Option<&SalaryHistoryEntry> {
        self.0.last()
    }

    /// Table view: newest entry first.
    pub fn most_recent_first(&self) -> impl Iterator<Item = &SalaryHistoryEntry> {
        self.0.iter().rev()
    }

    pub fn chart_points(&self) -> Vec<SalaryChartPoint> {
        self.0
            .iter()
            .map(|entry| SalaryChartPoint {
                effective_at: entry.effective_at,
                amount: entry.new_amount,
                delta: entry.delta(),
                percent: percent_change(entry.previous_amount, entry.new_amount),
            })
            .collect()
    }

    /// Whether every entry starts where the previous one ended.
    pub fn is_chained(&self) -> bool {
        self.0
            .windows(2)
            .all(|pair| pair[1].previous_amount == pair[0].new_amount)
    }
}
