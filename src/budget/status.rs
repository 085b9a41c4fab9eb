//! Derives the under/near/over status of budgets, the message shown next to
//! each one, and the order they are listed in.
//!
//! Everything here is a pure function of the budget numbers.

use serde::{Deserialize, Serialize};

use crate::{
    budget::core::Budget,
    filters::{format_currency, format_percent},
};

/// Budgets at or above this percent used are nearly exhausted.
pub const NEAR_THRESHOLD: f64 = 75.0;

/// Budgets at or above this percent used are over budget.
pub const OVER_THRESHOLD: f64 = 100.0;

/// How much of its allowance a budget has used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Over,
    Near,
    Under,
}

impl BudgetStatus {
    /// Lower is more urgent.
    fn priority(self) -> u8 {
        match self {
            BudgetStatus::Over => 0,
            BudgetStatus::Near => 1,
            BudgetStatus::Under => 2,
        }
    }
}

/// The percent of `budgeted` that `spent` makes up, clamped to `0..=100`.
///
/// Returns zero when `budgeted` is not positive. NaN inputs produce NaN.
pub fn progress_percent(spent: f64, budgeted: f64) -> f64 {
    if spent.is_nan() || budgeted.is_nan() {
        return f64::NAN;
    }

    if budgeted <= 0.0 {
        return 0.0;
    }

    (spent / budgeted * 100.0).clamp(0.0, 100.0)
}

/// Classify a percent used. Each band includes its lower bound.
pub fn status_of(percent_used: f64) -> BudgetStatus {
    if percent_used >= OVER_THRESHOLD {
        BudgetStatus::Over
    } else if percent_used >= NEAR_THRESHOLD {
        BudgetStatus::Near
    } else {
        BudgetStatus::Under
    }
}

/// A budget together with its derived status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetWithStatus {
    #[serde(flatten)]
    pub budget: Budget,
    pub status: BudgetStatus,
}

/// Attach the status for `budget` to a copy of it.
pub fn with_status(budget: &Budget) -> BudgetWithStatus {
    BudgetWithStatus {
        budget: budget.clone(),
        status: status_of(budget.effective_percent_used()),
    }
}

/// The short line describing where a budget stands, e.g. "$50.00 over budget",
/// "10% remaining" or "$120.00 remaining".
pub fn status_message(budget: &BudgetWithStatus) -> String {
    match budget.status {
        BudgetStatus::Over => format!(
            "{} over budget",
            format_currency(budget.budget.remaining.abs())
        ),
        BudgetStatus::Near => format!(
            "{} remaining",
            format_percent(100.0 - budget.budget.effective_percent_used())
        ),
        BudgetStatus::Under => {
            format!("{} remaining", format_currency(budget.budget.remaining))
        }
    }
}

/// Order budgets from most to least urgent: by status, then by percent used
/// from highest to lowest. Equal budgets keep their input order and a NaN
/// percent sorts after every number within its status.
pub fn prioritize(budgets: &[BudgetWithStatus]) -> Vec<BudgetWithStatus> {
    let mut sorted = budgets.to_vec();

    // `sort_by` is stable.
    sorted.sort_by(|a, b| {
        a.status
            .priority()
            .cmp(&b.status.priority())
            .then_with(|| urgency(b).total_cmp(&urgency(a)))
    });

    sorted
}

fn urgency(budget: &BudgetWithStatus) -> f64 {
    let percent = budget.budget.effective_percent_used();

    if percent.is_nan() {
        f64::NEG_INFINITY
    } else {
        percent
    }
}

/// The budgets with exactly `status`, in input order.
pub fn filter_by_status(budgets: &[BudgetWithStatus], status: BudgetStatus) -> Vec<BudgetWithStatus> {
    budgets
        .iter()
        .filter(|budget| budget.status == status)
        .cloned()
        .collect()
}




#[cfg(test)]
mod prioritize_tests {
    use crate::{budget::core::Budget, test_utils::sample_budget};

    use super::{BudgetStatus, BudgetWithStatus, filter_by_status, prioritize, with_status};

    fn budgets() -> Vec<BudgetWithStatus> {
        [
            sample_budget(1, 100.0, 10.0),
            sample_budget(2, 100.0, 80.0),
            sample_budget(3, 100.0, 120.0),
            sample_budget(4, 100.0, 10.0),
            sample_budget(5, 100.0, 95.0),
            sample_budget(6, 100.0, 100.0),
            sample_budget(7, 100.0, 50.0),
        ]
        .iter()
        .map(with_status)
        .collect()
    }

    fn ids(budgets: &[BudgetWithStatus]) -> Vec<i64> {
        budgets.iter().map(|budget| budget.budget.id).collect()
    }

    #[test]
    fn orders_by_status_then_percent_descending() {
        let sorted = prioritize(&budgets());

        assert_eq!(ids(&sorted), vec![3, 6, 5, 2, 7, 1, 4]);
    }

    #[test]
    fn does_not_mutate_input() {
        let input = budgets();
        let before = input.clone();

        let _ = prioritize(&input);

        assert_eq!(input, before);
    }

    #[test]
    fn is_idempotent() {
        let once = prioritize(&budgets());
        let twice = prioritize(&once);

        assert_eq!(once, twice);
    }

    #[test]
    fn is_stable_for_ties() {
        let mut input = budgets();
        input.reverse();

        let sorted = prioritize(&input);

        // Budgets 1 and 4 tie, so they keep their (reversed) input order.
        let tied: Vec<i64> = ids(&sorted)
            .into_iter()
            .filter(|id| *id == 1 || *id == 4)
            .collect();
        assert_eq!(tied, vec![4, 1]);
    }

    #[test]
    fn nan_percent_sorts_last_within_status() {
        let input: Vec<BudgetWithStatus> = (1..=64)
            .map(|id| {
                let mut budget = sample_budget(id, 100.0, (id % 10) as f64 * 10.0);
                if id % 3 == 0 {
                    budget.percent_used = f64::NAN;
                }
                with_status(&budget)
            })
            .collect();

        let sorted = prioritize(&input);

        assert_eq!(sorted.len(), input.len());
        assert_eq!(ids(&prioritize(&sorted)), ids(&sorted));

        let under = filter_by_status(&sorted, BudgetStatus::Under);
        let first_nan = under
            .iter()
            .position(|budget| budget.budget.percent_used.is_nan())
            .unwrap();
        assert!(
            under[first_nan..]
                .iter()
                .all(|budget| budget.budget.percent_used.is_nan())
        );

        // NaN budgets tie with each other, so they keep their input order.
        let nan_ids: Vec<i64> = under[first_nan..].iter().map(|b| b.budget.id).collect();
        let mut expected = nan_ids.clone();
        expected.sort();
        assert_eq!(nan_ids, expected);
    }

    #[test]
    fn filter_returns_ordered_subsequence() {
        let input = budgets();

        let near = filter_by_status(&input, BudgetStatus::Near);
        let over = filter_by_status(&input, BudgetStatus::Over);
        let under = filter_by_status(&input, BudgetStatus::Under);

        assert_eq!(ids(&near), vec![2, 5]);
        assert_eq!(ids(&over), vec![3, 6]);
        assert_eq!(ids(&under), vec![1, 4, 7]);
        assert!(near.iter().all(|budget| budget.status == BudgetStatus::Near));
    }

    #[test]
    fn serialises_status_alongside_budget_fields() {
        let budget: Budget = sample_budget(9, 100.0, 80.0);

        let json = serde_json::to_value(with_status(&budget)).unwrap();

        assert_eq!(json["id"], 9);
        assert_eq!(json["percentUsed"], 80.0);
        assert_eq!(json["status"], "near");
    }
}
