//! Projects a budget's spending to the end of its period.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{budget::core::Budget, date_format};

/// A budget is on track while its projected spend stays within this fraction
/// over the allowance.
pub const ON_TRACK_TOLERANCE: f64 = 0.10;

/// How a budget is tracking part way through its period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProgress {
    pub budget_id: i64,
    pub spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    /// Days of the period up to and including today.
    pub days_elapsed: i64,
    pub days_total: i64,
    #[serde(with = "date_format::date")]
    pub period_end: Date,
    /// The spend at the end of the period if spending continues at the same
    /// daily rate.
    pub projected_spend: f64,
    pub on_track: bool,
}

/// Project `budget` as of `today`.
///
/// Returns `None` if the budget has no computable period end, e.g. a custom
/// period with no end date.
pub fn project(budget: &Budget, today: Date) -> Option<BudgetProgress> {
    let period_end = budget.period_end()?;
    let days_total = ((period_end - budget.start_date).whole_days() + 1).max(1);
    let days_elapsed = ((today - budget.start_date).whole_days() + 1).clamp(0, days_total);

    let elapsed_fraction = days_elapsed as f64 / days_total as f64;
    let projected_spend = if days_elapsed == 0 {
        budget.spent
    } else {
        budget.spent / elapsed_fraction
    };

    Some(BudgetProgress {
        budget_id: budget.id,
        spent: budget.spent,
        remaining: budget.remaining,
        percent_used: budget.effective_percent_used(),
        days_elapsed,
        days_total,
        period_end,
        projected_spend,
        on_track: projected_spend <= budget.amount * (1.0 + ON_TRACK_TOLERANCE),
    })
}
