//! Budget records as the backend returns them, and the payloads for
//! creating and editing them.

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, OffsetDateTime};

use crate::{
    budget::status::{BudgetStatus, BudgetWithStatus},
    date_format,
    validation::ValidationErrors,
};

pub type BudgetId = i64;
pub type CategoryId = i64;
pub type UserId = i64;

/// The longest name a budget may have.
pub const MAX_BUDGET_NAME_LENGTH: usize = 100;

/// How often a budget's allowance resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    /// A one-off period with an explicit end date.
    Custom,
}

impl BudgetPeriod {
    /// The last day (inclusive) of a period starting on `start`.
    ///
    /// Monthly, quarterly and yearly periods add calendar months, clamping the
    /// day to the length of the target month. Custom periods end on
    /// `explicit_end`.
    pub fn end_date(self, start: Date, explicit_end: Option<Date>) -> Option<Date> {
        match self {
            BudgetPeriod::Weekly => start.checked_add(Duration::days(6)),
            BudgetPeriod::Monthly => add_months(start, 1)?.previous_day(),
            BudgetPeriod::Quarterly => add_months(start, 3)?.previous_day(),
            BudgetPeriod::Yearly => add_months(start, 12)?.previous_day(),
            BudgetPeriod::Custom => explicit_end,
        }
    }
}

/// Add `months` calendar months to `date`, clamping the day to the end of
/// the resulting month, e.g. Jan 31 + 1 month = Feb 28 (or 29).
pub fn add_months(date: Date, months: u32) -> Option<Date> {
    let total = date.year() * 12 + (date.month() as i32 - 1) + months as i32;
    let year = total.div_euclid(12);
    let month = Month::try_from((total.rem_euclid(12) + 1) as u8).ok()?;

    (28..=date.day())
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
        .or_else(|| Date::from_calendar_date(year, month, date.day()).ok())
}

/// A spending allowance for a category over a period.
///
/// `spent`, `remaining` and `percent_used` are computed by the backend from
/// the user's transactions; `remaining == amount - spent` always holds and
/// `percent_used` may exceed 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub name: String,
    /// The allowance for the period.
    pub amount: f64,
    pub period: BudgetPeriod,
    #[serde(with = "date_format::date")]
    pub start_date: Date,
    /// Always present for custom periods.
    #[serde(default, with = "date_format::option_date")]
    pub end_date: Option<Date>,
    pub spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    /// Whether unspent money carries over into the next period.
    pub rollover: bool,
    /// `false` once the budget has been archived.
    pub is_active: bool,
    #[serde(with = "date_format::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "date_format::timestamp")]
    pub updated_at: OffsetDateTime,
}

impl Budget {
    /// The percent of the allowance used, treating a non-positive allowance as
    /// nothing used and clamping negative spending to zero.
    ///
    /// NaN is passed through unchanged.
    pub fn effective_percent_used(&self) -> f64 {
        if self.percent_used.is_nan() {
            self.percent_used
        } else if self.amount <= 0.0 {
            0.0
        } else {
            self.percent_used.max(0.0)
        }
    }

    /// The last day (inclusive) of the budget's current period.
    pub fn period_end(&self) -> Option<Date> {
        self.period.end_date(self.start_date, self.end_date)
    }
}

/// The payload for creating a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    pub name: String,
    pub category_id: CategoryId,
    pub amount: f64,
    pub period: BudgetPeriod,
    #[serde(with = "date_format::date")]
    pub start_date: Date,
    #[serde(default, with = "date_format::option_date")]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub rollover: bool,
}

impl NewBudget {
    /// Check the payload before it is sent.
    ///
    /// # Errors
    ///
    /// Returns every field that is missing, out of range, or inconsistent,
    /// e.g. a custom period without an end date.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check_text("name", &self.name, MAX_BUDGET_NAME_LENGTH);
        errors.check_positive("amount", self.amount);
        errors.check_id("categoryId", self.category_id);
        check_period(&mut errors, self.period, self.start_date, self.end_date);

        errors.into_result()
    }
}

/// The payload for editing a budget. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<BudgetPeriod>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "date_format::option_date"
    )]
    pub start_date: Option<Date>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "date_format::option_date"
    )]
    pub end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollover: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl BudgetUpdate {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns every present field that fails the same checks as [NewBudget].
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = &self.name {
            errors.check_text("name", name, MAX_BUDGET_NAME_LENGTH);
        }
        if let Some(amount) = self.amount {
            errors.check_positive("amount", amount);
        }
        if let Some(category_id) = self.category_id {
            errors.check_id("categoryId", category_id);
        }
        // Whether a custom period has an end date depends on the stored
        // budget, so only the dates sent together are checked here.
        if let (Some(start_date), Some(end_date)) = (self.start_date, self.end_date) {
            errors.check_date_order("endDate", start_date, end_date);
        }

        errors.into_result()
    }

    /// Apply the present fields to `budget`.
    pub fn apply(&self, budget: &mut Budget) {
        if let Some(name) = &self.name {
            budget.name = name.trim().to_owned();
        }
        if let Some(category_id) = self.category_id {
            budget.category_id = category_id;
        }
        if let Some(amount) = self.amount {
            budget.amount = amount;
        }
        if let Some(period) = self.period {
            budget.period = period;
        }
        if let Some(start_date) = self.start_date {
            budget.start_date = start_date;
        }
        if self.end_date.is_some() {
            budget.end_date = self.end_date;
        }
        if let Some(rollover) = self.rollover {
            budget.rollover = rollover;
        }
        if let Some(is_active) = self.is_active {
            budget.is_active = is_active;
        }
    }
}

fn check_period(
    errors: &mut ValidationErrors,
    period: BudgetPeriod,
    start_date: Date,
    end_date: Option<Date>,
) {
    match end_date {
        Some(end_date) => errors.check_date_order("endDate", start_date, end_date),
        None if period == BudgetPeriod::Custom => {
            errors.add("endDate", "An end date is required for a custom period")
        }
        None => {}
    }
}

/// Filters for listing budgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<BudgetPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Include archived budgets, defaults to active budgets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_archived: Option<bool>,
}

impl BudgetFilters {
    /// Whether `budget` passes the filters.
    pub fn matches(&self, budget: &Budget) -> bool {
        self.period.is_none_or(|period| budget.period == period)
            && self
                .category_id
                .is_none_or(|category_id| budget.category_id == category_id)
            && (budget.is_active || self.include_archived.unwrap_or(false))
    }
}

/// Totals across the user's active budgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub budget_count: usize,
    pub total_budgeted: f64,
    pub total_spent: f64,
    pub total_remaining: f64,
    pub over_count: usize,
    pub near_count: usize,
    pub under_count: usize,
}

impl BudgetSummary {
    /// Sum the active budgets in `budgets`.
    pub fn from_budgets(budgets: &[BudgetWithStatus]) -> Self {
        budgets
            .iter()
            .filter(|budget| budget.budget.is_active)
            .fold(Self::default(), |mut summary, budget| {
                summary.budget_count += 1;
                summary.total_budgeted += budget.budget.amount;
                summary.total_spent += budget.budget.spent;
                summary.total_remaining += budget.budget.remaining;

                match budget.status {
                    BudgetStatus::Over => summary.over_count += 1,
                    BudgetStatus::Near => summary.near_count += 1,
                    BudgetStatus::Under => summary.under_count += 1,
                }

                summary
            })
    }
}

/// Budgeted versus spent for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTrend {
    /// The first day of the month.
    #[serde(with = "date_format::date")]
    pub month: Date,
    pub budgeted: f64,
    pub spent: f64,
}

/// Parameters for the budget trends report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendParams {
    /// How many months to look back, including the current one.
    pub months: u32,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self { months: 6 }
    }
}


#[cfg(test)]
mod validation_tests {
    use time::macros::date;

    use super::{BudgetPeriod, BudgetUpdate, NewBudget};

    fn new_budget() -> NewBudget {
        NewBudget {
            name: "Groceries".to_owned(),
            category_id: 3,
            amount: 500.0,
            period: BudgetPeriod::Monthly,
            start_date: date!(2025 - 03 - 01),
            end_date: None,
            rollover: false,
        }
    }

    #[test]
    fn valid_budget_passes() {
        assert_eq!(new_budget().validate(), Ok(()));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let budget = NewBudget {
            amount: -5.0,
            ..new_budget()
        };

        let errors = budget.validate().unwrap_err();

        assert_eq!(errors.for_field("amount"), Some("Must be greater than zero"));
    }

    #[test]
    fn blank_name_and_bad_category_are_both_reported() {
        let budget = NewBudget {
            name: "  ".to_owned(),
            category_id: 0,
            ..new_budget()
        };

        let errors = budget.validate().unwrap_err();

        assert_eq!(errors.errors().len(), 2);
        assert!(errors.for_field("name").is_some());
        assert!(errors.for_field("categoryId").is_some());
    }

    #[test]
    fn custom_period_requires_end_date() {
        let budget = NewBudget {
            period: BudgetPeriod::Custom,
            ..new_budget()
        };

        let errors = budget.validate().unwrap_err();

        assert_eq!(
            errors.for_field("endDate"),
            Some("An end date is required for a custom period")
        );
    }

    #[test]
    fn end_date_must_follow_start_date() {
        let budget = NewBudget {
            period: BudgetPeriod::Custom,
            end_date: Some(date!(2025 - 02 - 01)),
            ..new_budget()
        };

        assert!(budget.validate().unwrap_err().for_field("endDate").is_some());
    }

    #[test]
    fn update_checks_only_present_fields() {
        assert_eq!(BudgetUpdate::default().validate(), Ok(()));

        let update = BudgetUpdate {
            amount: Some(0.0),
            ..Default::default()
        };

        assert!(update.validate().unwrap_err().for_field("amount").is_some());
    }

    #[test]
    fn update_to_custom_leaves_end_date_to_stored_budget() {
        let update = BudgetUpdate {
            period: Some(BudgetPeriod::Custom),
            ..Default::default()
        };

        assert_eq!(update.validate(), Ok(()));
    }

    #[test]
    fn update_with_both_dates_checks_their_order() {
        let update = BudgetUpdate {
            start_date: Some(date!(2025 - 03 - 01)),
            end_date: Some(date!(2025 - 02 - 01)),
            ..Default::default()
        };

        assert!(update.validate().unwrap_err().for_field("endDate").is_some());
    }

    #[test]
    fn update_serialises_only_present_fields() {
        let update = BudgetUpdate {
            amount: Some(250.0),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"amount": 250.0})
        );
    }
}
