//! Report aggregates and the functions that build them from transactions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    budget::CategoryId, date_format, transaction::Transaction, validation::ValidationErrors,
};

/// The most months a cashflow report may cover.
pub const MAX_REPORT_MONTHS: u32 = 24;

/// Total expenses for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingByCategory {
    /// `None` groups uncategorised transactions.
    pub category_id: Option<CategoryId>,
    /// The absolute amount spent.
    pub total: f64,
    pub transaction_count: usize,
    /// This category's share of all spending in the report.
    pub percent_of_total: f64,
}

/// Money in and out for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCashflow {
    /// The first day of the month.
    #[serde(with = "date_format::date")]
    pub month: Date,
    pub income: f64,
    /// The absolute amount spent.
    pub expenses: f64,
    pub net: f64,
}

/// The date range for the spending report. Open ends are unbounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingParams {
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
}

impl SpendingParams {
    /// # Errors
    ///
    /// Returns an error if the range ends before it starts.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.add("endDate", format!("Must not be before {start}"));
            }
        }

        errors.into_result()
    }
}

/// How many months the cashflow report covers, ending with the current month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashflowParams {
    pub months: u32,
}

impl Default for CashflowParams {
    fn default() -> Self {
        Self { months: 6 }
    }
}

impl CashflowParams {
    /// # Errors
    ///
    /// Returns an error unless `months` is between 1 and [MAX_REPORT_MONTHS].
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !(1..=MAX_REPORT_MONTHS).contains(&self.months) {
            errors.add("months", format!("Must be between 1 and {MAX_REPORT_MONTHS}"));
        }

        errors.into_result()
    }
}

/// The first day of the month containing `date`.
pub fn month_start(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

/// The first days of the `count` months ending with the month of `today`, in
/// chronological order.
pub fn recent_months(today: Date, count: u32) -> Vec<Date> {
    let current = today.year() * 12 + (today.month() as i32 - 1);

    (0..count as i32)
        .rev()
        .filter_map(|offset| {
            let index = current - offset;
            let month = Month::try_from((index.rem_euclid(12) + 1) as u8).ok()?;
            Date::from_calendar_date(index.div_euclid(12), month, 1).ok()
        })
        .collect()
}

/// Group the expenses in `transactions` by category, largest first.
///
/// Only negative amounts (expenses) are included and totals are absolute.
pub fn spending_by_category(transactions: &[Transaction]) -> Vec<SpendingByCategory> {
    let mut totals: HashMap<Option<CategoryId>, (f64, usize)> = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.is_expense()) {
        let entry = totals.entry(transaction.category_id).or_insert((0.0, 0));
        entry.0 += transaction.amount.abs();
        entry.1 += 1;
    }

    let grand_total: f64 = totals.values().map(|(total, _)| total).sum();

    let mut spending: Vec<SpendingByCategory> = totals
        .into_iter()
        .map(|(category_id, (total, transaction_count))| SpendingByCategory {
            category_id,
            total,
            transaction_count,
            percent_of_total: if grand_total > 0.0 {
                total * 100.0 / grand_total
            } else {
                0.0
            },
        })
        .collect();

    // Uncategorised spending sorts last among equal totals.
    spending.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category_id.is_none().cmp(&b.category_id.is_none()))
            .then_with(|| a.category_id.cmp(&b.category_id))
    });

    spending
}

/// Income and expenses per month for each of `months`.
///
/// Months without transactions are reported with zero totals.
pub fn monthly_cashflow(transactions: &[Transaction], months: &[Date]) -> Vec<MonthlyCashflow> {
    let mut totals: HashMap<Date, (f64, f64)> = HashMap::new();

    for transaction in transactions {
        let entry = totals
            .entry(month_start(transaction.date))
            .or_insert((0.0, 0.0));

        if transaction.is_expense() {
            entry.1 += transaction.amount.abs();
        } else {
            entry.0 += transaction.amount;
        }
    }

    months
        .iter()
        .map(|month| {
            let (income, expenses) = totals.get(month).copied().unwrap_or((0.0, 0.0));

            MonthlyCashflow {
                month: *month,
                income,
                expenses,
                net: income - expenses,
            }
        })
        .collect()
}
