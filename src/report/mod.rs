//! Spending and cashflow reports.

mod core;

pub use core::{
    CashflowParams, MAX_REPORT_MONTHS, MonthlyCashflow, SpendingByCategory, SpendingParams,
    month_start, monthly_cashflow, recent_months, spending_by_category,
};

use crate::{
    Error,
    coordinator::Coordinator,
    endpoints::{self, entity_key},
};

impl Coordinator {
    /// Expenses grouped by category, largest first.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend for a range
    /// that ends before it starts, otherwise see [Coordinator::query].
    pub async fn spending_report(
        &self,
        params: &SpendingParams,
    ) -> Result<Vec<SpendingByCategory>, Error> {
        params.validate()?;

        self.query(&entity_key(endpoints::REPORT_SPENDING, None), params)
            .await
    }

    /// Income and expenses for each recent month.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend for an out
    /// of range month count, otherwise see [Coordinator::query].
    pub async fn cashflow_report(
        &self,
        params: &CashflowParams,
    ) -> Result<Vec<MonthlyCashflow>, Error> {
        params.validate()?;

        self.query(&entity_key(endpoints::REPORT_CASHFLOW, None), params)
            .await
    }
}
