//! Budgets: the records, their derived status, and the reads and writes for
//! every `/budgets` resource.

mod core;
mod projection;
mod status;

pub use core::{
    Budget, BudgetFilters, BudgetId, BudgetPeriod, BudgetSummary, BudgetTrend, BudgetUpdate,
    CategoryId, MAX_BUDGET_NAME_LENGTH, NewBudget, TrendParams, UserId, add_months,
};
pub use projection::{BudgetProgress, ON_TRACK_TOLERANCE, project};
pub use status::{
    BudgetStatus, BudgetWithStatus, NEAR_THRESHOLD, OVER_THRESHOLD, filter_by_status,
    prioritize, progress_percent, status_message, status_of, with_status,
};

use axum::http::Method;

use crate::{
    Error,
    backend::{ApiRequest, to_body},
    coordinator::{Coordinator, Mutation, MutationKind},
    endpoints::{self, entity_key, format_endpoint},
};

impl Coordinator {
    /// The user's budgets matching `filters`.
    ///
    /// # Errors
    ///
    /// See [Coordinator::query].
    pub async fn budgets(&self, filters: &BudgetFilters) -> Result<Vec<Budget>, Error> {
        self.query(&entity_key(endpoints::BUDGETS, None), filters)
            .await
    }

    /// The user's budgets matching `filters` with their status, most urgent
    /// first.
    ///
    /// # Errors
    ///
    /// See [Coordinator::query].
    pub async fn budgets_with_status(
        &self,
        filters: &BudgetFilters,
    ) -> Result<Vec<BudgetWithStatus>, Error> {
        let budgets: Vec<BudgetWithStatus> =
            self.budgets(filters).await?.iter().map(with_status).collect();

        Ok(prioritize(&budgets))
    }

    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no budget with `id`.
    pub async fn budget(&self, id: BudgetId) -> Result<Budget, Error> {
        self.query(&entity_key(endpoints::BUDGET, Some(id)), &())
            .await
    }

    /// Totals across the user's active budgets.
    ///
    /// # Errors
    ///
    /// See [Coordinator::query].
    pub async fn budget_summary(&self) -> Result<BudgetSummary, Error> {
        self.query(&entity_key(endpoints::BUDGET_SUMMARY, None), &())
            .await
    }

    /// Budgeted versus spent per month.
    ///
    /// # Errors
    ///
    /// See [Coordinator::query].
    pub async fn budget_trends(&self, params: &TrendParams) -> Result<Vec<BudgetTrend>, Error> {
        self.query(&entity_key(endpoints::BUDGET_TRENDS, None), params)
            .await
    }

    /// How the budget with `id` is tracking through its current period.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no budget with `id`.
    pub async fn budget_progress(&self, id: BudgetId) -> Result<BudgetProgress, Error> {
        self.query(&entity_key(endpoints::BUDGET_PROGRESS, Some(id)), &())
            .await
    }

    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if `budget`
    /// fails its checks, otherwise see [Coordinator::mutate].
    pub async fn create_budget(&self, budget: &NewBudget) -> Result<Budget, Error> {
        budget.validate()?;

        self.mutate(Mutation::new(
            MutationKind::CreateBudget,
            ApiRequest::with_body(Method::POST, endpoints::BUDGETS, Some(to_body(budget)?)),
        ))
        .await
    }

    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if `update`
    /// fails its checks, otherwise see [Coordinator::mutate].
    pub async fn update_budget(&self, id: BudgetId, update: &BudgetUpdate) -> Result<Budget, Error> {
        update.validate()?;

        self.mutate(Mutation::new(
            MutationKind::UpdateBudget,
            ApiRequest::with_body(
                Method::PUT,
                format_endpoint(endpoints::BUDGET, id),
                Some(to_body(update)?),
            ),
        ))
        .await
    }

    /// Soft-disable the budget with `id`.
    ///
    /// # Errors
    ///
    /// See [Coordinator::mutate].
    pub async fn archive_budget(&self, id: BudgetId) -> Result<Budget, Error> {
        self.mutate(Mutation::new(
            MutationKind::ArchiveBudget,
            ApiRequest::with_body(
                Method::POST,
                format_endpoint(endpoints::BUDGET_ARCHIVE, id),
                None,
            ),
        ))
        .await
    }

    /// # Errors
    ///
    /// See [Coordinator::mutate].
    pub async fn delete_budget(&self, id: BudgetId) -> Result<(), Error> {
        self.mutate(Mutation::new(
            MutationKind::DeleteBudget,
            ApiRequest::with_body(Method::DELETE, format_endpoint(endpoints::BUDGET, id), None),
        ))
        .await
    }
}
