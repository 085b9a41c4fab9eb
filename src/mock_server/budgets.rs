//! Handlers for `/budgets`.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use time::{Date, OffsetDateTime};

use crate::{
    budget::{
        Budget, BudgetFilters, BudgetId, BudgetPeriod, BudgetSummary, BudgetTrend, BudgetUpdate,
        NewBudget, TrendParams, UserId, add_months, project, with_status,
    },
    mock_server::{MockState, ServerError, success},
    report::{MAX_REPORT_MONTHS, recent_months},
    validation::ValidationErrors,
};

const BUDGET: &str = "Budget";

pub async fn list_budgets(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Query(filters): Query<BudgetFilters>,
) -> impl IntoResponse {
    let budgets: Vec<Budget> = state
        .store()
        .budgets(user_id)
        .into_iter()
        .filter(|budget| filters.matches(budget))
        .collect();

    success(budgets)
}

/// Create a budget, rejecting a second active budget for the same category
/// and period.
pub async fn create_budget(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Json(budget): Json<NewBudget>,
) -> Result<impl IntoResponse, ServerError> {
    budget.validate()?;

    let mut store = state.store();
    let duplicate = store.budgets(user_id).iter().any(|existing| {
        existing.is_active
            && existing.category_id == budget.category_id
            && existing.period == budget.period
    });
    if duplicate {
        return Err(ServerError::Conflict(
            "A budget for this category and period already exists".to_owned(),
        ));
    }

    let budget = store.insert_budget(user_id, &budget, OffsetDateTime::now_utc());
    tracing::info!("Created budget {} for user {user_id}", budget.id);

    Ok(success(budget))
}

pub async fn get_budget(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(budget_id): Path<BudgetId>,
) -> Result<impl IntoResponse, ServerError> {
    state
        .store()
        .budget(user_id, budget_id)
        .map(success)
        .ok_or(ServerError::NotFound(BUDGET))
}

pub async fn update_budget(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(budget_id): Path<BudgetId>,
    Json(update): Json<BudgetUpdate>,
) -> Result<impl IntoResponse, ServerError> {
    update.validate()?;

    let mut store = state.store();
    let budget = store
        .budget_mut(user_id, budget_id)
        .ok_or(ServerError::NotFound(BUDGET))?;

    let mut updated = budget.clone();
    update.apply(&mut updated);
    check_updated_period(&updated)?;
    updated.updated_at = OffsetDateTime::now_utc();
    *budget = updated;

    store
        .budget(user_id, budget_id)
        .map(success)
        .ok_or(ServerError::NotFound(BUDGET))
}

/// The checks on the period that need the stored fields as well as the update.
fn check_updated_period(budget: &Budget) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if budget.period == BudgetPeriod::Custom {
        match budget.end_date {
            Some(end_date) => errors.check_date_order("endDate", budget.start_date, end_date),
            None => errors.add("endDate", "An end date is required for a custom period"),
        }
    }

    errors.into_result()
}

pub async fn delete_budget(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(budget_id): Path<BudgetId>,
) -> Result<impl IntoResponse, ServerError> {
    if !state.store().remove_budget(user_id, budget_id) {
        return Err(ServerError::NotFound(BUDGET));
    }

    Ok(success(()))
}

/// Mark a budget inactive. Archived budgets are kept but hidden by default.
pub async fn archive_budget(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(budget_id): Path<BudgetId>,
) -> Result<impl IntoResponse, ServerError> {
    let mut store = state.store();
    let budget = store
        .budget_mut(user_id, budget_id)
        .ok_or(ServerError::NotFound(BUDGET))?;
    budget.is_active = false;
    budget.updated_at = OffsetDateTime::now_utc();

    store
        .budget(user_id, budget_id)
        .map(success)
        .ok_or(ServerError::NotFound(BUDGET))
}

pub async fn get_summary(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
) -> impl IntoResponse {
    let budgets: Vec<_> = state.store().budgets(user_id).iter().map(with_status).collect();

    success(BudgetSummary::from_budgets(&budgets))
}

/// Budgeted against spent for each of the last `months` months.
pub async fn get_trends(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<TrendParams>,
) -> Result<impl IntoResponse, ServerError> {
    if !(1..=MAX_REPORT_MONTHS).contains(&params.months) {
        let mut errors = ValidationErrors::new();
        errors.add("months", format!("Must be between 1 and {MAX_REPORT_MONTHS}"));
        return Err(errors.into());
    }

    let store = state.store();
    let budgets: Vec<Budget> = store
        .budgets(user_id)
        .into_iter()
        .filter(|budget| budget.is_active)
        .collect();

    let trends: Vec<BudgetTrend> = recent_months(state.today(), params.months)
        .into_iter()
        .map(|month| {
            let month_end = add_months(month, 1)
                .and_then(|next| next.previous_day())
                .unwrap_or(month);
            let in_month: Vec<&Budget> = budgets
                .iter()
                .filter(|budget| overlaps(budget, month, month_end))
                .collect();

            let budgeted: f64 = in_month.iter().map(|budget| monthly_amount(budget)).sum();
            let spent: f64 = store
                .expenses_between(user_id, month, month_end)
                .filter(|transaction| {
                    in_month
                        .iter()
                        .any(|budget| transaction.category_id == Some(budget.category_id))
                })
                .map(|transaction| transaction.amount.abs())
                .sum();

            BudgetTrend {
                month,
                budgeted,
                spent,
            }
        })
        .collect();

    Ok(success(trends))
}

fn overlaps(budget: &Budget, start: Date, end: Date) -> bool {
    let ends_before = match budget.period {
        BudgetPeriod::Custom => budget.end_date.is_some_and(|end_date| end_date < start),
        _ => false,
    };

    budget.start_date <= end && !ends_before
}

/// The allowance of `budget` spread over one month.
fn monthly_amount(budget: &Budget) -> f64 {
    match budget.period {
        BudgetPeriod::Weekly => budget.amount * 52.0 / 12.0,
        BudgetPeriod::Monthly | BudgetPeriod::Custom => budget.amount,
        BudgetPeriod::Quarterly => budget.amount / 3.0,
        BudgetPeriod::Yearly => budget.amount / 12.0,
    }
}

pub async fn get_progress(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(budget_id): Path<BudgetId>,
) -> Result<impl IntoResponse, ServerError> {
    let budget = state
        .store()
        .budget(user_id, budget_id)
        .ok_or(ServerError::NotFound(BUDGET))?;

    project(&budget, state.today())
        .map(success)
        .ok_or_else(|| ServerError::BadRequest("Budget has no end date".to_owned()))
}
