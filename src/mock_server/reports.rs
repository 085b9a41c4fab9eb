//! Handlers for `/reports`.

use axum::{
    Extension,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    budget::UserId,
    mock_server::{MockState, ServerError, success},
    report::{CashflowParams, SpendingParams, monthly_cashflow, recent_months, spending_by_category},
    transaction::Transaction,
};

pub async fn get_spending(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<SpendingParams>,
) -> Result<impl IntoResponse, ServerError> {
    params.validate()?;

    let transactions: Vec<Transaction> = state
        .store()
        .user_transactions(user_id)
        .filter(|transaction| {
            params.start_date.is_none_or(|start| transaction.date >= start)
                && params.end_date.is_none_or(|end| transaction.date <= end)
        })
        .cloned()
        .collect();

    Ok(success(spending_by_category(&transactions)))
}

pub async fn get_cashflow(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<CashflowParams>,
) -> Result<impl IntoResponse, ServerError> {
    params.validate()?;

    let months = recent_months(state.today(), params.months);
    let transactions: Vec<Transaction> =
        state.store().user_transactions(user_id).cloned().collect();

    Ok(success(monthly_cashflow(&transactions, &months)))
}
