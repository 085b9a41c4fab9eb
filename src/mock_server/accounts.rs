//! Handlers for `/accounts`.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use time::OffsetDateTime;

use crate::{
    account::{AccountBalance, AccountId, AccountUpdate, NewAccount},
    budget::UserId,
    mock_server::{MockState, ServerError, success},
};

const ACCOUNT: &str = "Account";

pub async fn list_accounts(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
) -> impl IntoResponse {
    success(state.store().accounts(user_id))
}

pub async fn create_account(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Json(account): Json<NewAccount>,
) -> Result<impl IntoResponse, ServerError> {
    account.validate()?;

    let account = state
        .store()
        .insert_account(user_id, &account, OffsetDateTime::now_utc());
    tracing::info!("Created account {} for user {user_id}", account.id);

    Ok(success(account))
}

pub async fn get_account(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, ServerError> {
    state
        .store()
        .account(user_id, account_id)
        .map(success)
        .ok_or(ServerError::NotFound(ACCOUNT))
}

pub async fn get_balance(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, ServerError> {
    let account = state
        .store()
        .account(user_id, account_id)
        .ok_or(ServerError::NotFound(ACCOUNT))?;

    Ok(success(AccountBalance {
        account_id: account.id,
        balance: account.balance,
        currency: account.currency,
        as_of: OffsetDateTime::now_utc(),
    }))
}

pub async fn update_account(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(account_id): Path<AccountId>,
    Json(update): Json<AccountUpdate>,
) -> Result<impl IntoResponse, ServerError> {
    update.validate()?;

    let mut store = state.store();
    let account = store
        .account_mut(user_id, account_id)
        .ok_or(ServerError::NotFound(ACCOUNT))?;
    update.apply(account);
    account.updated_at = OffsetDateTime::now_utc();

    store
        .account(user_id, account_id)
        .map(success)
        .ok_or(ServerError::NotFound(ACCOUNT))
}

/// Delete an account and every transaction in it.
pub async fn delete_account(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, ServerError> {
    if !state.store().remove_account(user_id, account_id) {
        return Err(ServerError::NotFound(ACCOUNT));
    }

    Ok(success(()))
}

/// Pretend to pull new transactions from the account's institution.
pub async fn sync_account(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, ServerError> {
    let mut store = state.store();
    let account = store
        .account_mut(user_id, account_id)
        .ok_or(ServerError::NotFound(ACCOUNT))?;
    account.last_synced_at = Some(OffsetDateTime::now_utc());

    store
        .account(user_id, account_id)
        .map(success)
        .ok_or(ServerError::NotFound(ACCOUNT))
}
