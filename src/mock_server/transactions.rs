//! Handlers for `/transactions`.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    budget::UserId,
    mock_server::{MockState, ServerError, store::MemoryStore, success},
    transaction::{
        BulkDelete, Categorize, DeleteSummary, ImportSummary, NewTransaction, Transaction,
        TransactionFilters, TransactionId, TransactionImport, TransactionPage, TransactionUpdate,
    },
    validation::ValidationErrors,
};

const TRANSACTION: &str = "Transaction";

/// The transactions of `user_id` matching `filters`, newest first.
fn matching(
    store: &MemoryStore,
    user_id: UserId,
    filters: &TransactionFilters,
) -> Vec<Transaction> {
    let mut transactions: Vec<Transaction> = store
        .user_transactions(user_id)
        .filter(|transaction| filters.matches(transaction))
        .cloned()
        .collect();

    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

    transactions
}

/// Check that `account_id` names an account of `user_id`, recording an error
/// against `field` if it does not.
fn check_account(
    store: &MemoryStore,
    user_id: UserId,
    errors: &mut ValidationErrors,
    field: &str,
    account_id: i64,
) {
    if !store.owns_account(user_id, account_id) {
        errors.add(field, "Must refer to an existing record");
    }
}

pub async fn list_transactions(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Query(filters): Query<TransactionFilters>,
) -> Result<impl IntoResponse, ServerError> {
    filters.validate()?;

    let transactions = matching(&state.store(), user_id, &filters);
    let total = transactions.len() as u64;
    let offset = (filters.page as usize - 1) * filters.page_size as usize;
    let items = transactions
        .into_iter()
        .skip(offset)
        .take(filters.page_size as usize)
        .collect();

    Ok(success(TransactionPage {
        items,
        page: filters.page,
        page_size: filters.page_size,
        total,
    }))
}

pub async fn create_transaction(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Json(transaction): Json<NewTransaction>,
) -> Result<impl IntoResponse, ServerError> {
    transaction.validate()?;

    let mut store = state.store();
    let mut errors = ValidationErrors::new();
    check_account(&store, user_id, &mut errors, "accountId", transaction.account_id);
    errors.into_result()?;

    Ok(success(
        store.insert_transaction(&transaction, OffsetDateTime::now_utc()),
    ))
}

pub async fn get_transaction(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, ServerError> {
    state
        .store()
        .transaction(user_id, transaction_id)
        .cloned()
        .map(success)
        .ok_or(ServerError::NotFound(TRANSACTION))
}

pub async fn update_transaction(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
    Json(update): Json<TransactionUpdate>,
) -> Result<impl IntoResponse, ServerError> {
    update.validate()?;

    let mut store = state.store();
    if let Some(account_id) = update.account_id {
        let mut errors = ValidationErrors::new();
        check_account(&store, user_id, &mut errors, "accountId", account_id);
        errors.into_result()?;
    }

    let transaction = store
        .transaction_mut(user_id, transaction_id)
        .ok_or(ServerError::NotFound(TRANSACTION))?;
    update.apply(transaction);

    Ok(success(transaction.clone()))
}

pub async fn delete_transaction(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, ServerError> {
    if state.store().remove_transactions(user_id, &[transaction_id]) == 0 {
        return Err(ServerError::NotFound(TRANSACTION));
    }

    Ok(success(()))
}

/// Delete every listed transaction. Unknown ids are skipped.
pub async fn bulk_delete_transactions(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Json(bulk_delete): Json<BulkDelete>,
) -> Result<impl IntoResponse, ServerError> {
    bulk_delete.validate()?;

    let deleted = state.store().remove_transactions(user_id, &bulk_delete.ids);
    tracing::info!("Deleted {deleted} transactions");

    Ok(success(DeleteSummary { deleted }))
}

pub async fn categorize_transaction(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
    Json(categorize): Json<Categorize>,
) -> Result<impl IntoResponse, ServerError> {
    let mut errors = ValidationErrors::new();
    errors.check_id("categoryId", categorize.category_id);
    errors.into_result()?;

    let mut store = state.store();
    let transaction = store
        .transaction_mut(user_id, transaction_id)
        .ok_or(ServerError::NotFound(TRANSACTION))?;
    transaction.category_id = Some(categorize.category_id);

    Ok(success(transaction.clone()))
}

pub async fn reconcile_transaction(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, ServerError> {
    let mut store = state.store();
    let transaction = store
        .transaction_mut(user_id, transaction_id)
        .ok_or(ServerError::NotFound(TRANSACTION))?;
    transaction.reconciled = true;

    Ok(success(transaction.clone()))
}

/// Create every transaction in the batch, or none of them if any row is
/// invalid.
pub async fn import_transactions(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Json(import): Json<TransactionImport>,
) -> Result<impl IntoResponse, ServerError> {
    import.validate()?;

    let mut store = state.store();
    let mut errors = ValidationErrors::new();
    for (index, transaction) in import.transactions.iter().enumerate() {
        check_account(
            &store,
            user_id,
            &mut errors,
            &format!("transactions[{index}].accountId"),
            transaction.account_id,
        );
    }
    errors.into_result()?;

    let now = OffsetDateTime::now_utc();
    for transaction in &import.transactions {
        store.insert_transaction(transaction, now);
    }
    tracing::info!("Imported {} transactions", import.transactions.len());

    Ok(success(ImportSummary {
        imported: import.transactions.len(),
    }))
}

/// A row of the CSV export.
#[derive(Serialize)]
struct ExportRow<'a> {
    id: TransactionId,
    date: String,
    description: &'a str,
    amount: f64,
    account_id: i64,
    category_id: Option<i64>,
    reconciled: bool,
}

const EXPORT_HEADER: [&str; 7] = [
    "id",
    "date",
    "description",
    "amount",
    "account_id",
    "category_id",
    "reconciled",
];

/// Every transaction matching the filters as CSV, ignoring pagination.
pub async fn export_transactions(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Query(filters): Query<TransactionFilters>,
) -> Result<impl IntoResponse, ServerError> {
    filters.validate()?;

    let transactions = matching(&state.store(), user_id, &filters);
    let csv = to_csv(&transactions).map_err(|error| ServerError::Internal(error.to_string()))?;

    Ok(([(CONTENT_TYPE, "text/csv")], csv))
}

fn to_csv(transactions: &[Transaction]) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    // Written by hand so that an empty export still has a header.
    writer.write_record(EXPORT_HEADER)?;
    for transaction in transactions {
        writer.serialize(ExportRow {
            id: transaction.id,
            date: transaction.date.to_string(),
            description: &transaction.description,
            amount: transaction.amount,
            account_id: transaction.account_id,
            category_id: transaction.category_id,
            reconciled: transaction.reconciled,
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| csv::Error::from(error.into_error()))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
