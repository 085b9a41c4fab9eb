//! The REST resource paths served by the backend.
//!
//! For endpoints that take a parameter, e.g., '/budgets/{budget_id}', use [format_endpoint].

/// The route for exchanging credentials for a bearer token.
pub const LOG_IN: &str = "/auth/login";
/// The route for ending the current session.
pub const LOG_OUT: &str = "/auth/logout";

/// The route to list and create accounts.
pub const ACCOUNTS: &str = "/accounts";
/// The route to read, update and delete a single account.
pub const ACCOUNT: &str = "/accounts/{account_id}";
/// The route for the current balance of an account.
pub const ACCOUNT_BALANCE: &str = "/accounts/{account_id}/balance";
/// The route to synchronise an account with its institution.
pub const ACCOUNT_SYNC: &str = "/accounts/{account_id}/sync";

/// The route to list and create budgets.
pub const BUDGETS: &str = "/budgets";
/// The route for the totals across all active budgets.
pub const BUDGET_SUMMARY: &str = "/budgets/summary";
/// The route for monthly spending against budgets.
pub const BUDGET_TRENDS: &str = "/budgets/trends";
/// The route to read, update and delete a single budget.
pub const BUDGET: &str = "/budgets/{budget_id}";
/// The route to archive (soft-disable) a budget.
pub const BUDGET_ARCHIVE: &str = "/budgets/{budget_id}/archive";
/// The route for the progress of a budget through its period.
pub const BUDGET_PROGRESS: &str = "/budgets/{budget_id}/progress";

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route to read, update and delete a single transaction.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";
/// The route to delete many transactions at once.
pub const TRANSACTIONS_BULK_DELETE: &str = "/transactions/bulk-delete";
/// The route to set the category of a transaction.
pub const TRANSACTION_CATEGORIZE: &str = "/transactions/{transaction_id}/categorize";
/// The route to mark a transaction as reconciled.
pub const TRANSACTION_RECONCILE: &str = "/transactions/{transaction_id}/reconcile";
/// The route to import a batch of transactions.
pub const TRANSACTIONS_IMPORT: &str = "/transactions/import";
/// The route to export transactions as CSV.
pub const TRANSACTIONS_EXPORT: &str = "/transactions/export";

/// The route to list and create savings goals.
pub const GOALS: &str = "/goals";
/// The route to read, update and delete a single goal.
pub const GOAL: &str = "/goals/{goal_id}";
/// The route to add money to a goal.
pub const GOAL_CONTRIBUTE: &str = "/goals/{goal_id}/contribute";

/// The route for expenses grouped by category.
pub const REPORT_SPENDING: &str = "/reports/spending";
/// The route for income and expenses per month.
pub const REPORT_CASHFLOW: &str = "/reports/cashflow";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/budgets/{budget_id}', '{budget_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let param_start = match endpoint_path.find('{') {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

/// Convert an axum-style route, e.g. '/budgets/{budget_id}', into the entity
/// key used by the query cache, e.g. 'budgets:7'.
///
/// Entity keys join the path segments with ':' so that the first segment is
/// always the entity domain.
pub fn entity_key(endpoint_path: &str, id: Option<i64>) -> String {
    let path = match id {
        Some(id) => format_endpoint(endpoint_path, id),
        None => endpoint_path.to_owned(),
    };

    path.trim_matches('/').replace('/', ":")
}
