//! A REST server that keeps everything in memory.
//!
//! It serves the same routes and envelopes as the real budgeting backend so the
//! client can be exercised end to end, either over HTTP through the
//! `mock_server` binary or in process through [crate::backend::InProcessBackend].

mod accounts;
mod auth;
mod budgets;
mod goals;
mod reports;
mod store;
mod transactions;

pub use store::{DEMO_EMAIL, DEMO_PASSWORD, MemoryStore};

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_server::Handle;
use serde::Serialize;
use serde_json::json;
use time::{Date, OffsetDateTime};
use tokio::signal;

use crate::{backend::Envelope, budget::UserId, endpoints, validation::ValidationErrors};

/// The state shared by every mock server handler.
#[derive(Debug, Clone)]
pub struct MockState {
    store: Arc<Mutex<MemoryStore>>,
    /// Overrides the current date for date dependent reports.
    today: Option<Date>,
}

impl MockState {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            today: None,
        }
    }

    /// Pin the date used for trends, progress and cashflow.
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> Date {
        self.today
            .unwrap_or_else(|| OffsetDateTime::now_utc().date())
    }

    /// Lock the store, recovering the data if a handler panicked while
    /// holding the lock.
    pub fn store(&self) -> MutexGuard<'_, MemoryStore> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The bearer token of the current request, placed in the request extensions
/// by [auth_guard].
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Return a router with every mock route.
///
/// Everything except logging in requires a bearer token issued by the log in
/// route.
pub fn build_router(state: MockState) -> Router {
    let public_routes = Router::new().route(endpoints::LOG_IN, post(auth::log_in));

    let protected_routes = Router::new()
        .route(endpoints::LOG_OUT, post(auth::log_out))
        .route(
            endpoints::ACCOUNTS,
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            endpoints::ACCOUNT,
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route(endpoints::ACCOUNT_BALANCE, get(accounts::get_balance))
        .route(endpoints::ACCOUNT_SYNC, post(accounts::sync_account))
        .route(
            endpoints::BUDGETS,
            get(budgets::list_budgets).post(budgets::create_budget),
        )
        .route(endpoints::BUDGET_SUMMARY, get(budgets::get_summary))
        .route(endpoints::BUDGET_TRENDS, get(budgets::get_trends))
        .route(
            endpoints::BUDGET,
            get(budgets::get_budget)
                .put(budgets::update_budget)
                .delete(budgets::delete_budget),
        )
        .route(endpoints::BUDGET_ARCHIVE, post(budgets::archive_budget))
        .route(endpoints::BUDGET_PROGRESS, get(budgets::get_progress))
        .route(
            endpoints::TRANSACTIONS,
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            endpoints::TRANSACTIONS_BULK_DELETE,
            post(transactions::bulk_delete_transactions),
        )
        .route(
            endpoints::TRANSACTIONS_IMPORT,
            post(transactions::import_transactions),
        )
        .route(
            endpoints::TRANSACTIONS_EXPORT,
            get(transactions::export_transactions),
        )
        .route(
            endpoints::TRANSACTION,
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route(
            endpoints::TRANSACTION_CATEGORIZE,
            post(transactions::categorize_transaction),
        )
        .route(
            endpoints::TRANSACTION_RECONCILE,
            post(transactions::reconcile_transaction),
        )
        .route(
            endpoints::GOALS,
            get(goals::list_goals).post(goals::create_goal),
        )
        .route(
            endpoints::GOAL,
            get(goals::get_goal)
                .put(goals::update_goal)
                .delete(goals::delete_goal),
        )
        .route(endpoints::GOAL_CONTRIBUTE, post(goals::contribute_to_goal))
        .route(endpoints::REPORT_SPENDING, get(reports::get_spending))
        .route(endpoints::REPORT_CASHFLOW, get(reports::get_cashflow))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes.merge(public_routes).with_state(state)
}

/// Middleware function that checks for a valid bearer token.
///
/// The user ID and token are placed into the request extensions and the
/// request executed normally if the token is valid, otherwise a 401 envelope is
/// returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user_id): Extension<UserId>` to receive the user ID.
async fn auth_guard(State(state): State<MockState>, mut request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    let Some(token) = token else {
        return ServerError::Unauthorized.into_response();
    };

    let user_id: Option<UserId> = state.store().sessions.get(&token).copied();

    match user_id {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            request.extensions_mut().insert(SessionToken(token));
            next.run(request).await
        }
        None => {
            tracing::debug!("Rejected request with unknown token");
            ServerError::Unauthorized.into_response()
        }
    }
}

/// The failures a mock handler can respond with.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ServerError {
    #[error("{0}")]
    Validation(ValidationErrors),

    /// The request was well formed but cannot be carried out, e.g. a budget
    /// without an end date has no progress.
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The named record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized | ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(errors: ValidationErrors) -> Self {
        ServerError::Validation(errors)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{self}");
        }

        let body = match &self {
            ServerError::Validation(errors) => json!({
                "success": false,
                "message": self.to_string(),
                "errors": errors.errors(),
            }),
            _ => json!({ "success": false, "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Wrap `data` in a successful envelope.
pub(crate) fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::success(data))
}

/// Start the shutdown of the server on SIGINT or SIGTERM, giving open
/// connections a second to finish.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to install the terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
