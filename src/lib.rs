//! A client for the Budgeteur budgeting REST API.
//!
//! The [Coordinator] sits between the UI and the backend. Reads go through a
//! query cache that deduplicates concurrent requests, serves fresh entries
//! without a round trip and retries transient failures. Writes are validated
//! locally, sent once, and invalidate the cached reads they affect.
//!
//! The backend is reached through a [Backend]: [HttpBackend] for a real server
//! or [InProcessBackend] for the in-memory [mock_server].
//!
//! ```no_run
//! # async fn run() -> Result<(), budgeteur_client::Error> {
//! use std::sync::Arc;
//!
//! use budgeteur_client::{
//!     Coordinator, CoordinatorConfig, HttpBackend, HttpBackendConfig, LogNotifier,
//!     MemoryTokenStore, budget::BudgetFilters, coordinator::Credentials,
//! };
//!
//! let tokens = Arc::new(MemoryTokenStore::new());
//! let backend = HttpBackend::new(&HttpBackendConfig::new("http://localhost:3000"), tokens.clone())?;
//! let coordinator = Coordinator::new(
//!     Arc::new(backend),
//!     tokens,
//!     Arc::new(LogNotifier),
//!     CoordinatorConfig::default(),
//! );
//!
//! coordinator
//!     .log_in(&Credentials {
//!         email: "demo@example.com".to_owned(),
//!         password: "password123".to_owned(),
//!     })
//!     .await?;
//! for budget in coordinator.budgets_with_status(&BudgetFilters::default()).await? {
//!     println!("{}: {:?}", budget.budget.name, budget.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod alert;
pub mod backend;
pub mod budget;
pub mod config;
pub mod coordinator;
mod date_format;
pub mod endpoints;
mod error;
pub mod filters;
pub mod goal;
pub mod logging;
pub mod mock_server;
pub mod report;
pub mod tokens;
pub mod transaction;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use alert::{Alert, AlertType, LogNotifier, Notifier};
pub use backend::{Backend, HttpBackend, InProcessBackend};
pub use config::{CoordinatorConfig, HttpBackendConfig};
pub use coordinator::Coordinator;
pub use error::Error;
pub use tokens::{MemoryTokenStore, SqliteTokenStore, TokenStore};
