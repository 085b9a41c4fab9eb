//! Transactions and the reads and writes for every `/transactions` resource.

mod core;

pub use core::{
    BulkDelete, Categorize, DEFAULT_PAGE_SIZE, DeleteSummary, ImportSummary,
    MAX_DESCRIPTION_LENGTH, MAX_PAGE_SIZE, NewTransaction, Transaction, TransactionFilters,
    TransactionId, TransactionImport, TransactionPage, TransactionUpdate,
};

use axum::http::Method;

use crate::{
    Error,
    backend::{ApiRequest, to_body},
    budget::CategoryId,
    coordinator::{Coordinator, Mutation, MutationKind},
    endpoints::{self, entity_key, format_endpoint},
    validation::ValidationErrors,
};

impl Coordinator {
    /// One page of the transactions matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if the
    /// filters are out of range, otherwise see [Coordinator::query].
    pub async fn transactions(&self, filters: &TransactionFilters) -> Result<TransactionPage, Error> {
        filters.validate()?;

        self.query(&entity_key(endpoints::TRANSACTIONS, None), filters)
            .await
    }

    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no transaction with `id`.
    pub async fn transaction(&self, id: TransactionId) -> Result<Transaction, Error> {
        self.query(&entity_key(endpoints::TRANSACTION, Some(id)), &())
            .await
    }

    /// Every transaction matching `filters` as CSV text, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if the
    /// filters are out of range, otherwise see [Coordinator::query].
    pub async fn export_transactions(&self, filters: &TransactionFilters) -> Result<String, Error> {
        filters.validate()?;

        self.query(&entity_key(endpoints::TRANSACTIONS_EXPORT, None), filters)
            .await
    }

    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if
    /// `transaction` fails its checks, otherwise see [Coordinator::mutate].
    pub async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction, Error> {
        transaction.validate()?;

        self.mutate(Mutation::new(
            MutationKind::CreateTransaction,
            ApiRequest::with_body(
                Method::POST,
                endpoints::TRANSACTIONS,
                Some(to_body(transaction)?),
            ),
        ))
        .await
    }

    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if `update`
    /// fails its checks, otherwise see [Coordinator::mutate].
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        update: &TransactionUpdate,
    ) -> Result<Transaction, Error> {
        update.validate()?;

        self.mutate(Mutation::new(
            MutationKind::UpdateTransaction,
            ApiRequest::with_body(
                Method::PUT,
                format_endpoint(endpoints::TRANSACTION, id),
                Some(to_body(update)?),
            ),
        ))
        .await
    }

    /// # Errors
    ///
    /// See [Coordinator::mutate].
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), Error> {
        self.mutate(Mutation::new(
            MutationKind::DeleteTransaction,
            ApiRequest::with_body(
                Method::DELETE,
                format_endpoint(endpoints::TRANSACTION, id),
                None,
            ),
        ))
        .await
    }

    /// Delete every transaction in `ids`.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if `ids` is
    /// empty, otherwise see [Coordinator::mutate].
    pub async fn bulk_delete_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<DeleteSummary, Error> {
        let payload = BulkDelete { ids: ids.to_vec() };
        payload.validate()?;

        self.mutate(Mutation::new(
            MutationKind::BulkDeleteTransactions,
            ApiRequest::with_body(
                Method::POST,
                endpoints::TRANSACTIONS_BULK_DELETE,
                Some(to_body(&payload)?),
            ),
        ))
        .await
    }

    /// Put the transaction with `id` into the category `category_id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend for an
    /// invalid category id, otherwise see [Coordinator::mutate].
    pub async fn categorize_transaction(
        &self,
        id: TransactionId,
        category_id: CategoryId,
    ) -> Result<Transaction, Error> {
        let mut errors = ValidationErrors::new();
        errors.check_id("categoryId", category_id);
        errors.into_result()?;

        self.mutate(Mutation::new(
            MutationKind::CategorizeTransaction,
            ApiRequest::with_body(
                Method::POST,
                format_endpoint(endpoints::TRANSACTION_CATEGORIZE, id),
                Some(to_body(&Categorize { category_id })?),
            ),
        ))
        .await
    }

    /// Mark the transaction with `id` as matched against a statement.
    ///
    /// # Errors
    ///
    /// See [Coordinator::mutate].
    pub async fn reconcile_transaction(&self, id: TransactionId) -> Result<Transaction, Error> {
        self.mutate(Mutation::new(
            MutationKind::ReconcileTransaction,
            ApiRequest::with_body(
                Method::POST,
                format_endpoint(endpoints::TRANSACTION_RECONCILE, id),
                None,
            ),
        ))
        .await
    }

    /// Create every transaction in `transactions` in one request.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if the batch
    /// is empty or any row fails its checks, otherwise see
    /// [Coordinator::mutate].
    pub async fn import_transactions(
        &self,
        transactions: &[NewTransaction],
    ) -> Result<ImportSummary, Error> {
        let payload = TransactionImport {
            transactions: transactions.to_vec(),
        };
        payload.validate()?;

        self.mutate(Mutation::new(
            MutationKind::ImportTransactions,
            ApiRequest::with_body(
                Method::POST,
                endpoints::TRANSACTIONS_IMPORT,
                Some(to_body(&payload)?),
            ),
        ))
        .await
    }
}
