//! Accounts and the reads and writes for every `/accounts` resource.

mod core;

pub use core::{
    Account, AccountBalance, AccountId, AccountKind, AccountUpdate, MAX_ACCOUNT_NAME_LENGTH,
    NewAccount,
};

use axum::http::Method;

use crate::{
    Error,
    backend::{ApiRequest, to_body},
    coordinator::{Coordinator, Mutation, MutationKind},
    endpoints::{self, entity_key, format_endpoint},
};

impl Coordinator {
    /// # Errors
    ///
    /// See [Coordinator::query].
    pub async fn accounts(&self) -> Result<Vec<Account>, Error> {
        self.query(&entity_key(endpoints::ACCOUNTS, None), &())
            .await
    }

    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no account with `id`.
    pub async fn account(&self, id: AccountId) -> Result<Account, Error> {
        self.query(&entity_key(endpoints::ACCOUNT, Some(id)), &())
            .await
    }

    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no account with `id`.
    pub async fn account_balance(&self, id: AccountId) -> Result<AccountBalance, Error> {
        self.query(&entity_key(endpoints::ACCOUNT_BALANCE, Some(id)), &())
            .await
    }

    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if `account`
    /// fails its checks, otherwise see [Coordinator::mutate].
    pub async fn create_account(&self, account: &NewAccount) -> Result<Account, Error> {
        account.validate()?;

        self.mutate(Mutation::new(
            MutationKind::CreateAccount,
            ApiRequest::with_body(Method::POST, endpoints::ACCOUNTS, Some(to_body(account)?)),
        ))
        .await
    }

    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if `update`
    /// fails its checks, otherwise see [Coordinator::mutate].
    pub async fn update_account(
        &self,
        id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, Error> {
        update.validate()?;

        self.mutate(Mutation::new(
            MutationKind::UpdateAccount,
            ApiRequest::with_body(
                Method::PUT,
                format_endpoint(endpoints::ACCOUNT, id),
                Some(to_body(update)?),
            ),
        ))
        .await
    }

    /// Delete the account with `id` along with its transactions.
    ///
    /// # Errors
    ///
    /// See [Coordinator::mutate].
    pub async fn delete_account(&self, id: AccountId) -> Result<(), Error> {
        self.mutate(Mutation::new(
            MutationKind::DeleteAccount,
            ApiRequest::with_body(Method::DELETE, format_endpoint(endpoints::ACCOUNT, id), None),
        ))
        .await
    }

    /// Pull the latest transactions for the account with `id` from its
    /// institution.
    ///
    /// # Errors
    ///
    /// See [Coordinator::mutate].
    pub async fn sync_account(&self, id: AccountId) -> Result<Account, Error> {
        self.mutate(Mutation::new(
            MutationKind::SyncAccount,
            ApiRequest::with_body(
                Method::POST,
                format_endpoint(endpoints::ACCOUNT_SYNC, id),
                None,
            ),
        ))
        .await
    }
}
