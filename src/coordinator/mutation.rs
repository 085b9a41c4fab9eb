//! Writes sent through the coordinator and the cache partitions each one
//! affects.

use crate::{backend::ApiRequest, coordinator::key::Domain};

/// Every write the client can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreateBudget,
    UpdateBudget,
    ArchiveBudget,
    DeleteBudget,
    CreateAccount,
    UpdateAccount,
    DeleteAccount,
    SyncAccount,
    CreateTransaction,
    UpdateTransaction,
    DeleteTransaction,
    BulkDeleteTransactions,
    CategorizeTransaction,
    ReconcileTransaction,
    ImportTransactions,
    CreateGoal,
    UpdateGoal,
    DeleteGoal,
    ContributeToGoal,
}

const BUDGET_WRITE: &[Domain] = &[Domain::Budgets, Domain::Reports];
const ACCOUNT_WRITE: &[Domain] = &[Domain::Accounts, Domain::Reports];
const ACCOUNT_SYNC: &[Domain] = &[
    Domain::Accounts,
    Domain::Transactions,
    Domain::Budgets,
    Domain::Reports,
];
const TRANSACTION_WRITE: &[Domain] = &[
    Domain::Transactions,
    Domain::Accounts,
    Domain::Budgets,
    Domain::Reports,
];
const RECONCILE: &[Domain] = &[Domain::Transactions, Domain::Accounts];
const GOAL_WRITE: &[Domain] = &[Domain::Goals, Domain::Reports];

impl MutationKind {
    /// The cache partitions invalidated when the write succeeds.
    pub fn affects(self) -> &'static [Domain] {
        match self {
            MutationKind::CreateBudget
            | MutationKind::UpdateBudget
            | MutationKind::ArchiveBudget
            | MutationKind::DeleteBudget => BUDGET_WRITE,
            MutationKind::CreateAccount
            | MutationKind::UpdateAccount
            | MutationKind::DeleteAccount => ACCOUNT_WRITE,
            MutationKind::SyncAccount => ACCOUNT_SYNC,
            MutationKind::CreateTransaction
            | MutationKind::UpdateTransaction
            | MutationKind::DeleteTransaction
            | MutationKind::BulkDeleteTransactions
            | MutationKind::CategorizeTransaction
            | MutationKind::ImportTransactions => TRANSACTION_WRITE,
            MutationKind::ReconcileTransaction => RECONCILE,
            MutationKind::CreateGoal
            | MutationKind::UpdateGoal
            | MutationKind::DeleteGoal
            | MutationKind::ContributeToGoal => GOAL_WRITE,
        }
    }

    /// The confirmation shown when the write succeeds.
    pub fn success_message(self) -> &'static str {
        match self {
            MutationKind::CreateBudget => "Budget created successfully",
            MutationKind::UpdateBudget => "Budget updated successfully",
            MutationKind::ArchiveBudget => "Budget archived successfully",
            MutationKind::DeleteBudget => "Budget deleted successfully",
            MutationKind::CreateAccount => "Account created successfully",
            MutationKind::UpdateAccount => "Account updated successfully",
            MutationKind::DeleteAccount => "Account deleted successfully",
            MutationKind::SyncAccount => "Account synced successfully",
            MutationKind::CreateTransaction => "Transaction created successfully",
            MutationKind::UpdateTransaction => "Transaction updated successfully",
            MutationKind::DeleteTransaction => "Transaction deleted successfully",
            MutationKind::BulkDeleteTransactions => "Transactions deleted successfully",
            MutationKind::CategorizeTransaction => "Transaction categorized successfully",
            MutationKind::ReconcileTransaction => "Transaction reconciled successfully",
            MutationKind::ImportTransactions => "Transactions imported successfully",
            MutationKind::CreateGoal => "Goal created successfully",
            MutationKind::UpdateGoal => "Goal updated successfully",
            MutationKind::DeleteGoal => "Goal deleted successfully",
            MutationKind::ContributeToGoal => "Contribution added successfully",
        }
    }

    /// The message shown when the write fails and the backend gave no reason.
    pub fn failure_message(self) -> &'static str {
        match self {
            MutationKind::CreateBudget => "Failed to create budget",
            MutationKind::UpdateBudget => "Failed to update budget",
            MutationKind::ArchiveBudget => "Failed to archive budget",
            MutationKind::DeleteBudget => "Failed to delete budget",
            MutationKind::CreateAccount => "Failed to create account",
            MutationKind::UpdateAccount => "Failed to update account",
            MutationKind::DeleteAccount => "Failed to delete account",
            MutationKind::SyncAccount => "Failed to sync account",
            MutationKind::CreateTransaction => "Failed to create transaction",
            MutationKind::UpdateTransaction => "Failed to update transaction",
            MutationKind::DeleteTransaction => "Failed to delete transaction",
            MutationKind::BulkDeleteTransactions => "Failed to delete transactions",
            MutationKind::CategorizeTransaction => "Failed to categorize transaction",
            MutationKind::ReconcileTransaction => "Failed to reconcile transaction",
            MutationKind::ImportTransactions => "Failed to import transactions",
            MutationKind::CreateGoal => "Failed to create goal",
            MutationKind::UpdateGoal => "Failed to update goal",
            MutationKind::DeleteGoal => "Failed to delete goal",
            MutationKind::ContributeToGoal => "Failed to add contribution",
        }
    }
}

/// A write ready to send: what it is and the request that performs it.
///
/// Payloads are validated before a `Mutation` is built, so holding one means
/// the request is fit to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub kind: MutationKind,
    pub request: ApiRequest,
}

impl Mutation {
    pub fn new(kind: MutationKind, request: ApiRequest) -> Self {
        Self { kind, request }
    }
}
