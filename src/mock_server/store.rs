//! The in-memory data behind the mock server.
//!
//! Derived fields (account balances, budget spending) are never stored; they
//! are computed from the transactions whenever a record is read.
//!
//! Every record belongs to one user. Budgets carry their owner, accounts and
//! goals are owned through a side table, and transactions belong to the owner
//! of their account.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use time::{Date, OffsetDateTime, macros::date};

use crate::{
    account::{Account, AccountId, AccountKind, NewAccount},
    budget::{Budget, BudgetId, BudgetPeriod, NewBudget, UserId},
    goal::{Goal, GoalId, NewGoal},
    transaction::{NewTransaction, Transaction, TransactionId},
};

/// The email of the user that always exists.
pub const DEMO_EMAIL: &str = "demo@example.com";
/// The password of the user that always exists.
pub const DEMO_PASSWORD: &str = "password123";

/// Hash `value` as lowercase hex.
pub fn hash_hex(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
}

/// Everything the mock server knows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub users: Vec<User>,
    /// Bearer token to the user it was issued to.
    pub sessions: HashMap<String, UserId>,
    pub accounts: Vec<Account>,
    pub budgets: Vec<Budget>,
    pub transactions: Vec<Transaction>,
    pub goals: Vec<Goal>,
    account_owners: HashMap<AccountId, UserId>,
    goal_owners: HashMap<GoalId, UserId>,
    next_id: i64,
    issued_tokens: u64,
}

impl MemoryStore {
    /// A store with only the demo user.
    pub fn new() -> Self {
        let mut store = Self::default();
        let id = store.next_id();

        store.users.push(User {
            id,
            email: DEMO_EMAIL.to_owned(),
            password_hash: hash_hex(DEMO_PASSWORD),
        });

        store
    }

    /// Register another user who can log in with `email` and `password`.
    pub fn add_user(&mut self, email: &str, password: &str) -> UserId {
        let id = self.next_id();

        self.users.push(User {
            id,
            email: email.trim().to_owned(),
            password_hash: hash_hex(password),
        });

        id
    }

    /// A store with the demo user and a month of sample data.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        let now = OffsetDateTime::now_utc();
        let user_id = store.users[0].id;

        let everyday = store.insert_account(
            user_id,
            &NewAccount {
                name: "Everyday".to_owned(),
                kind: AccountKind::Checking,
                currency: "NZD".to_owned(),
                initial_balance: 1500.0,
            },
            now,
        );
        let savings = store.insert_account(
            user_id,
            &NewAccount {
                name: "Rainy Day".to_owned(),
                kind: AccountKind::Savings,
                currency: "NZD".to_owned(),
                initial_balance: 8000.0,
            },
            now,
        );

        let month_start = now.date().replace_day(1).unwrap_or(now.date());
        for (name, category_id, amount) in [
            ("Groceries", 1, 600.0),
            ("Eating Out", 2, 200.0),
            ("Transport", 3, 250.0),
        ] {
            store.insert_budget(
                user_id,
                &NewBudget {
                    name: name.to_owned(),
                    category_id,
                    amount,
                    period: BudgetPeriod::Monthly,
                    start_date: month_start,
                    end_date: None,
                    rollover: false,
                },
                now,
            );
        }

        let seed_transactions = [
            (everyday.id, Some(1), -182.4, "Supermarket"),
            (everyday.id, Some(1), -96.15, "Farmers market"),
            (everyday.id, Some(2), -64.0, "Thai takeaway"),
            (everyday.id, Some(2), -122.5, "Birthday dinner"),
            (everyday.id, Some(3), -80.0, "Fuel"),
            (everyday.id, None, 3250.0, "Salary"),
            (savings.id, None, 500.0, "Transfer from Everyday"),
        ];
        for (account_id, category_id, amount, description) in seed_transactions {
            store.insert_transaction(
                &NewTransaction {
                    account_id,
                    category_id,
                    amount,
                    date: month_start,
                    description: description.to_owned(),
                },
                now,
            );
        }

        store.insert_goal(
            user_id,
            &NewGoal {
                name: "Holiday".to_owned(),
                target_amount: 4000.0,
                current_amount: 1250.0,
                target_date: Some(date!(2026 - 12 - 01)),
            },
            now,
        );

        store
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Issue a new bearer token for `user_id`.
    pub fn issue_token(&mut self, user_id: UserId, kind: &str) -> String {
        self.issued_tokens += 1;

        hash_hex(&format!(
            "{kind}:{user_id}:{}:{}",
            self.issued_tokens,
            OffsetDateTime::now_utc().unix_timestamp_nanos()
        ))
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email.trim()))
    }

    pub fn insert_account(
        &mut self,
        user_id: UserId,
        account: &NewAccount,
        now: OffsetDateTime,
    ) -> Account {
        let account = Account {
            id: self.next_id(),
            name: account.name.trim().to_owned(),
            kind: account.kind,
            currency: account.currency.clone(),
            initial_balance: account.initial_balance,
            balance: account.initial_balance,
            is_active: true,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        self.accounts.push(account.clone());
        self.account_owners.insert(account.id, user_id);

        account
    }

    pub fn owns_account(&self, user_id: UserId, id: AccountId) -> bool {
        self.account_owners.get(&id) == Some(&user_id)
    }

    /// The account with `id` owned by `user_id`, with its current balance.
    pub fn account(&self, user_id: UserId, id: AccountId) -> Option<Account> {
        self.accounts
            .iter()
            .find(|account| account.id == id && self.owns_account(user_id, id))
            .map(|account| self.with_balance(account))
    }

    pub fn accounts(&self, user_id: UserId) -> Vec<Account> {
        self.accounts
            .iter()
            .filter(|account| self.owns_account(user_id, account.id))
            .map(|account| self.with_balance(account))
            .collect()
    }

    pub fn account_mut(&mut self, user_id: UserId, id: AccountId) -> Option<&mut Account> {
        if !self.owns_account(user_id, id) {
            return None;
        }

        self.accounts.iter_mut().find(|account| account.id == id)
    }

    fn with_balance(&self, account: &Account) -> Account {
        let balance = account.initial_balance
            + self
                .transactions
                .iter()
                .filter(|transaction| transaction.account_id == account.id)
                .map(|transaction| transaction.amount)
                .sum::<f64>();

        Account {
            balance,
            ..account.clone()
        }
    }

    /// Remove the account with `id` and its transactions.
    pub fn remove_account(&mut self, user_id: UserId, id: AccountId) -> bool {
        if !self.owns_account(user_id, id) {
            return false;
        }

        self.accounts.retain(|account| account.id != id);
        self.account_owners.remove(&id);
        self.transactions
            .retain(|transaction| transaction.account_id != id);

        true
    }

    pub fn insert_budget(
        &mut self,
        user_id: UserId,
        budget: &NewBudget,
        now: OffsetDateTime,
    ) -> Budget {
        let budget = Budget {
            id: self.next_id(),
            user_id,
            category_id: budget.category_id,
            name: budget.name.trim().to_owned(),
            amount: budget.amount,
            period: budget.period,
            start_date: budget.start_date,
            end_date: budget.end_date,
            spent: 0.0,
            remaining: budget.amount,
            percent_used: 0.0,
            rollover: budget.rollover,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.budgets.push(budget.clone());

        self.with_spending(&budget)
    }

    /// The budget with `id` owned by `user_id`, with its spending.
    pub fn budget(&self, user_id: UserId, id: BudgetId) -> Option<Budget> {
        self.budgets
            .iter()
            .find(|budget| budget.id == id && budget.user_id == user_id)
            .map(|budget| self.with_spending(budget))
    }

    /// Every budget owned by `user_id`, with its spending.
    pub fn budgets(&self, user_id: UserId) -> Vec<Budget> {
        self.budgets
            .iter()
            .filter(|budget| budget.user_id == user_id)
            .map(|budget| self.with_spending(budget))
            .collect()
    }

    pub fn budget_mut(&mut self, user_id: UserId, id: BudgetId) -> Option<&mut Budget> {
        self.budgets
            .iter_mut()
            .find(|budget| budget.id == id && budget.user_id == user_id)
    }

    pub fn remove_budget(&mut self, user_id: UserId, id: BudgetId) -> bool {
        let before = self.budgets.len();
        self.budgets
            .retain(|budget| !(budget.id == id && budget.user_id == user_id));

        self.budgets.len() != before
    }

    /// Fill in the spent, remaining and percent used of `budget` from the
    /// expenses in its category during its current period.
    pub fn with_spending(&self, budget: &Budget) -> Budget {
        let period_end = budget.period_end().unwrap_or(Date::MAX);
        let spent = self
            .expenses_between(budget.user_id, budget.start_date, period_end)
            .filter(|transaction| transaction.category_id == Some(budget.category_id))
            .map(|transaction| transaction.amount.abs())
            .sum::<f64>();

        Budget {
            spent,
            remaining: budget.amount - spent,
            percent_used: if budget.amount > 0.0 {
                spent * 100.0 / budget.amount
            } else {
                0.0
            },
            ..budget.clone()
        }
    }

    /// The transactions in accounts owned by `user_id`.
    pub fn user_transactions(&self, user_id: UserId) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(move |transaction| self.owns_account(user_id, transaction.account_id))
    }

    /// Expense transactions of `user_id` dated within `start..=end`.
    pub fn expenses_between(
        &self,
        user_id: UserId,
        start: Date,
        end: Date,
    ) -> impl Iterator<Item = &Transaction> {
        self.user_transactions(user_id).filter(move |transaction| {
            transaction.is_expense() && transaction.date >= start && transaction.date <= end
        })
    }

    pub fn insert_transaction(
        &mut self,
        transaction: &NewTransaction,
        now: OffsetDateTime,
    ) -> Transaction {
        let transaction = Transaction {
            id: self.next_id(),
            account_id: transaction.account_id,
            category_id: transaction.category_id,
            amount: transaction.amount,
            date: transaction.date,
            description: transaction.description.trim().to_owned(),
            reconciled: false,
            created_at: now,
        };
        self.transactions.push(transaction.clone());

        transaction
    }

    pub fn transaction(&self, user_id: UserId, id: TransactionId) -> Option<&Transaction> {
        self.user_transactions(user_id)
            .find(|transaction| transaction.id == id)
    }

    pub fn transaction_mut(
        &mut self,
        user_id: UserId,
        id: TransactionId,
    ) -> Option<&mut Transaction> {
        let owners = &self.account_owners;

        self.transactions.iter_mut().find(|transaction| {
            transaction.id == id && owners.get(&transaction.account_id) == Some(&user_id)
        })
    }

    /// Remove every transaction of `user_id` in `ids`, returning how many
    /// were removed.
    pub fn remove_transactions(&mut self, user_id: UserId, ids: &[TransactionId]) -> usize {
        let owners = &self.account_owners;
        let before = self.transactions.len();

        self.transactions.retain(|transaction| {
            !(ids.contains(&transaction.id)
                && owners.get(&transaction.account_id) == Some(&user_id))
        });

        before - self.transactions.len()
    }

    pub fn insert_goal(&mut self, user_id: UserId, goal: &NewGoal, now: OffsetDateTime) -> Goal {
        let goal = Goal {
            id: self.next_id(),
            name: goal.name.trim().to_owned(),
            target_amount: goal.target_amount,
            current_amount: goal.current_amount,
            target_date: goal.target_date,
            created_at: now,
            updated_at: now,
        };
        self.goals.push(goal.clone());
        self.goal_owners.insert(goal.id, user_id);

        goal
    }

    fn owns_goal(&self, user_id: UserId, id: GoalId) -> bool {
        self.goal_owners.get(&id) == Some(&user_id)
    }

    pub fn goals(&self, user_id: UserId) -> Vec<Goal> {
        self.goals
            .iter()
            .filter(|goal| self.owns_goal(user_id, goal.id))
            .cloned()
            .collect()
    }

    pub fn goal(&self, user_id: UserId, id: GoalId) -> Option<&Goal> {
        self.goals
            .iter()
            .find(|goal| goal.id == id && self.owns_goal(user_id, id))
    }

    pub fn goal_mut(&mut self, user_id: UserId, id: GoalId) -> Option<&mut Goal> {
        if !self.owns_goal(user_id, id) {
            return None;
        }

        self.goals.iter_mut().find(|goal| goal.id == id)
    }

    pub fn remove_goal(&mut self, user_id: UserId, id: GoalId) -> bool {
        if !self.owns_goal(user_id, id) {
            return false;
        }

        self.goals.retain(|goal| goal.id != id);
        self.goal_owners.remove(&id);

        true
    }
}
