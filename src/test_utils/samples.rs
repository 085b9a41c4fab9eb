use time::{Date, macros::{date, datetime}};

use crate::{
    account::{Account, AccountId, AccountKind},
    budget::{Budget, BudgetId, BudgetPeriod},
    goal::{Goal, GoalId},
    transaction::{Transaction, TransactionId},
};

/// A monthly budget starting on 2025-04-01 for category 3.
pub(crate) fn sample_budget(id: BudgetId, amount: f64, spent: f64) -> Budget {
    Budget {
        id,
        user_id: 1,
        category_id: 3,
        name: format!("Budget {id}"),
        amount,
        period: BudgetPeriod::Monthly,
        start_date: date!(2025 - 04 - 01),
        end_date: None,
        spent,
        remaining: amount - spent,
        percent_used: if amount > 0.0 {
            spent * 100.0 / amount
        } else {
            0.0
        },
        rollover: false,
        is_active: true,
        created_at: datetime!(2025-04-01 0:00 UTC),
        updated_at: datetime!(2025-04-01 0:00 UTC),
    }
}

/// A transaction in account 1 and category 3.
pub(crate) fn sample_transaction(
    id: TransactionId,
    amount: f64,
    date: Date,
    description: &str,
) -> Transaction {
    Transaction {
        id,
        account_id: 1,
        category_id: Some(3),
        amount,
        date,
        description: description.to_owned(),
        reconciled: false,
        created_at: datetime!(2025-04-01 0:00 UTC),
    }
}

pub(crate) fn sample_account(id: AccountId, name: &str) -> Account {
    Account {
        id,
        name: name.to_owned(),
        kind: AccountKind::Checking,
        currency: "NZD".to_owned(),
        initial_balance: 0.0,
        balance: 0.0,
        is_active: true,
        last_synced_at: None,
        created_at: datetime!(2025-04-01 0:00 UTC),
        updated_at: datetime!(2025-04-01 0:00 UTC),
    }
}

pub(crate) fn sample_goal(id: GoalId, target_amount: f64, current_amount: f64) -> Goal {
    Goal {
        id,
        name: format!("Goal {id}"),
        target_amount,
        current_amount,
        target_date: None,
        created_at: datetime!(2025-04-01 0:00 UTC),
        updated_at: datetime!(2025-04-01 0:00 UTC),
    }
}
