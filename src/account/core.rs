use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{date_format, validation::ValidationErrors};

pub type AccountId = i64;

/// The longest name an account may have.
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 100;

/// What sort of account holds the money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Savings,
    Credit,
    Investment,
    Cash,
}

/// A bank account, credit card or cash holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub kind: AccountKind,
    /// ISO 4217 code, e.g. "NZD".
    pub currency: String,
    pub initial_balance: f64,
    /// The initial balance plus every transaction in the account.
    pub balance: f64,
    pub is_active: bool,
    #[serde(default, with = "date_format::option_timestamp")]
    pub last_synced_at: Option<OffsetDateTime>,
    #[serde(with = "date_format::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "date_format::timestamp")]
    pub updated_at: OffsetDateTime,
}

/// The balance of a single account as of now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub balance: f64,
    pub currency: String,
    #[serde(with = "date_format::timestamp")]
    pub as_of: OffsetDateTime,
}

/// The payload for creating an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    #[serde(default)]
    pub initial_balance: f64,
}

impl NewAccount {
    /// # Errors
    ///
    /// Returns every field that fails its check.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check_text("name", &self.name, MAX_ACCOUNT_NAME_LENGTH);
        check_currency(&mut errors, &self.currency);
        if !self.initial_balance.is_finite() {
            errors.add("initialBalance", "Must be a number");
        }

        errors.into_result()
    }
}

/// The payload for editing an account. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AccountKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl AccountUpdate {
    /// # Errors
    ///
    /// Returns every present field that fails its check.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = &self.name {
            errors.check_text("name", name, MAX_ACCOUNT_NAME_LENGTH);
        }
        if let Some(currency) = &self.currency {
            check_currency(&mut errors, currency);
        }

        errors.into_result()
    }

    /// Apply the present fields to `account`.
    pub fn apply(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = name.trim().to_owned();
        }
        if let Some(kind) = self.kind {
            account.kind = kind;
        }
        if let Some(currency) = &self.currency {
            account.currency = currency.clone();
        }
        if let Some(is_active) = self.is_active {
            account.is_active = is_active;
        }
    }
}

fn check_currency(errors: &mut ValidationErrors, currency: &str) {
    let is_code = currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase());

    if !is_code {
        errors.add("currency", "Must be a three letter currency code, e.g. NZD");
    }
}
