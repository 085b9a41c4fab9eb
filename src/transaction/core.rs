//! Defines the transaction records, their payloads and filters.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    account::AccountId, budget::CategoryId, date_format, validation::ValidationErrors,
};

pub type TransactionId = i64;

/// The longest description a transaction may have.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;
/// The largest page of transactions that may be requested.
pub const MAX_PAGE_SIZE: u32 = 100;
/// The page size used when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Negative amounts are expenses, positive amounts are income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub amount: f64,
    #[serde(with = "date_format::date")]
    pub date: Date,
    pub description: String,
    /// Whether the transaction has been matched against a statement.
    pub reconciled: bool,
    #[serde(with = "date_format::timestamp")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }
}

/// The payload for creating a transaction.
///
/// Use [NewTransaction::build] and set the optional fields as needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    pub amount: f64,
    #[serde(with = "date_format::date")]
    pub date: Date,
    pub description: String,
}

impl NewTransaction {
    /// Start a new uncategorised transaction.
    pub fn build(account_id: AccountId, amount: f64, date: Date, description: &str) -> Self {
        Self {
            account_id,
            category_id: None,
            amount,
            date,
            description: description.to_owned(),
        }
    }

    /// Set the category.
    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// # Errors
    ///
    /// Returns every field that fails its check.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check_id("accountId", self.account_id);
        if let Some(category_id) = self.category_id {
            errors.check_id("categoryId", category_id);
        }
        check_amount(&mut errors, self.amount);
        errors.check_text("description", &self.description, MAX_DESCRIPTION_LENGTH);

        errors.into_result()
    }
}

/// The payload for editing a transaction. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "date_format::option_date"
    )]
    pub date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TransactionUpdate {
    /// # Errors
    ///
    /// Returns every present field that fails its check.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(account_id) = self.account_id {
            errors.check_id("accountId", account_id);
        }
        if let Some(category_id) = self.category_id {
            errors.check_id("categoryId", category_id);
        }
        if let Some(amount) = self.amount {
            check_amount(&mut errors, amount);
        }
        if let Some(description) = &self.description {
            errors.check_text("description", description, MAX_DESCRIPTION_LENGTH);
        }

        errors.into_result()
    }

    /// Apply the present fields to `transaction`.
    pub fn apply(&self, transaction: &mut Transaction) {
        if let Some(account_id) = self.account_id {
            transaction.account_id = account_id;
        }
        if self.category_id.is_some() {
            transaction.category_id = self.category_id;
        }
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(date) = self.date {
            transaction.date = date;
        }
        if let Some(description) = &self.description {
            transaction.description = description.trim().to_owned();
        }
    }
}

fn check_amount(errors: &mut ValidationErrors, amount: f64) {
    if !amount.is_finite() || amount == 0.0 {
        errors.add("amount", "Must be a non-zero amount");
    }
}

/// Filters and pagination for listing transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "date_format::option_date"
    )]
    pub start_date: Option<Date>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "date_format::option_date"
    )]
    pub end_date: Option<Date>,
    /// Matches descriptions containing the text, ignoring case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// One based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for TransactionFilters {
    fn default() -> Self {
        Self {
            account_id: None,
            category_id: None,
            start_date: None,
            end_date: None,
            search: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl TransactionFilters {
    /// # Errors
    ///
    /// Returns an error for an out of range page or page size, or a date range
    /// that ends before it starts.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.page < 1 {
            errors.add("page", "Must be at least 1");
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            errors.add(
                "pageSize",
                format!("Must be between 1 and {MAX_PAGE_SIZE}"),
            );
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.add("endDate", format!("Must not be before {start}"));
            }
        }

        errors.into_result()
    }

    /// Whether `transaction` passes the filters, ignoring pagination.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.account_id.is_none_or(|id| transaction.account_id == id)
            && self
                .category_id
                .is_none_or(|id| transaction.category_id == Some(id))
            && self.start_date.is_none_or(|start| transaction.date >= start)
            && self.end_date.is_none_or(|end| transaction.date <= end)
            && self.search.as_deref().is_none_or(|search| {
                transaction
                    .description
                    .to_lowercase()
                    .contains(&search.to_lowercase())
            })
    }
}

/// One page of a filtered transaction listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub page: u32,
    pub page_size: u32,
    /// The number of transactions matching the filters across all pages.
    pub total: u64,
}

impl TransactionPage {
    /// The number of pages needed to show every match.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }

        self.total.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.page_count()
    }
}

/// The payload for deleting many transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDelete {
    pub ids: Vec<TransactionId>,
}

impl BulkDelete {
    /// # Errors
    ///
    /// Returns an error if no ids were given.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.ids.is_empty() {
            errors.add("ids", "Select at least one transaction");
        }
        for id in &self.ids {
            errors.check_id("ids", *id);
        }

        errors.into_result()
    }
}

/// The payload for setting the category of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorize {
    pub category_id: CategoryId,
}

/// The payload for importing a batch of transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionImport {
    pub transactions: Vec<NewTransaction>,
}

impl TransactionImport {
    /// Check every transaction in the batch.
    ///
    /// Field names are prefixed with the row index, e.g. "transactions[2].amount".
    ///
    /// # Errors
    ///
    /// Returns an error for an empty batch and every invalid field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.transactions.is_empty() {
            errors.add("transactions", "There are no transactions to import");
        }

        for (index, transaction) in self.transactions.iter().enumerate() {
            if let Err(row_errors) = transaction.validate() {
                for error in row_errors.errors() {
                    errors.add(
                        &format!("transactions[{index}].{}", error.field),
                        error.message.clone(),
                    );
                }
            }
        }

        errors.into_result()
    }
}

/// How many transactions an import created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
}

/// How many transactions a bulk delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub deleted: usize,
}

#[cfg(test)]
mod validation_tests {
    use time::macros::date;

    use super::{BulkDelete, NewTransaction, TransactionFilters, TransactionImport};

    #[test]
    fn valid_transaction_passes() {
        let transaction = NewTransaction::build(1, -12.5, date!(2025 - 04 - 02), "Coffee").category(2);

        assert_eq!(transaction.validate(), Ok(()));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let transaction = NewTransaction::build(1, 0.0, date!(2025 - 04 - 02), "Coffee");

        assert_eq!(
            transaction.validate().unwrap_err().for_field("amount"),
            Some("Must be a non-zero amount")
        );
    }

    #[test]
    fn description_length_is_limited() {
        let transaction =
            NewTransaction::build(1, 5.0, date!(2025 - 04 - 02), &"x".repeat(256));

        assert_eq!(
            transaction.validate().unwrap_err().for_field("description"),
            Some("Must be at most 255 characters")
        );
    }

    #[test]
    fn filters_check_pagination_and_dates() {
        let filters = TransactionFilters {
            page: 0,
            page_size: 101,
            start_date: Some(date!(2025 - 04 - 10)),
            end_date: Some(date!(2025 - 04 - 01)),
            ..Default::default()
        };

        let errors = filters.validate().unwrap_err();

        assert!(errors.for_field("page").is_some());
        assert!(errors.for_field("pageSize").is_some());
        assert!(errors.for_field("endDate").is_some());
    }

    #[test]
    fn same_day_range_is_allowed() {
        let filters = TransactionFilters {
            start_date: Some(date!(2025 - 04 - 01)),
            end_date: Some(date!(2025 - 04 - 01)),
            ..Default::default()
        };

        assert_eq!(filters.validate(), Ok(()));
    }

    #[test]
    fn bulk_delete_requires_ids() {
        let errors = BulkDelete { ids: vec![] }.validate().unwrap_err();

        assert_eq!(errors.for_field("ids"), Some("Select at least one transaction"));
    }

    #[test]
    fn import_reports_row_errors() {
        let import = TransactionImport {
            transactions: vec![
                NewTransaction::build(1, 5.0, date!(2025 - 04 - 02), "Pay"),
                NewTransaction::build(1, 0.0, date!(2025 - 04 - 02), "Broken"),
            ],
        };

        let errors = import.validate().unwrap_err();

        assert_eq!(
            errors.for_field("transactions[1].amount"),
            Some("Must be a non-zero amount")
        );
        assert_eq!(errors.errors().len(), 1);
    }

    #[test]
    fn empty_import_is_rejected() {
        let import = TransactionImport {
            transactions: vec![],
        };

        assert!(import.validate().unwrap_err().for_field("transactions").is_some());
    }
}
