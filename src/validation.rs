//! Client-side checks run on payloads before any request is issued.
//!
//! Failed checks are collected per field so a form can show every problem at
//! once instead of one at a time.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::Date;

/// A problem with a single field of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The name of the field, matching the JSON name of the payload field.
    pub field: String,
    /// What is wrong with the field.
    pub message: String,
}

/// Every field error found in a payload. Never empty when returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem with `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    /// All recorded errors in the order they were found.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// The first error message for `field`, if any.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Check that `value` is non-blank and at most `max_len` characters.
    pub fn check_text(&mut self, field: &str, value: &str, max_len: usize) {
        let trimmed = value.trim();

        if trimmed.is_empty() {
            self.add(field, "This field is required");
        } else if trimmed.chars().count() > max_len {
            self.add(field, format!("Must be at most {max_len} characters"));
        }
    }

    /// Check that `value` is a finite number strictly greater than zero.
    pub fn check_positive(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            self.add(field, "Must be greater than zero");
        }
    }

    /// Check that `value` is a finite number no less than zero.
    pub fn check_non_negative(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.add(field, "Cannot be negative");
        }
    }

    /// Check that `id` can refer to a stored entity.
    pub fn check_id(&mut self, field: &str, id: i64) {
        if id <= 0 {
            self.add(field, "Must refer to an existing record");
        }
    }

    /// Check that `end` falls strictly after `start`.
    pub fn check_date_order(&mut self, field: &str, start: Date, end: Date) {
        if end <= start {
            self.add(field, format!("Must be after {start}"));
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self
            .errors
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect();

        write!(f, "{}", messages.join(", "))
    }
}
