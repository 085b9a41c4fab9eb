use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{budget::progress_percent, date_format, validation::ValidationErrors};

pub type GoalId = i64;

/// The longest name a goal may have.
pub const MAX_GOAL_NAME_LENGTH: usize = 100;

/// An amount the user is saving towards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: GoalId,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    #[serde(default, with = "date_format::option_date")]
    pub target_date: Option<Date>,
    #[serde(with = "date_format::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "date_format::timestamp")]
    pub updated_at: OffsetDateTime,
}

impl Goal {
    /// How far the goal is towards its target, clamped to `0..=100`.
    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.current_amount, self.target_amount)
    }

    pub fn is_complete(&self) -> bool {
        self.current_amount >= self.target_amount
    }

    /// The amount still needed, never negative.
    pub fn amount_remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }
}

/// The payload for creating a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default, with = "date_format::option_date")]
    pub target_date: Option<Date>,
}

impl NewGoal {
    /// # Errors
    ///
    /// Returns every field that fails its check.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check_text("name", &self.name, MAX_GOAL_NAME_LENGTH);
        errors.check_positive("targetAmount", self.target_amount);
        errors.check_non_negative("currentAmount", self.current_amount);

        errors.into_result()
    }
}

/// The payload for editing a goal. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_amount: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "date_format::option_date"
    )]
    pub target_date: Option<Date>,
}

impl GoalUpdate {
    /// # Errors
    ///
    /// Returns every present field that fails its check.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = &self.name {
            errors.check_text("name", name, MAX_GOAL_NAME_LENGTH);
        }
        if let Some(target_amount) = self.target_amount {
            errors.check_positive("targetAmount", target_amount);
        }
        if let Some(current_amount) = self.current_amount {
            errors.check_non_negative("currentAmount", current_amount);
        }

        errors.into_result()
    }

    /// Apply the present fields to `goal`.
    pub fn apply(&self, goal: &mut Goal) {
        if let Some(name) = &self.name {
            goal.name = name.trim().to_owned();
        }
        if let Some(target_amount) = self.target_amount {
            goal.target_amount = target_amount;
        }
        if let Some(current_amount) = self.current_amount {
            goal.current_amount = current_amount;
        }
        if self.target_date.is_some() {
            goal.target_date = self.target_date;
        }
    }
}

/// Money put towards a goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub amount: f64,
}

impl Contribution {
    /// # Errors
    ///
    /// Returns an error unless the amount is greater than zero.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_positive("amount", self.amount);
        errors.into_result()
    }
}
