//! Deterministic cache keys built from an entity key and query parameters.

use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// The partitions of the cache that a mutation can invalidate.
///
/// The domain of a cache key is the first segment of its entity key, e.g. the
/// key "budgets:summary" belongs to [Domain::Budgets].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Accounts,
    Auth,
    Budgets,
    Goals,
    Reports,
    Transactions,
}

impl Domain {
    /// The entity key segment for the domain.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Accounts => "accounts",
            Domain::Auth => "auth",
            Domain::Budgets => "budgets",
            Domain::Goals => "goals",
            Domain::Reports => "reports",
            Domain::Transactions => "transactions",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "accounts" => Some(Domain::Accounts),
            "auth" => Some(Domain::Auth),
            "budgets" => Some(Domain::Budgets),
            "goals" => Some(Domain::Goals),
            "reports" => Some(Domain::Reports),
            "transactions" => Some(Domain::Transactions),
            _ => None,
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one cached read: an entity key such as "budgets" or
/// "budgets:7:progress" plus the filter and pagination parameters.
///
/// Parameters are kept sorted by name so two parameter objects with the same
/// fields in a different order produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    entity: String,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    /// A key without parameters.
    pub fn new(entity: &str) -> Self {
        Self {
            entity: entity.trim_matches(':').to_owned(),
            params: BTreeMap::new(),
        }
    }

    /// A key for `entity` filtered by `params`.
    ///
    /// `params` must serialize to an object (a struct or map) or to nothing
    /// (`()` or `None`). Null fields are dropped, scalars are stringified and
    /// arrays are joined with commas.
    ///
    /// # Errors
    ///
    /// Returns [Error::Encode] if `params` is not object-like.
    pub fn with_params<P>(entity: &str, params: &P) -> Result<Self, Error>
    where
        P: Serialize + ?Sized,
    {
        let value =
            serde_json::to_value(params).map_err(|error| Error::Encode(error.to_string()))?;

        let object = match value {
            Value::Null => return Ok(Self::new(entity)),
            Value::Object(object) => object,
            other => {
                return Err(Error::Encode(format!(
                    "query parameters must be an object, got {other}"
                )));
            }
        };

        let params = object
            .into_iter()
            .filter_map(|(name, value)| stringify(value).map(|value| (name, value)))
            .collect();

        Ok(Self {
            entity: entity.trim_matches(':').to_owned(),
            params,
        })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// The cache partition the key belongs to, `None` for unknown entities.
    pub fn domain(&self) -> Option<Domain> {
        self.entity.split(':').next().and_then(Domain::from_segment)
    }

    /// The REST path for the key, e.g. "budgets:7:progress" -> "/budgets/7/progress".
    pub fn path(&self) -> String {
        format!("/{}", self.entity.replace(':', "/"))
    }

    /// The parameters as (name, value) pairs in key order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.params.is_empty() {
            return write!(f, "{}", self.entity);
        }

        let query = serde_urlencoded::to_string(&self.params).map_err(|_| std::fmt::Error)?;
        write!(f, "{}?{}", self.entity, query)
    }
}

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(string) => Some(string),
        Value::Bool(boolean) => Some(boolean.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(values) => Some(
            values
                .into_iter()
                .filter_map(stringify)
                .collect::<Vec<_>>()
                .join(","),
        ),
        object @ Value::Object(_) => Some(object.to_string()),
    }
}
