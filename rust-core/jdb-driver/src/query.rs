// SPDX-License-Identifier: PMPL-1.0-or-later
//! The unified query shape shared by every driver.
//!
//! A query is either a structured find (`{"find", "where", "options"}`), an
//! SQL statement (`{"sql", "params"}`), or a raw string. Document-store
//! drivers only accept the first form.

use jdb_store::FindOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DriverError, DriverResult};

/// A structured find against one collection (or table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindQuery {
    /// Collection or table name.
    pub find: String,
    /// Filter object; absent means match everything.
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FindOptions>,
}

impl FindQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            find: collection.into(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn options(mut self, options: FindOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// An SQL statement with positional parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
}

/// Any query a driver may be handed.
#[derive(Debug, Clone, PartialEq)]
pub enum UnifiedQuery {
    Find(FindQuery),
    Sql(SqlQuery),
    Raw(String),
}

impl UnifiedQuery {
    /// Classify a JSON query: a string is raw, an object with an `sql` key
    /// is SQL, any other object is a find.
    pub fn from_json(value: Value) -> DriverResult<Self> {
        let is_sql = match &value {
            Value::String(raw) => return Ok(UnifiedQuery::Raw(raw.clone())),
            Value::Object(fields) => fields.contains_key("sql"),
            other => {
                return Err(DriverError::InvalidQuery(format!(
                    "expected a string or an object, got {other}"
                )))
            }
        };
        let parsed = if is_sql {
            serde_json::from_value(value).map(UnifiedQuery::Sql)
        } else {
            serde_json::from_value(value).map(UnifiedQuery::Find)
        };
        parsed.map_err(|err| DriverError::InvalidQuery(err.to_string()))
    }
}

impl From<FindQuery> for UnifiedQuery {
    fn from(query: FindQuery) -> Self {
        UnifiedQuery::Find(query)
    }
}

impl From<SqlQuery> for UnifiedQuery {
    fn from(query: SqlQuery) -> Self {
        UnifiedQuery::Sql(query)
    }
}

impl From<&str> for UnifiedQuery {
    fn from(raw: &str) -> Self {
        UnifiedQuery::Raw(raw.to_string())
    }
}

impl From<String> for UnifiedQuery {
    fn from(raw: String) -> Self {
        UnifiedQuery::Raw(raw)
    }
}
