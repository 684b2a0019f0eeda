// SPDX-License-Identifier: PMPL-1.0-or-later
//! Sort/skip/limit options for `find`.

use std::cmp::Ordering;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::error::{JdbError, JdbResult};
use crate::value::sort_order;

/// Sort direction: `1` ascending, `-1` descending in the JSON form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(SortDirection::Ascending),
            -1 => Some(SortDirection::Descending),
            _ => None,
        }
    }

    fn code(self) -> i64 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// An ordered list of sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(pub Vec<(String, SortDirection)>);

impl SortSpec {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare two documents key by key.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        self.0
            .iter()
            .map(|(field, direction)| direction.apply(sort_order(a.get(field), b.get(field))))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, direction) in &self.0 {
            map.serialize_entry(field, &direction.code())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SortVisitor;

        impl<'de> Visitor<'de> for SortVisitor {
            type Value = SortSpec;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an object mapping field names to 1 or -1")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SortSpec, A::Error> {
                let mut keys = Vec::new();
                while let Some((field, code)) = access.next_entry::<String, i64>()? {
                    let direction = SortDirection::from_code(code).ok_or_else(|| {
                        de::Error::custom(format!("sort direction for '{field}' must be 1 or -1"))
                    })?;
                    keys.push((field, direction));
                }
                Ok(SortSpec(keys))
            }
        }

        deserializer.deserialize_map(SortVisitor)
    }
}

/// Options for [`crate::Collection::find`]. Sorting happens first, then
/// `skip`, then `limit`. A `limit` of zero means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    #[serde(skip_serializing_if = "SortSpec::is_empty")]
    pub sort: SortSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sort key.
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.0.push((field.into(), direction));
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parse the JSON form `{"sort": {...}, "skip": n, "limit": n}`.
    /// `null` yields the default options.
    pub fn from_json(value: &Value) -> JdbResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value).map_err(|err| JdbError::InvalidOptions(err.to_string()))
    }

    /// Sort, then paginate, `documents`. The sort is stable.
    pub fn apply(&self, mut documents: Vec<Document>) -> Vec<Document> {
        if !self.sort.is_empty() {
            documents.sort_by(|a, b| self.sort.compare(a, b));
        }
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.filter(|limit| *limit > 0).unwrap_or(usize::MAX);
        documents.into_iter().skip(skip).take(limit).collect()
    }
}
