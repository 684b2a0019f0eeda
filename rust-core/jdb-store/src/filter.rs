// SPDX-License-Identifier: PMPL-1.0-or-later
//! Filter expressions.
//!
//! A filter is parsed once from its JSON form into a [`Filter`] tree and then
//! evaluated against every candidate document. The JSON form is a mapping
//! from field name to either a literal (equality) or an operator object
//! (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$regex`),
//! plus top-level `$or`/`$and` arrays of sub-filters. All clauses of one
//! object must hold; `{}` matches every document.
//!
//! Any JSON object in field position is treated as an operator object, so
//! `{"address": {"city": "Oslo"}}` is an (empty) operator object rather than
//! a nested-document equality. Unknown operators are ignored by
//! [`Filter::parse`] and rejected by [`Filter::parse_strict`].
//!
//! `$regex` patterns use the `regex` crate's syntax, not JavaScript's: there
//! is no lookaround and no backreferences, and such patterns are rejected as
//! [`JdbError::InvalidFilter`] when the filter is parsed.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::document::{type_name, Document};
use crate::error::{JdbError, JdbResult};
use crate::value::{coerce_to_string, compare_for_filter, field_equals};

/// A compiled, case-sensitive regular expression that remembers its source.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source`.
    pub fn new(source: &str) -> JdbResult<Self> {
        let regex = Regex::new(source)
            .map_err(|err| JdbError::InvalidFilter(format!("bad $regex '{source}': {err}")))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A single operator applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Equal to the value (also used for literal clauses).
    Eq(Value),
    /// Not equal to the value. A missing field is not equal to anything.
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// The field value is one of the listed values.
    In(Vec<Value>),
    /// The field value is none of the listed values.
    Nin(Vec<Value>),
    /// The field's string form matches the pattern.
    Regex(Pattern),
}

impl Condition {
    fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Condition::Eq(target) => field_equals(field, target),
            Condition::Ne(target) => !field_equals(field, target),
            Condition::Gt(target) => compare_for_filter(field, target) == Some(Ordering::Greater),
            Condition::Gte(target) => matches!(
                compare_for_filter(field, target),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(target) => compare_for_filter(field, target) == Some(Ordering::Less),
            Condition::Lte(target) => matches!(
                compare_for_filter(field, target),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::In(targets) => targets.iter().any(|target| field_equals(field, target)),
            Condition::Nin(targets) => !targets.iter().any(|target| field_equals(field, target)),
            Condition::Regex(pattern) => pattern.is_match(&coerce_to_string(field)),
        }
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every sub-filter must match. `And(vec![])` matches everything.
    And(Vec<Filter>),
    /// At least one sub-filter must match. `Or(vec![])` matches nothing.
    Or(Vec<Filter>),
    /// One operator against one top-level field.
    Field { field: String, condition: Condition },
}

impl Filter {
    /// The filter that matches every document.
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    /// `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Eq(value.into()))
    }

    /// An arbitrary condition on one field.
    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        Filter::Field {
            field: field.into(),
            condition,
        }
    }

    /// Conjunction of `filters`.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Disjunction of `filters`.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Parse a JSON filter, ignoring operators it does not know.
    pub fn parse(value: &Value) -> JdbResult<Self> {
        Parser { strict: false }.parse_object(value)
    }

    /// Parse a JSON filter, rejecting operators it does not know.
    pub fn parse_strict(value: &Value) -> JdbResult<Self> {
        Parser { strict: true }.parse_object(value)
    }

    /// Parse with the leniency selected by `strict`.
    pub fn parse_with(value: &Value, strict: bool) -> JdbResult<Self> {
        Parser { strict }.parse_object(value)
    }

    /// Evaluate the filter against a document. Short-circuits on the first
    /// failing clause of an `And` and the first passing branch of an `Or`.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(document)),
            Filter::Or(filters) => filters.iter().any(|filter| filter.matches(document)),
            Filter::Field { field, condition } => condition.matches(document.get(field)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::all()
    }
}

/// Free-function form of [`Filter::matches`].
pub fn match_filter(document: &Document, filter: &Filter) -> bool {
    filter.matches(document)
}

struct Parser {
    strict: bool,
}

impl Parser {
    fn parse_object(&self, value: &Value) -> JdbResult<Filter> {
        match value {
            Value::Object(clauses) => self.parse_clauses(clauses),
            Value::Null => Ok(Filter::all()),
            other => Err(JdbError::InvalidFilter(format!(
                "filter must be an object, got {}",
                type_name(other)
            ))),
        }
    }

    fn parse_clauses(&self, clauses: &Map<String, Value>) -> JdbResult<Filter> {
        let mut parsed = Vec::with_capacity(clauses.len());
        for (key, value) in clauses {
            match key.as_str() {
                "$or" => parsed.push(Filter::Or(self.parse_branches(key, value)?)),
                "$and" => parsed.push(Filter::And(self.parse_branches(key, value)?)),
                field => parsed.push(self.parse_field(field, value)?),
            }
        }
        Ok(match parsed.len() {
            1 => parsed.remove(0),
            _ => Filter::And(parsed),
        })
    }

    fn parse_branches(&self, key: &str, value: &Value) -> JdbResult<Vec<Filter>> {
        let branches = value.as_array().ok_or_else(|| {
            JdbError::InvalidFilter(format!("{key} expects an array, got {}", type_name(value)))
        })?;
        branches.iter().map(|branch| self.parse_object(branch)).collect()
    }

    fn parse_field(&self, field: &str, value: &Value) -> JdbResult<Filter> {
        let operators = match value {
            Value::Object(operators) => operators,
            literal => return Ok(Filter::eq(field, literal.clone())),
        };

        let mut conditions = Vec::with_capacity(operators.len());
        for (operator, target) in operators {
            match self.parse_condition(field, operator, target)? {
                Some(condition) => conditions.push(Filter::field(field, condition)),
                None => continue,
            }
        }
        Ok(match conditions.len() {
            1 => conditions.remove(0),
            _ => Filter::And(conditions),
        })
    }

    fn parse_condition(
        &self,
        field: &str,
        operator: &str,
        target: &Value,
    ) -> JdbResult<Option<Condition>> {
        let condition = match operator {
            "$eq" => Condition::Eq(target.clone()),
            "$ne" => Condition::Ne(target.clone()),
            "$gt" => Condition::Gt(target.clone()),
            "$gte" => Condition::Gte(target.clone()),
            "$lt" => Condition::Lt(target.clone()),
            "$lte" => Condition::Lte(target.clone()),
            "$in" => Condition::In(list_operand(field, operator, target)?),
            "$nin" => Condition::Nin(list_operand(field, operator, target)?),
            "$regex" => {
                let source = match target {
                    Value::String(source) => source.clone(),
                    Value::Array(_) | Value::Object(_) => {
                        return Err(JdbError::InvalidFilter(format!(
                            "$regex on '{field}' expects a pattern string, got {}",
                            type_name(target)
                        )))
                    }
                    scalar => coerce_to_string(Some(scalar)),
                };
                Condition::Regex(Pattern::new(&source)?)
            }
            unknown if self.strict => {
                return Err(JdbError::InvalidFilter(format!(
                    "unknown operator '{unknown}' on field '{field}'"
                )))
            }
            unknown => {
                warn!(field, operator = unknown, "Ignoring unknown filter operator");
                return Ok(None);
            }
        };
        Ok(Some(condition))
    }
}

fn list_operand(field: &str, operator: &str, target: &Value) -> JdbResult<Vec<Value>> {
    match target {
        Value::Array(items) => Ok(items.clone()),
        other => Err(JdbError::InvalidFilter(format!(
            "{operator} on '{field}' expects an array, got {}",
            type_name(other)
        ))),
    }
}
