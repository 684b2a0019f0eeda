// SPDX-License-Identifier: PMPL-1.0-or-later
//! Update expressions.
//!
//! The JSON form maps an operator (`$set`, `$unset`, `$inc`, `$push`,
//! `$pull`) to an object of field -> operand. Operators run in the order they
//! appear, fields within an operator likewise. Applying any update refreshes
//! `_updated` first. `_id` and `_created` are never modified.

use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::document::{now_millis, type_name, Document, CREATED_FIELD, ID_FIELD, UPDATED_FIELD};
use crate::error::{JdbError, JdbResult};
use crate::value::{add_numbers, values_equal};

/// One update operator with its field operands.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Assign each field.
    Set(Vec<(String, Value)>),
    /// Remove each field entirely.
    Unset(Vec<String>),
    /// Add a numeric delta; a missing or non-numeric field counts as zero.
    Inc(Vec<(String, Number)>),
    /// Append to an array field, replacing a missing or non-array value with
    /// a new array.
    Push(Vec<(String, Value)>),
    /// Remove every array element equal to the operand. No-op on non-arrays.
    Pull(Vec<(String, Value)>),
}

/// An ordered sequence of update operators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    /// An update with no operators. Applying it only refreshes `_updated`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(vec![(field.into(), value.into())]));
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(vec![field.into()]));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, delta: impl Into<Number>) -> Self {
        self.ops.push(UpdateOp::Inc(vec![(field.into(), delta.into())]));
        self
    }

    pub fn push(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push(vec![(field.into(), value.into())]));
        self
    }

    pub fn pull(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Pull(vec![(field.into(), value.into())]));
        self
    }

    /// The operators in application order.
    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    /// Parse a JSON update, ignoring operators it does not know.
    pub fn parse(value: &Value) -> JdbResult<Self> {
        Self::parse_with(value, false)
    }

    /// Parse a JSON update, rejecting operators it does not know.
    pub fn parse_strict(value: &Value) -> JdbResult<Self> {
        Self::parse_with(value, true)
    }

    /// Parse with the leniency selected by `strict`.
    pub fn parse_with(value: &Value, strict: bool) -> JdbResult<Self> {
        let operators = value.as_object().ok_or_else(|| {
            JdbError::InvalidUpdate(format!("update must be an object, got {}", type_name(value)))
        })?;

        let mut ops = Vec::with_capacity(operators.len());
        for (operator, operands) in operators {
            let fields = match operands {
                Value::Object(fields) => fields,
                other => {
                    return Err(JdbError::InvalidUpdate(format!(
                        "{operator} expects an object of fields, got {}",
                        type_name(other)
                    )))
                }
            };
            let op = match operator.as_str() {
                "$set" => UpdateOp::Set(pairs(fields)),
                "$unset" => UpdateOp::Unset(fields.keys().cloned().collect()),
                "$inc" => UpdateOp::Inc(numeric_pairs(fields)?),
                "$push" => UpdateOp::Push(pairs(fields)),
                "$pull" => UpdateOp::Pull(pairs(fields)),
                unknown if strict => {
                    return Err(JdbError::InvalidUpdate(format!("unknown operator '{unknown}'")))
                }
                unknown => {
                    warn!(operator = unknown, "Ignoring unknown update operator");
                    continue;
                }
            };
            ops.push(op);
        }
        Ok(Self { ops })
    }

    /// Apply the update to `document` in place.
    pub fn apply(&self, document: &mut Document) {
        let fields = document.fields_mut();
        fields.insert(UPDATED_FIELD.to_string(), Value::from(now_millis()));

        for op in &self.ops {
            match op {
                UpdateOp::Set(pairs) => {
                    for (field, value) in pairs {
                        if writable(field) {
                            fields.insert(field.clone(), value.clone());
                        }
                    }
                }
                UpdateOp::Unset(names) => {
                    for field in names {
                        if writable(field) {
                            fields.shift_remove(field);
                        }
                    }
                }
                UpdateOp::Inc(pairs) => {
                    for (field, delta) in pairs {
                        if writable(field) {
                            let sum = match fields.get(field) {
                                Some(Value::Number(base)) => add_numbers(base, delta),
                                _ => delta.clone(),
                            };
                            fields.insert(field.clone(), Value::Number(sum));
                        }
                    }
                }
                UpdateOp::Push(pairs) => {
                    for (field, value) in pairs {
                        if writable(field) {
                            push_value(fields, field, value.clone());
                        }
                    }
                }
                UpdateOp::Pull(pairs) => {
                    for (field, value) in pairs {
                        if let Some(Value::Array(items)) = fields.get_mut(field) {
                            items.retain(|item| !values_equal(item, value));
                        }
                    }
                }
            }
        }
    }
}

/// Free-function form of [`Update::apply`].
pub fn apply_update(document: &mut Document, update: &Update) {
    update.apply(document);
}

fn writable(field: &str) -> bool {
    let reserved = field == ID_FIELD || field == CREATED_FIELD;
    if reserved {
        warn!(field, "Ignoring update of immutable field");
    }
    !reserved
}

fn push_value(fields: &mut Map<String, Value>, field: &str, value: Value) {
    match fields.get_mut(field) {
        Some(Value::Array(items)) => items.push(value),
        _ => {
            fields.insert(field.to_string(), Value::Array(vec![value]));
        }
    }
}

fn pairs(fields: &Map<String, Value>) -> Vec<(String, Value)> {
    fields
        .iter()
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

fn numeric_pairs(fields: &Map<String, Value>) -> JdbResult<Vec<(String, Number)>> {
    fields
        .iter()
        .map(|(field, value)| match value {
            Value::Number(delta) => Ok((field.clone(), delta.clone())),
            other => Err(JdbError::InvalidUpdate(format!(
                "$inc on '{field}' expects a number, got {}",
                type_name(other)
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    fn applied(update: Value, document: Value) -> Document {
        let mut document = doc(document);
        Update::parse(&update).unwrap().apply(&mut document);
        document
    }

    #[test]
    fn test_set_is_idempotent() {
        let update = Update::parse(&json!({"$set": {"status": "active"}})).unwrap();
        let mut document = doc(json!({"_id": "a", "status": "new"}));
        update.apply(&mut document);
        let once = document.get("status").cloned();
        update.apply(&mut document);
        assert_eq!(document.get("status").cloned(), once);
        assert_eq!(once, Some(json!("active")));
    }

    #[test]
    fn test_inc_is_not_idempotent() {
        let update = Update::new().inc("age", 1);
        let mut document = doc(json!({"_id": "b", "age": 25}));
        update.apply(&mut document);
        assert_eq!(document.get("age"), Some(&json!(26)));
        update.apply(&mut document);
        assert_eq!(document.get("age"), Some(&json!(27)));
    }

    #[test]
    fn test_inc_missing_field_starts_at_zero() {
        let document = applied(json!({"$inc": {"visits": 3}}), json!({"_id": "a"}));
        assert_eq!(document.get("visits"), Some(&json!(3)));

        let document = applied(json!({"$inc": {"score": 0.5}}), json!({"score": 1}));
        assert_eq!(document.get("score"), Some(&json!(1.5)));
    }

    #[test]
    fn test_inc_rejects_non_numeric_delta() {
        let err = Update::parse(&json!({"$inc": {"n": "1"}})).unwrap_err();
        assert!(matches!(err, JdbError::InvalidUpdate(_)));
    }

    #[test]
    fn test_unset_removes_key_and_keeps_order() {
        let document = applied(json!({"$unset": {"b": ""}}), json!({"a": 1, "b": 2, "c": 3}));
        let keys: Vec<&str> = document.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "c", "_updated"]);
    }

    #[test]
    fn test_push_creates_or_replaces_non_array() {
        let document = applied(json!({"$push": {"tags": "x"}}), json!({}));
        assert_eq!(document.get("tags"), Some(&json!(["x"])));

        let document = applied(json!({"$push": {"tags": "y"}}), json!({"tags": ["x"]}));
        assert_eq!(document.get("tags"), Some(&json!(["x", "y"])));

        let document = applied(json!({"$push": {"tags": "y"}}), json!({"tags": "x"}));
        assert_eq!(document.get("tags"), Some(&json!(["y"])));
    }

    #[test]
    fn test_pull_removes_all_equal_elements() {
        let document = applied(json!({"$pull": {"n": 1}}), json!({"n": [1, 2, 1.0, 3]}));
        assert_eq!(document.get("n"), Some(&json!([2, 3])));

        let document = applied(json!({"$pull": {"n": 1}}), json!({"n": 1}));
        assert_eq!(document.get("n"), Some(&json!(1)));
    }

    #[test]
    fn test_operators_apply_in_order() {
        let document = applied(
            json!({"$set": {"n": 10}, "$inc": {"n": 5}, "$unset": {"gone": 1}}),
            json!({"n": 0, "gone": true}),
        );
        assert_eq!(document.get("n"), Some(&json!(15)));
        assert!(document.get("gone").is_none());
    }

    #[test]
    fn test_refreshes_updated_and_protects_reserved_fields() {
        let document = applied(
            json!({"$set": {"_id": "hijack", "_created": 0}}),
            json!({"_id": "a", "_created": 5, "_updated": 5}),
        );
        assert_eq!(document.id(), "a");
        assert_eq!(document.created(), Some(5));
        assert!(document.updated().unwrap() > 5);
    }

    #[test]
    fn test_unknown_operator_leniency() {
        let update = Update::parse(&json!({"$rename": {"a": "b"}})).unwrap();
        assert!(update.ops().is_empty());
        assert!(Update::parse_strict(&json!({"$rename": {"a": "b"}})).is_err());
    }

    #[test]
    fn test_rejects_malformed_shapes() {
        assert!(Update::parse(&json!([])).is_err());
        assert!(Update::parse(&json!({"$set": 1})).is_err());
    }
}
