// SPDX-License-Identifier: PMPL-1.0-or-later
//! JSON value semantics shared by the filter evaluator, the update applier
//! and the sorter.
//!
//! Numbers compare by numeric value regardless of integer/float encoding, so
//! `1` and `1.0` are equal. A missing field is modelled as `None` and never
//! equals anything, not even `null`.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Deep equality with numeric normalisation.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Equality between a possibly-missing document field and a target value.
pub fn field_equals(field: Option<&Value>, target: &Value) -> bool {
    field.is_some_and(|value| values_equal(value, target))
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

/// Ordering used by `$gt`/`$gte`/`$lt`/`$lte`.
///
/// Only number/number, string/string and bool/bool pairs are comparable.
/// Every other pairing (including a missing field) yields `None`, which makes
/// the comparison fail.
pub fn compare_for_filter(field: Option<&Value>, target: &Value) -> Option<Ordering> {
    match (field?, target) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Bool(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Object(_)) => 6,
    }
}

/// Total order used for sorting.
///
/// Values of different types order by type:
/// missing < null < bool < number < string < array < object.
pub fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            compare_numbers(x, y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(xs)), Some(Value::Array(ys))) => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| sort_order(Some(x), Some(y)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        _ => Ordering::Equal,
    }
}

/// String coercion used by `$regex`: the text a JavaScript-style
/// `RegExp.test` would see for the value.
pub fn coerce_to_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => format_number(number),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_to_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn format_number(number: &Number) -> String {
    if !number.is_f64() {
        return number.to_string();
    }
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < 1e21 => format!("{float:.0}"),
        Some(float) => float.to_string(),
        None => number.to_string(),
    }
}

/// Add two JSON numbers, staying integral when both operands are integers
/// and the sum does not overflow.
pub fn add_numbers(base: &Number, delta: &Number) -> Number {
    if let (Some(a), Some(b)) = (base.as_i64(), delta.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Number::from(sum);
        }
    }
    if let (Some(a), Some(b)) = (base.as_u64(), delta.as_u64()) {
        if let Some(sum) = a.checked_add(b) {
            return Number::from(sum);
        }
    }
    let sum = base.as_f64().unwrap_or(0.0) + delta.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).unwrap_or_else(|| Number::from(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_equality_ignores_encoding() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!(1.5)));
        assert!(values_equal(&json!([1, {"a": 2.0}]), &json!([1.0, {"a": 2}])));
    }

    #[test]
    fn test_object_equality_ignores_key_order() {
        assert!(values_equal(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_missing_field_never_equal() {
        assert!(!field_equals(None, &Value::Null));
        assert!(field_equals(Some(&Value::Null), &Value::Null));
    }

    #[test]
    fn test_filter_comparison_requires_same_type() {
        assert_eq!(compare_for_filter(Some(&json!(3)), &json!(2.5)), Some(Ordering::Greater));
        assert_eq!(compare_for_filter(Some(&json!("b")), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_for_filter(Some(&json!("3")), &json!(2)), None);
        assert_eq!(compare_for_filter(None, &json!(2)), None);
    }

    #[test]
    fn test_sort_order_ranks_types() {
        let null = json!(null);
        let number = json!(5);
        let text = json!("x");
        assert_eq!(sort_order(None, Some(&null)), Ordering::Less);
        assert_eq!(sort_order(Some(&number), Some(&text)), Ordering::Less);
        assert_eq!(sort_order(Some(&json!([1, 2])), Some(&json!([1, 3]))), Ordering::Less);
        assert_eq!(sort_order(Some(&json!([1])), Some(&json!([1, 0]))), Ordering::Less);
    }

    #[test]
    fn test_coerce_to_string() {
        assert_eq!(coerce_to_string(None), "undefined");
        assert_eq!(coerce_to_string(Some(&json!(30))), "30");
        assert_eq!(coerce_to_string(Some(&json!(30.0))), "30");
        assert_eq!(coerce_to_string(Some(&json!(1.5))), "1.5");
        assert_eq!(coerce_to_string(Some(&json!(true))), "true");
        assert_eq!(coerce_to_string(Some(&json!(["a", 1, null]))), "a,1,");
        assert_eq!(coerce_to_string(Some(&json!({"k": 1}))), "[object Object]");
    }

    #[test]
    fn test_add_numbers() {
        assert_eq!(add_numbers(&Number::from(25), &Number::from(1)), Number::from(26));
        assert_eq!(
            add_numbers(&Number::from(1), &Number::from_f64(0.5).unwrap()),
            Number::from_f64(1.5).unwrap()
        );
        assert_eq!(
            add_numbers(&Number::from(i64::MAX), &Number::from(1)),
            Number::from(i64::MAX as u64 + 1)
        );
    }
}
