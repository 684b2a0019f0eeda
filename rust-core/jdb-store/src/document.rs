// SPDX-License-Identifier: PMPL-1.0-or-later
//! Stored documents and their reserved fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{JdbError, JdbResult};
use crate::persist::generate_id;

/// Unique identifier field, a string.
pub const ID_FIELD: &str = "_id";
/// Creation timestamp field, epoch milliseconds. Never changes after insert.
pub const CREATED_FIELD: &str = "_created";
/// Last-modification timestamp field, epoch milliseconds.
pub const UPDATED_FIELD: &str = "_updated";

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A free-form JSON object carrying `_id`, `_created` and `_updated`.
///
/// Field order is preserved; the reserved fields come first on documents
/// created by `insert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Build a stored document from caller input.
    ///
    /// A missing, `null` or empty `_id` is replaced with a generated one.
    /// Caller-supplied `_created`/`_updated` values are discarded.
    pub(crate) fn from_input(input: Value, now: i64) -> JdbResult<Self> {
        let fields = match input {
            Value::Object(fields) => fields,
            other => {
                return Err(JdbError::InvalidDocument(format!(
                    "expected a JSON object, got {}",
                    type_name(&other)
                )))
            }
        };

        let id = match fields.get(ID_FIELD) {
            None | Some(Value::Null) => generate_id(),
            Some(Value::String(id)) if id.is_empty() => generate_id(),
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(JdbError::InvalidDocument(format!(
                    "_id must be a string, got {}",
                    type_name(other)
                )))
            }
        };

        let mut stamped = Map::with_capacity(fields.len() + 3);
        stamped.insert(ID_FIELD.to_string(), Value::String(id));
        stamped.insert(CREATED_FIELD.to_string(), Value::from(now));
        stamped.insert(UPDATED_FIELD.to_string(), Value::from(now));
        for (key, value) in fields {
            if !is_reserved(&key) {
                stamped.insert(key, value);
            }
        }
        Ok(Self(stamped))
    }

    /// The document's identifier.
    pub fn id(&self) -> &str {
        self.0.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default()
    }

    /// Creation timestamp in epoch milliseconds.
    pub fn created(&self) -> Option<i64> {
        self.0.get(CREATED_FIELD).and_then(Value::as_i64)
    }

    /// Last-modification timestamp in epoch milliseconds.
    pub fn updated(&self) -> Option<i64> {
        self.0.get(UPDATED_FIELD).and_then(Value::as_i64)
    }

    /// Look up a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// All fields, reserved ones included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Consume the document into a plain JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.into_value()
    }
}

/// Whether `field` is one of the store-managed fields.
pub fn is_reserved(field: &str) -> bool {
    matches!(field, ID_FIELD | CREATED_FIELD | UPDATED_FIELD)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_input_generates_id_and_timestamps() {
        let doc = Document::from_input(json!({"name": "Alice"}), 1_000).unwrap();
        assert!(!doc.id().is_empty());
        assert_eq!(doc.created(), Some(1_000));
        assert_eq!(doc.updated(), Some(1_000));
        assert_eq!(doc.get("name"), Some(&json!("Alice")));

        let keys: Vec<&str> = doc.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "_created", "_updated", "name"]);
    }

    #[test]
    fn test_from_input_keeps_caller_id() {
        let doc = Document::from_input(json!({"_id": "u1", "_created": 5}), 9).unwrap();
        assert_eq!(doc.id(), "u1");
        assert_eq!(doc.created(), Some(9));
    }

    #[test]
    fn test_from_input_replaces_empty_id() {
        let doc = Document::from_input(json!({"_id": ""}), 9).unwrap();
        assert!(!doc.id().is_empty());
    }

    #[test]
    fn test_from_input_rejects_non_object() {
        let err = Document::from_input(json!([1, 2]), 0).unwrap_err();
        assert!(matches!(err, JdbError::InvalidDocument(_)));
    }

    #[test]
    fn test_from_input_rejects_numeric_id() {
        let err = Document::from_input(json!({"_id": 7}), 0).unwrap_err();
        assert!(err.to_string().contains("_id must be a string"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let doc = Document::from_input(json!({"_id": "a", "n": 1}), 2).unwrap();
        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(text, r#"{"_id":"a","_created":2,"_updated":2,"n":1}"#);
        let back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }
}
