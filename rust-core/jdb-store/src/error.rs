// SPDX-License-Identifier: PMPL-1.0-or-later
//
// JDB - Error types
//
// Every failure the store can report: filesystem errors from the persistence
// primitives, malformed JSON on disk, rejected filter/update/document shapes,
// and failures of the background save task surfaced through `flush`.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum JdbError {
    /// An I/O error from reading, writing or renaming a collection file.
    /// A missing file on read is not an error; it loads as an empty collection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A collection file (or a value being stored) is not valid JSON.
    /// Corrupted `.jdb` files are not repaired and block the collection from
    /// loading until fixed by hand.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The filter expression could not be parsed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The update expression could not be parsed.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// Find options (sort/skip/limit) could not be parsed.
    #[error("invalid query options: {0}")]
    InvalidOptions(String),

    /// A document handed to `insert` is not a JSON object or carries a
    /// malformed reserved field.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A caller-supplied `_id` already exists in the collection (or appears
    /// twice in one batch).
    #[error("duplicate _id '{id}' in collection '{collection}'")]
    DuplicateId {
        /// The collection the insert targeted.
        collection: String,
        /// The offending identifier.
        id: String,
    },

    /// The collection name cannot be used as a file stem.
    #[error("invalid collection name '{0}'")]
    InvalidCollectionName(String),

    /// A background save failed. Reported by `flush` after the save task
    /// has gone idle.
    #[error("persisting collection '{collection}' failed: {message}")]
    Persist {
        /// The collection whose save failed.
        collection: String,
        /// The underlying error message.
        message: String,
    },
}

/// Convenience type alias for store results.
pub type JdbResult<T> = Result<T, JdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = JdbError::Io(io_err);
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_json_error_from() {
        let parse_err = serde_json::from_str::<serde_json::Value>("[{").unwrap_err();
        let err: JdbError = parse_err.into();
        assert!(matches!(err, JdbError::Json(_)));
        assert!(err.to_string().starts_with("JSON error"));
    }

    #[test]
    fn test_duplicate_id_display() {
        let err = JdbError::DuplicateId {
            collection: "users".to_string(),
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate _id 'abc' in collection 'users'");
    }

    #[test]
    fn test_persist_display() {
        let err = JdbError::Persist {
            collection: "posts".to_string(),
            message: "disk full".to_string(),
        };
        assert!(err.to_string().contains("posts"));
        assert!(err.to_string().contains("disk full"));
    }
}
