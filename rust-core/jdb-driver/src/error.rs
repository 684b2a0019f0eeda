// SPDX-License-Identifier: PMPL-1.0-or-later
//! Driver error types.

use jdb_store::JdbError;
use thiserror::Error;

/// Errors surfaced by [`crate::DbDriver`] implementations and the
/// [`crate::Db`] facade.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The driver cannot execute this kind of query or configuration.
    #[error("{0}")]
    Unsupported(String),

    /// The query shape is malformed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The underlying store rejected or failed the operation.
    #[error(transparent)]
    Engine(#[from] JdbError),
}

/// Convenience type alias for driver results.
pub type DriverResult<T> = Result<T, DriverError>;
