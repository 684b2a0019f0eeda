// SPDX-License-Identifier: PMPL-1.0-or-later
//! The driver contract every database backend implements.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DriverResult;
use crate::query::UnifiedQuery;

/// Engine-agnostic database driver.
///
/// Rows and documents cross this boundary as plain JSON so callers need not
/// know which backend is configured.
#[async_trait]
pub trait DbDriver: Send + Sync {
    async fn connect(&self) -> DriverResult<()>;

    async fn disconnect(&self) -> DriverResult<()>;

    /// Run a query and return the matching rows or documents.
    async fn query(&self, query: UnifiedQuery) -> DriverResult<Vec<Value>>;

    /// Insert one record and return it as stored.
    async fn create(&self, collection: &str, data: Value) -> DriverResult<Value>;

    /// Apply `update` to every record matching `filter`; returns the count.
    async fn update(&self, collection: &str, filter: &Value, update: &Value)
        -> DriverResult<usize>;

    /// Delete every record matching `filter`; returns the count.
    async fn delete(&self, collection: &str, filter: &Value) -> DriverResult<usize>;

    /// Count records matching `filter`.
    async fn count(&self, collection: &str, filter: &Value) -> DriverResult<usize>;

    /// A short backend name for logs.
    fn name(&self) -> &str;
}
