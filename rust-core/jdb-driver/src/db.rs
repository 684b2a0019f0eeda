// SPDX-License-Identifier: PMPL-1.0-or-later
//! The `Db` facade: one configured driver behind a small fluent API.

use jdb_store::FindOptions;
use serde_json::Value;

use crate::connector::{connect_driver, DbConfig};
use crate::driver::DbDriver;
use crate::error::DriverResult;
use crate::jdb::first_only;
use crate::query::{FindQuery, SqlQuery, UnifiedQuery};

/// Database handle used by application code.
pub struct Db {
    driver: Box<dyn DbDriver>,
}

impl Db {
    /// Select and build the driver for `config`.
    pub fn new(config: &DbConfig) -> DriverResult<Self> {
        Ok(Self::with_driver(connect_driver(config)?))
    }

    pub fn with_driver(driver: Box<dyn DbDriver>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &dyn DbDriver {
        self.driver.as_ref()
    }

    pub async fn connect(&self) -> DriverResult<()> {
        self.driver.connect().await
    }

    pub async fn disconnect(&self) -> DriverResult<()> {
        self.driver.disconnect().await
    }

    pub async fn query(&self, query: impl Into<UnifiedQuery>) -> DriverResult<Vec<Value>> {
        self.driver.query(query.into()).await
    }

    /// Run SQL text with positional parameters.
    pub async fn raw(&self, sql: &str, params: Vec<Value>) -> DriverResult<Vec<Value>> {
        let query = SqlQuery {
            sql: sql.to_string(),
            params,
        };
        self.driver.query(query.into()).await
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: Option<Value>,
        options: Option<FindOptions>,
    ) -> DriverResult<Vec<Value>> {
        let query = FindQuery {
            find: collection.to_string(),
            filter,
            options,
        };
        self.driver.query(query.into()).await
    }

    /// The first record matching `filter`, if any.
    pub async fn find_one(&self, collection: &str, filter: Value) -> DriverResult<Option<Value>> {
        let query = FindQuery::new(collection)
            .filter(filter)
            .options(first_only(None));
        Ok(self.driver.query(query.into()).await?.into_iter().next())
    }

    pub async fn create(&self, collection: &str, data: Value) -> DriverResult<Value> {
        self.driver.create(collection, data).await
    }

    pub async fn update(&self, collection: &str, filter: Value, update: Value) -> DriverResult<usize> {
        self.driver.update(collection, &filter, &update).await
    }

    pub async fn delete(&self, collection: &str, filter: Value) -> DriverResult<usize> {
        self.driver.delete(collection, &filter).await
    }

    pub async fn count(&self, collection: &str, filter: Value) -> DriverResult<usize> {
        self.driver.count(collection, &filter).await
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").field("driver", &self.driver.name()).finish()
    }
}
