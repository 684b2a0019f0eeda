// SPDX-License-Identifier: PMPL-1.0-or-later
//! [`DbDriver`] adapter over the JDB document store.
//!
//! JDB has no query language, so raw strings and SQL are rejected outright.
//! `update` and `delete` always apply to every match.

use std::sync::Arc;

use async_trait::async_trait;
use jdb_store::{Engine, Filter, FindOptions, JdbConfig, Update};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::connector::DbConfig;
use crate::driver::DbDriver;
use crate::error::{DriverError, DriverResult};
use crate::query::UnifiedQuery;

/// Driver backed by a JDB [`Engine`].
#[derive(Debug, Clone)]
pub struct JdbDriver {
    engine: Arc<Engine>,
}

impl JdbDriver {
    /// Build from a database configuration, using the default JDB settings
    /// (`./data`, on disk) when the `jdb` section is absent.
    pub fn new(config: &DbConfig) -> Self {
        let jdb = config.jdb.clone().unwrap_or_default();
        Self::with_config(jdb)
    }

    pub fn with_config(config: JdbConfig) -> Self {
        Self::from_engine(Arc::new(Engine::new(config)))
    }

    /// Share an existing engine.
    pub fn from_engine(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    fn strict(&self) -> bool {
        self.engine.config().strict_operators
    }

    fn filter(&self, filter: &Value) -> DriverResult<Filter> {
        Ok(Filter::parse_with(filter, self.strict())?)
    }
}

#[async_trait]
impl DbDriver for JdbDriver {
    async fn connect(&self) -> DriverResult<()> {
        Ok(self.engine.connect().await?)
    }

    async fn disconnect(&self) -> DriverResult<()> {
        Ok(self.engine.disconnect().await?)
    }

    #[instrument(skip(self, query))]
    async fn query(&self, query: UnifiedQuery) -> DriverResult<Vec<Value>> {
        let query = match query {
            UnifiedQuery::Find(query) => query,
            UnifiedQuery::Raw(_) => {
                return Err(DriverError::Unsupported(
                    "Raw string queries not supported in JDB directly. Use object syntax."
                        .to_string(),
                ))
            }
            UnifiedQuery::Sql(_) => {
                return Err(DriverError::Unsupported(
                    "SQL queries not supported in JDB driver.".to_string(),
                ))
            }
        };

        let filter = match &query.filter {
            Some(filter) => self.filter(filter)?,
            None => Filter::all(),
        };
        let options = query.options.unwrap_or_default();
        let documents = self
            .engine
            .collection(&query.find)?
            .find(&filter, &options)
            .await?;
        debug!(collection = %query.find, count = documents.len(), "Query");
        Ok(documents.into_iter().map(Value::from).collect())
    }

    async fn create(&self, collection: &str, data: Value) -> DriverResult<Value> {
        let document = self.engine.collection(collection)?.insert(data).await?;
        Ok(document.into_value())
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> DriverResult<usize> {
        let filter = self.filter(filter)?;
        let update = Update::parse_with(update, self.strict())?;
        Ok(self
            .engine
            .collection(collection)?
            .update(&filter, &update, true)
            .await?)
    }

    async fn delete(&self, collection: &str, filter: &Value) -> DriverResult<usize> {
        let filter = self.filter(filter)?;
        Ok(self.engine.collection(collection)?.delete(&filter, true).await?)
    }

    async fn count(&self, collection: &str, filter: &Value) -> DriverResult<usize> {
        let filter = self.filter(filter)?;
        Ok(self.engine.collection(collection)?.count(&filter).await?)
    }

    fn name(&self) -> &str {
        "jdb"
    }
}

/// Options for a single-document lookup: the caller's options with the
/// limit forced to one.
pub(crate) fn first_only(options: Option<FindOptions>) -> FindOptions {
    options.unwrap_or_default().limit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FindQuery, SqlQuery};
    use serde_json::json;

    fn driver() -> JdbDriver {
        JdbDriver::with_config(JdbConfig::in_memory())
    }

    #[tokio::test]
    async fn test_rejects_raw_and_sql() {
        let driver = driver();
        let err = driver.query(UnifiedQuery::from("SELECT 1")).await.unwrap_err();
        assert!(err.to_string().contains("Raw string queries not supported"));

        let err = driver
            .query(SqlQuery { sql: "SELECT 1".into(), params: vec![] }.into())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let driver = driver();
        driver.connect().await.unwrap();

        let alice = driver.create("users", json!({"name": "Alice", "age": 30})).await.unwrap();
        driver.create("users", json!({"name": "Bob", "age": 25})).await.unwrap();
        driver.create("users", json!({"name": "Cy", "age": 25})).await.unwrap();
        assert!(alice["_id"].is_string());

        let found = driver
            .query(FindQuery::new("users").filter(json!({"name": "Alice"})).into())
            .await
            .unwrap();
        assert_eq!(found, vec![alice]);

        // update and delete always apply to all matches
        let modified = driver
            .update("users", &json!({"age": 25}), &json!({"$set": {"junior": true}}))
            .await
            .unwrap();
        assert_eq!(modified, 2);
        assert_eq!(driver.count("users", &json!({"junior": true})).await.unwrap(), 2);

        assert_eq!(driver.delete("users", &json!({"junior": true})).await.unwrap(), 2);
        assert_eq!(driver.count("users", &json!({})).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_strict_operators_follow_engine_config() {
        let driver = JdbDriver::with_config(JdbConfig::in_memory().with_strict_operators(true));
        let err = driver
            .count("users", &json!({"age": {"$exists": true}}))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Engine(_)));

        let lenient = self::driver()
            .count("users", &json!({"age": {"$exists": true}}))
            .await
            .unwrap();
        assert_eq!(lenient, 0);
    }

    #[test]
    fn test_first_only_forces_limit() {
        assert_eq!(first_only(None).limit, Some(1));
        assert_eq!(first_only(Some(FindOptions::new().skip(3))).skip, Some(3));
    }
}
