// SPDX-License-Identifier: PMPL-1.0-or-later
//! Driver selection from configuration.

use std::fmt;

use jdb_store::JdbConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::driver::DbDriver;
use crate::error::{DriverError, DriverResult};
use crate::jdb::JdbDriver;

/// Supported database kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Jdb,
    Sqlite,
    Mysql,
    Postgres,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DbType::Jdb => "jdb",
            DbType::Sqlite => "sqlite",
            DbType::Mysql => "mysql",
            DbType::Postgres => "postgres",
        };
        f.write_str(name)
    }
}

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(rename = "type")]
    pub db_type: DbType,
    /// Connection string for SQL backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Settings for the JDB backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jdb: Option<JdbConfig>,
}

impl DbConfig {
    /// A JDB configuration.
    pub fn jdb(config: JdbConfig) -> Self {
        Self {
            db_type: DbType::Jdb,
            connection: None,
            jdb: Some(config),
        }
    }
}

/// Build the driver for `config.db_type`.
///
/// Only JDB ships with this crate; SQL kinds are rejected.
pub fn connect_driver(config: &DbConfig) -> DriverResult<Box<dyn DbDriver>> {
    match config.db_type {
        DbType::Jdb => {
            let driver = JdbDriver::new(config);
            info!(root = %driver.engine().config().root.display(), "Using JDB driver");
            Ok(Box::new(driver))
        }
        other => Err(DriverError::Unsupported(format!(
            "Unsupported DB type: {other}"
        ))),
    }
}
