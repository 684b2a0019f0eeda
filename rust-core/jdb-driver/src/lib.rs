// SPDX-License-Identifier: PMPL-1.0-or-later
//! JDB Driver
//!
//! A database-agnostic driver contract ([`DbDriver`]) with its unified query
//! shape, the JDB document-store adapter, driver selection from
//! configuration, and the [`Db`] facade application code talks to.

pub mod connector;
pub mod db;
pub mod driver;
pub mod error;
pub mod jdb;
pub mod query;

pub use connector::{connect_driver, DbConfig, DbType};
pub use db::Db;
pub use driver::DbDriver;
pub use error::{DriverError, DriverResult};
pub use jdb::JdbDriver;
pub use query::{FindQuery, SqlQuery, UnifiedQuery};
