// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JDB - embedded JSON document store
//
// Named collections of free-form JSON documents, each held in memory and
// mirrored to one `<name>.jdb` file under a storage root. Queries are
// MongoDB-style filter objects; mutations are update-operator objects.
//
// # Modules
//
// - [`persist`] -- directory creation, JSON reads, atomic JSON writes, ids.
// - [`value`] -- equality, ordering and string coercion of JSON values.
// - [`filter`] -- the `Filter` expression tree and its evaluator.
// - [`update`] -- the `Update` operator list and its applier.
// - [`options`] -- sort/skip/limit for `find`.
// - [`collection`] -- in-memory collections with coalesced background saves.
// - [`engine`] -- the collection registry for one storage root.
// - [`hooks`] -- observers of inserts, updates and deletes.
// - [`config`] -- `JdbConfig`, including environment overrides.
// - [`error`] -- `JdbError`.
//
// # Example
//
// ```rust
// use jdb_store::{Engine, Filter, FindOptions, JdbConfig, SortDirection, Update};
// use serde_json::json;
//
// # tokio_test::block_on(async {
// let engine = Engine::new(JdbConfig::in_memory());
// engine.connect().await.unwrap();
//
// let users = engine.collection("users").unwrap();
// users.insert(json!({"name": "Alice", "age": 30})).await.unwrap();
// users.insert(json!({"name": "Bob", "age": 25})).await.unwrap();
//
// let older = Filter::parse(&json!({"age": {"$gt": 26}})).unwrap();
// let found = users.find(&older, &FindOptions::new()).await.unwrap();
// assert_eq!(found[0].get("name"), Some(&json!("Alice")));
//
// let bob = Filter::eq("name", "Bob");
// assert_eq!(users.update(&bob, &Update::new().inc("age", 1), false).await.unwrap(), 1);
//
// let by_age = FindOptions::new().sort_by("age", SortDirection::Descending);
// assert_eq!(users.find(&Filter::all(), &by_age).await.unwrap().len(), 2);
// # });
// ```

pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod options;
pub mod persist;
pub mod update;
pub mod value;

pub use collection::{Collection, CollectionStats, COLLECTION_EXTENSION};
pub use config::JdbConfig;
pub use document::{Document, CREATED_FIELD, ID_FIELD, UPDATED_FIELD};
pub use engine::Engine;
pub use error::{JdbError, JdbResult};
pub use filter::{match_filter, Condition, Filter, Pattern};
pub use hooks::{MutationEvent, MutationHook, MutationKind};
pub use options::{FindOptions, SortDirection, SortSpec};
pub use update::{apply_update, Update, UpdateOp};
