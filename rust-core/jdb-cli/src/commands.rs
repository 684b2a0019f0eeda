// SPDX-License-Identifier: PMPL-1.0-or-later
//! Argument definitions and command execution.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jdb_store::{Engine, Filter, FindOptions, JdbConfig, SortSpec, Update};
use serde_json::{json, Value};
use tracing::debug;

/// Inspect and modify JDB collections.
#[derive(Parser, Debug)]
#[command(name = "jdb", version, about = "Command-line access to a JDB data directory")]
pub struct Cli {
    /// Storage root; overrides JDB_ROOT.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Reject unknown `$` operators instead of ignoring them.
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List collection names.
    Collections,

    /// Print matching documents.
    Find {
        collection: String,
        /// Filter as JSON.
        #[arg(long = "where")]
        filter: Option<String>,
        /// Sort spec as JSON, e.g. '{"age": -1}'.
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        skip: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Insert a document, or every document of a JSON array.
    Insert { collection: String, document: String },

    /// Apply an update to the first match, or all matches with --multi.
    Update {
        collection: String,
        filter: String,
        update: String,
        #[arg(long)]
        multi: bool,
    },

    /// Delete the first match, or all matches with --multi.
    Delete {
        collection: String,
        filter: String,
        #[arg(long)]
        multi: bool,
    },

    /// Count matching documents.
    Count {
        collection: String,
        #[arg(long = "where")]
        filter: Option<String>,
    },
}

impl Cli {
    fn config(&self) -> JdbConfig {
        let mut config = JdbConfig::from_env();
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if self.strict {
            config.strict_operators = true;
        }
        config
    }
}

/// Execute `cli` and return the value to print.
pub async fn run(cli: Cli) -> Result<Value> {
    let engine = Engine::new(cli.config());
    engine.connect().await?;
    let output = execute(&engine, cli.command).await?;
    // mutations are written in the background; wait for them before exit
    engine.flush_all().await?;
    engine.disconnect().await?;
    Ok(output)
}

async fn execute(engine: &Engine, command: Command) -> Result<Value> {
    let strict = engine.config().strict_operators;
    debug!(?command, "Executing");

    match command {
        Command::Collections => Ok(json!(engine.list_collections().await?)),
        Command::Find {
            collection,
            filter,
            sort,
            skip,
            limit,
        } => {
            let filter = parse_filter(filter.as_deref(), strict)?;
            let sort: SortSpec = match sort {
                Some(sort) => serde_json::from_str(&sort).context("invalid --sort")?,
                None => SortSpec::default(),
            };
            let options = FindOptions { sort, skip, limit };
            let documents = engine.collection(&collection)?.find(&filter, &options).await?;
            Ok(serde_json::to_value(documents)?)
        }
        Command::Insert {
            collection,
            document,
        } => {
            let collection = engine.collection(&collection)?;
            match parse_json(&document, "document")? {
                Value::Array(documents) => {
                    let stored = collection.insert_many(documents).await?;
                    Ok(serde_json::to_value(stored)?)
                }
                document => Ok(collection.insert(document).await?.into_value()),
            }
        }
        Command::Update {
            collection,
            filter,
            update,
            multi,
        } => {
            let filter = parse_filter(Some(&filter), strict)?;
            let update = Update::parse_with(&parse_json(&update, "update")?, strict)?;
            let modified = engine
                .collection(&collection)?
                .update(&filter, &update, multi)
                .await?;
            Ok(json!({ "modified": modified }))
        }
        Command::Delete {
            collection,
            filter,
            multi,
        } => {
            let filter = parse_filter(Some(&filter), strict)?;
            let deleted = engine.collection(&collection)?.delete(&filter, multi).await?;
            Ok(json!({ "deleted": deleted }))
        }
        Command::Count { collection, filter } => {
            let filter = parse_filter(filter.as_deref(), strict)?;
            Ok(json!(engine.collection(&collection)?.count(&filter).await?))
        }
    }
}

fn parse_json(text: &str, what: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("invalid {what} JSON"))
}

fn parse_filter(text: Option<&str>, strict: bool) -> Result<Filter> {
    let Some(text) = text else {
        return Ok(Filter::all());
    };
    let value = parse_json(text, "filter")?;
    if !value.is_object() {
        bail!("filter must be a JSON object");
    }
    Ok(Filter::parse_with(&value, strict)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn jdb(dir: &TempDir, args: &[&str]) -> Result<Value> {
        let root = dir.path().to_str().unwrap();
        let mut argv = vec!["jdb", "--root", root];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv)?).await
    }

    #[tokio::test]
    async fn test_insert_then_find_across_invocations() {
        let dir = TempDir::new().unwrap();

        let stored = jdb(&dir, &["insert", "users", r#"{"name": "Alice", "age": 30}"#])
            .await
            .unwrap();
        assert_eq!(stored["name"], json!("Alice"));
        assert!(stored["_id"].is_string());

        jdb(
            &dir,
            &["insert", "users", r#"[{"name": "Bob", "age": 25}, {"name": "Cy", "age": 41}]"#],
        )
        .await
        .unwrap();

        let found = jdb(
            &dir,
            &["find", "users", "--where", r#"{"age": {"$gt": 26}}"#, "--sort", r#"{"age": -1}"#],
        )
        .await
        .unwrap();
        let names: Vec<_> = found.as_array().unwrap().iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, vec![json!("Cy"), json!("Alice")]);

        let count = jdb(&dir, &["count", "users"]).await.unwrap();
        assert_eq!(count, json!(3));
    }

    #[tokio::test]
    async fn test_update_and_delete_multi_flag() {
        let dir = TempDir::new().unwrap();
        jdb(&dir, &["insert", "t", r#"[{"k": 1}, {"k": 1}, {"k": 2}]"#])
            .await
            .unwrap();

        let single = jdb(&dir, &["update", "t", r#"{"k": 1}"#, r#"{"$set": {"hit": true}}"#])
            .await
            .unwrap();
        assert_eq!(single, json!({"modified": 1}));

        let all = jdb(
            &dir,
            &["update", "t", r#"{"k": 1}"#, r#"{"$set": {"hit": true}}"#, "--multi"],
        )
        .await
        .unwrap();
        assert_eq!(all, json!({"modified": 2}));

        let deleted = jdb(&dir, &["delete", "t", r#"{"hit": true}"#, "--multi"])
            .await
            .unwrap();
        assert_eq!(deleted, json!({"deleted": 2}));
        assert_eq!(jdb(&dir, &["count", "t"]).await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_collections_lists_files() {
        let dir = TempDir::new().unwrap();
        jdb(&dir, &["insert", "b", "{}"]).await.unwrap();
        jdb(&dir, &["insert", "a", "{}"]).await.unwrap();

        let names = jdb(&dir, &["collections"]).await.unwrap();
        assert_eq!(names, json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_bad_input_is_reported() {
        let dir = TempDir::new().unwrap();
        assert!(jdb(&dir, &["find", "users", "--where", "{not json"]).await.is_err());
        assert!(jdb(&dir, &["find", "users", "--where", "[1]"]).await.is_err());
        assert!(jdb(&dir, &["count", "users", "--where", r#"{"a": {"$bogus": 1}}"#, "--strict"])
            .await
            .is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
