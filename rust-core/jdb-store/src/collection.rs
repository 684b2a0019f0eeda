// SPDX-License-Identifier: PMPL-1.0-or-later
//
// JDB - Collections
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A collection is an ordered array of documents held in memory and mirrored
// to `<root>/<name>.jdb`. Contents are loaded from disk by the first
// operation. Every operation runs under one async mutex, so no two operations
// on the same collection ever interleave their in-memory work.
//
// Mutations return as soon as the in-memory array has changed. Persistence
// happens in a background save task:
//
// - at most one write per collection is in flight;
// - a save requested while a write is in flight sets a `pending` flag, and
//   any number of further requests collapse into that same flag;
// - when the write finishes and the flag is set, exactly one more write is
//   issued, serialising the state as it is *then*, not as it was when the
//   request was made.
//
// Intermediate states may therefore never reach disk, but once the task goes
// idle the file reflects the latest in-memory state. A crash between a
// mutation returning and the covering write completing loses that mutation
// without any error being reported. `flush` waits for the task to go idle.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::document::{now_millis, Document};
use crate::error::{JdbError, JdbResult};
use crate::filter::Filter;
use crate::hooks::{HookRegistry, MutationKind};
use crate::options::FindOptions;
use crate::persist::{ensure_dir, read_json, write_atomic};
use crate::update::Update;

/// File extension of collection files.
pub const COLLECTION_EXTENSION: &str = "jdb";

/// Persistence counters for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Documents currently held in memory.
    pub documents: usize,
    /// Saves requested by mutations.
    pub saves_requested: u64,
    /// Writes that completed successfully.
    pub saves_written: u64,
    /// Writes that failed.
    pub saves_failed: u64,
    /// Requests absorbed by an already-pending save.
    pub saves_coalesced: u64,
}

#[derive(Debug, Clone, Default)]
struct SaveStatus {
    in_flight: bool,
    pending: bool,
    requested: u64,
    written: u64,
    failed: u64,
    coalesced: u64,
    last_error: Option<String>,
}

#[derive(Default)]
struct CollectionState {
    loaded: bool,
    documents: Vec<Document>,
    ids: HashSet<String>,
}

struct CollectionInner {
    name: String,
    dir: PathBuf,
    file: PathBuf,
    in_memory: bool,
    state: Mutex<CollectionState>,
    saves: watch::Sender<SaveStatus>,
    hooks: HookRegistry,
}

/// Handle to a named collection. Clones share the same collection.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Collection {
    pub(crate) fn new(
        name: &str,
        dir: impl Into<PathBuf>,
        in_memory: bool,
        hooks: HookRegistry,
    ) -> Self {
        let dir = dir.into();
        let file = dir.join(format!("{name}.{COLLECTION_EXTENSION}"));
        let (saves, _) = watch::channel(SaveStatus::default());
        Self {
            inner: Arc::new(CollectionInner {
                name: name.to_string(),
                dir,
                file,
                in_memory,
                state: Mutex::new(CollectionState::default()),
                saves,
                hooks,
            }),
        }
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The backing file, or `None` for in-memory collections.
    pub fn file_path(&self) -> Option<&Path> {
        (!self.inner.in_memory).then_some(self.inner.file.as_path())
    }

    /// Insert one document and return it as stored.
    ///
    /// A missing `_id` is generated; `_created` and `_updated` are set to
    /// now. Returns before the change is durable.
    pub async fn insert(&self, document: Value) -> JdbResult<Document> {
        let mut state = self.inner.lock_loaded().await?;
        let document = Document::from_input(document, now_millis())?;
        if state.ids.contains(document.id()) {
            return Err(self.duplicate(document.id()));
        }

        state.ids.insert(document.id().to_string());
        state.documents.push(document.clone());
        self.inner.request_save();
        drop(state);

        debug!(collection = %self.inner.name, id = document.id(), "Inserted document");
        self.inner
            .hooks
            .dispatch(&self.inner.name, MutationKind::Insert, std::slice::from_ref(&document));
        Ok(document)
    }

    /// Insert a batch. All documents share one timestamp. The batch is
    /// rejected as a whole if any `_id` collides with a stored document or
    /// with another member of the batch.
    pub async fn insert_many(&self, documents: Vec<Value>) -> JdbResult<Vec<Document>> {
        let mut state = self.inner.lock_loaded().await?;
        let now = now_millis();

        let mut batch_ids = HashSet::with_capacity(documents.len());
        let mut stored = Vec::with_capacity(documents.len());
        for input in documents {
            let document = Document::from_input(input, now)?;
            if state.ids.contains(document.id()) || !batch_ids.insert(document.id().to_string()) {
                return Err(self.duplicate(document.id()));
            }
            stored.push(document);
        }
        if stored.is_empty() {
            return Ok(stored);
        }

        state.ids.extend(batch_ids);
        state.documents.extend(stored.iter().cloned());
        self.inner.request_save();
        drop(state);

        debug!(collection = %self.inner.name, count = stored.len(), "Inserted documents");
        self.inner
            .hooks
            .dispatch(&self.inner.name, MutationKind::Insert, &stored);
        Ok(stored)
    }

    /// The first document, in insertion order, matching `filter`.
    pub async fn find_one(&self, filter: &Filter) -> JdbResult<Option<Document>> {
        let state = self.inner.lock_loaded().await?;
        Ok(state
            .documents
            .iter()
            .find(|document| filter.matches(document))
            .cloned())
    }

    /// Every document matching `filter`, sorted and paginated by `options`.
    pub async fn find(&self, filter: &Filter, options: &FindOptions) -> JdbResult<Vec<Document>> {
        let state = self.inner.lock_loaded().await?;
        let matched: Vec<Document> = state
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect();
        drop(state);
        Ok(options.apply(matched))
    }

    /// Apply `update` to the first match, or to every match when `multi`.
    /// Returns the number of documents modified; nothing is persisted when
    /// that number is zero.
    pub async fn update(&self, filter: &Filter, update: &Update, multi: bool) -> JdbResult<usize> {
        let mut state = self.inner.lock_loaded().await?;
        let mut modified = Vec::new();
        for document in state.documents.iter_mut() {
            if filter.matches(document) {
                update.apply(document);
                modified.push(document.clone());
                if !multi {
                    break;
                }
            }
        }
        if !modified.is_empty() {
            self.inner.request_save();
        }
        drop(state);

        debug!(collection = %self.inner.name, count = modified.len(), multi, "Updated documents");
        self.inner
            .hooks
            .dispatch(&self.inner.name, MutationKind::Update, &modified);
        Ok(modified.len())
    }

    /// Remove the first match, or every match when `multi`. Returns the
    /// number removed; nothing is persisted when that number is zero.
    pub async fn delete(&self, filter: &Filter, multi: bool) -> JdbResult<usize> {
        let mut state = self.inner.lock_loaded().await?;
        let removed: Vec<Document> = if multi {
            let (removed, kept): (Vec<Document>, Vec<Document>) =
                std::mem::take(&mut state.documents)
                    .into_iter()
                    .partition(|document| filter.matches(document));
            state.documents = kept;
            removed
        } else {
            match state.documents.iter().position(|document| filter.matches(document)) {
                Some(index) => vec![state.documents.remove(index)],
                None => Vec::new(),
            }
        };
        for document in &removed {
            state.ids.remove(document.id());
        }
        if !removed.is_empty() {
            self.inner.request_save();
        }
        drop(state);

        debug!(collection = %self.inner.name, count = removed.len(), multi, "Deleted documents");
        self.inner
            .hooks
            .dispatch(&self.inner.name, MutationKind::Delete, &removed);
        Ok(removed.len())
    }

    /// Number of documents matching `filter`.
    pub async fn count(&self, filter: &Filter) -> JdbResult<usize> {
        let state = self.inner.lock_loaded().await?;
        Ok(state
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .count())
    }

    /// Wait until no save is in flight or pending.
    ///
    /// Returns the error of the most recent write if it failed and no later
    /// write has succeeded since.
    pub async fn flush(&self) -> JdbResult<()> {
        let mut receiver = self.inner.saves.subscribe();
        let last_error = receiver
            .wait_for(|status| !status.in_flight)
            .await
            .map(|status| status.last_error.clone())
            .map_err(|_| self.persist_error("save status channel closed".to_string()))?;
        match last_error {
            Some(message) => Err(self.persist_error(message)),
            None => Ok(()),
        }
    }

    /// Document and persistence counters. Loads the collection if needed.
    pub async fn stats(&self) -> JdbResult<CollectionStats> {
        let documents = self.inner.lock_loaded().await?.documents.len();
        let status = self.inner.saves.borrow().clone();
        Ok(CollectionStats {
            documents,
            saves_requested: status.requested,
            saves_written: status.written,
            saves_failed: status.failed,
            saves_coalesced: status.coalesced,
        })
    }

    /// Whether both handles refer to the same collection instance.
    pub(crate) fn same_handle(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// No save is in flight or pending.
    pub(crate) fn saves_idle(&self) -> bool {
        !self.inner.saves.borrow().in_flight
    }

    fn duplicate(&self, id: &str) -> JdbError {
        JdbError::DuplicateId {
            collection: self.inner.name.clone(),
            id: id.to_string(),
        }
    }

    fn persist_error(&self, message: String) -> JdbError {
        JdbError::Persist {
            collection: self.inner.name.clone(),
            message,
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("file", &self.file_path())
            .finish()
    }
}

impl CollectionInner {
    /// Lock the state, loading it from disk on first use.
    async fn lock_loaded(&self) -> JdbResult<MutexGuard<'_, CollectionState>> {
        let mut state = self.state.lock().await;
        if state.loaded {
            return Ok(state);
        }

        if !self.in_memory {
            ensure_dir(&self.dir).await?;
            let documents: Option<Vec<Document>> = read_json(&self.file).await?;
            state.documents = documents.unwrap_or_default();
        }

        let mut ids = HashSet::with_capacity(state.documents.len());
        for document in &state.documents {
            if !ids.insert(document.id().to_string()) {
                warn!(collection = %self.name, id = document.id(), "Duplicate _id in collection file");
            }
        }
        state.ids = ids;
        state.loaded = true;

        info!(
            collection = %self.name,
            documents = state.documents.len(),
            in_memory = self.in_memory,
            "Loaded collection"
        );
        Ok(state)
    }

    /// Ask for the current state to be written. Never waits.
    fn request_save(self: &Arc<Self>) {
        if self.in_memory {
            return;
        }

        let mut start = false;
        self.saves.send_modify(|status| {
            status.requested += 1;
            if !status.in_flight {
                status.in_flight = true;
                start = true;
            } else if status.pending {
                status.coalesced += 1;
            } else {
                status.pending = true;
            }
        });

        if start {
            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.drain_saves().await });
        }
    }

    /// Body of the save task: write, then write again while requests keep
    /// arriving during the previous write.
    async fn drain_saves(self: Arc<Self>) {
        loop {
            let result = self.write_snapshot().await;
            if let Err(err) = &result {
                error!(collection = %self.name, file = %self.file.display(), error = %err, "Failed to persist collection");
            }

            let mut again = false;
            self.saves.send_modify(|status| {
                match &result {
                    Ok(()) => {
                        status.written += 1;
                        status.last_error = None;
                    }
                    Err(err) => {
                        status.failed += 1;
                        status.last_error = Some(err.to_string());
                    }
                }
                if status.pending {
                    status.pending = false;
                    again = true;
                } else {
                    status.in_flight = false;
                }
            });

            if !again {
                break;
            }
        }
    }

    async fn write_snapshot(&self) -> JdbResult<()> {
        let bytes = {
            let state = self.state.lock().await;
            serde_json::to_vec_pretty(&state.documents)?
        };
        write_atomic(&self.file, &bytes).await?;
        debug!(collection = %self.name, bytes = bytes.len(), "Persisted collection");
        Ok(())
    }
}
