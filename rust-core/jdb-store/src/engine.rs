// SPDX-License-Identifier: PMPL-1.0-or-later
//! The engine: one storage root and the registry of its collections.
//!
//! Construct one `Engine` per configured database at startup and share it
//! (typically behind an `Arc`) with whatever serves requests.

use std::collections::{BTreeSet, HashMap};
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, instrument};

use crate::collection::{Collection, COLLECTION_EXTENSION};
use crate::config::JdbConfig;
use crate::error::{JdbError, JdbResult};
use crate::hooks::{HookRegistry, MutationHook};
use crate::persist::ensure_dir;

/// Owner of all collections under one storage root.
#[derive(Debug)]
pub struct Engine {
    config: JdbConfig,
    collections: RwLock<HashMap<String, Collection>>,
    hooks: HookRegistry,
}

impl Engine {
    pub fn new(config: JdbConfig) -> Self {
        Self {
            config,
            collections: RwLock::new(HashMap::new()),
            hooks: HookRegistry::new(),
        }
    }

    pub fn config(&self) -> &JdbConfig {
        &self.config
    }

    /// Create the storage root if needed. Idempotent. In-memory engines
    /// never touch the filesystem.
    #[instrument(skip(self), fields(root = %self.config.root.display()))]
    pub async fn connect(&self) -> JdbResult<()> {
        if self.config.in_memory {
            debug!("In-memory engine, skipping storage root");
            return Ok(());
        }
        ensure_dir(&self.config.root).await?;
        info!("Connected to storage root");
        Ok(())
    }

    /// Release the engine. Saves still in flight are neither awaited nor
    /// cancelled; call [`Engine::flush_all`] first when durability matters.
    pub async fn disconnect(&self) -> JdbResult<()> {
        debug!(root = %self.config.root.display(), "Disconnected");
        Ok(())
    }

    /// The collection called `name`, created and registered on first use.
    ///
    /// The name becomes the file stem verbatim, so names that would escape
    /// the root or are not valid file names are rejected.
    pub fn collection(&self, name: &str) -> JdbResult<Collection> {
        if let Some(collection) = self.read_registry().get(name) {
            return Ok(collection.clone());
        }
        validate_name(name)?;

        let mut registry = self.write_registry();
        let collection = registry
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(collection = name, "Registered collection");
                Collection::new(
                    name,
                    self.config.root.clone(),
                    self.config.in_memory,
                    self.hooks.clone(),
                )
            })
            .clone();
        Ok(collection)
    }

    /// Forget the in-memory handle for `name` once its pending writes have
    /// landed. The file stays on disk and is reloaded by the next
    /// [`Engine::collection`] call. Returns whether a handle was registered.
    ///
    /// If the final flush fails the handle stays registered and the error is
    /// returned. Clones of the dropped handle must not be used afterwards.
    pub async fn drop_collection(&self, name: &str) -> JdbResult<bool> {
        loop {
            let Some(collection) = self.read_registry().get(name).cloned() else {
                return Ok(false);
            };
            collection.flush().await?;

            let mut registry = self.write_registry();
            let idle = registry
                .get(name)
                .map(|current| current.same_handle(&collection) && collection.saves_idle());
            match idle {
                None => return Ok(false),
                Some(true) => {
                    registry.remove(name);
                    debug!(collection = name, "Dropped collection");
                    return Ok(true);
                }
                // a write started after the flush; wait for it too
                Some(false) => {}
            }
        }
    }

    /// Names of registered collections and of `*.jdb` files under the root,
    /// sorted and deduplicated.
    pub async fn list_collections(&self) -> JdbResult<Vec<String>> {
        let mut names: BTreeSet<String> = self.read_registry().keys().cloned().collect();
        if self.config.in_memory {
            return Ok(names.into_iter().collect());
        }

        let mut entries = match tokio::fs::read_dir(&self.config.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(names.into_iter().collect())
            }
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension() != Some(OsStr::new(COLLECTION_EXTENSION)) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(OsStr::to_str) {
                names.insert(stem.to_string());
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Flush every registered collection, returning the first failure.
    pub async fn flush_all(&self) -> JdbResult<()> {
        let collections: Vec<Collection> = self.read_registry().values().cloned().collect();
        let mut first_error = None;
        for collection in collections {
            if let Err(err) = collection.flush().await {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Observe every mutation on every collection of this engine.
    pub fn register_hook(&self, hook: impl MutationHook + 'static) {
        self.hooks.register(Arc::new(hook));
    }

    fn write_registry(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Collection>> {
        match self.collections.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn read_registry(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Collection>> {
        match self.collections.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Reject names that are empty, are `.`/`..`, or contain path separators
/// or NUL.
pub fn validate_name(name: &str) -> JdbResult<()> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(JdbError::InvalidCollectionName(name.to_string()));
    }
    Ok(())
}
