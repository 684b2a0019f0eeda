// SPDX-License-Identifier: PMPL-1.0-or-later
//! Mutation hooks.
//!
//! Hooks registered on an [`crate::Engine`] observe every successful insert,
//! update and delete on its collections. They run synchronously on the
//! calling task, after the collection lock has been released and before the
//! operation returns.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::document::Document;

/// The kind of mutation being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Insert => "insert",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A completed mutation.
#[derive(Debug, Clone, Serialize)]
pub struct MutationEvent<'a> {
    pub collection: &'a str,
    pub kind: MutationKind,
    /// Inserted documents, documents after update, or removed documents.
    pub documents: &'a [Document],
}

/// Observer of collection mutations.
pub trait MutationHook: Send + Sync {
    fn on_mutation(&self, event: &MutationEvent<'_>);
}

impl<F> MutationHook for F
where
    F: Fn(&MutationEvent<'_>) + Send + Sync,
{
    fn on_mutation(&self, event: &MutationEvent<'_>) {
        self(event)
    }
}

/// Shared, append-only list of hooks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Arc<RwLock<Vec<Arc<dyn MutationHook>>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hook: Arc<dyn MutationHook>) {
        match self.hooks.write() {
            Ok(mut hooks) => hooks.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every hook, in registration order, for one event.
    pub fn dispatch(&self, collection: &str, kind: MutationKind, documents: &[Document]) {
        if documents.is_empty() {
            return;
        }
        let hooks = self.snapshot();
        if hooks.is_empty() {
            return;
        }
        let event = MutationEvent {
            collection,
            kind,
            documents,
        };
        for hook in &hooks {
            hook.on_mutation(&event);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn MutationHook>> {
        match self.hooks.read() {
            Ok(hooks) => hooks.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_dispatch_runs_hooks_in_order() {
        let registry = HookRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            registry.register(Arc::new(move |event: &MutationEvent<'_>| {
                seen.lock()
                    .unwrap()
                    .push(format!("{tag}:{}:{}", event.collection, event.kind));
            }));
        }

        let document: Document = serde_json::from_value(json!({"_id": "a"})).unwrap();
        registry.dispatch("users", MutationKind::Insert, &[document]);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:users:insert", "second:users:insert"]
        );
    }

    #[test]
    fn test_empty_mutation_is_not_reported() {
        let registry = HookRegistry::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        registry.register(Arc::new(move |_: &MutationEvent<'_>| {
            *counter.lock().unwrap() += 1;
        }));

        registry.dispatch("users", MutationKind::Delete, &[]);
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(registry.len(), 1);
    }
}
