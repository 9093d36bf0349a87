//! Request-scoped globals.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// A chained key/value map holding request-lifetime state.
///
/// Each node owns its entries plus an optional parent. Lookups walk the
/// parent chain; writes either stay local ([`set_scoped`](Self::set_scoped))
/// or land on the nearest scope that already holds the key
/// ([`set_global`](Self::set_global)). Subscriptions derive a fresh child per
/// emitted event so event-local state stays isolated while the request
/// globals remain readable.
#[derive(Debug, Default)]
pub struct ScopedMap {
    parent: Option<Arc<ScopedMap>>,
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl ScopedMap {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Derive a child scope whose lookups fall back to `self`.
    pub fn child(self: &Arc<Self>) -> Arc<ScopedMap> {
        Arc::new(ScopedMap {
            parent: Some(Arc::clone(self)),
            entries: Mutex::default(),
        })
    }

    /// Look the key up in this scope, then in each ancestor.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.entries.lock().unwrap().get(key) {
                return Some(value.clone());
            }
            scope = current.parent.as_deref();
        }
        None
    }

    /// Write the key into this scope only, shadowing any ancestor entry.
    pub fn set_scoped(&self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.lock().unwrap().insert(key.into(), value);
    }

    /// Write the key into the nearest scope that already contains it, or
    /// locally if none does.
    pub fn set_global(&self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        let mut scope = Some(self);
        while let Some(current) = scope {
            let mut entries = current.entries.lock().unwrap();
            if entries.contains_key(&key) {
                entries.insert(key, value);
                return;
            }
            drop(entries);
            scope = current.parent.as_deref();
        }
        self.set_scoped(key, value);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let root = ScopedMap::new();
        root.set_scoped("a", json!(1));
        let child = root.child();
        assert_eq!(child.get("a"), Some(json!(1)));
        assert_eq!(child.get("missing"), None);
    }

    #[test]
    fn test_scoped_write_shadows() {
        let root = ScopedMap::new();
        root.set_scoped("a", json!(1));
        let child = root.child();
        child.set_scoped("a", json!(2));
        assert_eq!(child.get("a"), Some(json!(2)));
        assert_eq!(root.get("a"), Some(json!(1)));
    }

    #[test]
    fn test_global_write_updates_owning_scope() {
        let root = ScopedMap::new();
        root.set_scoped("a", json!(1));
        let child = root.child();
        child.set_global("a", json!(2));
        assert_eq!(root.get("a"), Some(json!(2)));

        // A key no scope holds lands locally.
        child.set_global("b", json!(3));
        assert_eq!(root.get("b"), None);
        assert_eq!(child.get("b"), Some(json!(3)));
    }
}
