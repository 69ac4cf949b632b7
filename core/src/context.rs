//! Contexts: named, typed payloads commands can be specialized against.
//!
//! A command with a context dependency fans out into one hidden sub-command
//! per matching context plus one dispatching placeholder. The core only sees
//! contexts through the [`Context`] capability; concrete kinds (a database
//! table, a remote endpoint, ...) live with the surrounding application and
//! downcast through `as_any`.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;

/// Capability every context payload must expose.
pub trait Context {
    /// Stable name the context is addressed by (becomes part of generated
    /// command names).
    fn identifier(&self) -> &str;

    /// Context-kind tag, e.g. `"table"`.
    fn kind(&self) -> &str;

    /// Escape hatch for handlers that know the concrete context type.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a context payload.
pub type ContextHandle = Arc<dyn Context>;

/// An ordered, named collection of contexts of one kind.
#[derive(Clone, Default)]
pub struct ContextStore {
    kind: String,
    contexts: IndexMap<String, ContextHandle>,
}

impl ContextStore {
    pub fn new(kind: &str) -> ContextStore {
        ContextStore {
            kind: kind.to_string(),
            contexts: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn insert(&mut self, context: ContextHandle) {
        self.contexts
            .insert(context.identifier().to_string(), context);
    }

    pub fn get(&self, name: &str) -> Option<&ContextHandle> {
        self.contexts.get(name)
    }

    /// Contexts matching an optional allow-list, in insertion order.
    pub fn select(&self, names: Option<&[String]>) -> Vec<(String, ContextHandle)> {
        self.contexts
            .iter()
            .filter(|(name, _)| names.is_none_or(|allowed| allowed.contains(name)))
            .map(|(name, context)| (name.clone(), context.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// All context stores known to the application, keyed by kind.
#[derive(Clone, Default)]
pub struct ContextRegistry {
    stores: IndexMap<String, ContextStore>,
}

impl ContextRegistry {
    pub fn new() -> ContextRegistry {
        ContextRegistry::default()
    }

    pub fn add_store(&mut self, store: ContextStore) {
        self.stores.insert(store.kind().to_string(), store);
    }

    pub fn store(&self, kind: &str) -> Option<&ContextStore> {
        self.stores.get(kind)
    }

    /// Contexts of a kind matching an optional allow-list; an unknown kind
    /// yields no contexts (the command degrades to its plain form).
    pub fn select(&self, kind: &str, names: Option<&[String]>) -> Vec<(String, ContextHandle)> {
        self.stores
            .get(kind)
            .map(|store| store.select(names))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        name: String,
    }

    impl Context for Dummy {
        fn identifier(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> &str {
            "dummy"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registry() -> ContextRegistry {
        let mut store = ContextStore::new("dummy");
        for name in ["user", "team", "task"] {
            store.insert(Arc::new(Dummy { name: name.into() }));
        }
        let mut registry = ContextRegistry::new();
        registry.add_store(store);
        registry
    }

    #[test]
    fn test_select_preserves_insertion_order() {
        let names: Vec<String> = registry()
            .select("dummy", None)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["user", "team", "task"]);
    }

    #[test]
    fn test_select_with_allow_list() {
        let allowed = ["team".to_string()];
        let selected = registry().select("dummy", Some(&allowed));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, "team");
    }

    #[test]
    fn test_unknown_kind_yields_nothing() {
        assert!(registry().select("other", None).is_empty());
    }
}
