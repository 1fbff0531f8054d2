//! Memoization tables for namespace sources.
//!
//! Two independently-locked tables per loader. The import table is
//! populated by exactly one walk over the wiring's static import edges,
//! executed under its lock so concurrent first access stays idempotent; the
//! dynamic-import pattern registry lives under the same lock because both
//! are wiring-derived state. The required table fills lazily, one namespace
//! at a time, and keeps negative entries for the lifetime of the wiring.
//! Its lock is only ever held for lookup and store — require-graph
//! traversal happens outside it.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dynamic::NamePatterns;
use crate::source::NamespaceSource;

/// Snapshot of a loader's cache activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Import-table population walks performed (at most one per wiring).
    pub import_walks: u64,
    /// Require-graph traversals performed (cache misses).
    pub required_traversals: u64,
}

#[derive(Default)]
struct ImportState {
    initialized: bool,
    table: FxHashMap<Arc<str>, NamespaceSource>,
    dynamic: NamePatterns,
}

pub(crate) struct SourceCache {
    imports: Mutex<ImportState>,
    required: Mutex<FxHashMap<Arc<str>, NamespaceSource>>,
    import_walks: AtomicU64,
    required_traversals: AtomicU64,
}

impl SourceCache {
    pub(crate) fn new<'a>(dynamic_patterns: impl IntoIterator<Item = &'a str>) -> Self {
        SourceCache {
            imports: Mutex::new(ImportState {
                initialized: false,
                table: FxHashMap::default(),
                dynamic: NamePatterns::from_patterns(dynamic_patterns),
            }),
            required: Mutex::new(FxHashMap::default()),
            import_walks: AtomicU64::new(0),
            required_traversals: AtomicU64::new(0),
        }
    }

    /// Look up a statically-imported source, populating the table on first
    /// access. `walk` produces the full table contents and runs at most
    /// once, under the import lock.
    pub(crate) fn imported_source(
        &self,
        name: &str,
        walk: impl FnOnce() -> Vec<(Arc<str>, NamespaceSource)>,
    ) -> Option<NamespaceSource> {
        let mut state = self.imports.lock();
        self.ensure_imports(&mut state, walk);
        state.table.get(name).cloned()
    }

    /// All imported namespace names, populating the table on first access.
    pub(crate) fn imported_namespaces(
        &self,
        walk: impl FnOnce() -> Vec<(Arc<str>, NamespaceSource)>,
    ) -> Vec<Arc<str>> {
        let mut state = self.imports.lock();
        self.ensure_imports(&mut state, walk);
        state.table.keys().cloned().collect()
    }

    fn ensure_imports(
        &self,
        state: &mut ImportState,
        walk: impl FnOnce() -> Vec<(Arc<str>, NamespaceSource)>,
    ) {
        if state.initialized {
            return;
        }
        self.import_walks.fetch_add(1, Ordering::Relaxed);
        for (namespace, source) in walk() {
            state.table.insert(namespace, source);
        }
        state.initialized = true;
    }

    /// Record a source produced by a dynamic rewire.
    pub(crate) fn add_import(&self, source: NamespaceSource) {
        let mut state = self.imports.lock();
        state.table.insert(Arc::from(source.namespace()), source);
    }

    /// Dynamic-import eligibility of a namespace against the registry.
    pub(crate) fn dynamic_matches(&self, namespace: &str) -> bool {
        self.imports.lock().dynamic.matches(namespace)
    }

    /// Register additional dynamic-import patterns after construction.
    pub(crate) fn add_dynamic_patterns<'a>(&self, patterns: impl IntoIterator<Item = &'a str>) {
        let mut state = self.imports.lock();
        for pattern in patterns {
            state.dynamic.add(pattern);
        }
    }

    /// Memoized required-module source, including negative entries.
    pub(crate) fn required(&self, name: &str) -> Option<NamespaceSource> {
        self.required.lock().get(name).cloned()
    }

    /// Store a computed required-module source. The first stored entry for
    /// a namespace wins so concurrent computations observe one canonical
    /// source.
    pub(crate) fn store_required(&self, source: NamespaceSource) -> NamespaceSource {
        let mut table = self.required.lock();
        table.entry(Arc::from(source.namespace())).or_insert(source).clone()
    }

    pub(crate) fn note_required_traversal(&self) {
        self.required_traversals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            import_walks: self.import_walks.load(Ordering::Relaxed),
            required_traversals: self.required_traversals.load(Ordering::Relaxed),
        }
    }
}
