//! Resolved wiring snapshot for one module.
//!
//! A wiring is produced by the external solver and consumed read-only by the
//! delegation engine. It is never mutated in place: re-resolving a module
//! replaces the wiring wholesale (and with it the module's loader and
//! caches).

use std::sync::Arc;

use crate::module::{ModuleId, Version};

/// A namespace this module declares it provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    namespace: Arc<str>,
    version: Option<Version>,
}

impl Export {
    pub fn new(namespace: impl Into<Arc<str>>, version: Option<Version>) -> Self {
        Export { namespace: namespace.into(), version }
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub(crate) fn namespace_arc(&self) -> Arc<str> {
        Arc::clone(&self.namespace)
    }
}

/// A statically resolved import edge: one namespace, one provider module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWire {
    namespace: Arc<str>,
    provider: ModuleId,
}

impl ImportWire {
    pub fn new(namespace: impl Into<Arc<str>>, provider: ModuleId) -> Self {
        ImportWire { namespace: namespace.into(), provider }
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn provider(&self) -> ModuleId {
        self.provider
    }

    pub(crate) fn namespace_arc(&self) -> Arc<str> {
        Arc::clone(&self.namespace)
    }
}

/// A whole-module dependency edge, optionally re-exported to dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequireEdge {
    provider: ModuleId,
    reexport: bool,
}

impl RequireEdge {
    pub fn new(provider: ModuleId, reexport: bool) -> Self {
        RequireEdge { provider, reexport }
    }

    #[inline]
    pub fn provider(&self) -> ModuleId {
        self.provider
    }

    #[inline]
    pub fn reexport(&self) -> bool {
        self.reexport
    }
}

/// Read-only snapshot of a module's resolved edges.
#[derive(Debug, Clone, Default)]
pub struct Wiring {
    exports: Vec<Export>,
    substituted: Vec<Arc<str>>,
    imports: Vec<ImportWire>,
    requires: Vec<RequireEdge>,
    dynamic_patterns: Vec<Arc<str>>,
}

impl Wiring {
    pub fn new() -> Self {
        Wiring::default()
    }

    /// Declare an exported namespace.
    pub fn with_export(mut self, namespace: impl Into<Arc<str>>) -> Self {
        self.exports.push(Export::new(namespace, None));
        self
    }

    /// Declare an exported namespace at a specific version.
    pub fn with_export_at(mut self, namespace: impl Into<Arc<str>>, version: Version) -> Self {
        self.exports.push(Export::new(namespace, Some(version)));
        self
    }

    /// Mark a namespace as a substituted export: simultaneously imported and
    /// re-exported, with the import's source authoritative.
    pub fn with_substituted(mut self, namespace: impl Into<Arc<str>>) -> Self {
        self.substituted.push(namespace.into());
        self
    }

    /// Add a resolved static import edge.
    pub fn with_import(mut self, namespace: impl Into<Arc<str>>, provider: ModuleId) -> Self {
        self.imports.push(ImportWire::new(namespace, provider));
        self
    }

    /// Add a require-edge to another module.
    pub fn with_require(mut self, provider: ModuleId, reexport: bool) -> Self {
        self.requires.push(RequireEdge::new(provider, reexport));
        self
    }

    /// Add a dynamic-import pattern: exact name, `stem.*`, or `*`.
    pub fn with_dynamic(mut self, pattern: impl Into<Arc<str>>) -> Self {
        self.dynamic_patterns.push(pattern.into());
        self
    }

    #[inline]
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    #[inline]
    pub fn substituted(&self) -> &[Arc<str>] {
        &self.substituted
    }

    #[inline]
    pub fn imports(&self) -> &[ImportWire] {
        &self.imports
    }

    #[inline]
    pub fn requires(&self) -> &[RequireEdge] {
        &self.requires
    }

    #[inline]
    pub fn dynamic_patterns(&self) -> &[Arc<str>] {
        &self.dynamic_patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiring_snapshot() {
        let provider = ModuleId::new(9);
        let wiring = Wiring::new()
            .with_export("pkg.a")
            .with_export_at("pkg.b", Version::new(1, 2, 0))
            .with_substituted("pkg.c")
            .with_import("pkg.c", provider)
            .with_require(provider, true)
            .with_dynamic("com.acme.*");

        assert_eq!(wiring.exports().len(), 2);
        assert_eq!(wiring.exports()[1].version(), Some(Version::new(1, 2, 0)));
        assert_eq!(wiring.substituted(), &["pkg.c".into()]);
        assert_eq!(wiring.imports()[0].provider(), provider);
        assert!(wiring.requires()[0].reexport());
        assert_eq!(wiring.dynamic_patterns().len(), 1);
    }
}
