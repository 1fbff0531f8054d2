//! Namespace sources: where a namespace's members come from.
//!
//! A source is one of three shapes: a single providing module, an ordered
//! aggregate of single providers, or a cached negative result. Aggregates
//! never nest; [`NamespaceSource::combine`] flattens its inputs and
//! de-duplicates suppliers preserving first-seen order.

use std::sync::Arc;

use crate::container::{CodeUnit, ResourceRef};
use crate::host::ModuleHost;
use crate::loader::ResolveError;
use crate::module::ModuleId;

/// A single providing module for one namespace.
///
/// Resolution through a single source only ever consults the provider
/// module's local code, never its own delegation pipeline; the provider
/// owns the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSource {
    namespace: Arc<str>,
    provider: ModuleId,
}

impl SingleSource {
    pub fn new(namespace: impl Into<Arc<str>>, provider: ModuleId) -> Self {
        SingleSource { namespace: namespace.into(), provider }
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn provider(&self) -> ModuleId {
        self.provider
    }

    fn load_type(&self, host: &ModuleHost, name: &str) -> Result<Option<CodeUnit>, ResolveError> {
        match host.loader_for(self.provider) {
            Some(loader) => loader.find_local_type(name),
            None => Ok(None),
        }
    }

    fn find_resource(&self, host: &ModuleHost, name: &str) -> Option<ResourceRef> {
        host.loader_for(self.provider)?.find_local_resource(name)
    }

    fn list(&self, host: &ModuleHost, path: &str, pattern: &str) -> Vec<Arc<str>> {
        match host.loader_for(self.provider) {
            Some(loader) => loader.list_local(path, pattern, Default::default()),
            None => Vec::new(),
        }
    }
}

/// The place a namespace's members come from.
#[derive(Debug, Clone)]
pub enum NamespaceSource {
    /// Exactly one providing module.
    Single(SingleSource),
    /// An ordered, de-duplicated aggregate of single providers.
    Multi {
        namespace: Arc<str>,
        suppliers: Vec<SingleSource>,
    },
    /// Cached negative result; carries the namespace for diagnostics.
    Null { namespace: Arc<str> },
}

impl NamespaceSource {
    pub fn single(namespace: impl Into<Arc<str>>, provider: ModuleId) -> Self {
        NamespaceSource::Single(SingleSource::new(namespace, provider))
    }

    pub fn null(namespace: impl Into<Arc<str>>) -> Self {
        NamespaceSource::Null { namespace: namespace.into() }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, NamespaceSource::Null { .. })
    }

    pub fn namespace(&self) -> &str {
        match self {
            NamespaceSource::Single(single) => single.namespace(),
            NamespaceSource::Multi { namespace, .. } => namespace,
            NamespaceSource::Null { namespace } => namespace,
        }
    }

    /// The flattened, ordered single providers behind this source.
    pub fn suppliers(&self) -> &[SingleSource] {
        match self {
            NamespaceSource::Single(single) => std::slice::from_ref(single),
            NamespaceSource::Multi { suppliers, .. } => suppliers,
            NamespaceSource::Null { .. } => &[],
        }
    }

    /// Merge sources for one namespace into a flat, de-duplicated source.
    ///
    /// Null inputs contribute nothing. Zero distinct suppliers collapse to
    /// a null source, one distinct supplier to a single, more to a multi.
    pub fn combine(
        namespace: impl Into<Arc<str>>,
        parts: impl IntoIterator<Item = NamespaceSource>,
    ) -> NamespaceSource {
        let namespace = namespace.into();
        let mut suppliers: Vec<SingleSource> = Vec::new();
        for part in parts {
            for single in part.suppliers() {
                if !suppliers.contains(single) {
                    suppliers.push(single.clone());
                }
            }
        }
        if suppliers.len() > 1 {
            return NamespaceSource::Multi { namespace, suppliers };
        }
        match suppliers.pop() {
            Some(single) => NamespaceSource::Single(single),
            None => NamespaceSource::Null { namespace },
        }
    }

    /// Load a type through the suppliers in order; first hit wins.
    pub(crate) fn load_type(
        &self,
        host: &ModuleHost,
        name: &str,
    ) -> Result<Option<CodeUnit>, ResolveError> {
        for supplier in self.suppliers() {
            if let Some(unit) = supplier.load_type(host, name)? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    /// Locate a resource through the suppliers in order; first hit wins.
    pub(crate) fn find_resource(&self, host: &ModuleHost, name: &str) -> Option<ResourceRef> {
        self.suppliers()
            .iter()
            .find_map(|supplier| supplier.find_resource(host, name))
    }

    /// Locate every supplier's copy of a resource, de-duplicated.
    pub(crate) fn find_resources(&self, host: &ModuleHost, name: &str) -> Vec<ResourceRef> {
        let mut found = Vec::new();
        for supplier in self.suppliers() {
            if let Some(resource) = supplier.find_resource(host, name) {
                if !found.contains(&resource) {
                    found.push(resource);
                }
            }
        }
        found
    }

    /// List entries under `path` across the suppliers, de-duplicated.
    pub(crate) fn list(&self, host: &ModuleHost, path: &str, pattern: &str) -> Vec<Arc<str>> {
        let mut entries: Vec<Arc<str>> = Vec::new();
        for supplier in self.suppliers() {
            for entry in supplier.list(host, path, pattern) {
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
        }
        entries
    }
}
