//! Per-module delegation: the ordered search pipeline for a requested name.
//!
//! A `ModuleLoader` owns one module's resolved wiring and answers, for any
//! requested type or resource, which module's code satisfies the request.
//!
//! # Delegation order
//!
//! ```text
//! load_type(name) / find_resource(name)
//!   1. reserved namespace        → root provider, terminal either way
//!   2. boot-delegation list      → root provider, fall through on miss
//!   3. pre hooks                 → first claim terminates
//!   4. static import source      → terminal either way (explicit imports
//!                                  never fall through)
//!   5. required-module source    → keep result, keep searching on miss
//!   6. local code                → only if nothing found yet
//!   7. dynamic import            → only if no required source claimed the
//!                                  namespace; terminal either way
//!   8. post hooks                → only if nothing found yet
//!   9. fallback policy           → only if nothing found yet
//!  10. compatibility root retry  → opt-in
//!  11. definitive not-found
//! ```
//!
//! Loaders are immutable once constructed: replacing a module's wiring
//! installs an entirely new loader with fresh caches.

use log::{debug, trace};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheStats, SourceCache};
use crate::container::{CodeContainer, CodeHandle, CodeUnit, ListOptions, LoadError, ResourceRef};
use crate::hooks::{FallbackPolicy, HookError, Hooked, LoaderHook};
use crate::host::ModuleHost;
use crate::module::{ModuleId, ModuleInfo};
use crate::name::{is_sub_namespace, namespace_to_path, resource_namespace, type_namespace};
use crate::source::NamespaceSource;
use crate::wiring::{Export, ImportWire, Wiring};

/// Caller-facing resolution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Consult the root provider for reserved, boot-delegated, and
    /// compatibility steps.
    pub check_root: bool,
    /// The request originated outside any module's code. Enables the
    /// compatibility root retry for legacy callers; supplied explicitly by
    /// the caller rather than inferred from the call stack.
    pub external_caller: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions { check_root: true, external_caller: false }
    }
}

/// Resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Definitive absence after the full pipeline. An expected outcome, not
    /// a fault.
    NotFound { name: Arc<str> },
    /// The addressed module has no installed loader.
    ModuleUnavailable { module: ModuleId },
    /// Local content exists but is malformed or forbidden.
    LoadFailed { name: Arc<str>, message: Arc<str> },
    /// A hook reported an unrecoverable condition.
    HookFault { name: Arc<str>, message: Arc<str> },
}

impl ResolveError {
    pub(crate) fn not_found(name: &str) -> Self {
        ResolveError::NotFound { name: Arc::from(name) }
    }

    pub(crate) fn from_load(error: LoadError) -> Self {
        ResolveError::LoadFailed { name: error.name, message: error.message }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound { name } => write!(f, "'{name}' not found"),
            ResolveError::ModuleUnavailable { module } => {
                write!(f, "module {module} is not installed")
            }
            ResolveError::LoadFailed { name, message } => {
                write!(f, "failed to load '{name}': {message}")
            }
            ResolveError::HookFault { name, message } => {
                write!(f, "hook fault while resolving '{name}': {message}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// The delegation resolver for one module under one wiring.
pub struct ModuleLoader {
    info: ModuleInfo,
    wiring: Wiring,
    /// Namespaces this module exports; fixed at construction.
    exported: FxHashSet<Arc<str>>,
    /// Substituted exports: imported-and-re-exported namespaces whose
    /// import source is authoritative.
    substituted: FxHashSet<Arc<str>>,
    cache: SourceCache,
    local: CodeHandle,
    fallback: Option<Arc<dyn FallbackPolicy>>,
}

impl ModuleLoader {
    pub(crate) fn new(
        info: ModuleInfo,
        wiring: Wiring,
        container: Arc<dyn CodeContainer>,
        fallback: Option<Arc<dyn FallbackPolicy>>,
    ) -> Self {
        let exported: FxHashSet<Arc<str>> =
            wiring.exports().iter().map(Export::namespace_arc).collect();
        let substituted: FxHashSet<Arc<str>> = wiring.substituted().iter().cloned().collect();
        let cache = SourceCache::new(wiring.dynamic_patterns().iter().map(AsRef::as_ref));
        let local = CodeHandle::new(info.id(), container);
        ModuleLoader { info, wiring, exported, substituted, cache, local, fallback }
    }

    #[inline]
    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    #[inline]
    fn id(&self) -> ModuleId {
        self.info.id()
    }

    #[inline]
    pub fn is_exported(&self, namespace: &str) -> bool {
        self.exported.contains(namespace)
    }

    #[inline]
    pub fn is_substituted(&self, namespace: &str) -> bool {
        self.substituted.contains(namespace)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub(crate) fn close_local(&self) -> bool {
        self.local.close()
    }

    pub(crate) fn add_dynamic_patterns<'a>(&self, patterns: impl IntoIterator<Item = &'a str>) {
        self.cache.add_dynamic_patterns(patterns);
    }

    // ------------------------------------------------------------------
    // Type resolution
    // ------------------------------------------------------------------

    pub(crate) fn load_type(
        &self,
        host: &ModuleHost,
        name: &str,
        options: ResolveOptions,
    ) -> Result<CodeUnit, ResolveError> {
        trace!("loader[{}]: load_type({name})", self.info);
        let namespace = type_namespace(name);

        // 1) reserved namespaces delegate to the root and end the search
        if options.check_root && host.is_reserved(namespace) {
            if let Some(root) = host.root() {
                return root.load_type(name).ok_or_else(|| ResolveError::not_found(name));
            }
        }

        // 2) opt-in boot delegation: try the root, continue on failure
        let mut boot_attempted = false;
        if options.check_root && host.is_boot_delegated(namespace) {
            if let Some(root) = host.root() {
                if let Some(unit) = root.load_type(name) {
                    return Ok(unit);
                }
                boot_attempted = true;
            }
        }

        // 3) pre hooks
        match self.hook_outcome(host, name, |hook| hook.pre_find_type(name, &self.info))? {
            Hooked::Found(unit) => return Ok(unit),
            Hooked::Absent => return Err(ResolveError::not_found(name)),
            Hooked::Continue => {}
        }

        // 4) static import source: an explicitly imported namespace never
        // falls through, success or not
        if let Some(source) = self.imported_source(host, namespace, None) {
            return source.load_type(host, name)?.ok_or_else(|| ResolveError::not_found(name));
        }

        // 5) required-module source: attempt it but keep searching on a miss
        let required = self.required_source_in(host, namespace, None);
        let mut result = None;
        if let Some(source) = &required {
            result = source.load_type(host, name)?;
        }

        // 6) local code
        if result.is_none() {
            result = self.find_local_type(name)?;
        }
        if let Some(unit) = result {
            return Ok(unit);
        }

        // 7) dynamic import; a required source claiming the namespace
        // suppresses speculative rewiring even when it produced nothing
        if required.is_none() {
            if let Some(source) = self.dynamic_source(host, namespace) {
                return source.load_type(host, name)?.ok_or_else(|| ResolveError::not_found(name));
            }
        }

        // 8) post hooks
        match self.hook_outcome(host, name, |hook| hook.post_find_type(name, &self.info))? {
            Hooked::Found(unit) => return Ok(unit),
            Hooked::Absent => return Err(ResolveError::not_found(name)),
            Hooked::Continue => {}
        }

        // 9) fallback policy
        if let Some(fallback) = &self.fallback {
            if let Some(unit) = fallback.try_type(name) {
                return Ok(unit);
            }
        }

        // 10) compatibility root retry, unless boot delegation already tried
        if !boot_attempted
            && ((options.check_root && host.config().compat_root_delegation)
                || options.external_caller)
        {
            if let Some(root) = host.root() {
                if let Some(unit) = root.load_type(name) {
                    return Ok(unit);
                }
            }
        }

        Err(ResolveError::not_found(name))
    }

    /// Load a type from this module's own code only.
    pub(crate) fn find_local_type(&self, name: &str) -> Result<Option<CodeUnit>, ResolveError> {
        let Some(container) = self.local.open() else {
            return Ok(None);
        };
        let found = container.load_local(name).map_err(ResolveError::from_load)?;
        if found.is_some() {
            trace!("loader[{}]: found local type {name}", self.info);
        }
        Ok(found)
    }

    // ------------------------------------------------------------------
    // Resource resolution
    // ------------------------------------------------------------------

    pub(crate) fn find_resource(
        &self,
        host: &ModuleHost,
        name: &str,
        options: ResolveOptions,
    ) -> Result<Option<ResourceRef>, ResolveError> {
        let name = strip_leading_slash(name);
        trace!("loader[{}]: find_resource({name})", self.info);
        let namespace = resource_namespace(name);
        let namespace = namespace.as_str();

        if options.check_root && host.is_reserved(namespace) {
            if let Some(root) = host.root() {
                return Ok(root.find_resource(name));
            }
        }

        let mut boot_attempted = false;
        if options.check_root && host.is_boot_delegated(namespace) {
            if let Some(root) = host.root() {
                if let Some(resource) = root.find_resource(name) {
                    return Ok(Some(resource));
                }
                boot_attempted = true;
            }
        }

        match self.hook_outcome(host, name, |hook| hook.pre_find_resource(name, &self.info))? {
            Hooked::Found(resource) => return Ok(Some(resource)),
            Hooked::Absent => return Ok(None),
            Hooked::Continue => {}
        }

        if let Some(source) = self.imported_source(host, namespace, None) {
            return Ok(source.find_resource(host, name));
        }

        let required = self.required_source_in(host, namespace, None);
        let mut result = None;
        if let Some(source) = &required {
            result = source.find_resource(host, name);
        }

        if result.is_none() {
            result = self.find_local_resource(name);
        }
        if result.is_some() {
            return Ok(result);
        }

        if required.is_none() {
            if let Some(source) = self.dynamic_source(host, namespace) {
                return Ok(source.find_resource(host, name));
            }
        }

        match self.hook_outcome(host, name, |hook| hook.post_find_resource(name, &self.info))? {
            Hooked::Found(resource) => return Ok(Some(resource)),
            Hooked::Absent => return Ok(None),
            Hooked::Continue => {}
        }

        if let Some(fallback) = &self.fallback {
            if let Some(resource) = fallback.try_resource(name) {
                return Ok(Some(resource));
            }
        }

        if !boot_attempted
            && ((options.check_root && host.config().compat_root_delegation)
                || options.external_caller)
        {
            if let Some(root) = host.root() {
                return Ok(root.find_resource(name));
            }
        }

        Ok(None)
    }

    /// Locate a resource in this module's own content only.
    pub(crate) fn find_local_resource(&self, name: &str) -> Option<ResourceRef> {
        self.local.open()?.find_local_resource(name)
    }

    /// Enumerate every copy of a resource, accumulating across imports,
    /// required modules, local content, dynamic rewiring, hooks, and the
    /// fallback policy, de-duplicated in first-seen order.
    pub(crate) fn find_resources(
        &self,
        host: &ModuleHost,
        name: &str,
    ) -> Result<Vec<ResourceRef>, ResolveError> {
        let name = strip_leading_slash(name);
        let namespace = resource_namespace(name);
        let namespace = namespace.as_str();

        match self.hook_outcome(host, name, |hook| hook.pre_find_resources(name, &self.info))? {
            Hooked::Found(resources) => return Ok(resources),
            Hooked::Absent => return Ok(Vec::new()),
            Hooked::Continue => {}
        }

        let mut found: Vec<ResourceRef> = Vec::new();
        if let Some(source) = self.imported_source(host, namespace, None) {
            extend_unique(&mut found, source.find_resources(host, name));
        }

        let required = self.required_source_in(host, namespace, None);
        if let Some(source) = &required {
            extend_unique(&mut found, source.find_resources(host, name));
        }

        if let Some(resource) = self.find_local_resource(name) {
            if !found.contains(&resource) {
                found.push(resource);
            }
        }

        if found.is_empty() && required.is_none() {
            if let Some(source) = self.dynamic_source(host, namespace) {
                return Ok(source.find_resources(host, name));
            }
        }

        if found.is_empty() {
            match self.hook_outcome(host, name, |hook| hook.post_find_resources(name, &self.info))?
            {
                Hooked::Found(resources) => extend_unique(&mut found, resources),
                Hooked::Absent => return Ok(Vec::new()),
                Hooked::Continue => {}
            }
        }

        if let Some(fallback) = &self.fallback {
            extend_unique(&mut found, fallback.try_resources(name));
        }

        Ok(found)
    }

    /// List resource entry names under a path, classifying each reachable
    /// namespace as externally served or locally enumerable.
    pub(crate) fn list_resources(
        &self,
        host: &ModuleHost,
        path: &str,
        pattern: &str,
        options: ListOptions,
    ) -> Vec<Arc<str>> {
        let slashed = if path.ends_with('/') { path.to_string() } else { format!("{path}/") };
        let namespace = resource_namespace(&slashed);
        let namespace = namespace.as_str();
        let path = strip_leading_slash(path);

        // candidate namespaces under the path: imports first
        let mut namespaces: Vec<Arc<str>> = Vec::new();
        for imported in self.imported_namespaces(host) {
            if imported.as_ref() == namespace
                || (options.recurse && is_sub_namespace(namespace, &imported))
            {
                if !namespaces.contains(&imported) {
                    namespaces.push(imported);
                }
            }
        }

        // then everything the require graph makes visible
        let mut visited = FxHashSet::default();
        visited.insert(self.id());
        for edge in self.wiring.requires() {
            if let Some(provider) = host.loader_for(edge.provider()) {
                provider.collect_namespace_names(
                    host,
                    namespace,
                    options.recurse,
                    &mut namespaces,
                    &mut visited,
                );
            }
        }

        let mut imported_namespaces: FxHashSet<Arc<str>> = FxHashSet::default();
        let mut entries: Vec<Arc<str>> = Vec::new();
        for candidate in &namespaces {
            let external = match self.imported_source(host, candidate, None) {
                Some(source) => {
                    imported_namespaces.insert(Arc::clone(candidate));
                    Some(source)
                }
                None => self.required_source_in(host, candidate, None),
            };
            // external content is skipped entirely in a local-only view
            if let (Some(source), false) = (external, options.local_only) {
                let candidate_path = namespace_to_path(candidate);
                for entry in source.list(host, &candidate_path, pattern) {
                    if !entries.contains(&entry) {
                        entries.push(entry);
                    }
                }
            }
        }

        // local content last; imported namespaces are served externally and
        // excluded from the local walk
        if let Some(container) = self.local.open() {
            for entry in container.list_local(path, pattern, options) {
                let entry_namespace = resource_namespace(&entry);
                if !imported_namespaces.contains(entry_namespace.as_str())
                    && !entries.contains(&entry)
                {
                    entries.push(entry);
                }
            }
        }
        entries
    }

    /// List entries from this module's own content only.
    pub(crate) fn list_local(
        &self,
        path: &str,
        pattern: &str,
        options: ListOptions,
    ) -> Vec<Arc<str>> {
        match self.local.open() {
            Some(container) => container.list_local(path, pattern, options),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Source lookup and graph traversal
    // ------------------------------------------------------------------

    /// The statically-imported source for a namespace, populating the
    /// import table on first access. `visited` threads through when the
    /// lookup happens mid-traversal.
    fn imported_source(
        &self,
        host: &ModuleHost,
        name: &str,
        visited: Option<&mut FxHashSet<ModuleId>>,
    ) -> Option<NamespaceSource> {
        self.cache.imported_source(name, || self.build_import_table(host, visited))
    }

    fn imported_namespaces(&self, host: &ModuleHost) -> Vec<Arc<str>> {
        self.cache.imported_namespaces(|| self.build_import_table(host, None))
    }

    fn build_import_table(
        &self,
        host: &ModuleHost,
        visited: Option<&mut FxHashSet<ModuleId>>,
    ) -> Vec<(Arc<str>, NamespaceSource)> {
        let mut visited = visited;
        let mut table = Vec::with_capacity(self.wiring.imports().len());
        for wire in self.wiring.imports() {
            // each wire traverses independently; every traversal must skip
            // this module, whose import lock is held during the walk
            let mut scratch;
            let visited = match visited.as_deref_mut() {
                Some(threaded) => threaded,
                None => {
                    scratch = FxHashSet::default();
                    &mut scratch
                }
            };
            visited.insert(self.id());
            if let Some(source) = self.wire_source(host, wire, Some(visited)) {
                table.push((wire.namespace_arc(), source));
            }
        }
        table
    }

    /// Build the source behind one import wire: whatever the provider's own
    /// require graph supplies for the namespace, followed by the provider's
    /// local export.
    fn wire_source(
        &self,
        host: &ModuleHost,
        wire: &ImportWire,
        visited: Option<&mut FxHashSet<ModuleId>>,
    ) -> Option<NamespaceSource> {
        let provider = host.loader_for(wire.provider())?;
        let export = NamespaceSource::single(wire.namespace_arc(), wire.provider());
        match provider.required_source_in(host, wire.namespace(), visited) {
            Some(required) => {
                Some(NamespaceSource::combine(wire.namespace_arc(), [required, export]))
            }
            None => Some(export),
        }
    }

    /// The aggregate source a namespace gets from this module's required
    /// modules, memoized including negative results.
    fn required_source_in(
        &self,
        host: &ModuleHost,
        name: &str,
        visited: Option<&mut FxHashSet<ModuleId>>,
    ) -> Option<NamespaceSource> {
        if let Some(memo) = self.cache.required(name) {
            return (!memo.is_null()).then_some(memo);
        }
        self.cache.note_required_traversal();

        let mut fresh = FxHashSet::default();
        let visited = visited.unwrap_or(&mut fresh);
        // never recurse back into ourselves
        visited.insert(self.id());

        let mut found: SmallVec<[NamespaceSource; 3]> = SmallVec::new();
        for edge in self.wiring.requires() {
            if let Some(provider) = host.loader_for(edge.provider()) {
                provider.collect_exported_providers(host, name, &mut found, visited);
            }
        }
        let source = if found.is_empty() {
            NamespaceSource::null(name)
        } else {
            NamespaceSource::combine(name, found)
        };
        let stored = self.cache.store_required(source);
        (!stored.is_null()).then_some(stored)
    }

    /// Contribute this module's providers for `namespace` to an aggregate,
    /// upstream require-edges ahead of the local export.
    ///
    /// Recursion into an edge happens only when this module itself provides
    /// the namespace (upstream contributions must order ahead of it) or the
    /// edge is re-exported. Substituted exports resolve through the import
    /// table and never forward to required modules.
    fn collect_exported_providers(
        &self,
        host: &ModuleHost,
        namespace: &str,
        out: &mut SmallVec<[NamespaceSource; 3]>,
        visited: &mut FxHashSet<ModuleId>,
    ) {
        if !visited.insert(self.id()) {
            return;
        }
        let local = self
            .exported
            .contains(namespace)
            .then(|| NamespaceSource::single(namespace, self.id()));
        if local.is_none() && self.substituted.contains(namespace) {
            if let Some(source) = self.imported_source(host, namespace, Some(visited)) {
                out.push(source);
            }
            return;
        }
        for edge in self.wiring.requires() {
            if local.is_some() || edge.reexport() {
                if let Some(provider) = host.loader_for(edge.provider()) {
                    provider.collect_exported_providers(host, namespace, out, visited);
                }
            }
        }
        if let Some(local) = local {
            out.push(local);
        }
    }

    /// The enumeration twin of provider collection: gather all namespace
    /// names visible at or under `namespace` through this module.
    fn collect_namespace_names(
        &self,
        host: &ModuleHost,
        namespace: &str,
        recurse: bool,
        out: &mut Vec<Arc<str>>,
        visited: &mut FxHashSet<ModuleId>,
    ) {
        if !visited.insert(self.id()) {
            return;
        }
        for provided in self.exported.iter().chain(self.substituted.iter()) {
            if provided.as_ref() == namespace || (recurse && is_sub_namespace(namespace, provided))
            {
                if !out.contains(provided) {
                    out.push(Arc::clone(provided));
                }
            }
        }
        for edge in self.wiring.requires() {
            if edge.reexport() {
                if let Some(provider) = host.loader_for(edge.provider()) {
                    provider.collect_namespace_names(host, namespace, recurse, out, visited);
                }
            }
        }
    }

    /// Ask the solver for a live one-shot rewire of `namespace` and cache
    /// the resulting source. Failures are not cached; later requests may
    /// try again.
    fn dynamic_source(&self, host: &ModuleHost, namespace: &str) -> Option<NamespaceSource> {
        if self.exported.contains(namespace) {
            return None;
        }
        if !(host.is_reserved(namespace) || self.cache.dynamic_matches(namespace)) {
            return None;
        }
        match host.solver().resolve_dynamic(namespace, &self.info) {
            Ok(Some(wire)) => {
                let source = self.wire_source(host, &wire, None)?;
                debug!(
                    "loader[{}]: dynamic rewire bound '{namespace}' to {}",
                    self.info,
                    wire.provider()
                );
                self.cache.add_import(source.clone());
                Some(source)
            }
            Ok(None) => None,
            Err(error) => {
                debug!("loader[{}]: no dynamic provider for '{namespace}': {error}", self.info);
                None
            }
        }
    }

    fn hook_outcome<T>(
        &self,
        host: &ModuleHost,
        name: &str,
        call: impl FnMut(&dyn LoaderHook) -> Result<Hooked<T>, HookError>,
    ) -> Result<Hooked<T>, ResolveError> {
        host.hooks().consult(call).map_err(|fault| ResolveError::HookFault {
            name: Arc::from(name),
            message: fault.message,
        })
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("module", &self.info)
            .field("exports", &self.exported.len())
            .field("imports", &self.wiring.imports().len())
            .field("requires", &self.wiring.requires().len())
            .finish()
    }
}

fn strip_leading_slash(name: &str) -> &str {
    if name.len() > 1 && name.starts_with('/') {
        &name[1..]
    } else {
        name
    }
}

fn extend_unique<T: PartialEq>(into: &mut Vec<T>, from: Vec<T>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}
