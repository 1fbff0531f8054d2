//! The module host: installed loaders, the root provider, and the public
//! resolution surface.
//!
//! ```text
//!            ┌────────────────────────────────────────────┐
//!            │                 ModuleHost                 │
//!            │  solver ─ hooks ─ root ─ config            │
//!            │  ┌──────────────────────────────────────┐  │
//!            │  │ loaders: ModuleId → Arc<ModuleLoader> │  │
//!            │  └──────────────────────────────────────┘  │
//!            └───────────────┬────────────────────────────┘
//!                            │ load_type / find_resource / ...
//!                            ▼
//!                     delegation pipeline (loader)
//! ```
//!
//! Installing a module asks the solver for its wiring and builds a fresh
//! loader. Re-installing replaces the loader wholesale, so every cached
//! source derived from the old wiring dies with it.

use dashmap::DashMap;
use log::{debug, info};
use std::sync::Arc;

use crate::cache::CacheStats;
use crate::container::{CodeContainer, CodeUnit, ListOptions, ResourceRef};
use crate::dynamic::NamePatterns;
use crate::hooks::{FallbackPolicy, HookChain, LoaderHook};
use crate::loader::{ModuleLoader, ResolveError, ResolveOptions};
use crate::module::{ModuleId, ModuleInfo};
use crate::name::is_sub_namespace;
use crate::solver::{SolveError, Solver};

/// Host content shared with every module: the party of last and, for
/// reserved namespaces, first resort.
pub trait RootProvider: Send + Sync {
    fn load_type(&self, name: &str) -> Option<CodeUnit>;
    fn find_resource(&self, name: &str) -> Option<ResourceRef>;
    fn find_resources(&self, name: &str) -> Vec<ResourceRef>;
}

/// Host-wide delegation policy.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Namespace prefix always served by the root provider. Requests in it
    /// (or any sub-namespace) never reach module code.
    pub reserved_prefix: Arc<str>,
    /// Namespace patterns delegated to the root ahead of the module
    /// pipeline, falling through on a miss. Supports `*` and `ns.*` forms.
    pub boot_delegation: Vec<Arc<str>>,
    /// Compatibility escape hatch: retry the root at the end of every
    /// failed search, as pre-strict-delegation consumers expect.
    pub compat_root_delegation: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            reserved_prefix: Arc::from("host"),
            boot_delegation: Vec::new(),
            compat_root_delegation: false,
        }
    }
}

/// The delegation engine's container of installed modules.
pub struct ModuleHost {
    solver: Arc<dyn Solver>,
    root: Option<Arc<dyn RootProvider>>,
    hooks: HookChain,
    config: HostConfig,
    boot: NamePatterns,
    loaders: DashMap<ModuleId, Arc<ModuleLoader>, rustc_hash::FxBuildHasher>,
}

impl ModuleHost {
    pub fn new(solver: Arc<dyn Solver>) -> Self {
        Self::with_config(solver, HostConfig::default())
    }

    pub fn with_config(solver: Arc<dyn Solver>, config: HostConfig) -> Self {
        let boot = NamePatterns::from_patterns(config.boot_delegation.iter());
        ModuleHost {
            solver,
            root: None,
            hooks: HookChain::new(),
            config,
            boot,
            loaders: DashMap::default(),
        }
    }

    /// Attach the root provider. Builder-style; call before sharing the host.
    pub fn with_root(mut self, root: Arc<dyn RootProvider>) -> Self {
        self.root = Some(root);
        self
    }

    /// Append a hook to the chain. Builder-style; call before sharing the
    /// host. Hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn LoaderHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    #[inline]
    pub(crate) fn solver(&self) -> &dyn Solver {
        self.solver.as_ref()
    }

    #[inline]
    pub(crate) fn root(&self) -> Option<&dyn RootProvider> {
        self.root.as_deref()
    }

    #[inline]
    pub(crate) fn hooks(&self) -> &HookChain {
        &self.hooks
    }

    #[inline]
    pub(crate) fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Whether a namespace belongs to the host-reserved subtree.
    pub fn is_reserved(&self, namespace: &str) -> bool {
        namespace == self.config.reserved_prefix.as_ref()
            || is_sub_namespace(&self.config.reserved_prefix, namespace)
    }

    /// Whether a namespace is on the boot-delegation list.
    pub fn is_boot_delegated(&self, namespace: &str) -> bool {
        self.boot.matches(namespace)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Install a module, asking the solver for its wiring. Re-installing an
    /// already-present module replaces its loader wholesale: all cached
    /// sources die with the old wiring, and the old code handle closes.
    pub fn install(
        &self,
        info: ModuleInfo,
        container: Arc<dyn CodeContainer>,
    ) -> Result<(), SolveError> {
        self.install_with_fallback(info, container, None)
    }

    /// Install with a module-scoped fallback policy consulted after every
    /// other step fails.
    pub fn install_with_fallback(
        &self,
        info: ModuleInfo,
        container: Arc<dyn CodeContainer>,
        fallback: Option<Arc<dyn FallbackPolicy>>,
    ) -> Result<(), SolveError> {
        let wiring = self.solver.wiring(&info)?;
        let id = info.id();
        info!("installing module {info}");
        let loader = Arc::new(ModuleLoader::new(info, wiring, container, fallback));
        if let Some(previous) = self.loaders.insert(id, loader) {
            debug!("module {id}: replaced existing loader");
            previous.close_local();
        }
        Ok(())
    }

    /// Remove a module. Later requests addressed to it fail with
    /// `ModuleUnavailable`; traversals simply skip it.
    pub fn uninstall(&self, module: ModuleId) -> bool {
        match self.loaders.remove(&module) {
            Some((_, loader)) => {
                info!("uninstalling module {}", loader.info());
                loader.close_local();
                true
            }
            None => false,
        }
    }

    /// Widen a module's dynamic-import patterns at runtime.
    pub fn add_dynamic_patterns<'a>(
        &self,
        module: ModuleId,
        patterns: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ResolveError> {
        let loader = self
            .loaders
            .get(&module)
            .ok_or(ResolveError::ModuleUnavailable { module })?;
        loader.add_dynamic_patterns(patterns);
        Ok(())
    }

    pub(crate) fn loader_for(&self, module: ModuleId) -> Option<Arc<ModuleLoader>> {
        self.loaders.get(&module).map(|entry| Arc::clone(entry.value()))
    }

    /// Installed-module metadata, in no particular order.
    pub fn modules(&self) -> Vec<ModuleInfo> {
        self.loaders.iter().map(|entry| entry.value().info().clone()).collect()
    }

    /// Cache counters for one module's loader.
    pub fn cache_stats(&self, module: ModuleId) -> Option<CacheStats> {
        self.loaders.get(&module).map(|entry| entry.value().cache_stats())
    }

    // ------------------------------------------------------------------
    // Resolution entry points
    // ------------------------------------------------------------------

    /// Resolve a type through `module`'s delegation pipeline.
    pub fn load_type(&self, module: ModuleId, name: &str) -> Result<CodeUnit, ResolveError> {
        self.load_type_with(module, name, ResolveOptions::default())
    }

    pub fn load_type_with(
        &self,
        module: ModuleId,
        name: &str,
        options: ResolveOptions,
    ) -> Result<CodeUnit, ResolveError> {
        let loader = self
            .loaders
            .get(&module)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ResolveError::ModuleUnavailable { module })?;
        loader.load_type(self, name, options)
    }

    /// Locate the first visible copy of a resource through `module`'s
    /// pipeline.
    pub fn find_resource(
        &self,
        module: ModuleId,
        name: &str,
    ) -> Result<Option<ResourceRef>, ResolveError> {
        self.find_resource_with(module, name, ResolveOptions::default())
    }

    pub fn find_resource_with(
        &self,
        module: ModuleId,
        name: &str,
        options: ResolveOptions,
    ) -> Result<Option<ResourceRef>, ResolveError> {
        let loader = self
            .loaders
            .get(&module)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ResolveError::ModuleUnavailable { module })?;
        loader.find_resource(self, name, options)
    }

    /// Enumerate every copy of a resource visible through `module`'s own
    /// pipeline, first-seen order, de-duplicated. Never consults the root
    /// provider; see [`ModuleHost::get_resources`] for the compounding
    /// variant.
    pub fn find_resources(
        &self,
        module: ModuleId,
        name: &str,
    ) -> Result<Vec<ResourceRef>, ResolveError> {
        let loader = self
            .loaders
            .get(&module)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ResolveError::ModuleUnavailable { module })?;
        loader.find_resources(self, name)
    }

    /// Enumerate every visible copy of a resource with root delegation:
    /// reserved namespaces come from the root alone, boot-delegated
    /// namespaces prepend the root's copies ahead of the module pipeline.
    pub fn get_resources(
        &self,
        module: ModuleId,
        name: &str,
    ) -> Result<Vec<ResourceRef>, ResolveError> {
        self.get_resources_with(module, name, ResolveOptions::default())
    }

    pub fn get_resources_with(
        &self,
        module: ModuleId,
        name: &str,
        options: ResolveOptions,
    ) -> Result<Vec<ResourceRef>, ResolveError> {
        let loader = self
            .loaders
            .get(&module)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ResolveError::ModuleUnavailable { module })?;

        let stripped = if name.len() > 1 { name.strip_prefix('/').unwrap_or(name) } else { name };
        let namespace = crate::name::resource_namespace(stripped);
        let mut found = Vec::new();
        let mut boot_attempted = false;
        if options.check_root {
            if let Some(root) = self.root() {
                if self.is_reserved(&namespace) {
                    return Ok(root.find_resources(stripped));
                }
                if self.is_boot_delegated(&namespace) {
                    found = root.find_resources(stripped);
                    boot_attempted = true;
                }
            }
        }
        for resource in loader.find_resources(self, stripped)? {
            if !found.contains(&resource) {
                found.push(resource);
            }
        }
        if found.is_empty()
            && !boot_attempted
            && ((options.check_root && self.config.compat_root_delegation)
                || options.external_caller)
        {
            if let Some(root) = self.root() {
                found = root.find_resources(stripped);
            }
        }
        Ok(found)
    }

    /// List resource entry names visible to `module` under `path`.
    pub fn list_resources(
        &self,
        module: ModuleId,
        path: &str,
        pattern: &str,
        options: ListOptions,
    ) -> Result<Vec<Arc<str>>, ResolveError> {
        let loader = self
            .loaders
            .get(&module)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ResolveError::ModuleUnavailable { module })?;
        Ok(loader.list_resources(self, path, pattern, options))
    }
}

impl std::fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("modules", &self.loaders.len())
            .field("reserved_prefix", &self.config.reserved_prefix)
            .field("compat_root_delegation", &self.config.compat_root_delegation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::LoadError;
    use crate::module::Version;
    use crate::wiring::Wiring;

    struct EmptySolver;

    impl Solver for EmptySolver {
        fn wiring(&self, _module: &ModuleInfo) -> Result<Wiring, SolveError> {
            Ok(Wiring::new())
        }

        fn resolve_dynamic(
            &self,
            _namespace: &str,
            _module: &ModuleInfo,
        ) -> Result<Option<crate::wiring::ImportWire>, SolveError> {
            Ok(None)
        }
    }

    struct EmptyContainer;

    impl CodeContainer for EmptyContainer {
        fn load_local(&self, _name: &str) -> Result<Option<CodeUnit>, LoadError> {
            Ok(None)
        }

        fn find_local_resource(&self, _name: &str) -> Option<ResourceRef> {
            None
        }

        fn list_local(&self, _path: &str, _pattern: &str, _options: ListOptions) -> Vec<Arc<str>> {
            Vec::new()
        }
    }

    fn info(id: u64, name: &str) -> ModuleInfo {
        ModuleInfo::new(ModuleId::new(id), name, Version::new(1, 0, 0))
    }

    #[test]
    fn test_reserved_namespace_matching() {
        let host = ModuleHost::new(Arc::new(EmptySolver));
        assert!(host.is_reserved("host"));
        assert!(host.is_reserved("host.intrinsics"));
        assert!(!host.is_reserved("hostile"));
        assert!(!host.is_reserved("app.host"));
    }

    #[test]
    fn test_unknown_module_is_unavailable() {
        let host = ModuleHost::new(Arc::new(EmptySolver));
        let err = host.load_type(ModuleId::new(9), "app.Thing").unwrap_err();
        assert_eq!(err, ResolveError::ModuleUnavailable { module: ModuleId::new(9) });
    }

    #[test]
    fn test_install_and_uninstall() {
        let host = ModuleHost::new(Arc::new(EmptySolver));
        host.install(info(1, "app"), Arc::new(EmptyContainer)).unwrap();
        assert_eq!(host.modules().len(), 1);
        assert!(host.uninstall(ModuleId::new(1)));
        assert!(!host.uninstall(ModuleId::new(1)));
        assert!(host.load_type(ModuleId::new(1), "app.Thing").is_err());
    }

    #[test]
    fn test_reinstall_replaces_loader() {
        let host = ModuleHost::new(Arc::new(EmptySolver));
        host.install(info(1, "app"), Arc::new(EmptyContainer)).unwrap();
        host.install(info(1, "app"), Arc::new(EmptyContainer)).unwrap();
        assert_eq!(host.modules().len(), 1);
    }
}
