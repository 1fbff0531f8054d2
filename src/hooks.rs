//! Pluggable lookup hooks and the fallback policy.
//!
//! Hooks are consulted in registration order at fixed pre/post points of
//! the delegation pipeline. A hook either passes (`Continue`), supplies the
//! result (`Found`), or declares a definitive absence (`Absent`) that ends
//! the search as a not-found. A hook error aborts the pipeline.

use std::fmt;
use std::sync::Arc;

use crate::container::{CodeUnit, ResourceRef};
use crate::module::ModuleInfo;

/// Outcome of one hook consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hooked<T> {
    /// The hook has no opinion; the pipeline falls through.
    Continue,
    /// The hook supplies the result; the search terminates.
    Found(T),
    /// The hook declares the name definitively absent.
    Absent,
}

/// Unrecoverable hook condition; propagated verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    pub message: Arc<str>,
}

impl HookError {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        HookError { message: message.into() }
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loader hook fault: {}", self.message)
    }
}

impl std::error::Error for HookError {}

/// A pre/post lookup extension.
///
/// Every method defaults to `Continue`; implementors override only the
/// points they care about.
pub trait LoaderHook: Send + Sync {
    fn pre_find_type(
        &self,
        _name: &str,
        _module: &ModuleInfo,
    ) -> Result<Hooked<CodeUnit>, HookError> {
        Ok(Hooked::Continue)
    }

    fn post_find_type(
        &self,
        _name: &str,
        _module: &ModuleInfo,
    ) -> Result<Hooked<CodeUnit>, HookError> {
        Ok(Hooked::Continue)
    }

    fn pre_find_resource(
        &self,
        _name: &str,
        _module: &ModuleInfo,
    ) -> Result<Hooked<ResourceRef>, HookError> {
        Ok(Hooked::Continue)
    }

    fn post_find_resource(
        &self,
        _name: &str,
        _module: &ModuleInfo,
    ) -> Result<Hooked<ResourceRef>, HookError> {
        Ok(Hooked::Continue)
    }

    fn pre_find_resources(
        &self,
        _name: &str,
        _module: &ModuleInfo,
    ) -> Result<Hooked<Vec<ResourceRef>>, HookError> {
        Ok(Hooked::Continue)
    }

    fn post_find_resources(
        &self,
        _name: &str,
        _module: &ModuleInfo,
    ) -> Result<Hooked<Vec<ResourceRef>>, HookError> {
        Ok(Hooked::Continue)
    }
}

/// Ordered chain of loader hooks.
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn LoaderHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        HookChain::default()
    }

    pub fn register(&mut self, hook: Arc<dyn LoaderHook>) {
        self.hooks.push(hook);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Consult the hooks in order; the first non-`Continue` outcome wins.
    pub(crate) fn consult<T>(
        &self,
        mut call: impl FnMut(&dyn LoaderHook) -> Result<Hooked<T>, HookError>,
    ) -> Result<Hooked<T>, HookError> {
        for hook in &self.hooks {
            match call(hook.as_ref())? {
                Hooked::Continue => continue,
                outcome => return Ok(outcome),
            }
        }
        Ok(Hooked::Continue)
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain").field("len", &self.hooks.len()).finish()
    }
}

/// Secondary resolution strategy, consulted once after the primary pipeline
/// is exhausted.
pub trait FallbackPolicy: Send + Sync {
    fn try_type(&self, _name: &str) -> Option<CodeUnit> {
        None
    }

    fn try_resource(&self, _name: &str) -> Option<ResourceRef> {
        None
    }

    fn try_resources(&self, _name: &str) -> Vec<ResourceRef> {
        Vec::new()
    }
}
