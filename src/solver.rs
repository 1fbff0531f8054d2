//! External collaborator contracts: the dependency solver and the
//! visibility scope policy.
//!
//! The engine never computes wirings itself; it consumes what the solver
//! produced and, for dynamic imports, asks the solver for a one-shot live
//! rewire of a single namespace.

use std::fmt;
use std::sync::Arc;

use crate::module::ModuleInfo;
use crate::wiring::{ImportWire, Wiring};

/// The dependency-graph solver.
pub trait Solver: Send + Sync {
    /// The resolved wiring for a module, fetched at install time.
    fn wiring(&self, module: &ModuleInfo) -> Result<Wiring, SolveError>;

    /// Attempt a live rewire for exactly one namespace on behalf of
    /// `module`. `Ok(None)` and `Err` both mean "no dynamic provider
    /// available right now"; an error is never fatal and is never cached.
    fn resolve_dynamic(
        &self,
        namespace: &str,
        module: &ModuleInfo,
    ) -> Result<Option<ImportWire>, SolveError>;
}

/// Solver failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveError {
    pub message: Arc<str>,
}

impl SolveError {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        SolveError { message: message.into() }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resolution failed: {}", self.message)
    }
}

impl std::error::Error for SolveError {}

/// Visibility scoping for inter-module lookups.
///
/// This is a contract for the surrounding system only; the delegation
/// engine itself never consults it. A scoped system decides with it whether
/// one module's providers are visible to another at all, upstream of
/// namespace resolution.
pub trait ScopePolicy: Send + Sync {
    /// Is `provider` visible to `client`?
    fn is_visible(&self, client: &ModuleInfo, provider: &ModuleInfo) -> bool;

    /// Are the two modules in the same scope?
    fn same_scope(&self, a: &ModuleInfo, b: &ModuleInfo) -> bool;

    /// True when no scopes are defined at all, letting callers skip the
    /// policy entirely.
    fn no_scopes(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleId, Version};

    struct FlatScope;

    impl ScopePolicy for FlatScope {
        fn is_visible(&self, _client: &ModuleInfo, _provider: &ModuleInfo) -> bool {
            true
        }

        fn same_scope(&self, _a: &ModuleInfo, _b: &ModuleInfo) -> bool {
            true
        }

        fn no_scopes(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_flat_scope_policy() {
        let a = ModuleInfo::new(ModuleId::new(1), "a", Version::default());
        let b = ModuleInfo::new(ModuleId::new(2), "b", Version::default());
        let policy = FlatScope;
        assert!(policy.no_scopes());
        assert!(policy.is_visible(&a, &b));
        assert!(policy.same_scope(&a, &b));
    }
}
