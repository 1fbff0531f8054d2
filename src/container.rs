//! Per-module code container: the local class/resource store.
//!
//! The container is an external collaborator; the engine only consults it
//! for *local* content — delegation between modules happens above it. The
//! handle wrapper gives the container the lifecycle the engine needs: lazy
//! first-use open, close-once teardown, clean absence after close.

use log::trace;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::module::ModuleId;

/// A loaded unit of code (a type definition) with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    name: Arc<str>,
    origin: ModuleId,
}

impl CodeUnit {
    pub fn new(name: impl Into<Arc<str>>, origin: ModuleId) -> Self {
        CodeUnit { name: name.into(), origin }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module whose code actually defines this unit.
    #[inline]
    pub fn origin(&self) -> ModuleId {
        self.origin
    }
}

/// A located resource with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    path: Arc<str>,
    origin: ModuleId,
}

impl ResourceRef {
    pub fn new(path: impl Into<Arc<str>>, origin: ModuleId) -> Self {
        ResourceRef { path: path.into(), origin }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn origin(&self) -> ModuleId {
        self.origin
    }
}

/// Options for resource listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Descend into sub-namespaces.
    pub recurse: bool,
    /// Restrict the view to locally enumerable content; content served by
    /// external providers is skipped entirely.
    pub local_only: bool,
}

/// Local content store of one module.
pub trait CodeContainer: Send + Sync {
    /// Load a type defined locally. `Ok(None)` means absent; `Err` means the
    /// content exists but is malformed or forbidden, and must propagate.
    fn load_local(&self, name: &str) -> Result<Option<CodeUnit>, LoadError>;

    /// Locate a local resource by exact name.
    fn find_local_resource(&self, name: &str) -> Option<ResourceRef>;

    /// List local entry names under `path` matching `pattern`.
    fn list_local(&self, path: &str, pattern: &str, options: ListOptions) -> Vec<Arc<str>>;
}

/// Malformed or forbidden local content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub name: Arc<str>,
    pub message: Arc<str>,
}

impl LoadError {
    pub fn new(name: impl Into<Arc<str>>, message: impl Into<Arc<str>>) -> Self {
        LoadError { name: name.into(), message: message.into() }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load '{}': {}", self.name, self.message)
    }
}

impl std::error::Error for LoadError {}

enum HandleState {
    Unopened(Arc<dyn CodeContainer>),
    Open(Arc<dyn CodeContainer>),
    Closed,
}

/// Lifecycle wrapper around a module's code container.
pub(crate) struct CodeHandle {
    module: ModuleId,
    state: Mutex<HandleState>,
}

impl CodeHandle {
    pub(crate) fn new(module: ModuleId, container: Arc<dyn CodeContainer>) -> Self {
        CodeHandle { module, state: Mutex::new(HandleState::Unopened(container)) }
    }

    /// Get the container, opening it on first use. `None` after close.
    pub(crate) fn open(&self) -> Option<Arc<dyn CodeContainer>> {
        let mut state = self.state.lock();
        match &*state {
            HandleState::Open(container) => Some(Arc::clone(container)),
            HandleState::Unopened(container) => {
                let container = Arc::clone(container);
                trace!("module {}: opening local code container", self.module);
                *state = HandleState::Open(Arc::clone(&container));
                Some(container)
            }
            HandleState::Closed => None,
        }
    }

    /// Tear the handle down. Returns true only for the closing call.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(&*state, HandleState::Closed) {
            return false;
        }
        trace!("module {}: closing local code container", self.module);
        *state = HandleState::Closed;
        true
    }
}

impl fmt::Debug for CodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            HandleState::Unopened(_) => "unopened",
            HandleState::Open(_) => "open",
            HandleState::Closed => "closed",
        };
        f.debug_struct("CodeHandle").field("module", &self.module).field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_handle_opens_once_and_closes_once() {
        let handle = CodeHandle::new(ModuleId::new(1), Arc::new(EmptyContainer));
        assert!(handle.open().is_some());
        assert!(handle.open().is_some());
        assert!(handle.close());
        assert!(!handle.close(), "second close is a no-op");
        assert!(handle.open().is_none(), "access after close is a clean absence");
    }

    #[test]
    fn test_close_without_open() {
        let handle = CodeHandle::new(ModuleId::new(2), Arc::new(EmptyContainer));
        assert!(handle.close());
        assert!(handle.open().is_none());
    }
}
