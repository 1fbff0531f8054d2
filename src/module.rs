//! Module identity values.
//!
//! A module is a unit of packaged, versioned code participating in the
//! dependency graph. Identity is carried by a small copyable id; the host
//! maps ids to live loaders.

use std::fmt;
use std::sync::Arc;

/// Unique identity of an installed module.
///
/// Ids are assigned by the surrounding system (installer/solver); the engine
/// only compares them. `ModuleId::ROOT` is reserved for the platform's root
/// provider and never names an installed module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl ModuleId {
    /// Reserved id for the platform/root provider.
    pub const ROOT: ModuleId = ModuleId(0);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        ModuleId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Module version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    #[inline]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Version { major, minor, patch }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Descriptive identity of a module: id, symbolic name, version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    id: ModuleId,
    name: Arc<str>,
    version: Version,
}

impl ModuleInfo {
    pub fn new(id: ModuleId, name: impl Into<Arc<str>>, version: Version) -> Self {
        ModuleInfo { id, name: name.into(), version }
    }

    #[inline]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}{}", self.name, self.version, self.id)
    }
}
