//! Delegation engine for a dynamic module runtime.
//!
//! Every installed module gets a [`ModuleLoader`] that answers, for any
//! requested type or resource, which module's code satisfies the request —
//! following the module's resolved wiring through an ordered search
//! pipeline with lazily built, negative-caching source tables.
//!
//! ```text
//!   caller ──▶ ModuleHost ──▶ ModuleLoader (per module)
//!                                │
//!                  ┌─────────────┼──────────────┐
//!                  ▼             ▼              ▼
//!            import table   require graph   local code
//!            (SourceCache)  (traversal +    (CodeContainer)
//!                            SourceCache)
//!                  │             │              │
//!                  └──────▶ NamespaceSource ◀───┘
//! ```
//!
//! The [`Solver`] decides *what* a module is wired to; this crate decides
//! *where a request goes* given that wiring.

pub mod cache;
pub mod container;
pub mod dynamic;
pub mod hooks;
pub mod host;
pub mod loader;
pub mod module;
pub mod name;
pub mod solver;
pub mod source;
pub mod wiring;

pub use cache::CacheStats;
pub use container::{CodeContainer, CodeUnit, ListOptions, LoadError, ResourceRef};
pub use hooks::{FallbackPolicy, HookError, Hooked, LoaderHook};
pub use host::{HostConfig, ModuleHost, RootProvider};
pub use loader::{ModuleLoader, ResolveError, ResolveOptions};
pub use module::{ModuleId, ModuleInfo, Version};
pub use solver::{ScopePolicy, SolveError, Solver};
pub use source::{NamespaceSource, SingleSource};
pub use wiring::{Export, ImportWire, RequireEdge, Wiring};
