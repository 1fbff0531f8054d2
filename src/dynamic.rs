//! Namespace pattern tables for dynamic imports and boot delegation.
//!
//! Three pattern forms: a blanket `*`, exact namespace names, and wildcard
//! stems (`com.acme.*`, stored without the wildcard). Registration is
//! idempotent and a blanket registration discards future specific entries
//! as redundant.

use rustc_hash::FxHashSet;
use std::sync::Arc;

/// A set of namespace patterns.
#[derive(Debug, Default)]
pub struct NamePatterns {
    all: bool,
    names: FxHashSet<Arc<str>>,
    stems: Vec<Arc<str>>,
}

impl NamePatterns {
    pub fn new() -> Self {
        NamePatterns::default()
    }

    /// Build a table from raw pattern strings.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = NamePatterns::new();
        for pattern in patterns {
            table.add(pattern.as_ref());
        }
        table
    }

    /// Register one pattern. Re-adding an already-matched name is a no-op.
    pub fn add(&mut self, pattern: &str) {
        if self.matches(pattern) {
            return;
        }
        if pattern == "*" {
            self.all = true;
            self.names.clear();
            self.stems.clear();
            return;
        }
        if let Some(stem) = pattern.strip_suffix(".*") {
            // store the stem with its trailing separator for prefix checks
            self.stems.push(Arc::from(format!("{stem}.")));
        } else {
            self.names.insert(Arc::from(pattern));
        }
    }

    /// Check eligibility: blanket, then exact names, then stems.
    pub fn matches(&self, namespace: &str) -> bool {
        if self.all {
            return true;
        }
        if self.names.contains(namespace) {
            return true;
        }
        self.stems.iter().any(|stem| namespace.starts_with(stem.as_ref()))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.all && self.names.is_empty() && self.stems.is_empty()
    }
}
