// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module cache for require()
//!
//! [`CjsCache`] holds the modules loaded through `require()`.
//! [`DualStoreCache`] is the `require.cache` object user code sees: it
//! merges that cache with the ES module registry, so modules reached only
//! through static imports show up too.

use crate::config::LoaderConfig;
use crate::dispatch::ModuleKind;
use crate::host::ModuleHost;
use crate::registry::{ModuleRegistry, ModuleState};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A CommonJS `module` object
pub struct CjsModule {
    id: String,
    exports: RwLock<Value>,
}

impl CjsModule {
    /// Create a module object with initial exports
    pub fn new(id: impl Into<String>, exports: Value) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            exports: RwLock::new(exports),
        })
    }

    /// Module id (its canonical key)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current `module.exports`, read at call time
    pub fn exports(&self) -> Value {
        self.exports.read().clone()
    }

    /// Replace `module.exports`
    pub fn set_exports(&self, exports: Value) {
        *self.exports.write() = exports;
    }
}

impl fmt::Debug for CjsModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CjsModule")
            .field("id", &self.id)
            .field("exports", &*self.exports.read())
            .finish()
    }
}

/// Map-like module cache surface
pub trait CacheStore {
    /// Get a cached module
    fn get(&self, key: &str) -> Option<Arc<CjsModule>>;

    /// Cache a module under `key`
    fn set(&self, key: &str, module: Arc<CjsModule>);

    /// Check if `key` is cached
    fn has(&self, key: &str) -> bool;

    /// Remove `key`; returns whether anything was removed
    fn delete(&self, key: &str) -> bool;

    /// Cached keys in enumeration order
    fn keys(&self) -> Vec<String>;

    /// Number of cached keys
    fn len(&self) -> usize {
        self.keys().len()
    }

    /// Check if nothing is cached
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered cache of CommonJS module objects
#[derive(Debug, Default)]
pub struct CjsCache {
    modules: RwLock<IndexMap<String, Arc<CjsModule>>>,
}

impl CjsCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the entire cache
    pub fn clear(&self) {
        self.modules.write().clear();
    }
}

impl CacheStore for CjsCache {
    fn get(&self, key: &str) -> Option<Arc<CjsModule>> {
        self.modules.read().get(key).cloned()
    }

    fn set(&self, key: &str, module: Arc<CjsModule>) {
        self.modules.write().insert(key.to_string(), module);
    }

    fn has(&self, key: &str) -> bool {
        self.modules.read().contains_key(key)
    }

    fn delete(&self, key: &str) -> bool {
        self.modules.write().shift_remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.modules.read().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.modules.read().len()
    }
}

/// `require.cache`: the CommonJS cache merged with the module registry
///
/// Behaves like an object with a null prototype: only keys physically held
/// by one of the two stores are present.
pub struct DualStoreCache<H: ModuleHost> {
    modules: Arc<CjsCache>,
    registry: Arc<ModuleRegistry>,
    host: Arc<H>,
    config: Arc<LoaderConfig>,
}

impl<H: ModuleHost> DualStoreCache<H> {
    /// Create a view over both stores
    pub fn new(
        modules: Arc<CjsCache>,
        registry: Arc<ModuleRegistry>,
        host: Arc<H>,
        config: Arc<LoaderConfig>,
    ) -> Self {
        Self {
            modules,
            registry,
            host,
            config,
        }
    }

    /// The view never inherits keys from a prototype
    pub fn has_prototype(&self) -> bool {
        false
    }

    /// Empty both stores
    pub fn clear(&self) {
        self.modules.clear();
        self.registry.clear();
    }

    /// Wrap an evaluated registry entry as a module object
    fn synthesize(&self, key: &str) -> Option<Arc<CjsModule>> {
        // A registry entry for a data file or addon never holds its exports
        if !ModuleKind::from_key(key, &self.config).in_module_graph() {
            return None;
        }
        let entry = self.registry.get(key)?;
        if entry.state() != ModuleState::Evaluated {
            return None;
        }
        let record = entry.module_record()?;
        let module = CjsModule::new(key, self.host.namespace(&record));
        tracing::debug!("Synthesized cache entry for {}", key);
        self.modules.set(key, Arc::clone(&module));
        Some(module)
    }
}

impl<H: ModuleHost> CacheStore for DualStoreCache<H> {
    fn get(&self, key: &str) -> Option<Arc<CjsModule>> {
        self.modules.get(key).or_else(|| self.synthesize(key))
    }

    fn set(&self, key: &str, module: Arc<CjsModule>) {
        self.modules.set(key, module);
    }

    fn has(&self, key: &str) -> bool {
        self.modules.has(key) || self.registry.contains(key)
    }

    fn delete(&self, key: &str) -> bool {
        let from_modules = self.modules.delete(key);
        let from_registry = self.registry.remove(key).is_some();
        from_modules || from_registry
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = self.modules.keys();
        let registry_only: Vec<String> = self
            .registry
            .keys()
            .into_iter()
            .filter(|key| !self.modules.has(key))
            .collect();
        keys.extend(registry_only);
        keys
    }
}

impl<H: ModuleHost> fmt::Debug for DualStoreCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualStoreCache")
            .field("keys", &self.keys())
            .finish()
    }
}
