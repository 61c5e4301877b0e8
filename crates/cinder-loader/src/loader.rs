// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - routes resolved modules and caches the results

use crate::cache::{CacheStore, CjsCache, CjsModule, DualStoreCache};
use crate::config::LoaderConfig;
use crate::dispatch::{ModuleKind, parse_json_module, parse_toml_module};
use crate::error::{LoaderError, Result};
use crate::host::ModuleHost;
use crate::instantiate::InstantiationEngine;
use crate::registry::ModuleRegistry;
use parking_lot::ReentrantMutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters describing loader activity
#[derive(Debug, Default)]
pub struct LoaderStats {
    loads: AtomicUsize,
    cache_hits: AtomicUsize,
    instantiations: AtomicUsize,
}

/// Point-in-time copy of [`LoaderStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Modules loaded (cache misses)
    pub loads: usize,
    /// `require()` calls answered from the cache
    pub cache_hits: usize,
    /// Runs of the instantiation engine
    pub instantiations: usize,
}

impl LoaderStats {
    /// Take a snapshot of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            loads: self.loads.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            instantiations: self.instantiations.load(Ordering::Relaxed),
        }
    }
}

/// Module loader
///
/// Loads are serialized: one `load` runs to completion before another
/// starts, so registry checks and the state changes they guard are never
/// interleaved. The lock is reentrant so a host may call back into
/// `require()` while evaluating.
pub struct ModuleLoader<H: ModuleHost> {
    /// Engine-side collaborators
    host: Arc<H>,
    /// ES module registry
    registry: Arc<ModuleRegistry>,
    /// CommonJS module cache
    modules: Arc<CjsCache>,
    /// Loader configuration
    config: Arc<LoaderConfig>,
    /// Activity counters
    stats: LoaderStats,
    /// Held for the duration of each load
    load_lock: ReentrantMutex<()>,
}

impl<H: ModuleHost> ModuleLoader<H> {
    /// Create a loader with fresh stores
    pub fn new(host: H, config: LoaderConfig) -> Self {
        Self::with_registry(Arc::new(host), Arc::new(ModuleRegistry::new()), config)
    }

    /// Create a loader over an existing registry
    pub fn with_registry(host: Arc<H>, registry: Arc<ModuleRegistry>, config: LoaderConfig) -> Self {
        Self {
            host,
            registry,
            modules: Arc::new(CjsCache::new()),
            config: Arc::new(config),
            stats: LoaderStats::default(),
            load_lock: ReentrantMutex::new(()),
        }
    }

    /// `require(name)` as called from the module `parent`
    pub fn require(&self, name: &Value, parent: &str) -> Result<Value> {
        let specifier = match name {
            Value::String(s) if !s.is_empty() => s,
            Value::String(_) => {
                return Err(LoaderError::InvalidArgument(
                    "The argument 'id' must be a non-empty string. Received ''".to_string(),
                ));
            }
            other => {
                return Err(LoaderError::InvalidArgument(format!(
                    "The \"id\" argument must be of type string. Received {}",
                    describe_value(other)
                )));
            }
        };
        let key = self.resolve(specifier, parent)?;
        Ok(self.load(&key)?.exports())
    }

    /// Resolve a specifier to its canonical key without loading it
    pub fn resolve(&self, specifier: &str, parent: &str) -> Result<String> {
        if self.host.is_canonical(specifier) {
            return Ok(specifier.to_string());
        }
        self.host.resolve(specifier, parent)
    }

    /// Load the module with canonical key `key`
    pub fn load(&self, key: &str) -> Result<Arc<CjsModule>> {
        let _guard = self.load_lock.lock();
        if let Some(module) = self.cache().get(key) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(module);
        }

        let kind = ModuleKind::from_key(key, &self.config);
        tracing::debug!("Loading {} as {:?}", key, kind);
        let module = match kind {
            ModuleKind::Json => self.load_data_file(key, parse_json_module)?,
            ModuleKind::Toml => self.load_data_file(key, parse_toml_module)?,
            ModuleKind::Native => self.load_native_addon(key)?,
            ModuleKind::EsModule => self.load_es_module(key)?,
        };
        self.stats.loads.fetch_add(1, Ordering::Relaxed);

        self.modules.set(key, Arc::clone(&module));
        Ok(module)
    }

    /// Load a JSON or TOML file
    fn load_data_file(
        &self,
        key: &str,
        parse: fn(&str, &str) -> Result<Value>,
    ) -> Result<Arc<CjsModule>> {
        let content = self.host.read_file(key)?;
        Ok(CjsModule::new(key, parse(key, &content)?))
    }

    /// Load a native addon; the host fills in `module.exports`
    fn load_native_addon(&self, key: &str) -> Result<Arc<CjsModule>> {
        let module = CjsModule::new(key, Value::Object(Default::default()));
        self.host.native_load(key, &module)?;
        Ok(module)
    }

    /// Load JavaScript through the ES module graph
    fn load_es_module(&self, key: &str) -> Result<Arc<CjsModule>> {
        self.stats.instantiations.fetch_add(1, Ordering::Relaxed);
        let entry = InstantiationEngine::new(self.host.as_ref(), &self.registry)
            .with_config(&self.config)
            .run(key)?;
        let record = entry
            .module_record()
            .ok_or_else(|| LoaderError::ParseOrFetchFailed {
                key: key.to_string(),
                reason: format!("Module \"{}\" has no parsed record", key),
            })?;
        Ok(CjsModule::new(key, self.host.namespace(&record)))
    }

    /// The `require.cache` view
    pub fn cache(&self) -> DualStoreCache<H> {
        DualStoreCache::new(
            Arc::clone(&self.modules),
            Arc::clone(&self.registry),
            Arc::clone(&self.host),
            Arc::clone(&self.config),
        )
    }

    /// The ES module registry
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// The host collaborators
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Activity counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Drop every cached module and registry entry
    pub fn shutdown(&self) {
        let _guard = self.load_lock.lock();
        self.cache().clear();
    }
}

/// Short description of a value for argument errors
fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("type boolean ({})", b),
        Value::Number(n) => format!("type number ({})", n),
        Value::String(s) => format!("type string ('{}')", s),
        Value::Array(_) => "an instance of Array".to_string(),
        Value::Object(_) => "an instance of Object".to_string(),
    }
}
