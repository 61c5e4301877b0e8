// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! In-memory module host with call counters

#![allow(dead_code)]

use cinder_loader::{
    CjsModule, DeferredValue, LoaderError, ModuleHost, ModuleRegistry, ParsedModule, Rejection,
    Resolver, Result, SourceText,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How a step of a module behaves
#[derive(Clone)]
pub enum Step {
    Ok,
    Reject(Rejection),
    Pending,
    Forwarded,
}

#[derive(Clone)]
struct MemoryModule {
    imports: Vec<String>,
    namespace: Value,
    fetch: Step,
    parse: Step,
}

#[derive(Default)]
pub struct MemoryHost {
    modules: Mutex<HashMap<String, MemoryModule>>,
    files: Mutex<HashMap<String, String>>,
    addons: Mutex<HashMap<String, Value>>,
    loaded_addons: Mutex<Vec<Arc<CjsModule>>>,
    suspended: Mutex<HashSet<String>>,
    failing_links: Mutex<HashMap<String, Rejection>>,
    link_resolvers: Mutex<HashMap<String, Resolver<()>>>,
    fetch_delay: Option<Duration>,
    pub resolves: AtomicUsize,
    pub fetches: Mutex<Vec<String>>,
    pub parses: AtomicUsize,
    pub links: AtomicUsize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a JavaScript module
    pub fn module(self, key: &str, imports: &[&str], namespace: Value) -> Self {
        self.modules.lock().insert(
            key.to_string(),
            MemoryModule {
                imports: imports.iter().map(|s| s.to_string()).collect(),
                namespace,
                fetch: Step::Ok,
                parse: Step::Ok,
            },
        );
        self
    }

    /// Register a data file
    pub fn file(self, key: &str, content: &str) -> Self {
        self.files.lock().insert(key.to_string(), content.to_string());
        self
    }

    /// Register a native addon and the exports it installs
    pub fn addon(self, key: &str, exports: Value) -> Self {
        self.addons.lock().insert(key.to_string(), exports);
        self
    }

    pub fn fetch_step(self, key: &str, step: Step) -> Self {
        if let Some(module) = self.modules.lock().get_mut(key) {
            module.fetch = step;
        }
        self
    }

    pub fn parse_step(self, key: &str, step: Step) -> Self {
        if let Some(module) = self.modules.lock().get_mut(key) {
            module.parse = step;
        }
        self
    }

    /// Sleep in every fetch, widening the window for racing loads
    pub fn fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Make link-and-evaluate of `key` return a pending result
    pub fn suspend(self, key: &str) -> Self {
        self.suspended.lock().insert(key.to_string());
        self
    }

    /// Make link-and-evaluate of `key` reject
    pub fn fail_link(self, key: &str, reason: Rejection) -> Self {
        self.failing_links.lock().insert(key.to_string(), reason);
        self
    }

    /// Finish a suspended evaluation in the background
    pub fn finish_evaluation(&self, key: &str) {
        if let Some(resolver) = self.link_resolvers.lock().remove(key) {
            resolver.fulfill(());
        }
    }

    pub fn set_namespace(&self, key: &str, namespace: Value) {
        if let Some(module) = self.modules.lock().get_mut(key) {
            module.namespace = namespace;
        }
    }

    /// Module objects handed to native_load
    pub fn loaded_addons(&self) -> Vec<Arc<CjsModule>> {
        self.loaded_addons.lock().clone()
    }

    pub fn fetch_count(&self, key: &str) -> usize {
        self.fetches.lock().iter().filter(|k| k.as_str() == key).count()
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().len()
    }

    fn deferred<T>(step: &Step, value: T) -> DeferredValue<T> {
        match step {
            Step::Ok => DeferredValue::fulfilled(value),
            Step::Reject(reason) => DeferredValue::rejected(reason.clone()),
            Step::Pending => DeferredValue::pending().0,
            Step::Forwarded => DeferredValue::forwarded(DeferredValue::fulfilled(value)),
        }
    }
}

impl ModuleHost for MemoryHost {
    fn resolve(&self, specifier: &str, from: &str) -> Result<String> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        match specifier.strip_prefix("./") {
            Some(rest) => Ok(format!("/{}", rest)),
            None => Err(LoaderError::resolution(specifier, from, "not a relative path")),
        }
    }

    fn fetch_source(&self, key: &str) -> DeferredValue<SourceText> {
        if let Some(delay) = self.fetch_delay {
            std::thread::sleep(delay);
        }
        self.fetches.lock().push(key.to_string());
        match self.modules.lock().get(key) {
            Some(module) => Self::deferred(&module.fetch, SourceText::from(format!("// {}", key))),
            None => DeferredValue::rejected(Rejection::with_message(format!(
                "Cannot find module \"{}\"",
                key
            ))),
        }
    }

    fn parse_module(&self, key: &str, _source: &SourceText) -> DeferredValue<Arc<ParsedModule>> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        let modules = self.modules.lock();
        let module = modules.get(key).cloned().expect("parsed modules were fetched");
        Self::deferred(
            &module.parse,
            Arc::new(ParsedModule::new(key, module.imports.clone())),
        )
    }

    fn link_and_evaluate(&self, key: &str, _registry: &ModuleRegistry) -> DeferredValue<()> {
        self.links.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.failing_links.lock().get(key) {
            return DeferredValue::rejected(reason.clone());
        }
        if self.suspended.lock().contains(key) {
            let (evaluation, resolver) = DeferredValue::pending();
            self.link_resolvers.lock().insert(key.to_string(), resolver);
            return evaluation;
        }
        DeferredValue::fulfilled(())
    }

    fn namespace(&self, module: &ParsedModule) -> Value {
        self.modules
            .lock()
            .get(&module.key)
            .map(|m| m.namespace.clone())
            .unwrap_or(Value::Null)
    }

    fn native_load(&self, key: &str, module: &Arc<CjsModule>) -> Result<()> {
        let exports = self.addons.lock().get(key).cloned();
        match exports {
            Some(exports) => {
                module.set_exports(exports);
                self.loaded_addons.lock().push(Arc::clone(module));
                Ok(())
            }
            None => Err(LoaderError::NativeAddon {
                key: key.to_string(),
                reason: "dlopen failed".to_string(),
            }),
        }
    }

    fn read_file(&self, key: &str) -> Result<String> {
        self.files.lock().get(key).cloned().ok_or_else(|| {
            LoaderError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", key),
            ))
        })
    }
}
