// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Collaborators the loader drives but does not implement
//!
//! Parsing, linking, path resolution and native addon loading belong to the
//! embedding engine. The loader reaches them only through [`ModuleHost`].

use crate::cache::CjsModule;
use crate::deferred::DeferredValue;
use crate::error::Result;
use crate::registry::ModuleRegistry;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Fetched module source
pub type SourceText = Arc<str>;

/// Parsed module record
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedModule {
    /// Canonical key of the module
    pub key: String,
    /// Statically requested specifiers, in declaration order
    pub requested_modules: Vec<String>,
    /// Host-specific payload
    pub meta: Value,
}

impl ParsedModule {
    /// Create a record with no host payload
    pub fn new(key: impl Into<String>, requested_modules: Vec<String>) -> Self {
        Self {
            key: key.into(),
            requested_modules,
            meta: Value::Null,
        }
    }

    /// Attach a host payload
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }
}

/// The engine-side half of module loading
pub trait ModuleHost {
    /// Turn `specifier`, written inside the module `from`, into a canonical key
    fn resolve(&self, specifier: &str, from: &str) -> Result<String>;

    /// Whether `specifier` is already a canonical key and can skip [`resolve`](Self::resolve)
    fn is_canonical(&self, specifier: &str) -> bool {
        Path::new(specifier).is_absolute()
    }

    /// Start fetching the source of `key`; must settle immediately for local modules
    fn fetch_source(&self, key: &str) -> DeferredValue<SourceText>;

    /// Parse fetched source; must settle immediately for local modules
    fn parse_module(&self, key: &str, source: &SourceText) -> DeferredValue<Arc<ParsedModule>>;

    /// Link and evaluate the graph rooted at `key`
    ///
    /// The registry already holds every module of the graph at `Linking` or
    /// beyond, with dependencies filled in. A pending result means the graph
    /// genuinely suspends (top-level await).
    fn link_and_evaluate(&self, key: &str, registry: &ModuleRegistry) -> DeferredValue<()>;

    /// Namespace object of an evaluated module
    fn namespace(&self, module: &ParsedModule) -> Value;

    /// Load a native addon, filling `module.exports`
    fn native_load(&self, key: &str, module: &Arc<CjsModule>) -> Result<()>;

    /// Read a data file (JSON, TOML) named by its canonical key
    fn read_file(&self, key: &str) -> Result<String> {
        Ok(std::fs::read_to_string(key)?)
    }
}

impl<H: ModuleHost + ?Sized> ModuleHost for Arc<H> {
    fn resolve(&self, specifier: &str, from: &str) -> Result<String> {
        (**self).resolve(specifier, from)
    }

    fn is_canonical(&self, specifier: &str) -> bool {
        (**self).is_canonical(specifier)
    }

    fn fetch_source(&self, key: &str) -> DeferredValue<SourceText> {
        (**self).fetch_source(key)
    }

    fn parse_module(&self, key: &str, source: &SourceText) -> DeferredValue<Arc<ParsedModule>> {
        (**self).parse_module(key, source)
    }

    fn link_and_evaluate(&self, key: &str, registry: &ModuleRegistry) -> DeferredValue<()> {
        (**self).link_and_evaluate(key, registry)
    }

    fn namespace(&self, module: &ParsedModule) -> Value {
        (**self).namespace(module)
    }

    fn native_load(&self, key: &str, module: &Arc<CjsModule>) -> Result<()> {
        (**self).native_load(key, module)
    }

    fn read_file(&self, key: &str) -> Result<String> {
        (**self).read_file(key)
    }
}
