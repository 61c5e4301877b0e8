// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS require() implementation

use crate::cache::DualStoreCache;
use crate::error::Result;
use crate::host::ModuleHost;
use crate::loader::ModuleLoader;
use serde_json::Value;

/// The require() function for CommonJS modules
pub fn require<H: ModuleHost>(loader: &ModuleLoader<H>, name: &Value, parent: &str) -> Result<Value> {
    loader.require(name, parent)
}

/// require.resolve() - get the resolved key without loading
pub fn require_resolve<H: ModuleHost>(
    loader: &ModuleLoader<H>,
    specifier: &str,
    parent: &str,
) -> Result<String> {
    loader.resolve(specifier, parent)
}

/// require.cache - the module cache object
pub fn require_cache<H: ModuleHost>(loader: &ModuleLoader<H>) -> DualStoreCache<H> {
    loader.cache()
}

/// A `require` function bound to the module that calls it
pub struct Require<'a, H: ModuleHost> {
    loader: &'a ModuleLoader<H>,
    parent: String,
}

impl<'a, H: ModuleHost> Require<'a, H> {
    /// Create `require` for the module `parent`
    pub fn new(loader: &'a ModuleLoader<H>, parent: impl Into<String>) -> Self {
        Self {
            loader,
            parent: parent.into(),
        }
    }

    /// Key of the calling module
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// `require(name)`
    pub fn call(&self, name: &Value) -> Result<Value> {
        require(self.loader, name, &self.parent)
    }

    /// `require(name)` with a string name
    pub fn call_str(&self, name: &str) -> Result<Value> {
        self.call(&Value::String(name.to_string()))
    }

    /// `require.resolve(specifier)`
    pub fn resolve(&self, specifier: &str) -> Result<String> {
        require_resolve(self.loader, specifier, &self.parent)
    }

    /// `require.cache`
    pub fn cache(&self) -> DualStoreCache<H> {
        require_cache(self.loader)
    }
}
