// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Filesystem-backed module host
//!
//! Reads modules from disk and scans them statically. Nothing is executed:
//! namespaces hold only literal exports, and a graph containing top-level
//! `await` reports an evaluation that never settles, exactly like a real
//! engine would mid-suspension.

mod resolve;
mod scan;

pub use resolve::{PathResolver, canonical_key};
pub use scan::{ModuleSyntax, scan_module};

use crate::cache::CjsModule;
use crate::config::LoaderConfig;
use crate::deferred::{DeferredValue, Rejection};
use crate::error::{LoaderError, Result};
use crate::host::{ModuleHost, ParsedModule, SourceText};
use crate::registry::ModuleRegistry;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

/// Module host over the local filesystem
#[derive(Debug, Clone)]
pub struct FsHost {
    resolver: PathResolver,
}

impl FsHost {
    /// Create a host using the configured resolution extensions
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            resolver: PathResolver::new(config.resolve_extensions.clone()),
        }
    }
}

impl Default for FsHost {
    fn default() -> Self {
        Self::new(&LoaderConfig::default())
    }
}

impl ModuleHost for FsHost {
    fn resolve(&self, specifier: &str, from: &str) -> Result<String> {
        self.resolver.resolve(specifier, from)
    }

    fn is_canonical(&self, specifier: &str) -> bool {
        let path = Path::new(specifier);
        path.is_absolute() && path.is_file()
    }

    fn fetch_source(&self, key: &str) -> DeferredValue<SourceText> {
        match std::fs::read_to_string(key) {
            Ok(source) => DeferredValue::fulfilled(SourceText::from(source)),
            Err(e) => DeferredValue::rejected(Rejection::with_message(format!(
                "Cannot read module \"{}\": {}",
                key, e
            ))),
        }
    }

    fn parse_module(&self, key: &str, source: &SourceText) -> DeferredValue<Arc<ParsedModule>> {
        let syntax = scan_module(source);
        let meta = json!({
            "namespace": syntax.namespace(),
            "topLevelAwait": syntax.top_level_await,
        });
        DeferredValue::fulfilled(Arc::new(
            ParsedModule::new(key, syntax.requested).with_meta(meta),
        ))
    }

    fn link_and_evaluate(&self, key: &str, registry: &ModuleRegistry) -> DeferredValue<()> {
        let suspending = registry.graph(key).into_iter().find(|entry| {
            entry
                .module_record()
                .and_then(|record| record.meta.get("topLevelAwait").and_then(Value::as_bool))
                .unwrap_or(false)
        });
        match suspending {
            Some(entry) => {
                tracing::debug!("{} suspends on top-level await", entry.key());
                let (evaluation, _resolver) = DeferredValue::pending();
                evaluation
            }
            None => DeferredValue::fulfilled(()),
        }
    }

    fn namespace(&self, module: &ParsedModule) -> Value {
        module
            .meta
            .get("namespace")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    fn native_load(&self, key: &str, _module: &Arc<CjsModule>) -> Result<()> {
        Err(LoaderError::NativeAddon {
            key: key.to_string(),
            reason: "native addons cannot be loaded by the filesystem host".to_string(),
        })
    }
}
