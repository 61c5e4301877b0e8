// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Synchronous dependency instantiation
//!
//! Walks a module's static imports breadth-first, fetching and parsing each
//! module once, then hands the graph to the host linker. Nothing here ever
//! waits: a step that has not settled by the time it is inspected aborts
//! the whole call with [`LoaderError::AsyncUnsupported`].
//!
//! Aborts leave the registry as far as it got. Entries already at
//! `Linking` or beyond stay there and are reused by the next call.
//!
//! Imports whose key routes to a data file or a native addon are left out
//! of the graph; `require()` loads those on demand.

use crate::config::LoaderConfig;
use crate::deferred::{Settlement, force_settle};
use crate::dispatch::ModuleKind;
use crate::error::{LoaderError, Result};
use crate::host::{ModuleHost, ParsedModule};
use crate::registry::{ModuleEntry, ModuleRegistry, ModuleState};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;

/// Drives a root module and its dependencies to `Evaluated`
pub struct InstantiationEngine<'a, H: ModuleHost + ?Sized> {
    host: &'a H,
    registry: &'a ModuleRegistry,
    config: Cow<'a, LoaderConfig>,
}

impl<'a, H: ModuleHost + ?Sized> InstantiationEngine<'a, H> {
    /// Create an engine over a host and registry
    pub fn new(host: &'a H, registry: &'a ModuleRegistry) -> Self {
        Self {
            host,
            registry,
            config: Cow::Owned(LoaderConfig::default()),
        }
    }

    /// Use the suffix tables of `config` to tell graph modules from the rest
    pub fn with_config(mut self, config: &'a LoaderConfig) -> Self {
        self.config = Cow::Borrowed(config);
        self
    }

    /// Instantiate, link and evaluate `root_key`
    ///
    /// When an earlier call left the root's evaluation running, the stored
    /// result is inspected again instead of evaluating a second time.
    pub fn run(&self, root_key: &str) -> Result<Arc<ModuleEntry>> {
        let root = self.registry.ensure_registered(root_key);
        if root.state() >= ModuleState::Evaluated {
            return Ok(root);
        }
        if let Some(evaluation) = root.evaluation() {
            tracing::debug!("Re-inspecting earlier evaluation of {}", root_key);
            return self.finish_evaluation(&root, evaluation.inspect());
        }

        self.instantiate(root_key)?;

        self.registry
            .raise_state_at_least(&root, ModuleState::Evaluating);
        let evaluation = self.host.link_and_evaluate(root_key, self.registry);
        root.set_evaluation(evaluation.clone());
        self.finish_evaluation(&root, evaluation.inspect())
    }

    /// Bring `root_key` and everything it imports to at least `Linked`
    pub fn instantiate(&self, root_key: &str) -> Result<Arc<ModuleEntry>> {
        let mut queue = VecDeque::from([root_key.to_string()]);

        while let Some(key) = queue.pop_front() {
            let entry = self.registry.ensure_registered(&key);
            if entry.is_link_ready() {
                continue;
            }

            let record = self.parse_entry(&entry)?;
            self.registry
                .raise_state_at_least(&entry, ModuleState::Linking);

            let mut deps = Vec::with_capacity(record.requested_modules.len());
            for specifier in &record.requested_modules {
                let dep_key = if self.host.is_canonical(specifier) {
                    specifier.clone()
                } else {
                    self.host.resolve(specifier, &key)?
                };
                // Data files and native addons are loaded by require() itself
                if !ModuleKind::from_key(&dep_key, &self.config).in_module_graph() {
                    tracing::debug!("Not linking {} (imported by {})", dep_key, key);
                    continue;
                }
                let dep = self.registry.ensure_registered(&dep_key);
                // A Linking entry whose enumeration was cut short by an
                // earlier failed call is not link-ready and gets revisited.
                if dep.state() < ModuleState::Linking || !dep.is_link_ready() {
                    tracing::debug!("Queueing {} (imported by {})", dep_key, key);
                    queue.push_back(dep_key);
                }
                deps.push((specifier.clone(), dep));
            }
            entry.set_dependencies(deps);
            ModuleEntry::mark_link_ready(&entry);
        }

        for entry in self.registry.graph(root_key) {
            self.registry
                .raise_state_at_least(&entry, ModuleState::Linked);
        }
        Ok(self.registry.ensure_registered(root_key))
    }

    /// Fetch and parse `entry` unless it already has a record
    fn parse_entry(&self, entry: &Arc<ModuleEntry>) -> Result<Arc<ParsedModule>> {
        if let Some(record) = entry.module_record() {
            return Ok(record);
        }
        let key = entry.key();

        if entry.state() <= ModuleState::FetchRequested && !entry.fetch_issued() {
            tracing::debug!("Fetching {}", key);
            entry.set_raw_source(self.host.fetch_source(key));
        }
        let source = force_settle(key, "fetch", &entry.raw_source())?;
        self.registry
            .raise_state_at_least(entry, ModuleState::Fetched);

        let parsed = self.host.parse_module(key, &source);
        let record = force_settle(key, "parse", &parsed)?;
        entry.set_module_record(Arc::clone(&record));
        Ok(entry.module_record().unwrap_or(record))
    }

    fn finish_evaluation(
        &self,
        root: &Arc<ModuleEntry>,
        settlement: Settlement<()>,
    ) -> Result<Arc<ModuleEntry>> {
        let key = root.key();
        match settlement {
            Settlement::Fulfilled(()) => {
                for entry in self.registry.graph(key) {
                    self.registry
                        .raise_state_at_least(&entry, ModuleState::Evaluated);
                }
                Ok(Arc::clone(root))
            }
            Settlement::Rejected(reason) => Err(LoaderError::ParseOrFetchFailed {
                key: key.to_string(),
                reason: reason.describe(key),
            }),
            Settlement::Pending => {
                tracing::warn!(
                    "{} is still evaluating; it keeps running in the background",
                    key
                );
                Err(LoaderError::async_unsupported(key))
            }
        }
    }
}
