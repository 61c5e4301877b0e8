// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ES module registry
//!
//! One [`ModuleEntry`] per canonical key. Entries only ever move forward
//! through [`ModuleState`]; every change goes through
//! [`ModuleEntry::raise_state_at_least`].

use crate::deferred::DeferredValue;
use crate::host::{ParsedModule, SourceText};
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};

/// Lifecycle of a registry entry, in advancing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleState {
    /// Key not seen yet; never stored on an entry
    Unregistered,
    /// Entry exists, source not fetched yet
    FetchRequested,
    /// Source available
    Fetched,
    /// Parsed, dependencies being wired up
    Linking,
    /// Whole dependency graph instantiated
    Linked,
    /// Handed to the linker for evaluation
    Evaluating,
    /// Evaluation finished
    Evaluated,
}

impl ModuleState {
    /// The later of two states
    pub fn advance(self, proposed: ModuleState) -> ModuleState {
        self.max(proposed)
    }

    /// Lowercase name for display
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleState::Unregistered => "unregistered",
            ModuleState::FetchRequested => "fetch-requested",
            ModuleState::Fetched => "fetched",
            ModuleState::Linking => "linking",
            ModuleState::Linked => "linked",
            ModuleState::Evaluating => "evaluating",
            ModuleState::Evaluated => "evaluated",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Back-reference into the registry
pub type ModuleRef = Weak<ModuleEntry>;

struct EntryInner {
    state: ModuleState,
    fetch_issued: bool,
    raw_source: DeferredValue<SourceText>,
    module_record: Option<Arc<ParsedModule>>,
    dependencies: Vec<ModuleRef>,
    dependencies_by_name: IndexMap<String, ModuleRef>,
    link_ready: DeferredValue<ModuleRef>,
    satisfy_ready: DeferredValue<ModuleRef>,
    evaluation: Option<DeferredValue<()>>,
}

/// Registry record for one module
pub struct ModuleEntry {
    key: String,
    inner: Mutex<EntryInner>,
}

impl ModuleEntry {
    fn new(key: String) -> Self {
        // Resolvers are dropped: these stay pending until replaced.
        let (raw_source, _) = DeferredValue::pending();
        let (link_ready, _) = DeferredValue::pending();
        let (satisfy_ready, _) = DeferredValue::pending();
        Self {
            key,
            inner: Mutex::new(EntryInner {
                state: ModuleState::FetchRequested,
                fetch_issued: false,
                raw_source,
                module_record: None,
                dependencies: Vec::new(),
                dependencies_by_name: IndexMap::new(),
                link_ready,
                satisfy_ready,
                evaluation: None,
            }),
        }
    }

    /// Canonical key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current state
    pub fn state(&self) -> ModuleState {
        self.inner.lock().state
    }

    /// Set the state to `max(current, proposed)` and return the result
    pub fn raise_state_at_least(&self, proposed: ModuleState) -> ModuleState {
        let mut inner = self.inner.lock();
        let next = inner.state.advance(proposed);
        if next != inner.state {
            tracing::debug!("{}: {} -> {}", self.key, inner.state, next);
            inner.state = next;
        }
        next
    }

    /// Whether a fetch has been issued for this entry
    pub fn fetch_issued(&self) -> bool {
        self.inner.lock().fetch_issued
    }

    /// Fetch result
    pub fn raw_source(&self) -> DeferredValue<SourceText> {
        self.inner.lock().raw_source.clone()
    }

    /// Store the fetch result
    pub fn set_raw_source(&self, source: DeferredValue<SourceText>) {
        let mut inner = self.inner.lock();
        inner.raw_source = source;
        inner.fetch_issued = true;
    }

    /// Parsed module record, once parsing completed
    pub fn module_record(&self) -> Option<Arc<ParsedModule>> {
        self.inner.lock().module_record.clone()
    }

    /// Store the parsed record; returns `false` if one was already set
    pub fn set_module_record(&self, record: Arc<ParsedModule>) -> bool {
        let mut inner = self.inner.lock();
        if inner.module_record.is_some() {
            return false;
        }
        inner.module_record = Some(record);
        true
    }

    /// Dependencies in declaration order
    pub fn dependencies(&self) -> Vec<Arc<ModuleEntry>> {
        self.inner
            .lock()
            .dependencies
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Keys of the dependencies in declaration order
    pub fn dependency_keys(&self) -> Vec<String> {
        self.dependencies()
            .iter()
            .map(|dep| dep.key().to_string())
            .collect()
    }

    /// Dependency bound to a specifier as written in source
    pub fn dependency(&self, specifier: &str) -> Option<Arc<ModuleEntry>> {
        self.inner
            .lock()
            .dependencies_by_name
            .get(specifier)
            .and_then(Weak::upgrade)
    }

    /// Specifiers with a bound dependency, in declaration order
    pub fn dependency_names(&self) -> Vec<String> {
        self.inner.lock().dependencies_by_name.keys().cloned().collect()
    }

    /// Replace the dependency lists with a fully enumerated set
    pub fn set_dependencies(&self, deps: Vec<(String, Arc<ModuleEntry>)>) {
        let mut inner = self.inner.lock();
        inner.dependencies = deps.iter().map(|(_, dep)| Arc::downgrade(dep)).collect();
        inner.dependencies_by_name = deps
            .into_iter()
            .map(|(name, dep)| (name, Arc::downgrade(&dep)))
            .collect();
    }

    /// Signal consumed by the linker once dependencies are wired
    pub fn link_ready(&self) -> DeferredValue<ModuleRef> {
        self.inner.lock().link_ready.clone()
    }

    /// Signal consumed by the linker once the entry is satisfied
    pub fn satisfy_ready(&self) -> DeferredValue<ModuleRef> {
        self.inner.lock().satisfy_ready.clone()
    }

    /// Whether dependency enumeration finished for this entry
    pub fn is_link_ready(&self) -> bool {
        !self.inner.lock().link_ready.inspect().is_pending()
    }

    /// Settle both linker signals with a reference to `entry`
    pub fn mark_link_ready(entry: &Arc<ModuleEntry>) {
        let mut inner = entry.inner.lock();
        inner.link_ready = DeferredValue::fulfilled(Arc::downgrade(entry));
        inner.satisfy_ready = DeferredValue::fulfilled(Arc::downgrade(entry));
    }

    /// Outstanding or finished evaluation handed back by the linker
    pub fn evaluation(&self) -> Option<DeferredValue<()>> {
        self.inner.lock().evaluation.clone()
    }

    /// Remember the linker's evaluation result
    pub fn set_evaluation(&self, evaluation: DeferredValue<()>) {
        self.inner.lock().evaluation = Some(evaluation);
    }
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ModuleEntry")
            .field("key", &self.key)
            .field("state", &inner.state)
            .field("parsed", &inner.module_record.is_some())
            .field("dependencies", &inner.dependencies.len())
            .finish()
    }
}

/// Keyed store of all module entries
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: DashMap<String, Arc<ModuleEntry>>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `key`, creating it in `FetchRequested` if absent
    pub fn ensure_registered(&self, key: &str) -> Arc<ModuleEntry> {
        if let Some(entry) = self.entries.get(key) {
            return Arc::clone(entry.value());
        }
        let entry = self.entries.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!("Registering module {}", key);
            Arc::new(ModuleEntry::new(key.to_string()))
        });
        Arc::clone(entry.value())
    }

    /// Advance `entry` to at least `proposed`
    pub fn raise_state_at_least(&self, entry: &ModuleEntry, proposed: ModuleState) -> ModuleState {
        entry.raise_state_at_least(proposed)
    }

    /// Get an entry by key
    pub fn get(&self, key: &str) -> Option<Arc<ModuleEntry>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// State of `key`, `Unregistered` when absent
    pub fn state_of(&self, key: &str) -> ModuleState {
        self.get(key)
            .map(|entry| entry.state())
            .unwrap_or(ModuleState::Unregistered)
    }

    /// Check if a key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove an entry
    pub fn remove(&self, key: &str) -> Option<Arc<ModuleEntry>> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    /// All registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Entries reachable from `root` (inclusive), breadth-first
    pub fn graph(&self, root: &str) -> Vec<Arc<ModuleEntry>> {
        let Some(root) = self.get(root) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(entry) = queue.pop_front() {
            if !seen.insert(entry.key().to_string()) {
                continue;
            }
            queue.extend(entry.dependencies());
            order.push(entry);
        }
        order
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }
}
