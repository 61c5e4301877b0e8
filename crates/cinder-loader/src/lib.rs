// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # cinder-loader
//!
//! Synchronous `require()` on top of an asynchronous ES module graph.
//!
//! The ES module pipeline (fetch, parse, link, evaluate) is promise-shaped.
//! This crate drives it to completion without yielding whenever every step
//! has already settled, and fails with a typed error when one has not:
//!
//! - A breadth-first instantiation engine brings a module and its static
//!   imports to `Linked`, visiting each module once, cycles included
//! - Deferred results are inspected, never awaited
//! - `.json`, `.toml` and native addons bypass the module graph
//! - `require.cache` merges the CommonJS cache with the module registry
//!
//! Parsing, linking and resolution are supplied by the embedder through
//! [`ModuleHost`]. [`FsHost`] is a filesystem implementation that scans
//! sources statically.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cinder_loader::{FsHost, LoaderConfig, ModuleLoader, Require};
//!
//! let config = LoaderConfig::default();
//! let loader = ModuleLoader::new(FsHost::new(&config), config);
//! let require = Require::new(&loader, "/app/main.js");
//! let exports = require.call_str("./config.json")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod deferred;
pub mod dispatch;
pub mod error;
pub mod fs_host;
pub mod host;
pub mod instantiate;
pub mod loader;
pub mod registry;
pub mod require;

// Re-exports
pub use cache::{CacheStore, CjsCache, CjsModule, DualStoreCache};
pub use config::LoaderConfig;
pub use deferred::{DeferredValue, Rejection, Resolver, Settlement, force_settle};
pub use dispatch::ModuleKind;
pub use error::{LoaderError, ModuleLoadError, Result};
pub use fs_host::FsHost;
pub use host::{ModuleHost, ParsedModule, SourceText};
pub use instantiate::InstantiationEngine;
pub use loader::{ModuleLoader, StatsSnapshot};
pub use registry::{ModuleEntry, ModuleRegistry, ModuleState};
pub use require::{Require, require, require_cache, require_resolve};

/// Version of the loader
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
