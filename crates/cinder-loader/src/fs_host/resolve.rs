// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Path resolution for the filesystem host

use crate::error::{LoaderError, Result};
use std::path::{Path, PathBuf};

/// Resolves relative and absolute file specifiers to canonical keys
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// File extensions to try
    extensions: Vec<String>,
}

impl PathResolver {
    /// Create a resolver trying `extensions` in order
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Check if a specifier is relative or absolute
    pub fn is_path_like(specifier: &str) -> bool {
        specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier == "."
            || specifier == ".."
            || Path::new(specifier).is_absolute()
    }

    /// Resolve a module specifier written in the module `from`
    pub fn resolve(&self, specifier: &str, from: &str) -> Result<String> {
        if !Self::is_path_like(specifier) {
            return Err(LoaderError::resolution(
                specifier,
                from,
                "only relative and absolute paths can be resolved",
            ));
        }

        let path = if Path::new(specifier).is_absolute() {
            PathBuf::from(specifier)
        } else {
            let from = Path::new(from);
            let parent_dir = if from.is_dir() {
                from
            } else {
                from.parent().unwrap_or(Path::new("."))
            };
            parent_dir.join(specifier)
        };

        self.resolve_file(&path)
            .map(|resolved| canonical_key(&resolved))
            .ok_or_else(|| LoaderError::resolution(specifier, from, "module not found"))
    }

    /// Resolve a file path
    fn resolve_file(&self, path: &Path) -> Option<PathBuf> {
        // Try exact path first
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        // Try appending each extension to the full file name
        if let Some(filename) = path.file_name() {
            for ext in &self.extensions {
                let mut filename = filename.to_os_string();
                filename.push(ext);
                let with_ext = path.with_file_name(filename);
                if with_ext.is_file() {
                    return Some(with_ext);
                }
            }
        }

        // Try as directory with index file
        if path.is_dir() {
            return self
                .extensions
                .iter()
                .map(|ext| path.join(format!("index{}", ext)))
                .find(|index| index.is_file());
        }

        None
    }
}

/// Canonical key for an existing file
pub fn canonical_key(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
