// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Name used at the `require()` boundary for load failures.
pub type ModuleLoadError = LoaderError;

/// Errors that can occur while loading a module
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Specifier could not be turned into a canonical key
    #[error("Cannot resolve module '{specifier}' from '{from}': {reason}")]
    Resolution {
        /// Module specifier as written
        specifier: String,
        /// Key of the importing module
        from: String,
        /// Reason for failure
        reason: String,
    },

    /// Source of a module (or one of its dependencies) could not be read or parsed
    #[error("{reason}")]
    ParseOrFetchFailed {
        /// Key of the module that failed
        key: String,
        /// Rejection message
        reason: String,
    },

    /// The synchronous contract was broken by a genuinely deferred step
    #[error(
        "require() cannot be used on module \"{key}\" because it (or one of its dependencies) \
         is still loading asynchronously, e.g. it uses top-level await. Use import() instead"
    )]
    AsyncUnsupported {
        /// Key of the module that could not settle
        key: String,
    },

    /// Wrong argument type passed to `require()`
    #[error("TypeError: {0}")]
    InvalidArgument(String),

    /// Native addon failed to load
    #[error("Failed to load native addon '{key}': {reason}")]
    NativeAddon {
        /// Key of the addon
        key: String,
        /// Reason for failure
        reason: String,
    },

    /// JSON data module could not be parsed
    #[error("Failed to parse JSON module '{key}': {source}")]
    Json {
        /// Key of the data module
        key: String,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// TOML data module could not be parsed
    #[error("Failed to parse TOML module '{key}': {source}")]
    Toml {
        /// Key of the data module
        key: String,
        /// Underlying parse error
        source: toml::de::Error,
    },

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LoaderError {
    /// Create a resolution error
    pub fn resolution(
        specifier: impl Into<String>,
        from: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            specifier: specifier.into(),
            from: from.into(),
            reason: reason.into(),
        }
    }

    /// Create an async-unsupported error for `key`
    pub fn async_unsupported(key: impl Into<String>) -> Self {
        Self::AsyncUnsupported { key: key.into() }
    }

    /// Key of the module this error is attributed to, if any
    pub fn module_key(&self) -> Option<&str> {
        match self {
            Self::ParseOrFetchFailed { key, .. }
            | Self::AsyncUnsupported { key }
            | Self::NativeAddon { key, .. }
            | Self::Json { key, .. }
            | Self::Toml { key, .. } => Some(key),
            Self::Resolution { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Whether this error signals genuine suspension rather than a broken module
    pub fn is_async_unsupported(&self) -> bool {
        matches!(self, Self::AsyncUnsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_unsupported_message_names_key() {
        let err = LoaderError::async_unsupported("/app/tla.mjs");
        let msg = err.to_string();
        assert!(msg.contains("\"/app/tla.mjs\""));
        assert!(msg.contains("import()"));
        assert!(err.is_async_unsupported());
    }

    #[test]
    fn test_module_key() {
        let err = LoaderError::ParseOrFetchFailed {
            key: "/a.js".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(err.module_key(), Some("/a.js"));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(LoaderError::InvalidArgument("x".into()).module_key(), None);
    }
}
