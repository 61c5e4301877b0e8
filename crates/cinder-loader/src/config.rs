// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project-level config file
pub const PROJECT_CONFIG_FILE: &str = "cinder.toml";

/// Configuration for the module loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Suffixes loaded as JSON data
    pub json_extensions: Vec<String>,

    /// Suffixes loaded as TOML data
    pub toml_extensions: Vec<String>,

    /// Suffixes loaded as native addons
    pub native_extensions: Vec<String>,

    /// Suffixes tried, in order, when resolving an extensionless path
    pub resolve_extensions: Vec<String>,

    /// Log level for the loader
    pub log_level: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            json_extensions: vec![".json".to_string()],
            toml_extensions: vec![".toml".to_string()],
            native_extensions: vec![".node".to_string()],
            resolve_extensions: vec![
                ".js".to_string(),
                ".mjs".to_string(),
                ".cjs".to_string(),
                ".json".to_string(),
                ".toml".to_string(),
                ".node".to_string(),
            ],
            log_level: "warn".to_string(),
        }
    }
}

/// Partial config as written in a file; absent keys keep earlier values
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    json_extensions: Option<Vec<String>>,
    toml_extensions: Option<Vec<String>>,
    native_extensions: Option<Vec<String>>,
    resolve_extensions: Option<Vec<String>>,
    log_level: Option<String>,
}

impl LoaderConfig {
    /// Load configuration from default locations.
    ///
    /// Later sources win: user config, then `cinder.toml` in `project_dir`,
    /// then `CINDER_*` environment variables.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut config = LoaderConfig::default();

        if let Some(user_config_path) = user_config_path() {
            if user_config_path.is_file() {
                config.merge_from_file(&user_config_path)?;
            }
        }

        let project_config = project_dir.join(PROJECT_CONFIG_FILE);
        if project_config.is_file() {
            config.merge_from_file(&project_config)?;
        }

        config.load_from_env();

        Ok(config)
    }

    /// Parse a complete config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config = LoaderConfig::default();
        config.merge_toml(content)?;
        Ok(config)
    }

    /// Merge configuration from a file.
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.merge_toml(&content)
            .map_err(|e| LoaderError::Config(format!("{}: {}", path.display(), e)))
    }

    fn merge_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| LoaderError::Config(e.to_string()))?;

        if let Some(exts) = file.json_extensions {
            self.json_extensions = normalize_extensions(exts);
        }
        if let Some(exts) = file.toml_extensions {
            self.toml_extensions = normalize_extensions(exts);
        }
        if let Some(exts) = file.native_extensions {
            self.native_extensions = normalize_extensions(exts);
        }
        if let Some(exts) = file.resolve_extensions {
            self.resolve_extensions = normalize_extensions(exts);
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    fn load_from_env(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("CINDER_") {
                self.set(&config_key.to_lowercase(), &value);
            }
        }
    }

    /// Set a configuration value; list values are comma-separated.
    pub fn set(&mut self, key: &str, value: &str) {
        let list = || normalize_extensions(value.split(',').map(str::to_string).collect());
        match key {
            "json_extensions" => self.json_extensions = list(),
            "toml_extensions" => self.toml_extensions = list(),
            "native_extensions" => self.native_extensions = list(),
            "resolve_extensions" => self.resolve_extensions = list(),
            "log_level" => self.log_level = value.to_string(),
            _ => tracing::debug!("Ignoring unknown config key {}", key),
        }
    }
}

/// Trim entries and make sure each starts with a dot
fn normalize_extensions(exts: Vec<String>) -> Vec<String> {
    exts.into_iter()
        .map(|ext| ext.trim().to_string())
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}

/// Get the user config file path.
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cinder").join("config.toml"))
}
