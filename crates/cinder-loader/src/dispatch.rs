// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Extension-based routing of resolved modules

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use serde_json::Value;

/// How a resolved module is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// JSON data file
    Json,
    /// TOML data file
    Toml,
    /// Native addon
    Native,
    /// JavaScript, loaded through the ES module graph
    EsModule,
}

impl ModuleKind {
    /// Pick the loader for a canonical key by its suffix
    pub fn from_key(key: &str, config: &LoaderConfig) -> Self {
        let has_suffix = |exts: &[String]| exts.iter().any(|ext| key.ends_with(ext.as_str()));

        if has_suffix(&config.json_extensions) {
            ModuleKind::Json
        } else if has_suffix(&config.native_extensions) {
            ModuleKind::Native
        } else if has_suffix(&config.toml_extensions) {
            ModuleKind::Toml
        } else {
            ModuleKind::EsModule
        }
    }

    /// Whether modules of this kind are loaded through the ES module graph
    pub fn in_module_graph(self) -> bool {
        matches!(self, ModuleKind::EsModule)
    }
}

/// Parse a JSON data module
pub fn parse_json_module(key: &str, content: &str) -> Result<Value> {
    serde_json::from_str(content).map_err(|source| LoaderError::Json {
        key: key.to_string(),
        source,
    })
}

/// Parse a TOML data module into the JSON value model
pub fn parse_toml_module(key: &str, content: &str) -> Result<Value> {
    let table: toml::Table = toml::from_str(content).map_err(|source| LoaderError::Toml {
        key: key.to_string(),
        source,
    })?;
    Ok(toml_to_value(toml::Value::Table(table)))
}

/// Convert toml::Value to serde_json::Value
fn toml_to_value(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_value).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_module_kind_from_key() {
        let config = LoaderConfig::default();
        assert_eq!(ModuleKind::from_key("/a/x.json", &config), ModuleKind::Json);
        assert_eq!(ModuleKind::from_key("/a/x.toml", &config), ModuleKind::Toml);
        assert_eq!(ModuleKind::from_key("/a/x.node", &config), ModuleKind::Native);
        assert_eq!(ModuleKind::from_key("/a/x.js", &config), ModuleKind::EsModule);
        assert_eq!(ModuleKind::from_key("/a/json", &config), ModuleKind::EsModule);
        assert!(ModuleKind::EsModule.in_module_graph());
        assert!(!ModuleKind::Toml.in_module_graph());
        assert!(!ModuleKind::Native.in_module_graph());
    }

    #[test]
    fn test_custom_extensions() {
        let mut config = LoaderConfig::default();
        config.set("json_extensions", ".json,.json5");
        assert_eq!(ModuleKind::from_key("/x.json5", &config), ModuleKind::Json);
    }

    #[test]
    fn test_parse_toml_module() {
        let value = parse_toml_module(
            "/c.toml",
            r#"
            k = 1
            name = "cinder"
            ratio = 0.5
            [server]
            ports = [80, 443]
            "#,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "k": 1,
                "name": "cinder",
                "ratio": 0.5,
                "server": { "ports": [80, 443] }
            })
        );
    }

    #[test]
    fn test_parse_errors_carry_key() {
        let err = parse_json_module("/bad.json", "{").unwrap_err();
        assert_eq!(err.module_key(), Some("/bad.json"));
        let err = parse_toml_module("/bad.toml", "k = ").unwrap_err();
        assert_eq!(err.module_key(), Some("/bad.toml"));
    }
}
