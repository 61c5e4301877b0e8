// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end loading from disk

use cinder_loader::fs_host::canonical_key;
use cinder_loader::{
    CacheStore, FsHost, LoaderConfig, LoaderError, ModuleLoader, ModuleState, Require,
};
use serde_json::json;
use std::fs;
use std::path::Path;

fn loader() -> ModuleLoader<FsHost> {
    let config = LoaderConfig::default();
    ModuleLoader::new(FsHost::new(&config), config)
}

fn entry(dir: &Path) -> String {
    fs::write(dir.join("main.js"), "").unwrap();
    canonical_key(&dir.join("main.js"))
}

#[test]
fn test_commonjs_style_graph() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.js"),
        "const b = require(\"./b.js\");\nmodule.exports = {v: 1};\n",
    )
    .unwrap();
    fs::write(dir.path().join("b.js"), "module.exports = {v: 2};\n").unwrap();
    let main = entry(dir.path());

    let loader = loader();
    let require = Require::new(&loader, main);
    assert_eq!(require.call_str("./a.js").unwrap(), json!({ "v": 1 }));

    let a = canonical_key(&dir.path().join("a.js"));
    let b = canonical_key(&dir.path().join("b.js"));
    let keys = require.cache().keys();
    assert!(keys.contains(&a));
    assert!(keys.contains(&b));
    assert_eq!(require.call_str("./b").unwrap(), json!({ "v": 2 }));
    assert_eq!(loader.registry().state_of(&b), ModuleState::Evaluated);
}

#[test]
fn test_data_and_addon_dependencies_bypass_graph() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.js"),
        "const conf = require('./conf.json');\nconst addon = require('./addon.node');\nmodule.exports = {v: 1};\n",
    )
    .unwrap();
    fs::write(dir.path().join("conf.json"), r#"{"k": 1}"#).unwrap();
    fs::write(dir.path().join("addon.node"), [0x7fu8, b'E', b'L', b'F', 0xff, 0xfe]).unwrap();
    let main = entry(dir.path());

    let loader = loader();
    let require = Require::new(&loader, main);
    assert_eq!(require.call_str("./a.js").unwrap(), json!({ "v": 1 }));

    let conf = canonical_key(&dir.path().join("conf.json"));
    assert!(!loader.registry().contains(&conf));
    assert!(!loader
        .registry()
        .contains(&canonical_key(&dir.path().join("addon.node"))));
    assert_eq!(require.call_str("./conf.json").unwrap(), json!({ "k": 1 }));
}

#[test]
fn test_es_module_exports() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("lib.mjs"),
        "import { helper } from './helper.mjs';\nexport const answer = 42;\nexport default 'lib';\n",
    )
    .unwrap();
    fs::write(dir.path().join("helper.mjs"), "export const helper = null;\n").unwrap();
    let main = entry(dir.path());

    let loader = loader();
    let exports = loader.require(&json!("./lib.mjs"), &main).unwrap();
    assert_eq!(exports, json!({ "answer": 42, "default": "lib" }));
    assert_eq!(loader.registry().len(), 2);
}

#[test]
fn test_data_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("package.json"), r#"{"name": "demo"}"#).unwrap();
    fs::write(dir.path().join("settings.toml"), "debug = true\n").unwrap();
    let main = entry(dir.path());

    let loader = loader();
    let require = Require::new(&loader, main);
    assert_eq!(require.call_str("./package.json").unwrap(), json!({ "name": "demo" }));
    assert_eq!(require.call_str("./settings.toml").unwrap(), json!({ "debug": true }));
    assert!(loader.registry().is_empty());
}

#[test]
fn test_top_level_await_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("tla.mjs"),
        "const config = await import('./config.mjs');\nexport const ready = true;\n",
    )
    .unwrap();
    fs::write(dir.path().join("uses-tla.js"), "require('./tla.mjs');\n").unwrap();
    let main = entry(dir.path());

    let loader = loader();
    let err = loader.require(&json!("./uses-tla.js"), &main).unwrap_err();
    assert!(err.is_async_unsupported());
    assert_eq!(
        err.module_key(),
        Some(canonical_key(&dir.path().join("uses-tla.js")).as_str())
    );

    let tla = canonical_key(&dir.path().join("tla.mjs"));
    assert_eq!(loader.registry().state_of(&tla), ModuleState::Linked);
    assert!(loader.cache().get(&tla).is_none());
}

#[test]
fn test_missing_dependency() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.js"), "import './gone.js';\n").unwrap();
    let main = entry(dir.path());

    let err = loader().require(&json!("./a.js"), &main).unwrap_err();
    assert!(matches!(
        err,
        LoaderError::Resolution { ref specifier, .. } if specifier == "./gone.js"
    ));
}

#[test]
fn test_native_addons_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("binding.node"), [0u8; 4]).unwrap();
    let main = entry(dir.path());

    let err = loader().require(&json!("./binding.node"), &main).unwrap_err();
    assert!(matches!(err, LoaderError::NativeAddon { .. }));
}
