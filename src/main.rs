// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! cinder CLI - load a module synchronously and print its exports

use anyhow::Context;
use cinder_loader::fs_host::canonical_key;
use cinder_loader::{CacheStore, FsHost, LoaderConfig, ModuleLoader, Require, VERSION};
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "cinder",
    about = "Synchronous require() over an ES module graph",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Module to require
    entry: PathBuf,

    /// Print the module graph after loading
    #[arg(long)]
    graph: bool,

    /// Print the require.cache keys after loading
    #[arg(long)]
    cache: bool,

    /// Config file merged over the project config
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let entry = cli
        .entry
        .canonicalize()
        .with_context(|| format!("cannot open '{}'", cli.entry.display()))?;
    let config = load_config(&entry, cli.config.as_deref())?;

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(format!("cinder_loader={}", level))
        .with_writer(std::io::stderr)
        .init();

    let key = canonical_key(&entry);
    let loader = ModuleLoader::new(FsHost::new(&config), config);
    let require = Require::new(&loader, key.clone());

    let exports = require.call_str(&key)?;
    println!("{}", serde_json::to_string_pretty(&exports)?);

    if cli.graph {
        print_graph(&loader, &key);
    }
    if cli.cache {
        println!("{}", "require.cache".cyan().bold());
        for cached in require.cache().keys() {
            println!("  {}", cached);
        }
    }

    let stats = loader.stats();
    tracing::info!(
        "{} loads, {} cache hits, {} instantiations",
        stats.loads,
        stats.cache_hits,
        stats.instantiations
    );
    Ok(())
}

fn load_config(entry: &Path, explicit: Option<&Path>) -> anyhow::Result<LoaderConfig> {
    let project_dir = entry.parent().unwrap_or(Path::new("."));
    let mut config = LoaderConfig::load(project_dir)?;
    if let Some(path) = explicit {
        config.merge_from_file(path)?;
    }
    Ok(config)
}

fn print_graph(loader: &ModuleLoader<FsHost>, root: &str) {
    println!("{}", "graph".cyan().bold());
    for entry in loader.registry().graph(root) {
        println!("  {} {}", entry.key(), format!("[{}]", entry.state()).dimmed());
        for dep in entry.dependency_keys() {
            println!("    -> {}", dep);
        }
    }
}
