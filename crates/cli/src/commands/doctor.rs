//! `stride doctor`: Diagnose configuration and storage.

use std::path::Path;
use stride_config::AppConfig;

use super::{CliResult, load_config};

pub fn run(config_path: Option<&Path>) -> CliResult {
    println!("Stride Doctor");
    println!("=============\n");

    let mut issues = 0;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if path.exists() {
        println!("  ok    Config file found at {}", path.display());
    } else {
        println!("  info  No config file at {}, using defaults", path.display());
    }

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ok    Config valid");
            config
        }
        Err(e) => {
            println!("  FAIL  Config invalid: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    match config.catalog() {
        Ok(catalog) => println!("  ok    {} experiment(s) loaded", catalog.experiments().len()),
        Err(e) => {
            println!("  FAIL  Experiments invalid: {e}");
            issues += 1;
        }
    }

    let store_dir = config.store_dir();
    if store_dir.is_dir() {
        println!("  ok    Store directory {}", store_dir.display());
    } else {
        println!(
            "  warn  Store directory {} does not exist; every user starts empty",
            store_dir.display()
        );
        issues += 1;
    }

    if config.has_api_key() {
        println!("  ok    API key configured (model {})", config.generation.model);
    } else {
        println!("  warn  No API key; tips come from the algorithms tier");
        println!("        Set STRIDE_API_KEY or OPENAI_API_KEY to enable generation");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }
    Ok(())
}
