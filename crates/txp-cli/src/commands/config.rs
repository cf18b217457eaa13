//! Config command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};
use txp_core::config::{self, ClientConfig};

use crate::output::{print_error, print_info, print_success, print_warning};

/// Path of the config file in use: the `--config` flag or the default
pub fn resolve_config_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Show the effective configuration
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(config_path);

    if path.exists() {
        print_info(&format!("Configuration file: {:?}", path));
    } else {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Showing defaults; run 'txproc config init' to create one");
    }
    println!();

    let config: ClientConfig = config::load_config_or_default(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

/// Write a default configuration file
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve_config_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &ClientConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}
