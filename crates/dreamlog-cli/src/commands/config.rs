//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use dreamlog_core::Config;

use crate::output::{Output, OutputFormat};

fn or_unset(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "items_per_page": config.items_per_page,
                    "endless_increment": config.endless_increment,
                    "delete_timeout_secs": config.delete_timeout_secs,
                    "search_debounce_ms": config.search_debounce_ms,
                    "log_level": config.log_level,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:            {}", config.data_dir.display());
            println!("  items_per_page:      {}", config.items_per_page);
            println!("  endless_increment:   {}", config.endless_increment);
            println!("  delete_timeout_secs: {}", config.delete_timeout_secs);
            println!("  search_debounce_ms:  {}", config.search_debounce_ms);
            println!("  log_level:           {}", config.log_level);
            println!("  log_file:            {}", or_unset(config.log_file.as_ref()));
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value and write the config file
pub fn set(key: String, value: String, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    config.set(&key, &value)?;

    let path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&path)
        .with_context(|| format!("Failed to save configuration to {:?}", path))?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}
