//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up x4 CLI defaults.

use crate::cli::Overrides;
use anyhow::{Context, Result};
use std::path::Path;
use x4::Config;

pub fn handle(config_path: &Path, overrides: &Overrides, show: bool) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;

    if show {
        show_config(&config, config_path);
        return Ok(());
    }

    let before = config.clone();
    let detected = super::apply_overrides(&mut config, overrides)?;
    if config == before {
        show_usage();
        return Ok(());
    }

    config
        .save(config_path)
        .with_context(|| format!("Failed to save config to {}", config_path.display()))?;
    if detected > 0 {
        println!("Detected {detected} extensions");
    }
    println!("Config saved to: {}", config_path.display());
    Ok(())
}

fn show_config(config: &Config, path: &Path) {
    println!("Config file:   {}", path.display());
    println!("Game:          {}", config.game_path.display());
    println!("Catalog tool:  {}", config.cat_tool.display());
    if let Some(launcher) = &config.tool_launcher {
        println!("Launcher:      {}", launcher.display());
    }
    println!("Extract to:    {}", config.extraction_path.display());
    println!("Database:      {}", config.database_path.display());
    println!("Language:      {}", config.language);
    println!("Tool timeout:  {}s", config.tool_timeout_secs);
    println!("Cleanup:       {}", config.cleanup_after_extraction);

    if config.layers.is_empty() {
        println!("Layers:        none");
        return;
    }
    println!("Layers:");
    for layer in &config.layers {
        println!(
            "  {:<24} priority {:>3}  {}  {}",
            layer.id,
            layer.priority,
            if layer.enabled { "enabled " } else { "disabled" },
            layer.path.display()
        );
    }
}

fn show_usage() {
    println!("Usage: x4 configure --game PATH [--tool PATH] [--out DIR] [--db PATH] [--language N]");
    println!("   or: x4 configure --detect-layers");
    println!("   or: x4 configure --show");
}
