//! Command handlers for the x4 CLI
//!
//! Each subcommand has its own module with a `handle` function.

pub mod archives;
pub mod configure;
pub mod extract;
pub mod merge;
pub mod text;

use crate::cli::Overrides;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use x4::Config;

/// The config file to use: the one given, else the per-user default
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path().context("Could not locate the config file"),
    }
}

/// Apply command-line overrides, returning how many layers were detected
pub fn apply_overrides(config: &mut Config, overrides: &Overrides) -> Result<usize> {
    if let Some(game) = &overrides.game {
        config.game_path = game.clone();
    }
    if let Some(tool) = &overrides.tool {
        config.cat_tool = tool.clone();
    }
    if let Some(launcher) = &overrides.launcher {
        config.tool_launcher = Some(launcher.clone());
    }
    if let Some(out) = &overrides.out {
        config.extraction_path = out.clone();
    }
    if let Some(db) = &overrides.db {
        config.database_path = db.clone();
    }
    if let Some(language) = overrides.language {
        config.language = language;
    }

    if !overrides.detect_layers {
        return Ok(0);
    }
    config.detect_layers().with_context(|| {
        format!(
            "Failed to detect extensions under {}",
            config.game_path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let mut config = Config::default();
        let overrides = Overrides {
            out: Some(PathBuf::from("/tmp/x4-out")),
            language: Some(49),
            ..Overrides::default()
        };
        assert_eq!(apply_overrides(&mut config, &overrides).unwrap(), 0);
        assert_eq!(config.extraction_path, PathBuf::from("/tmp/x4-out"));
        assert_eq!(config.language, 49);
        assert_eq!(config.cat_tool, Config::default().cat_tool);
        assert!(config.tool_launcher.is_none());
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = config_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("custom.toml"));
    }
}
