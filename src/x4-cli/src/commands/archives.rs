//! Archive load order listing

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use x4::Config;
use x4_cat::ArchiveSequence;

pub fn handle(config_path: &Path, game: Option<PathBuf>, detect_layers: bool) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    if let Some(game) = game {
        config.game_path = game;
    }
    if config.game_path.as_os_str().is_empty() {
        bail!("No game path configured. Pass --game or run `x4 configure --game PATH`");
    }
    if detect_layers {
        config.detect_layers()?;
    }

    let sequence = ArchiveSequence::resolve(&config.game_path, &config.layers);
    if sequence.is_empty() {
        bail!("No archives found under {}", config.game_path.display());
    }

    let mut position = 0;
    println!("Base ({} archives)", sequence.base.len());
    for archive in &sequence.base {
        position += 1;
        println!("  {position:>3}  {}", archive.display());
    }
    for layer in &sequence.layers {
        println!(
            "{} (priority {}, {} archives)",
            layer.layer_id,
            layer.priority,
            layer.archives.len()
        );
        for archive in &layer.archives {
            position += 1;
            println!("  {position:>3}  {}", archive.display());
        }
    }

    let disabled: Vec<_> = config
        .layers
        .iter()
        .filter(|layer| !layer.enabled)
        .map(|layer| layer.id.as_str())
        .collect();
    if !disabled.is_empty() {
        println!("Disabled: {}", disabled.join(", "));
    }
    Ok(())
}
