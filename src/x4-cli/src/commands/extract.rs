//! Full extraction into the catalog database

use crate::cli::Overrides;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use x4::{Config, Pipeline, RunSummary, Tally, TracingObserver};
use x4_db::SqliteDb;

pub fn handle(config_path: &Path, overrides: &Overrides, json: bool) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    let detected = super::apply_overrides(&mut config, overrides)?;
    if detected > 0 {
        tracing::info!("Detected {detected} additional extensions");
    }

    config.validate()?;

    let db = SqliteDb::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;
    let tool = config.cat_tool();

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );
    let bar = pb.clone();
    let observer = TracingObserver::new().with_progress(move |progress| {
        bar.set_position((progress.fraction * 100.0).round() as u64);
        bar.set_message(progress.message.clone());
    });

    let result = Pipeline::new(&config, &tool, &db, &observer).run();
    pb.finish_and_clear();
    let summary = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        println!("Database: {}", config.database_path.display());
    }
    Ok(())
}

fn print_tally(label: &str, parsed: usize, tally: &Tally) {
    println!(
        "  {:<12} {:>6} parsed {:>6} kept {:>6} excluded",
        label,
        parsed,
        tally.kept,
        tally.excluded_total()
    );
    for (reason, count) in &tally.excluded {
        println!("    {count:>6}  {reason}");
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Extraction complete");
    println!("  Archives:   {}", summary.archives);
    if !summary.merged_documents.is_empty() {
        println!("  Merged:     {}", summary.merged_documents.join(", "));
    }
    if !summary.merge_notes.is_empty() {
        println!("  Merge notes: {}", summary.merge_notes.len());
    }
    println!(
        "  Text:       {} entries, {} unresolved references",
        summary.text_entries, summary.unresolved_references
    );

    let parsed = &summary.parsed;
    let tallies = &summary.tallies;
    print_tally("Craft", parsed.crafts, &tallies.crafts);
    print_tally("Weapons", parsed.weapons, &tallies.weapons);
    print_tally("Shields", parsed.shields, &tallies.shields);
    print_tally("Engines", parsed.engines, &tallies.engines);
    print_tally("Thrusters", parsed.thrusters, &tallies.thrusters);
    println!("  Consumables  {:>6} from {} wares", tallies.consumables.kept, parsed.wares);

    let skipped = summary.skipped.total();
    if skipped > 0 {
        println!("  Skipped {skipped} documents with no usable definition");
    }
    println!(
        "Stored {} craft, {} slots, {} equipment, {} consumables",
        summary.persisted.crafts,
        summary.persisted.slots,
        summary.persisted.equipment,
        summary.persisted.consumables
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_config_leaves_no_database() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("catalog.db");
        let overrides = Overrides {
            game: Some(dir.path().join("no-such-game")),
            db: Some(db.clone()),
            ..Overrides::default()
        };

        let error = handle(&dir.path().join("config.toml"), &overrides, false).unwrap_err();
        assert!(error.to_string().contains("no-such-game"));
        assert!(!db.exists());
    }
}
