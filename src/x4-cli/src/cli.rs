//! CLI argument definitions for x4

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "x4")]
#[command(about = "X4 game data extractor", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "X4_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that override the saved config for one invocation
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// X4 installation directory
    #[arg(long)]
    pub game: Option<PathBuf>,

    /// Catalog tool executable
    #[arg(long)]
    pub tool: Option<PathBuf>,

    /// Program that runs the catalog tool (e.g. wine)
    #[arg(long)]
    pub launcher: Option<PathBuf>,

    /// Working directory for extracted files
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// SQLite database to rebuild
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Text table language id (44 is English)
    #[arg(long)]
    pub language: Option<u32>,

    /// Add installed extensions to the layer list
    #[arg(long)]
    pub detect_layers: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract game data and rebuild the catalog database
    #[command(visible_alias = "x")]
    Extract {
        #[command(flatten)]
        overrides: Overrides,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the archive load order
    #[command(visible_alias = "a")]
    Archives {
        /// X4 installation directory (uses the configured one if not provided)
        #[arg(long)]
        game: Option<PathBuf>,

        /// Include installed extensions not in the config
        #[arg(long)]
        detect_layers: bool,
    },

    /// Apply diff patches to a document
    #[command(visible_alias = "m")]
    Merge {
        /// Base document
        base: PathBuf,

        /// Diff documents, applied in order
        #[arg(required = true)]
        diffs: Vec<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a text reference against an extracted tree
    #[command(visible_alias = "t")]
    Text {
        /// Extraction root containing `t/`
        #[arg(long)]
        root: PathBuf,

        /// Reference or text to resolve, e.g. "{20101,10101}"
        reference: String,

        #[arg(long, default_value_t = x4::DEFAULT_LANGUAGE)]
        language: u32,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        #[command(flatten)]
        overrides: Overrides,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extract_overrides() {
        let cli = Cli::try_parse_from([
            "x4",
            "extract",
            "--game",
            "/games/X4",
            "--language",
            "49",
            "--detect-layers",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract { overrides, json } => {
                assert_eq!(overrides.game, Some(PathBuf::from("/games/X4")));
                assert_eq!(overrides.language, Some(49));
                assert!(overrides.detect_layers);
                assert!(!json);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_merge_requires_a_diff() {
        assert!(Cli::try_parse_from(["x4", "merge", "base.xml"]).is_err());
        assert!(Cli::try_parse_from(["x4", "merge", "base.xml", "a.xml", "b.xml"]).is_ok());
    }

    #[test]
    fn test_text_default_language() {
        let cli = Cli::try_parse_from(["x4", "text", "--root", "out", "{1,2}"]).unwrap();
        match cli.command {
            Commands::Text { language, .. } => assert_eq!(language, 44),
            _ => panic!("expected text"),
        }
    }
}
