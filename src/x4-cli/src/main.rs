mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "x4=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = commands::config_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract { overrides, json } => {
            commands::extract::handle(&config_path, &overrides, json)?;
        }

        Commands::Archives {
            game,
            detect_layers,
        } => {
            commands::archives::handle(&config_path, game, detect_layers)?;
        }

        Commands::Merge {
            base,
            diffs,
            output,
        } => {
            commands::merge::handle(&base, &diffs, output.as_deref())?;
        }

        Commands::Text {
            root,
            reference,
            language,
        } => {
            commands::text::handle(&root, &reference, language)?;
        }

        Commands::Configure { overrides, show } => {
            commands::configure::handle(&config_path, &overrides, show)?;
        }
    }

    Ok(())
}
