//! Progress and diagnostics reporting
//!
//! Every stage and parser receives an [`Observer`] explicitly. Calls are
//! notifications only; the pipeline never waits on or inspects a result.

use std::fmt;
use tracing::Level;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validate,
    PrepareWorkingDirectory,
    Extract,
    DiffMerge,
    LoadTextTable,
    ParseIndexes,
    ParseWares,
    ParseCraft,
    ParseWeapons,
    ParseProjectiles,
    ParseShields,
    ParseEngines,
    ParseThrusters,
    BuildPersistenceBatch,
    Persist,
    WriteRunMetadata,
    Complete,
}

impl Stage {
    /// Progress reported when the stage starts
    pub fn fraction(&self) -> f64 {
        match self {
            Self::Validate => 0.0,
            Self::PrepareWorkingDirectory => 0.05,
            Self::Extract => 0.10,
            Self::DiffMerge => 0.25,
            Self::LoadTextTable => 0.30,
            Self::ParseIndexes => 0.40,
            Self::ParseWares => 0.50,
            Self::ParseCraft => 0.60,
            Self::ParseWeapons => 0.65,
            Self::ParseProjectiles => 0.68,
            Self::ParseShields => 0.70,
            Self::ParseEngines => 0.73,
            Self::ParseThrusters => 0.76,
            Self::BuildPersistenceBatch => 0.80,
            Self::Persist => 0.85,
            Self::WriteRunMetadata => 0.95,
            Self::Complete => 1.0,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Validate => "Validating configuration",
            Self::PrepareWorkingDirectory => "Preparing working directory",
            Self::Extract => "Extracting game archives",
            Self::DiffMerge => "Merging extension diffs",
            Self::LoadTextTable => "Loading text table",
            Self::ParseIndexes => "Parsing name indexes",
            Self::ParseWares => "Parsing wares",
            Self::ParseCraft => "Parsing craft",
            Self::ParseWeapons => "Parsing weapons",
            Self::ParseProjectiles => "Parsing projectiles",
            Self::ParseShields => "Parsing shields",
            Self::ParseEngines => "Parsing engines",
            Self::ParseThrusters => "Parsing thrusters",
            Self::BuildPersistenceBatch => "Building catalog batch",
            Self::Persist => "Writing catalog",
            Self::WriteRunMetadata => "Writing run metadata",
            Self::Complete => "Extraction complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::PrepareWorkingDirectory => "prepare",
            Self::Extract => "extract",
            Self::DiffMerge => "diff-merge",
            Self::LoadTextTable => "load-text",
            Self::ParseIndexes => "parse-indexes",
            Self::ParseWares => "parse-wares",
            Self::ParseCraft => "parse-craft",
            Self::ParseWeapons => "parse-weapons",
            Self::ParseProjectiles => "parse-projectiles",
            Self::ParseShields => "parse-shields",
            Self::ParseEngines => "parse-engines",
            Self::ParseThrusters => "parse-thrusters",
            Self::BuildPersistenceBatch => "build-batch",
            Self::Persist => "persist",
            Self::WriteRunMetadata => "write-metadata",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// One progress notification
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub stage: Stage,
    pub message: String,
    /// In `[0, 1]`, never decreasing within a run
    pub fraction: f64,
}

pub trait Observer {
    fn progress(&self, progress: &Progress);

    fn diagnostic(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.diagnostic(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.diagnostic(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.diagnostic(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.diagnostic(Level::ERROR, message);
    }
}

type ProgressCallback = Box<dyn Fn(&Progress) + Send + Sync>;

/// Forwards diagnostics to `tracing` and progress to an optional callback
#[derive(Default)]
pub struct TracingObserver {
    on_progress: Option<ProgressCallback>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, callback: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for TracingObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingObserver")
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl Observer for TracingObserver {
    fn progress(&self, progress: &Progress) {
        tracing::info!(
            stage = %progress.stage,
            "[{:.0}%] {}",
            progress.fraction * 100.0,
            progress.message
        );
        if let Some(callback) = &self.on_progress {
            callback(progress);
        }
    }

    fn diagnostic(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!("{message}");
        } else if level == Level::WARN {
            tracing::warn!("{message}");
        } else if level == Level::INFO {
            tracing::info!("{message}");
        } else if level == Level::DEBUG {
            tracing::debug!("{message}");
        } else {
            tracing::trace!("{message}");
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn progress(&self, _progress: &Progress) {}

    fn diagnostic(&self, _level: Level, _message: &str) {}
}
