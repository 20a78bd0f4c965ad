//! The full extraction run
//!
//! Stages run strictly in order, each consuming what the previous one left
//! on disk or in memory:
//!
//! validate → prepare → extract → diff-merge → load text → parse indexes →
//! parse entities → build batch → persist → write metadata
//!
//! A missing or malformed document is reported through the [`Observer`] and
//! skipped. Anything that stops a whole stage (invalid configuration, the
//! catalog tool failing or timing out, the database refusing the batch)
//! ends the run with a [`PipelineError`] naming the stage. The catalog is
//! only replaced once everything has been parsed, in one transaction.

use crate::config::{Config, ConfigError};
use crate::index::{NameIndex, COMPONENTS_INDEX, MACROS_INDEX};
use crate::normalize::{build_batch, ParsedEntities, Tallies};
use crate::observer::{Observer, Progress, Stage};
use crate::parse::projectile::by_macro;
use crate::parse::ware::WARES_FILE;
use crate::parse::{self, ParseContext, Parsed};
use crate::text::{TextResolver, TextTable};
use serde::Serialize;
use std::cell::Cell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use x4_cat::{ArchiveExtractor, ArchiveSequence, ExtractRequest};
use x4_db::{BatchCounts, CatalogRepository, RepoError, SCHEMA_VERSION};
use x4_xml::Document;

/// Documents that extensions patch with diffs rather than replace
pub const OVERLAID_DOCUMENTS: [&str; 3] = [WARES_FILE, MACROS_INDEX, COMPONENTS_INDEX];

/// Why a stage could not complete
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Archive(#[from] x4_cat::Error),

    #[error(transparent)]
    Repository(#[from] RepoError),

    #[error(transparent)]
    Document(#[from] x4_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A run that stopped at `stage`
#[derive(Debug, thiserror::Error)]
#[error("{} failed: {source}", .stage.describe())]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

fn failed_at<E: Into<StageError>>(stage: Stage) -> impl FnOnce(E) -> PipelineError {
    move |e| PipelineError {
        stage,
        source: e.into(),
    }
}

/// Per-type record counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub wares: usize,
    pub crafts: usize,
    pub weapons: usize,
    pub projectiles: usize,
    pub shields: usize,
    pub engines: usize,
    pub thrusters: usize,
}

impl EntityCounts {
    pub fn total(&self) -> usize {
        self.wares
            + self.crafts
            + self.weapons
            + self.projectiles
            + self.shields
            + self.engines
            + self.thrusters
    }
}

/// What a successful run did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Archives unpacked, in load order
    pub archives: usize,
    /// Overlaid documents rewritten from their merged layers
    pub merged_documents: Vec<String>,
    /// Diff operations that could not be applied
    pub merge_notes: Vec<String>,
    pub text_entries: usize,
    pub unresolved_references: usize,
    pub parsed: EntityCounts,
    /// Documents that produced no record
    pub skipped: EntityCounts,
    pub tallies: Tallies,
    pub persisted: BatchCounts,
}

/// One full extraction, from game archives to a rebuilt catalog
pub struct Pipeline<'a> {
    config: &'a Config,
    extractor: &'a dyn ArchiveExtractor,
    repository: &'a dyn CatalogRepository,
    observer: &'a dyn Observer,
    reached: Cell<f64>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        extractor: &'a dyn ArchiveExtractor,
        repository: &'a dyn CatalogRepository,
        observer: &'a dyn Observer,
    ) -> Self {
        Self {
            config,
            extractor,
            repository,
            observer,
            reached: Cell::new(0.0),
        }
    }

    fn enter(&self, stage: Stage) {
        self.report(stage, stage.describe().to_string());
    }

    fn report(&self, stage: Stage, message: String) {
        let fraction = stage.fraction().clamp(0.0, 1.0).max(self.reached.get());
        self.reached.set(fraction);
        self.observer.progress(&Progress {
            stage,
            message,
            fraction,
        });
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        self.reached.set(0.0);
        let mut summary = RunSummary::default();
        let root = self.config.extraction_path.as_path();

        self.enter(Stage::Validate);
        self.config.validate().map_err(failed_at(Stage::Validate))?;
        self.extractor
            .preflight()
            .map_err(failed_at(Stage::Validate))?;

        self.enter(Stage::PrepareWorkingDirectory);
        self.prepare_working_directory(root)
            .map_err(failed_at(Stage::PrepareWorkingDirectory))?;

        self.enter(Stage::Extract);
        let sequence = ArchiveSequence::resolve(&self.config.game_path, &self.config.layers);
        let archives = sequence.ordered();
        summary.archives = archives.len();
        self.observer.info(&format!(
            "Extracting {} archives ({} base, {} layers) to {}",
            archives.len(),
            sequence.base.len(),
            sequence.layers.len(),
            root.display()
        ));
        self.extractor
            .extract(&ExtractRequest::documents(archives, root))
            .map_err(failed_at(Stage::Extract))?;

        self.enter(Stage::DiffMerge);
        self.merge_overlaid(&sequence, root, &mut summary);

        self.enter(Stage::LoadTextTable);
        let table = TextTable::load(root, self.config.language, self.observer);
        summary.text_entries = table.len();
        let text = TextResolver::new(table);

        self.enter(Stage::ParseIndexes);
        let index = NameIndex::load(root, self.observer);

        let ctx = ParseContext::new(root, &text, &index, self.observer);
        let entities = self.parse_entities(&ctx, &mut summary);

        let unresolved = text.unresolved();
        summary.unresolved_references = unresolved.len();
        for (page, entry) in &unresolved {
            self.observer
                .debug(&format!("No text entry for {{{page},{entry}}}, left literal"));
        }

        self.enter(Stage::BuildPersistenceBatch);
        let (batch, tallies) = build_batch(entities, self.observer);
        summary.tallies = tallies;

        self.enter(Stage::Persist);
        summary.persisted = self
            .repository
            .replace_all(&batch)
            .map_err(failed_at(Stage::Persist))?;
        self.observer.info(&format!(
            "Stored {} craft ({} slots), {} equipment, {} consumables",
            summary.persisted.crafts,
            summary.persisted.slots,
            summary.persisted.equipment,
            summary.persisted.consumables
        ));

        self.enter(Stage::WriteRunMetadata);
        self.write_metadata(&summary.persisted)
            .map_err(failed_at(Stage::WriteRunMetadata))?;

        if self.config.cleanup_after_extraction {
            match fs::remove_dir_all(root) {
                Ok(()) => self
                    .observer
                    .info(&format!("Removed working directory {}", root.display())),
                Err(e) => self.observer.warn(&format!(
                    "Could not remove working directory {}: {e}",
                    root.display()
                )),
            }
        }

        self.enter(Stage::Complete);
        Ok(summary)
    }

    /// Empty the working directory so nothing from an earlier run is parsed
    fn prepare_working_directory(&self, root: &Path) -> std::io::Result<()> {
        if self.config.game_path.starts_with(root) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "working directory {} contains the game installation",
                    root.display()
                ),
            ));
        }
        if root.exists() {
            self.observer
                .info(&format!("Clearing previous extraction in {}", root.display()));
            fs::remove_dir_all(root)?;
        }
        fs::create_dir_all(root)
    }

    fn parse_entities(&self, ctx: &ParseContext<'_>, summary: &mut RunSummary) -> ParsedEntities {
        fn take<T>(parsed: Parsed<T>, count: &mut usize, skipped: &mut usize) -> Vec<T> {
            *count = parsed.records.len();
            *skipped = parsed.skipped;
            parsed.records
        }
        let (parsed, skipped) = (&mut summary.parsed, &mut summary.skipped);

        self.enter(Stage::ParseWares);
        let wares = take(parse::parse_wares(ctx), &mut parsed.wares, &mut skipped.wares);

        self.enter(Stage::ParseCraft);
        let crafts = take(parse::parse_craft(ctx), &mut parsed.crafts, &mut skipped.crafts);

        self.enter(Stage::ParseWeapons);
        let weapons = take(parse::parse_weapons(ctx), &mut parsed.weapons, &mut skipped.weapons);

        self.enter(Stage::ParseProjectiles);
        let projectiles = by_macro(take(
            parse::parse_projectiles(ctx),
            &mut parsed.projectiles,
            &mut skipped.projectiles,
        ));

        self.enter(Stage::ParseShields);
        let shields = take(parse::parse_shields(ctx), &mut parsed.shields, &mut skipped.shields);

        self.enter(Stage::ParseEngines);
        let engines = take(parse::parse_engines(ctx), &mut parsed.engines, &mut skipped.engines);

        self.enter(Stage::ParseThrusters);
        let thrusters = take(
            parse::parse_thrusters(ctx),
            &mut parsed.thrusters,
            &mut skipped.thrusters,
        );

        ParsedEntities {
            wares,
            crafts,
            weapons,
            projectiles,
            shields,
            engines,
            thrusters,
        }
    }

    /// Rebuild each overlaid document from its base copy plus every layer's copy
    fn merge_overlaid(&self, sequence: &ArchiveSequence, root: &Path, summary: &mut RunSummary) {
        if sequence.layers.is_empty() {
            self.observer.info("No layers enabled, nothing to merge");
            return;
        }

        for relative in OVERLAID_DOCUMENTS {
            match self.merge_document(sequence, root, relative, &mut summary.merge_notes) {
                Ok(true) => summary.merged_documents.push(relative.to_string()),
                Ok(false) => {}
                Err(e) => self
                    .observer
                    .warn(&format!("Could not merge {relative}: {e}")),
            }
        }
        self.observer.info(&format!(
            "Merged {} of {} overlaid documents",
            summary.merged_documents.len(),
            OVERLAID_DOCUMENTS.len()
        ));
    }

    /// Returns whether the working copy was rewritten
    fn merge_document(
        &self,
        sequence: &ArchiveSequence,
        root: &Path,
        relative: &str,
        notes: &mut Vec<String>,
    ) -> Result<bool, StageError> {
        let scratch = TempDir::new()?;

        let Some(base_path) =
            self.extractor
                .extract_file(&sequence.base, relative, &scratch.path().join("base"))?
        else {
            self.observer
                .debug(&format!("{relative} is not in the base archives"));
            return Ok(false);
        };
        let mut document = Document::from_file(&base_path)?;
        if document.is_diff() {
            self.observer
                .info(&format!("Base copy of {relative} is itself a diff, leaving it as extracted"));
            return Ok(false);
        }

        let mut layers_seen = 0;
        for (position, layer) in sequence.layers.iter().enumerate() {
            let output = scratch.path().join(format!("layer{position:02}"));
            let Some(path) = self.extractor.extract_file(&layer.archives, relative, &output)? else {
                continue;
            };
            let copy = Document::from_file(&path)?;
            layers_seen += 1;

            // A copy not rooted at <diff> is skipped with a note
            let merged = x4_xml::merge(&document, std::slice::from_ref(&copy));
            for note in &merged.notes {
                let message = format!("{relative} [{}] {note}", layer.layer_id);
                self.observer.warn(&message);
                notes.push(message);
            }
            document = merged.document;
        }

        if layers_seen == 0 {
            return Ok(false);
        }
        document.write_file(root.join(relative))?;
        self.observer.debug(&format!(
            "Merged {relative} from base and {layers_seen} layers"
        ));
        Ok(true)
    }

    fn write_metadata(&self, counts: &BatchCounts) -> Result<(), RepoError> {
        let entries = [
            ("last_run_time", chrono::Utc::now().to_rfc3339()),
            ("schema_version", SCHEMA_VERSION.to_string()),
            ("game_path", self.config.game_path.display().to_string()),
            ("language", self.config.language.to_string()),
            ("layers", self.config.enabled_layer_ids()),
            ("craft_count", counts.crafts.to_string()),
            ("slot_count", counts.slots.to_string()),
            ("equipment_count", counts.equipment.to_string()),
            ("consumable_count", counts.consumables.to_string()),
        ];
        for (key, value) in &entries {
            self.repository.set_metadata(key, value)?;
        }
        Ok(())
    }
}
