//! # x4
//!
//! X4 game data extraction - from installed archives to a SQLite catalog.
//!
//! This library provides functionality to:
//! - Unpack the base game and its extensions in load order
//! - Merge extension diff patches onto overlaid documents
//! - Resolve `{page,entry}` text references against the language tables
//! - Parse craft, weapons, shields, engines, thrusters, projectiles and wares
//! - Drop records that are not meaningful catalog entries, join prices and
//!   projectile stats, and rebuild the catalog in one transaction
//!
//! ## Example
//!
//! ```no_run
//! use x4::{Config, Pipeline, TracingObserver};
//! use x4_db::SqliteDb;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::load_or_default(&Config::default_path()?)?;
//! config.detect_layers()?;
//!
//! let tool = config.cat_tool();
//! let db = SqliteDb::open(&config.database_path)?;
//! let observer = TracingObserver::new().with_progress(|p| {
//!     println!("{:>3.0}% {}", p.fraction * 100.0, p.message);
//! });
//!
//! let summary = Pipeline::new(&config, &tool, &db, &observer).run()?;
//! println!("{} craft stored", summary.persisted.crafts);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod exclusion;
pub mod index;
pub mod normalize;
pub mod observer;
pub mod parse;
pub mod pipeline;
pub mod records;
pub mod sanitize;
pub mod text;

#[doc(inline)]
pub use config::{Config, ConfigError, DEFAULT_LANGUAGE};
#[doc(inline)]
pub use exclusion::{craft_exclusion_reason, equipment_exclusion_reason};
#[doc(inline)]
pub use index::NameIndex;
#[doc(inline)]
pub use normalize::{build_batch, ParsedEntities, PriceBook, Tallies, Tally};
#[doc(inline)]
pub use observer::{NullObserver, Observer, Progress, Stage, TracingObserver};
#[doc(inline)]
pub use pipeline::{EntityCounts, Pipeline, PipelineError, RunSummary, StageError};
#[doc(inline)]
pub use records::{
    CraftRecord, EngineRecord, EquipmentInfo, ProjectileRecord, ShieldRecord, ThrusterRecord,
    TradableRecord, WareCategory, WeaponRecord,
};
#[doc(inline)]
pub use sanitize::sanitize;
#[doc(inline)]
pub use text::{TextResolver, TextTable};
