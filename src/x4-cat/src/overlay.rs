//! Archive load order
//!
//! The base installation's numbered archives come first, then each enabled
//! layer's own archives in ascending priority. Unpacking in this order makes
//! higher-priority content overwrite lower-priority and base content.
//! Archives that do not exist on disk are left out.

use crate::layer::{enabled_in_order, Layer};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Numbers of the base installation's archives (`01.cat` .. `09.cat`)
pub const BASE_ARCHIVES: RangeInclusive<u8> = 1..=9;

/// Numbers of each layer's archives (`ext_01.cat` .. `ext_03.cat`)
pub const LAYER_ARCHIVES: RangeInclusive<u8> = 1..=3;

pub fn base_archive_name(number: u8) -> String {
    format!("{number:02}.cat")
}

pub fn layer_archive_name(number: u8) -> String {
    format!("ext_{number:02}.cat")
}

/// Archives contributed by one enabled layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerArchives {
    pub layer_id: String,
    pub priority: i32,
    pub archives: Vec<PathBuf>,
}

/// Ordered archives for one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSequence {
    pub base: Vec<PathBuf>,
    pub layers: Vec<LayerArchives>,
}

impl ArchiveSequence {
    pub fn resolve(game_root: &Path, layers: &[Layer]) -> Self {
        let base = BASE_ARCHIVES
            .map(|n| game_root.join(base_archive_name(n)))
            .filter(|path| path.exists())
            .collect();

        let layers = enabled_in_order(layers)
            .into_iter()
            .map(|layer| LayerArchives {
                layer_id: layer.id.clone(),
                priority: layer.priority,
                archives: LAYER_ARCHIVES
                    .map(|n| layer.path.join(layer_archive_name(n)))
                    .filter(|path| path.exists())
                    .collect(),
            })
            .collect();

        Self { base, layers }
    }

    /// Base archives followed by every layer's archives, in unpack order
    pub fn ordered(&self) -> Vec<PathBuf> {
        self.base
            .iter()
            .chain(self.layers.iter().flat_map(|layer| layer.archives.iter()))
            .cloned()
            .collect()
    }

    pub fn layer(&self, id: &str) -> Option<&LayerArchives> {
        self.layers.iter().find(|layer| layer.layer_id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.layers.iter().all(|layer| layer.archives.is_empty())
    }
}
