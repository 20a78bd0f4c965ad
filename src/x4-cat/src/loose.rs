//! Extraction from already-unpacked trees
//!
//! Each "archive" is a directory holding files at their relative paths, as
//! left behind by a previous catalog unpack or a mod's loose files.

use crate::extractor::{ArchiveExtractor, ExtractRequest};
use crate::filter::PathFilter;
use crate::Result;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default)]
pub struct LooseExtractor;

impl ArchiveExtractor for LooseExtractor {
    fn extract(&self, request: &ExtractRequest) -> Result<()> {
        let filter = PathFilter::new(&request.include, &request.exclude)?;
        fs::create_dir_all(&request.output)?;

        for archive in request.archives.iter().filter(|a| a.is_dir()) {
            copy_tree(archive, &request.output, &filter)?;
        }
        Ok(())
    }
}

fn copy_tree(source: &Path, output: &Path, filter: &PathFilter) -> Result<()> {
    for entry in WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let key = relative.to_string_lossy().replace('\\', "/");
        if !filter.matches(&key) {
            continue;
        }

        let destination = output.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &destination)?;
    }
    Ok(())
}
