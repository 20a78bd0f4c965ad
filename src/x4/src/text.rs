//! Language text table and `{page,entry}` reference resolution

use crate::observer::Observer;
use crate::sanitize::sanitize;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use x4_xml::Document;

/// An indirect text reference, `{page,entry}`
pub static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\d+),\s*(\d+)\}").expect("valid reference pattern"));

pub const DEFAULT_MAX_DEPTH: usize = 5;

/// `(page, entry) -> text` for one language
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextTable {
    entries: HashMap<(u32, u32), String>,
}

impl TextTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table files for `language` under `root/t`, in load order
    pub fn files(root: &Path, language: u32) -> Vec<PathBuf> {
        let suffix = format!("-l{language:03}.xml");
        let Ok(entries) = fs::read_dir(root.join("t")) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(&suffix))
            })
            .collect();
        files.sort();
        files
    }

    /// Load every table file for `language`. Later files override earlier
    /// ones; unreadable files are reported and skipped.
    pub fn load(root: &Path, language: u32, observer: &dyn Observer) -> Self {
        let files = Self::files(root, language);
        if files.is_empty() {
            observer.warn(&format!(
                "No text files for language {language} under {}",
                root.join("t").display()
            ));
        }

        let mut table = Self::new();
        for file in &files {
            match Document::from_file(file) {
                Ok(doc) => table.add_document(&doc),
                Err(e) => observer.warn(&format!("Skipping text file {}: {e}", file.display())),
            }
        }
        observer.info(&format!(
            "Loaded {} text entries from {} files",
            table.len(),
            files.len()
        ));
        table
    }

    pub fn add_document(&mut self, doc: &Document) {
        let pages = std::iter::once(&doc.root)
            .chain(doc.root.descendants())
            .filter(|e| e.name == "page");
        for page in pages {
            let Some(page_id) = page.attr("id").and_then(|id| id.trim().parse().ok()) else {
                continue;
            };
            for entry in page.descendants().filter(|e| e.name == "t") {
                if let Some(id) = entry.attr("id").and_then(|id| id.trim().parse().ok()) {
                    self.entries.insert((page_id, id), entry.text());
                }
            }
        }
    }

    pub fn insert(&mut self, page: u32, entry: u32, text: impl Into<String>) {
        self.entries.insert((page, entry), text.into());
    }

    pub fn get(&self, page: u32, entry: u32) -> Option<&str> {
        self.entries.get(&(page, entry)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Expands references against a [`TextTable`] and sanitizes the result.
///
/// Expansion is recursive up to `max_depth` levels; past that, references
/// are left as they are, so cycles terminate. References with no entry stay
/// literal and are remembered in [`TextResolver::unresolved`].
#[derive(Debug)]
pub struct TextResolver {
    table: TextTable,
    max_depth: usize,
    unresolved: RefCell<BTreeSet<(u32, u32)>>,
}

impl TextResolver {
    pub fn new(table: TextTable) -> Self {
        Self {
            table,
            max_depth: DEFAULT_MAX_DEPTH,
            unresolved: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn table(&self) -> &TextTable {
        &self.table
    }

    /// Expand and sanitize
    pub fn resolve(&self, raw: &str) -> String {
        sanitize(&self.expand(raw))
    }

    /// Expand without sanitizing
    pub fn expand(&self, raw: &str) -> String {
        self.expand_at(raw, 0)
    }

    fn expand_at(&self, text: &str, depth: usize) -> String {
        if depth >= self.max_depth || !text.contains('{') {
            return text.to_string();
        }
        REFERENCE
            .replace_all(text, |caps: &Captures| {
                let key = (caps[1].parse::<u32>(), caps[2].parse::<u32>());
                if let (Ok(page), Ok(entry)) = key {
                    if let Some(found) = self.table.get(page, entry) {
                        return self.expand_at(found, depth + 1);
                    }
                    if self.unresolved.borrow_mut().insert((page, entry)) {
                        tracing::debug!(page, entry, "no text entry for reference");
                    }
                }
                caps[0].to_string()
            })
            .into_owned()
    }

    /// References seen so far that had no table entry
    pub fn unresolved(&self) -> Vec<(u32, u32)> {
        self.unresolved.borrow().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::RecordingObserver;
    use crate::observer::NullObserver;
    use tempfile::TempDir;

    fn resolver(entries: &[(u32, u32, &str)]) -> TextResolver {
        let mut table = TextTable::new();
        for (page, entry, text) in entries {
            table.insert(*page, *entry, *text);
        }
        TextResolver::new(table)
    }

    #[test]
    fn test_resolves_single_reference() {
        let r = resolver(&[(1001, 1, "Hull")]);
        assert_eq!(r.resolve("{1001,1}"), "Hull");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let r = resolver(&[(1001, 1, "Hull")]);
        assert_eq!(r.resolve("plain text"), "plain text");
    }

    #[test]
    fn test_missing_reference_stays_literal() {
        let r = resolver(&[]);
        assert_eq!(r.resolve("{1001,99}"), "{1001,99}");
        assert_eq!(r.unresolved(), vec![(1001, 99)]);
    }

    #[test]
    fn test_embedded_and_nested_references() {
        let r = resolver(&[
            (20101, 1, "Argon {20101, 2}"),
            (20101, 2, "Destroyer"),
            (1001, 1, "Hull"),
        ]);
        assert_eq!(r.resolve("{20101,1} Mk1"), "Argon Destroyer Mk1");
        assert_eq!(r.resolve("Max {1001,1}: 100"), "Max Hull: 100");
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let r = resolver(&[(1, 1, "{1,2}"), (1, 2, "{1,1}")]);
        let resolved = r.expand("{1,1}");
        assert!(resolved == "{1,1}" || resolved == "{1,2}", "{resolved}");
        assert!(r.unresolved().is_empty());
    }

    #[test]
    fn test_depth_bound_leaves_rest_verbatim() {
        let r = resolver(&[(1, 1, "a{1,2}"), (1, 2, "b{1,3}"), (1, 3, "c")]).with_max_depth(2);
        assert_eq!(r.expand("{1,1}"), "ab{1,3}");
    }

    #[test]
    fn test_load_table_files_in_order() {
        let dir = TempDir::new().unwrap();
        let t = dir.path().join("t");
        fs::create_dir_all(&t).unwrap();
        fs::write(
            t.join("0001-l044.xml"),
            r#"<language id="44"><page id="1001"><t id="1">Hull</t><t id="2">Old</t></page></language>"#,
        )
        .unwrap();
        fs::write(
            t.join("0002-l044.xml"),
            r#"<language id="44"><page id="1001"><t id="2">New</t></page></language>"#,
        )
        .unwrap();
        fs::write(
            t.join("0001-l049.xml"),
            r#"<language id="49"><page id="1001"><t id="1">Hülle</t></page></language>"#,
        )
        .unwrap();
        fs::write(t.join("0003-l044.xml"), "<language><page id=").unwrap();

        let observer = RecordingObserver::default();
        let table = TextTable::load(dir.path(), 44, &observer);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1001, 1), Some("Hull"));
        assert_eq!(table.get(1001, 2), Some("New"));
        assert_eq!(observer.messages_at(tracing::Level::WARN).len(), 1);

        let german = TextTable::load(dir.path(), 49, &NullObserver);
        assert_eq!(german.get(1001, 1), Some("Hülle"));
    }

    #[test]
    fn test_missing_directory_is_empty_table() {
        let dir = TempDir::new().unwrap();
        assert!(TextTable::load(dir.path(), 44, &NullObserver).is_empty());
    }
}
