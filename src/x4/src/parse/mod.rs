//! Entity parsers
//!
//! Each parser scans a known directory for macro documents, finds the
//! definition `<macro>` in each, and reads its `<properties>` into a record.
//! Absent or unparseable attributes read as defaults. A document that is
//! missing, malformed, or has no definition or properties yields no record
//! and is counted in [`Parsed::skipped`].

pub mod craft;
pub mod equipment;
pub mod projectile;
pub mod ware;

use crate::index::{normalize_path, NameIndex};
use crate::observer::Observer;
use crate::text::TextResolver;
use std::path::Path;
use walkdir::WalkDir;
use x4_xml::{Document, Element};

pub use craft::parse_craft;
pub use equipment::{parse_engines, parse_shields, parse_thrusters, parse_weapons};
pub use projectile::parse_projectiles;
pub use ware::parse_wares;

/// Records from one parser, plus how many documents produced nothing
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// A macro document found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroFile {
    /// File stem, which is also the macro's name
    pub macro_name: String,
    /// Forward-slash path relative to the extraction root
    pub relative: String,
}

/// A loaded macro document with its definition and properties located
pub struct Fragment<'d> {
    pub file: &'d MacroFile,
    pub document: &'d Document,
    pub definition: &'d Element,
    pub properties: &'d Element,
}

/// What every parser reads through
pub struct ParseContext<'a> {
    pub root: &'a Path,
    pub text: &'a TextResolver,
    pub index: &'a NameIndex,
    pub observer: &'a dyn Observer,
}

impl<'a> ParseContext<'a> {
    pub fn new(
        root: &'a Path,
        text: &'a TextResolver,
        index: &'a NameIndex,
        observer: &'a dyn Observer,
    ) -> Self {
        Self {
            root,
            text,
            index,
            observer,
        }
    }

    /// Load a document, warning when it does not exist
    pub fn load(&self, relative: &str) -> Option<Document> {
        let relative = normalize_path(relative);
        if !self.root.join(&relative).is_file() {
            self.observer.warn(&format!("File not found: {relative}"));
            return None;
        }
        self.try_load(&relative)
    }

    /// Load a document that may legitimately be absent
    pub fn try_load(&self, relative: &str) -> Option<Document> {
        let relative = normalize_path(relative);
        let path = self.root.join(&relative);
        if !path.is_file() {
            return None;
        }
        match Document::from_file(&path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                self.observer
                    .error(&format!("Malformed document {relative}: {e}"));
                None
            }
        }
    }

    /// `*_macro.xml` files under `dir` whose names start with one of `prefixes`,
    /// sorted by path
    pub fn scan(&self, dir: &str, prefixes: &[&str], max_depth: Option<usize>) -> Vec<MacroFile> {
        let base = self.root.join(dir);
        if !base.is_dir() {
            self.observer
                .debug(&format!("Nothing to scan under {dir}"));
            return Vec::new();
        }

        let mut walker = WalkDir::new(&base).follow_links(false);
        if let Some(depth) = max_depth {
            walker = walker.max_depth(depth);
        }

        let mut files: Vec<MacroFile> = walker
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_str()?;
                if !file_name.ends_with("_macro.xml")
                    || !prefixes.iter().any(|p| file_name.starts_with(p))
                {
                    return None;
                }
                let relative = entry.path().strip_prefix(self.root).ok()?;
                Some(MacroFile {
                    macro_name: file_name.trim_end_matches(".xml").to_string(),
                    relative: relative.to_string_lossy().replace('\\', "/"),
                })
            })
            .collect();
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files
    }

    /// Run `parse_one` over every file that loads and has a definition with properties
    pub fn parse_each<T>(
        &self,
        files: &[MacroFile],
        mut parse_one: impl FnMut(&Fragment<'_>) -> Option<T>,
    ) -> Parsed<T> {
        let mut parsed = Parsed::default();
        for file in files {
            let Some(document) = self.load(&file.relative) else {
                parsed.skipped += 1;
                continue;
            };
            let Some(definition) = definition(&document, "macro", &file.macro_name) else {
                self.observer
                    .warn(&format!("No macro element found in {}", file.relative));
                parsed.skipped += 1;
                continue;
            };
            let Some(properties) = definition.child("properties") else {
                self.observer
                    .warn(&format!("No properties found for {}", file.macro_name));
                parsed.skipped += 1;
                continue;
            };

            let fragment = Fragment {
                file,
                document: &document,
                definition,
                properties,
            };
            match parse_one(&fragment) {
                Some(record) => parsed.records.push(record),
                None => parsed.skipped += 1,
            }
        }
        parsed
    }

    /// A text-valued attribute with references resolved
    pub fn attr_text(&self, element: Option<&Element>, name: &str) -> String {
        let raw = attr_str(element, name);
        if raw.is_empty() {
            raw
        } else {
            self.text.resolve(&raw)
        }
    }
}

/// The `<tag name="...">` element, else the first `<tag>` anywhere
pub fn definition<'d>(doc: &'d Document, tag: &str, name: &str) -> Option<&'d Element> {
    let mut first = None;
    for element in std::iter::once(&doc.root).chain(doc.root.descendants()) {
        if element.name != tag {
            continue;
        }
        if element.attr("name") == Some(name) {
            return Some(element);
        }
        first.get_or_insert(element);
    }
    first
}

pub fn child<'e>(element: Option<&'e Element>, name: &str) -> Option<&'e Element> {
    element.and_then(|e| e.child(name))
}

pub fn attr_str(element: Option<&Element>, name: &str) -> String {
    element
        .and_then(|e| e.attr(name))
        .unwrap_or_default()
        .to_string()
}

pub fn attr_int(element: Option<&Element>, name: &str, default: i64) -> i64 {
    element
        .and_then(|e| e.attr(name))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn attr_float(element: Option<&Element>, name: &str, default: f64) -> f64 {
    element
        .and_then(|e| e.attr(name))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn attr_bool(element: Option<&Element>, name: &str, default: bool) -> bool {
    match element.and_then(|e| e.attr(name)) {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        None => default,
    }
}

const SIZE_MARKERS: [(&str, &str); 5] = [
    ("_xs_", "xs"),
    ("_s_", "s"),
    ("_m_", "m"),
    ("_l_", "l"),
    ("_xl_", "xl"),
];

/// Size code embedded in a macro or ware name
pub fn size_from_name(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    SIZE_MARKERS
        .iter()
        .find(|(marker, _)| lower.contains(marker))
        .map(|(_, code)| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use crate::text::TextTable;
    use std::fs;
    use tempfile::TempDir;

    fn element(xml: &str) -> Element {
        Document::parse_str(xml).unwrap().root
    }

    #[test]
    fn test_attribute_defaults() {
        let e = element(r#"<hull max="1200" ratio="0.5" bad="x" integrated="Yes"/>"#);
        assert_eq!(attr_int(Some(&e), "max", 0), 1200);
        assert_eq!(attr_int(Some(&e), "bad", 7), 7);
        assert_eq!(attr_int(Some(&e), "ratio", 0), 0);
        assert_eq!(attr_int(None, "max", 3), 3);
        assert_eq!(attr_float(Some(&e), "ratio", 0.0), 0.5);
        assert_eq!(attr_float(Some(&e), "missing", 1.0), 1.0);
        assert!(attr_bool(Some(&e), "integrated", false));
        assert!(!attr_bool(Some(&e), "bad", true));
        assert!(attr_bool(Some(&e), "missing", true));
        assert_eq!(attr_str(None, "x"), "");
    }

    #[test]
    fn test_definition_falls_back_to_first_macro() {
        let doc = Document::parse_str(
            r#"<macros><macro name="other"/><macro name="wanted"><properties/></macro></macros>"#,
        )
        .unwrap();
        assert_eq!(definition(&doc, "macro", "wanted").unwrap().attr("name"), Some("wanted"));
        assert_eq!(definition(&doc, "macro", "renamed").unwrap().attr("name"), Some("other"));
        assert!(definition(&doc, "component", "wanted").is_none());
    }

    #[test]
    fn test_size_from_name() {
        assert_eq!(size_from_name("weapon_arg_m_laser_01_mk1_macro").as_deref(), Some("m"));
        assert_eq!(size_from_name("shield_gen_XL_standard_01_mk1_macro").as_deref(), Some("xl"));
        assert_eq!(size_from_name("missile_dumbfire_light_mk1"), None);
    }

    #[test]
    fn test_scan_and_parse_each_count_skips() {
        let dir = TempDir::new().unwrap();
        let macros = dir.path().join("assets/props/engines/macros");
        fs::create_dir_all(&macros).unwrap();
        fs::write(
            macros.join("engine_a_macro.xml"),
            r#"<macros><macro name="engine_a_macro"><properties/></macro></macros>"#,
        )
        .unwrap();
        fs::write(
            macros.join("engine_b_macro.xml"),
            r#"<macros><macro name="engine_b_macro"/></macros>"#,
        )
        .unwrap();
        fs::write(macros.join("engine_c_macro.xml"), "<macros><macro").unwrap();
        fs::write(macros.join("engine_c.xml"), "<components/>").unwrap();
        fs::write(macros.join("thruster_a_macro.xml"), "<macros/>").unwrap();

        let text = TextResolver::new(TextTable::new());
        let index = NameIndex::new();
        let ctx = ParseContext::new(dir.path(), &text, &index, &NullObserver);

        let files = ctx.scan("assets/props", &["engine_"], None);
        let names: Vec<_> = files.iter().map(|f| f.macro_name.as_str()).collect();
        assert_eq!(names, vec!["engine_a_macro", "engine_b_macro", "engine_c_macro"]);
        assert_eq!(
            files[0].relative,
            "assets/props/engines/macros/engine_a_macro.xml"
        );

        let parsed = ctx.parse_each(&files, |f| Some(f.file.macro_name.clone()));
        assert_eq!(parsed.records, vec!["engine_a_macro"]);
        assert_eq!(parsed.skipped, 2);
    }
}
