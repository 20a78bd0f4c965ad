//! Macro and component name indexes (`index/macros.xml`, `index/components.xml`)

use crate::observer::Observer;
use std::collections::HashMap;
use std::path::Path;
use x4_xml::Document;

pub const MACROS_INDEX: &str = "index/macros.xml";
pub const COMPONENTS_INDEX: &str = "index/components.xml";

/// Name to document path, relative to the extraction root.
///
/// Names are matched case-insensitively. Paths are normalized with
/// [`normalize_path`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndex {
    macros: HashMap<String, String>,
    components: HashMap<String, String>,
}

/// Forward slashes, no `extensions/<id>/` prefix, `.xml` suffix
pub fn normalize_path(value: &str) -> String {
    let mut path = value.trim().replace('\\', "/");
    if let Some(rest) = path.strip_prefix("extensions/") {
        if let Some((_, inner)) = rest.split_once('/') {
            path = inner.to_string();
        }
    }
    if !path.to_ascii_lowercase().ends_with(".xml") {
        path.push_str(".xml");
    }
    path
}

fn entries(doc: &Document) -> impl Iterator<Item = (String, String)> + '_ {
    doc.root
        .descendants()
        .filter(|e| e.name == "entry")
        .filter_map(|e| match (e.attr("name"), e.attr("value")) {
            (Some(name), Some(value)) if !name.is_empty() && !value.is_empty() => {
                Some((name.to_ascii_lowercase(), normalize_path(value)))
            }
            _ => None,
        })
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(root: &Path, observer: &dyn Observer) -> Self {
        let mut index = Self::new();
        if let Some(doc) = load_index(root, MACROS_INDEX, observer) {
            index.macros.extend(entries(&doc));
        }
        if let Some(doc) = load_index(root, COMPONENTS_INDEX, observer) {
            index.components.extend(entries(&doc));
        }
        observer.info(&format!(
            "Loaded {} macros and {} components from indexes",
            index.macros.len(),
            index.components.len()
        ));
        index
    }

    pub fn insert_macro(&mut self, name: &str, path: &str) {
        self.macros
            .insert(name.to_ascii_lowercase(), normalize_path(path));
    }

    pub fn insert_component(&mut self, name: &str, path: &str) {
        self.components
            .insert(name.to_ascii_lowercase(), normalize_path(path));
    }

    pub fn macro_path(&self, name: &str) -> Option<&str> {
        self.macros
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn component_path(&self, name: &str) -> Option<&str> {
        self.components
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Macro path, else component path
    pub fn get(&self, name: &str) -> Option<&str> {
        self.macro_path(name).or_else(|| self.component_path(name))
    }

    pub fn macro_count(&self) -> usize {
        self.macros.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

fn load_index(root: &Path, relative: &str, observer: &dyn Observer) -> Option<Document> {
    let path = root.join(relative);
    if !path.is_file() {
        observer.warn(&format!("Index not found: {relative}"));
        return None;
    }
    match Document::from_file(&path) {
        Ok(doc) => Some(doc),
        Err(e) => {
            observer.error(&format!("Malformed index {relative}: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(r"assets\units\size_s\macros\ship_arg_s_fighter_01_a_macro"),
            "assets/units/size_s/macros/ship_arg_s_fighter_01_a_macro.xml"
        );
        assert_eq!(
            normalize_path("extensions\\ego_dlc_split\\assets\\units\\size_m\\ship_spl_m"),
            "assets/units/size_m/ship_spl_m.xml"
        );
        assert_eq!(normalize_path("libraries/wares.XML"), "libraries/wares.XML");
    }

    #[test]
    fn test_load_both_indexes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("index")).unwrap();
        fs::write(
            dir.path().join(MACROS_INDEX),
            r#"<index>
                <entry name="Storage_Arg_S_Trans_01_A_Macro" value="assets\units\size_s\macros\storage_arg_s_trans_01_a_macro"/>
                <entry name="broken"/>
            </index>"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(COMPONENTS_INDEX),
            r#"<index><entry name="ship_arg_s_fighter_01" value="assets\units\size_s\ship_arg_s_fighter_01"/></index>"#,
        )
        .unwrap();

        let index = NameIndex::load(dir.path(), &NullObserver);
        assert_eq!(index.macro_count(), 1);
        assert_eq!(index.component_count(), 1);
        assert_eq!(
            index.get("storage_arg_s_trans_01_a_macro"),
            Some("assets/units/size_s/macros/storage_arg_s_trans_01_a_macro.xml")
        );
        assert_eq!(
            index.get("SHIP_ARG_S_FIGHTER_01"),
            Some("assets/units/size_s/ship_arg_s_fighter_01.xml")
        );
        assert_eq!(index.get("missing"), None);
    }

    #[test]
    fn test_missing_indexes_are_empty() {
        let dir = TempDir::new().unwrap();
        let index = NameIndex::load(dir.path(), &NullObserver);
        assert_eq!(index.macro_count() + index.component_count(), 0);
    }
}
