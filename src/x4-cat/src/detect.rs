//! Installed extension discovery

use crate::layer::Layer;
use crate::Result;
use std::fs;
use std::path::Path;

/// Official extensions with their release-order priority and display name
pub const KNOWN_EXTENSIONS: &[(&str, i32, &str)] = &[
    ("ego_dlc_mini_01", 1, "Bonus Content"),
    ("ego_dlc_split", 2, "Split Vendetta"),
    ("ego_dlc_terran", 3, "Cradle of Humanity"),
    ("ego_dlc_pirate", 4, "Tides of Avarice"),
    ("ego_dlc_boron", 5, "Kingdom End"),
    ("ego_dlc_timelines", 6, "Timelines"),
];

/// Priority for extensions not in [`KNOWN_EXTENSIONS`]
pub const UNKNOWN_PRIORITY: i32 = 100;

/// Layers for every `extensions/<id>/` holding a `content.xml`, in load order
pub fn detect_layers(game_root: &Path) -> Result<Vec<Layer>> {
    let extensions = game_root.join("extensions");
    if !extensions.is_dir() {
        return Ok(Vec::new());
    }

    let mut layers = Vec::new();
    for entry in fs::read_dir(&extensions)? {
        let path = entry?.path();
        if !path.join("content.xml").is_file() {
            continue;
        }
        let Some(id) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let mut layer = Layer::new(id.as_str(), &path, UNKNOWN_PRIORITY);
        if let Some((_, priority, name)) = KNOWN_EXTENSIONS.iter().find(|(known, ..)| *known == id) {
            layer.priority = *priority;
            layer.name = name.to_string();
        }
        layers.push(layer);
    }

    layers.sort_by(|a, b| a.load_order(b));
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install(root: &Path, id: &str, with_content: bool) {
        let dir = root.join("extensions").join(id);
        fs::create_dir_all(&dir).unwrap();
        if with_content {
            fs::write(dir.join("content.xml"), "<content/>").unwrap();
        }
    }

    #[test]
    fn test_detects_known_and_unknown_extensions() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), "ego_dlc_boron", true);
        install(dir.path(), "ego_dlc_split", true);
        install(dir.path(), "my_mod", true);
        install(dir.path(), "half_installed", false);

        let layers = detect_layers(dir.path()).unwrap();
        let summary: Vec<_> = layers
            .iter()
            .map(|l| (l.id.as_str(), l.priority, l.name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("ego_dlc_split", 2, "Split Vendetta"),
                ("ego_dlc_boron", 5, "Kingdom End"),
                ("my_mod", UNKNOWN_PRIORITY, "my_mod"),
            ]
        );
        assert!(layers.iter().all(|l| l.enabled));
    }

    #[test]
    fn test_no_extensions_directory() {
        let dir = TempDir::new().unwrap();
        assert!(detect_layers(dir.path()).unwrap().is_empty());
    }
}
