//! Content layers

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

/// One extension contributing archives on top of the base installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

impl Layer {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, priority: i32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            path: path.into(),
            enabled: true,
            priority,
        }
    }

    /// Load order: ascending priority, ties broken by id
    pub fn load_order(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Enabled layers in load order
pub fn enabled_in_order(layers: &[Layer]) -> Vec<&Layer> {
    let mut enabled: Vec<&Layer> = layers.iter().filter(|layer| layer.enabled).collect();
    enabled.sort_by(|a, b| a.load_order(b));
    enabled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_in_order_sorts_and_filters() {
        let mut off = Layer::new("ego_dlc_off", "/x", 0);
        off.enabled = false;
        let layers = vec![
            Layer::new("ego_dlc_terran", "/t", 3),
            off,
            Layer::new("b_mod", "/b", 1),
            Layer::new("a_mod", "/a", 1),
        ];
        let ids: Vec<_> = enabled_in_order(&layers)
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a_mod", "b_mod", "ego_dlc_terran"]);
    }

    #[test]
    fn test_deserialize_defaults() {
        #[derive(Deserialize)]
        struct Wrapper {
            layers: Vec<Layer>,
        }
        let parsed: Wrapper = serde_json::from_str(
            r#"{"layers":[{"id":"ego_dlc_split","path":"/g/extensions/ego_dlc_split","priority":2}]}"#,
        )
        .unwrap();
        assert!(parsed.layers[0].enabled);
        assert_eq!(parsed.layers[0].name, "");
    }
}
