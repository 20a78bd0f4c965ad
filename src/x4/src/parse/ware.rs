//! Tradable wares from `libraries/wares.xml`

use super::{attr_int, attr_str, ParseContext, Parsed};
use crate::records::{TradableRecord, WareCategory};
use x4_db::Price;
use x4_xml::Element;

pub const WARES_FILE: &str = "libraries/wares.xml";

/// Every `<ware>` with an `id`, in document order
pub fn parse_wares(ctx: &ParseContext<'_>) -> Parsed<TradableRecord> {
    let mut parsed = Parsed::default();
    let Some(doc) = ctx.load(WARES_FILE) else {
        return parsed;
    };

    for element in doc.root.descendants().filter(|e| e.name == "ware") {
        match read_ware(ctx, element) {
            Some(ware) => parsed.records.push(ware),
            None => parsed.skipped += 1,
        }
    }
    ctx.observer.info(&format!("Parsed {} wares", parsed.records.len()));
    parsed
}

fn read_ware(ctx: &ParseContext<'_>, element: &Element) -> Option<TradableRecord> {
    let id = element.attr("id").filter(|id| !id.is_empty())?;
    let tags: Vec<String> = attr_str(Some(element), "tags")
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let price = element.child("price");

    Some(TradableRecord {
        id: id.to_string(),
        name: ctx.attr_text(Some(element), "name"),
        description: ctx.attr_text(Some(element), "description"),
        category: WareCategory::from_tags(&tags),
        tags,
        price: Price {
            min: attr_int(price, "min", 0),
            average: attr_int(price, "average", 0),
            max: attr_int(price, "max", 0),
        },
        component_ref: element
            .child("component")
            .and_then(|c| c.attr("ref"))
            .map(str::to_string),
        owners: element
            .descendants()
            .filter(|e| e.name == "owner")
            .filter_map(|e| e.attr("faction"))
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::NameIndex;
    use crate::observer::testing::RecordingObserver;
    use crate::observer::NullObserver;
    use crate::text::{TextResolver, TextTable};
    use std::fs;
    use tempfile::TempDir;
    use tracing::Level;

    #[test]
    fn test_parse_wares() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("libraries")).unwrap();
        fs::write(
            dir.path().join(WARES_FILE),
            r#"<wares>
                <production/>
                <ware id="missile_dumbfire_light_mk1" name="{20201,1}" tags="equipment missile">
                  <price min="500" average="600" max="700"/>
                  <component ref="missile_dumbfire_light_mk1_macro"/>
                  <owner faction="argon"/>
                  <owner faction="teladi"/>
                </ware>
                <ware name="no id"/>
                <ware id="energycells" tags="container economy"/>
              </wares>"#,
        )
        .unwrap();

        let mut table = TextTable::new();
        table.insert(20201, 1, "Light Dumbfire Missile");
        let text = TextResolver::new(table);
        let index = NameIndex::new();
        let ctx = ParseContext::new(dir.path(), &text, &index, &NullObserver);

        let parsed = parse_wares(&ctx);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.records.len(), 2);

        let missile = &parsed.records[0];
        assert_eq!(missile.name, "Light Dumbfire Missile");
        assert_eq!(missile.category, WareCategory::Missile);
        assert_eq!(missile.tags, vec!["equipment", "missile"]);
        assert_eq!(missile.price.average, 600);
        assert_eq!(
            missile.component_ref.as_deref(),
            Some("missile_dumbfire_light_mk1_macro")
        );
        assert_eq!(missile.owners, vec!["argon", "teladi"]);

        let cells = &parsed.records[1];
        assert_eq!(cells.category, WareCategory::Other);
        assert_eq!(cells.price, Price::default());
        assert!(cells.component_ref.is_none());
    }

    #[test]
    fn test_missing_wares_file_warns() {
        let dir = TempDir::new().unwrap();
        let text = TextResolver::new(TextTable::new());
        let index = NameIndex::new();
        let observer = RecordingObserver::default();
        let ctx = ParseContext::new(dir.path(), &text, &index, &observer);

        let parsed = parse_wares(&ctx);
        assert!(parsed.records.is_empty());
        assert_eq!(observer.messages_at(Level::WARN).len(), 1);
    }
}
