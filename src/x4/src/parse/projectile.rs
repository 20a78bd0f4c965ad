//! Projectile (bullet) macros, joined to weapons by `bullet@class`

use super::{attr_float, attr_int, child, ParseContext, Parsed};
use crate::records::ProjectileRecord;
use std::collections::BTreeMap;

pub const BULLETS_DIR: &str = "assets/fx/weaponfx/macros";

pub fn parse_projectiles(ctx: &ParseContext<'_>) -> Parsed<ProjectileRecord> {
    let files = ctx.scan(BULLETS_DIR, &["bullet_"], Some(1));
    let parsed = ctx.parse_each(&files, |fragment| {
        let props = Some(fragment.properties);
        let bullet = child(props, "bullet");
        let damage = child(props, "damage");
        let ammunition = child(props, "ammunition");

        let speed = attr_float(bullet, "speed", 0.0);
        let lifetime = attr_float(bullet, "lifetime", 0.0);
        Some(ProjectileRecord {
            macro_name: fragment.file.macro_name.clone(),
            speed,
            lifetime,
            range: speed * lifetime,
            amount: attr_int(bullet, "amount", 1),
            barrel_amount: attr_int(bullet, "barrelamount", 1),
            damage: attr_float(damage, "value", 0.0),
            repair: attr_float(damage, "repair", 0.0),
            heat: attr_float(child(props, "heat"), "value", 0.0),
            reload_rate: attr_float(child(props, "reload"), "rate", 0.0),
            ammunition: attr_int(ammunition, "value", 0),
            ammunition_reload: attr_float(ammunition, "reload", 0.0),
        })
    });
    ctx.observer
        .info(&format!("Parsed {} projectiles", parsed.records.len()));
    parsed
}

/// Projectiles keyed by macro name
pub fn by_macro(records: Vec<ProjectileRecord>) -> BTreeMap<String, ProjectileRecord> {
    records
        .into_iter()
        .map(|p| (p.macro_name.clone(), p))
        .collect()
}
