//! Equipment macros under `assets/props`: weapons and turrets, shields,
//! engines, thrusters

use super::{attr_bool, attr_float, attr_int, attr_str, child, size_from_name, Fragment, MacroFile, ParseContext, Parsed};
use crate::records::{EngineRecord, EquipmentInfo, ShieldRecord, ThrusterRecord, WeaponRecord};
use x4_db::{EquipmentKind, ShieldStats, ThrusterStats};

pub const PROPS_DIR: &str = "assets/props";

/// Display name: `basename`, with ` Mk{n}` above Mk1, else `name`, else the macro
pub fn display_name(basename: &str, mk_level: i64, name: &str, macro_name: &str) -> String {
    if !basename.is_empty() {
        if mk_level > 1 {
            format!("{basename} Mk{mk_level}")
        } else {
            basename.to_string()
        }
    } else if !name.is_empty() {
        name.to_string()
    } else {
        macro_name.to_string()
    }
}

fn read_info(ctx: &ParseContext<'_>, fragment: &Fragment<'_>) -> EquipmentInfo {
    let macro_name = fragment.file.macro_name.clone();
    let props = Some(fragment.properties);
    let ident = child(props, "identification");

    let basename = ctx.attr_text(ident, "basename");
    let mk_level = attr_int(ident, "mk", 1);
    let name = if ident.is_some() {
        display_name(&basename, mk_level, &ctx.attr_text(ident, "name"), &macro_name)
    } else {
        macro_name.clone()
    };

    EquipmentInfo {
        component_ref: fragment
            .definition
            .child("component")
            .and_then(|c| c.attr("ref"))
            .map(str::to_string),
        description: ctx.attr_text(ident, "description"),
        makerrace: attr_str(ident, "makerrace"),
        size: size_from_name(&macro_name),
        hull: attr_int(child(props, "hull"), "max", 0),
        macro_name,
        name,
        basename,
        mk_level,
    }
}

/// Whether the hull is part of the craft's own, rather than separately damageable
fn hull_integrated(fragment: &Fragment<'_>) -> bool {
    let hull = fragment.properties.child("hull");
    let max_absent = hull.and_then(|h| h.attr("max")).is_none();
    attr_bool(hull, "integrated", max_absent)
}

fn scan_props(ctx: &ParseContext<'_>, prefixes: &[&str]) -> Vec<MacroFile> {
    ctx.scan(PROPS_DIR, prefixes, None)
}

fn report<T>(ctx: &ParseContext<'_>, what: &str, parsed: &Parsed<T>) {
    ctx.observer.info(&format!(
        "Parsed {} {what} ({} skipped)",
        parsed.records.len(),
        parsed.skipped
    ));
}

/// `weapon_*` and `turret_*` macros under `weaponsystems`
pub fn parse_weapons(ctx: &ParseContext<'_>) -> Parsed<WeaponRecord> {
    let files: Vec<_> = scan_props(ctx, &["weapon_", "turret_"])
        .into_iter()
        .filter(|f| f.relative.to_ascii_lowercase().contains("/weaponsystems/"))
        .collect();

    let parsed = ctx.parse_each(&files, |fragment| {
        let props = Some(fragment.properties);
        let heat = child(props, "heat");
        let kind = if fragment.file.macro_name.contains("turret_") {
            EquipmentKind::Turret
        } else {
            EquipmentKind::Weapon
        };
        Some(WeaponRecord {
            info: read_info(ctx, fragment),
            kind,
            heat_overheat: attr_float(heat, "overheat", 0.0),
            heat_cooldelay: attr_float(heat, "cooldelay", 0.0),
            heat_coolrate: attr_float(heat, "coolrate", 0.0),
            heat_reenable: attr_float(heat, "reenable", 0.0),
            rotation_speed_max: attr_float(child(props, "rotationspeed"), "max", 0.0),
            rotation_accel_max: attr_float(child(props, "rotationacceleration"), "max", 0.0),
            bullet_class: attr_str(child(props, "bullet"), "class"),
        })
    });
    report(ctx, "weapons and turrets", &parsed);
    parsed
}

pub fn parse_shields(ctx: &ParseContext<'_>) -> Parsed<ShieldRecord> {
    let files = scan_props(ctx, &["shield_"]);
    let parsed = ctx.parse_each(&files, |fragment| {
        let recharge = fragment.properties.child("recharge");
        Some(ShieldRecord {
            info: read_info(ctx, fragment),
            hull_integrated: hull_integrated(fragment),
            recharge: ShieldStats {
                capacity: attr_int(recharge, "max", 0),
                recharge_rate: attr_float(recharge, "rate", 0.0),
                recharge_delay: attr_float(recharge, "delay", 0.0),
            },
        })
    });
    report(ctx, "shields", &parsed);
    parsed
}

pub fn parse_engines(ctx: &ParseContext<'_>) -> Parsed<EngineRecord> {
    let files = scan_props(ctx, &["engine_"]);
    let parsed = ctx.parse_each(&files, |fragment| {
        let props = Some(fragment.properties);
        let thrust = child(props, "thrust");
        let boost = child(props, "boost");
        let travel = child(props, "travel");
        Some(EngineRecord {
            info: read_info(ctx, fragment),
            hull_integrated: hull_integrated(fragment),
            forward_thrust: attr_float(thrust, "forward", 0.0),
            reverse_thrust: attr_float(thrust, "reverse", 0.0),
            boost_duration: attr_float(boost, "duration", 0.0),
            boost_thrust: attr_float(boost, "thrust", 0.0),
            boost_recharge: attr_float(boost, "recharge", 0.0),
            boost_acceleration: attr_float(boost, "acceleration", 0.0),
            boost_attack: attr_float(boost, "attack", 0.0),
            boost_release: attr_float(boost, "release", 0.0),
            boost_coast: attr_float(boost, "coast", 0.0),
            travel_charge: attr_float(travel, "charge", 0.0),
            travel_thrust: attr_float(travel, "thrust", 0.0),
            travel_attack: attr_float(travel, "attack", 0.0),
            travel_release: attr_float(travel, "release", 0.0),
        })
    });
    report(ctx, "engines", &parsed);
    parsed
}

pub fn parse_thrusters(ctx: &ParseContext<'_>) -> Parsed<ThrusterRecord> {
    let files = scan_props(ctx, &["thruster_"]);
    let parsed = ctx.parse_each(&files, |fragment| {
        let thrust = fragment.properties.child("thrust");
        Some(ThrusterRecord {
            info: read_info(ctx, fragment),
            hull_integrated: hull_integrated(fragment),
            thrust: ThrusterStats {
                strafe: attr_float(thrust, "strafe", 0.0),
                pitch: attr_float(thrust, "pitch", 0.0),
                yaw: attr_float(thrust, "yaw", 0.0),
                roll: attr_float(thrust, "roll", 0.0),
            },
        })
    });
    report(ctx, "thrusters", &parsed);
    parsed
}
