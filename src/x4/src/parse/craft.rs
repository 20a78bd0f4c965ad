//! Craft macros (`assets/units/<size>/macros/ship_*_macro.xml`)

use super::{attr_float, attr_int, attr_str, child, definition, size_from_name, Fragment, ParseContext, Parsed};
use crate::records::CraftRecord;
use std::collections::HashMap;
use std::path::Path;
use x4_db::{Drag, EquipmentKind, Inertia, Jerk, Slot, Storage};
use x4_xml::Element;

pub const UNITS_DIR: &str = "assets/units";

const CLASS_SIZES: [(&str, &str); 5] = [
    ("ship_xs", "xs"),
    ("ship_s", "s"),
    ("ship_m", "m"),
    ("ship_l", "l"),
    ("ship_xl", "xl"),
];

const DEFAULT_SIZE: &str = "s";

/// Name fragments of macros that are not real craft
const PLACEHOLDER_MARKERS: [&str; 2] = ["_dvd_", "_part_"];

const STORAGE_CONNECTIONS: [&str; 2] = ["con_storage", "con_shipstorage"];

const UNIT_SIZES: [&str; 5] = ["xs", "s", "m", "l", "xl"];

/// Slot kind keywords, tested in order against names and tags
const KIND_KEYWORDS: [(&str, EquipmentKind); 5] = [
    ("weapon", EquipmentKind::Weapon),
    ("turret", EquipmentKind::Turret),
    ("shield", EquipmentKind::Shield),
    ("engine", EquipmentKind::Engine),
    ("thruster", EquipmentKind::Thruster),
];

/// Size words in component tags, longest first so `extralarge` is not read as `large`
const TAG_SIZES: [(&str, &str); 5] = [
    ("extrasmall", "xs"),
    ("extralarge", "xl"),
    ("medium", "m"),
    ("small", "s"),
    ("large", "l"),
];

pub fn parse_craft(ctx: &ParseContext<'_>) -> Parsed<CraftRecord> {
    let files: Vec<_> = ctx
        .scan(UNITS_DIR, &["ship_"], Some(3))
        .into_iter()
        .filter(|f| f.relative.rsplit('/').nth(1) == Some("macros"))
        .filter(|f| !PLACEHOLDER_MARKERS.iter().any(|m| f.macro_name.contains(m)))
        .collect();
    ctx.observer
        .info(&format!("Found {} craft macro files", files.len()));

    let mut cargo_cache = HashMap::new();
    let parsed = ctx.parse_each(&files, |fragment| {
        Some(read_craft(ctx, fragment, &mut cargo_cache))
    });
    ctx.observer.info(&format!(
        "Parsed {} craft ({} skipped)",
        parsed.records.len(),
        parsed.skipped
    ));
    parsed
}

fn read_craft(
    ctx: &ParseContext<'_>,
    fragment: &Fragment<'_>,
    cargo_cache: &mut HashMap<String, i64>,
) -> CraftRecord {
    let macro_name = fragment.file.macro_name.clone();
    let definition = fragment.definition;
    let props = Some(fragment.properties);

    let ship_class = attr_str(Some(definition), "class");
    let size = CLASS_SIZES
        .iter()
        .find(|(class, _)| *class == ship_class)
        .map_or(DEFAULT_SIZE, |(_, size)| *size)
        .to_string();
    let component_ref = definition
        .child("component")
        .and_then(|c| c.attr("ref"))
        .map(str::to_string);

    let ident = child(props, "identification");
    let basename = ctx.attr_text(ident, "basename");
    let variation = ctx.attr_text(ident, "variation");
    let name = match ident {
        Some(_) if !basename.is_empty() && !variation.is_empty() => format!("{basename} {variation}"),
        Some(_) if !basename.is_empty() => basename.clone(),
        Some(_) => Some(ctx.attr_text(ident, "name"))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| macro_name.clone()),
        None => macro_name.clone(),
    };

    let physics = child(props, "physics");
    let inertia = child(physics, "inertia");
    let drag = child(physics, "drag");
    let jerk = child(props, "jerk");
    let jerk_forward = child(jerk, "forward");
    let jerk_boost = child(jerk, "forward_boost");
    let jerk_travel = child(jerk, "forward_travel");
    let storage = child(props, "storage");
    let explosion = child(props, "explosiondamage");

    let mut slots = inline_slots(definition);
    if let Some(component) = &component_ref {
        slots.extend(component_slots(ctx, component, &fragment.file.relative));
    }

    CraftRecord {
        cargo_capacity: cargo_capacity(ctx, definition, cargo_cache),
        short_variation: ctx.attr_text(ident, "shortvariation"),
        description: ctx.attr_text(ident, "description"),
        makerrace: attr_str(ident, "makerrace"),
        icon: attr_str(ident, "icon"),
        ship_type: attr_str(child(props, "ship"), "type"),
        purpose: attr_str(child(props, "purpose"), "primary"),
        hull: attr_int(child(props, "hull"), "max", 0),
        mass: attr_float(physics, "mass", 0.0),
        inertia: Inertia {
            pitch: attr_float(inertia, "pitch", 0.0),
            yaw: attr_float(inertia, "yaw", 0.0),
            roll: attr_float(inertia, "roll", 0.0),
        },
        drag: Drag {
            forward: attr_float(drag, "forward", 0.0),
            reverse: attr_float(drag, "reverse", 0.0),
            horizontal: attr_float(drag, "horizontal", 0.0),
            vertical: attr_float(drag, "vertical", 0.0),
            pitch: attr_float(drag, "pitch", 0.0),
            yaw: attr_float(drag, "yaw", 0.0),
            roll: attr_float(drag, "roll", 0.0),
        },
        forward_accfactor: attr_float(child(physics, "accfactors"), "forward", 1.0),
        jerk: Jerk {
            forward_accel: attr_float(jerk_forward, "accel", 0.0),
            forward_decel: attr_float(jerk_forward, "decel", 0.0),
            forward_ratio: attr_float(jerk_forward, "ratio", 0.0),
            boost_accel: attr_float(jerk_boost, "accel", 0.0),
            boost_ratio: attr_float(jerk_boost, "ratio", 0.0),
            travel_accel: attr_float(jerk_travel, "accel", 0.0),
            travel_decel: attr_float(jerk_travel, "decel", 0.0),
            travel_ratio: attr_float(jerk_travel, "ratio", 0.0),
            strafe: attr_float(child(jerk, "strafe"), "value", 0.0),
            angular: attr_float(child(jerk, "angular"), "value", 0.0),
        },
        storage: Storage {
            missiles: attr_int(storage, "missile", 0),
            drones: attr_int(storage, "drone", 0),
            units: attr_int(storage, "unit", 0),
            crew: attr_int(child(props, "people"), "capacity", 0),
        },
        explosion_damage: attr_float(explosion, "value", 0.0),
        explosion_damage_shield: attr_float(explosion, "shield", 0.0),
        secrecy_level: attr_int(child(props, "secrecy"), "level", 0),
        thruster_tags: attr_str(child(props, "thruster"), "tags"),
        macro_name,
        component_ref,
        name,
        basename,
        variation,
        ship_class,
        size,
        slots,
    }
}

/// Sum of `<cargo max>` over every attached storage fragment
fn cargo_capacity(
    ctx: &ParseContext<'_>,
    definition: &Element,
    cache: &mut HashMap<String, i64>,
) -> i64 {
    let Some(connections) = definition.child("connections") else {
        return 0;
    };

    connections
        .children_named("connection")
        .filter(|c| {
            c.attr("ref")
                .is_some_and(|r| STORAGE_CONNECTIONS.iter().any(|p| r.starts_with(p)))
        })
        .filter_map(|c| c.child("macro").and_then(|m| m.attr("ref")))
        .filter(|storage_ref| !storage_ref.is_empty())
        .map(|storage_ref| {
            *cache
                .entry(storage_ref.to_ascii_lowercase())
                .or_insert_with(|| storage_capacity(ctx, storage_ref))
        })
        .sum()
}

fn storage_capacity(ctx: &ParseContext<'_>, storage_ref: &str) -> i64 {
    let candidates = UNIT_SIZES
        .iter()
        .map(|size| format!("{UNITS_DIR}/size_{size}/macros/{storage_ref}.xml"))
        .chain(ctx.index.macro_path(storage_ref).map(str::to_string))
        .chain(std::iter::once(format!(
            "assets/props/SurfaceElements/macros/{storage_ref}.xml"
        )));

    for relative in candidates {
        if let Some(doc) = ctx.try_load(&relative) {
            return attr_int(doc.root.find(".//properties/cargo"), "max", 0);
        }
    }
    ctx.observer
        .debug(&format!("Storage fragment not found: {storage_ref}"));
    0
}

fn kind_from_name(name: &str) -> Option<EquipmentKind> {
    let lower = name.to_ascii_lowercase();
    KIND_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, kind)| *kind)
}

fn kind_from_connection(connection: &str) -> Option<EquipmentKind> {
    match connection {
        "shieldgenerator" => Some(EquipmentKind::Shield),
        other => KIND_KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == other)
            .map(|(_, kind)| *kind),
    }
}

/// Slots declared as `<connection ref>` in the craft macro itself
fn inline_slots(definition: &Element) -> Vec<Slot> {
    let Some(connections) = definition.child("connections") else {
        return Vec::new();
    };

    connections
        .children_named("connection")
        .filter_map(|connection| {
            let name = connection.attr("ref").filter(|r| !r.is_empty())?;
            let linked = connection.child("macro");
            let kind = linked
                .and_then(|m| m.attr("connection"))
                .and_then(kind_from_connection)
                .or_else(|| kind_from_name(name));
            let size = linked
                .and_then(|m| m.attr("ref"))
                .and_then(size_from_name);
            Some(Slot {
                name: name.to_string(),
                kind,
                size,
                tags: attr_str(Some(connection), "tags"),
            })
        })
        .collect()
}

/// Hardpoints from the craft's structural component fragment.
///
/// Only tagged connections whose tags name an equipment kind count.
fn component_slots(ctx: &ParseContext<'_>, component_ref: &str, macro_relative: &str) -> Vec<Slot> {
    let beside = Path::new(macro_relative)
        .parent()
        .and_then(Path::parent)
        .map(|dir| format!("{}/{component_ref}.xml", dir.to_string_lossy()));
    let doc = beside
        .as_deref()
        .and_then(|relative| ctx.try_load(relative))
        .or_else(|| ctx.index.component_path(component_ref).and_then(|p| ctx.try_load(p)));
    let Some(doc) = doc else {
        ctx.observer
            .debug(&format!("Component fragment not found: {component_ref}"));
        return Vec::new();
    };
    let Some(component) = definition(&doc, "component", component_ref) else {
        return Vec::new();
    };
    let Some(connections) = component.child("connections") else {
        return Vec::new();
    };

    connections
        .children_named("connection")
        .filter_map(|connection| {
            let name = connection.attr("name").filter(|n| !n.is_empty())?;
            let tags = connection.attr("tags").filter(|t| !t.is_empty())?;
            let kind = kind_from_name(tags)?;
            let lower = tags.to_ascii_lowercase();
            let size = TAG_SIZES
                .iter()
                .find(|(word, _)| lower.contains(word))
                .map(|(_, code)| code.to_string());
            Some(Slot {
                name: name.to_string(),
                kind: Some(kind),
                size,
                tags: tags.to_string(),
            })
        })
        .collect()
}
