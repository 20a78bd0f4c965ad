//! Turning parsed records into one persistence [`Batch`]
//!
//! Pricing joins by `ware.component_ref == macro_name`, weapons join their
//! projectile by `bullet_class`, exclusion rules drop what the catalog
//! should not carry, and consumables are picked out of the tradables.

use crate::exclusion::{craft_exclusion_reason, equipment_exclusion_reason};
use crate::observer::Observer;
use crate::parse::size_from_name;
use crate::records::{
    CraftRecord, EngineRecord, EquipmentInfo, ProjectileRecord, ShieldRecord, ThrusterRecord,
    TradableRecord, WeaponRecord,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use x4_db::{
    Batch, Consumable, ConsumableKind, Craft, EngineStats, Equipment, EquipmentKind,
    EquipmentStats, Price, WeaponStats,
};

/// Everything the parse stages produced
#[derive(Debug, Clone, Default)]
pub struct ParsedEntities {
    pub wares: Vec<TradableRecord>,
    pub crafts: Vec<CraftRecord>,
    pub weapons: Vec<WeaponRecord>,
    pub projectiles: BTreeMap<String, ProjectileRecord>,
    pub shields: Vec<ShieldRecord>,
    pub engines: Vec<EngineRecord>,
    pub thrusters: Vec<ThrusterRecord>,
}

/// What happened to one record type during normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub kept: usize,
    /// Count per exclusion reason
    pub excluded: BTreeMap<String, usize>,
    /// Records dropped because an earlier one had the same key
    pub duplicates: usize,
}

impl Tally {
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }

    fn exclude(&mut self, reason: &str) {
        *self.excluded.entry(reason.to_string()).or_default() += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tallies {
    pub crafts: Tally,
    pub weapons: Tally,
    pub shields: Tally,
    pub engines: Tally,
    pub thrusters: Tally,
    pub consumables: Tally,
}

#[derive(Debug, Clone, PartialEq)]
struct PricedWare {
    id: String,
    price: Price,
    tags: String,
}

/// Ware prices keyed by the macro each ware sells
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    entries: HashMap<String, PricedWare>,
}

impl PriceBook {
    pub fn from_wares(wares: &[TradableRecord]) -> Self {
        let entries = wares
            .iter()
            .filter_map(|ware| {
                let key = ware.component_ref.as_deref().filter(|r| !r.is_empty())?;
                Some((
                    key.to_string(),
                    PricedWare {
                        id: ware.id.clone(),
                        price: ware.price,
                        tags: ware.tags.join(","),
                    },
                ))
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zero price when no ware sells the macro
    pub fn price(&self, macro_name: &str) -> Price {
        self.entries
            .get(macro_name)
            .map(|w| w.price)
            .unwrap_or_default()
    }

    pub fn ware_id(&self, macro_name: &str) -> Option<String> {
        self.entries.get(macro_name).map(|w| w.id.clone())
    }

    fn tags(&self, macro_name: &str) -> String {
        self.entries
            .get(macro_name)
            .map(|w| w.tags.clone())
            .unwrap_or_default()
    }
}

/// Combat figures for a weapon, from the projectile it fires when known
pub fn weapon_stats(weapon: &WeaponRecord, projectile: Option<&ProjectileRecord>) -> WeaponStats {
    let mut stats = WeaponStats {
        bullet_class: weapon.bullet_class.clone(),
        heat_per_shot: weapon.heat_overheat,
        heat_dissipation: weapon.heat_coolrate,
        overheat_time: weapon.heat_cooldelay,
        reenable_time: weapon.heat_reenable,
        rotation_speed: weapon.rotation_speed_max,
        ..WeaponStats::default()
    };
    if let Some(projectile) = projectile {
        let fire_rate = projectile.reload_rate.max(0.0);
        stats.damage = projectile.damage;
        stats.fire_rate = fire_rate;
        stats.dps = projectile.damage * fire_rate;
        stats.projectile_speed = projectile.speed;
        stats.projectile_lifetime = projectile.lifetime;
        stats.range = projectile.range;
        stats.heat_per_shot = projectile.heat;
    }
    stats
}

/// Consumable category from a ware's id and resolved name
pub fn consumable_kind(id: &str, name: &str) -> Option<ConsumableKind> {
    let id = id.to_lowercase();
    let name = name.to_lowercase();

    if name.contains("missile") || id.contains("missile") {
        Some(ConsumableKind::Missile)
    } else if name.contains("mine") && !name.contains("miner") {
        Some(ConsumableKind::Mine)
    } else if name.contains("satellite") || id.contains("probe") || id.contains("beacon") {
        Some(ConsumableKind::Satellite)
    } else if id.contains("lasertower") || name.contains("tower") {
        Some(ConsumableKind::LaserTower)
    } else if (id.contains("drone") || name.contains("drone"))
        && !id.contains("dronecomponents")
        && !id.contains("module_gen_prod")
    {
        Some(ConsumableKind::Drone)
    } else if id.contains("countermeasure") || id.contains("flare") {
        Some(ConsumableKind::Countermeasure)
    } else {
        None
    }
}

/// Mk level written in a display name, `1` when none is
pub fn mk_level_from_name(name: &str) -> i64 {
    let name = name.to_lowercase();
    (1..=3)
        .find(|n| name.contains(&format!("mk{n}")) || name.contains(&format!("mk {n}")))
        .unwrap_or(1)
}

fn craft_row(record: CraftRecord, prices: &PriceBook) -> Craft {
    Craft {
        ware_id: prices.ware_id(&record.macro_name),
        price: prices.price(&record.macro_name),
        macro_name: record.macro_name,
        name: record.name,
        basename: record.basename,
        description: record.description,
        variation: record.variation,
        short_variation: record.short_variation,
        makerrace: record.makerrace,
        icon: record.icon,
        size: record.size,
        ship_class: record.ship_class,
        ship_type: record.ship_type,
        purpose: record.purpose,
        hull: record.hull,
        mass: record.mass,
        explosion_damage: record.explosion_damage,
        explosion_damage_shield: record.explosion_damage_shield,
        cargo_capacity: record.cargo_capacity,
        storage: record.storage,
        secrecy_level: record.secrecy_level,
        inertia: record.inertia,
        drag: record.drag,
        forward_accfactor: record.forward_accfactor,
        jerk: record.jerk,
        thruster_tags: record.thruster_tags,
        slots: record.slots,
    }
}

fn equipment_row(
    info: EquipmentInfo,
    kind: EquipmentKind,
    stats: EquipmentStats,
    prices: &PriceBook,
) -> Equipment {
    Equipment {
        ware_id: prices.ware_id(&info.macro_name),
        tags: prices.tags(&info.macro_name),
        price: prices.price(&info.macro_name),
        macro_name: info.macro_name,
        kind,
        name: info.name,
        description: info.description,
        makerrace: info.makerrace,
        size: info.size,
        mk_level: info.mk_level,
        hull: info.hull,
        stats: Some(stats),
    }
}

fn engine_stats(engine: &EngineRecord) -> EngineStats {
    EngineStats {
        forward_thrust: engine.forward_thrust,
        reverse_thrust: engine.reverse_thrust,
        boost_thrust: engine.boost_thrust,
        boost_duration: engine.boost_duration,
        boost_recharge: engine.boost_recharge,
        travel_thrust: engine.travel_thrust,
        travel_charge_time: engine.travel_charge,
        travel_attack_time: engine.travel_attack,
        travel_release_time: engine.travel_release,
    }
}

/// Builds the batch while tracking what was kept, excluded and deduplicated
struct Builder<'a> {
    prices: PriceBook,
    observer: &'a dyn Observer,
    seen_equipment: HashSet<String>,
    batch: Batch,
    tallies: Tallies,
}

impl Builder<'_> {
    fn tally(&mut self, kind: EquipmentKind) -> &mut Tally {
        match kind {
            EquipmentKind::Weapon | EquipmentKind::Turret => &mut self.tallies.weapons,
            EquipmentKind::Shield => &mut self.tallies.shields,
            EquipmentKind::Engine => &mut self.tallies.engines,
            EquipmentKind::Thruster => &mut self.tallies.thrusters,
        }
    }

    /// Exclusion and duplicate checks shared by every equipment type
    fn admit_equipment(&mut self, macro_name: &str, kind: EquipmentKind) -> bool {
        if let Some(reason) = equipment_exclusion_reason(macro_name) {
            self.observer
                .debug(&format!("Excluding {} {macro_name}: {reason}", kind.as_str()));
            self.tally(kind).exclude(reason);
            return false;
        }
        if !self.seen_equipment.insert(macro_name.to_string()) {
            self.observer
                .warn(&format!("Duplicate equipment macro {macro_name}, keeping the first"));
            self.tally(kind).duplicates += 1;
            return false;
        }
        self.tally(kind).kept += 1;
        true
    }

    fn crafts(&mut self, crafts: Vec<CraftRecord>) {
        let mut seen = HashSet::new();
        for craft in crafts {
            if let Some(reason) = craft_exclusion_reason(&craft) {
                self.observer
                    .debug(&format!("Excluding craft {}: {reason}", craft.macro_name));
                self.tallies.crafts.exclude(reason);
                continue;
            }
            if !seen.insert(craft.macro_name.clone()) {
                self.observer.warn(&format!(
                    "Duplicate craft macro {}, keeping the first",
                    craft.macro_name
                ));
                self.tallies.crafts.duplicates += 1;
                continue;
            }
            self.tallies.crafts.kept += 1;
            self.batch.crafts.push(craft_row(craft, &self.prices));
        }
    }

    fn weapons(&mut self, weapons: Vec<WeaponRecord>, projectiles: &BTreeMap<String, ProjectileRecord>) {
        for weapon in weapons {
            if !self.admit_equipment(&weapon.info.macro_name, weapon.kind) {
                continue;
            }
            let projectile = projectiles.get(&weapon.bullet_class);
            if projectile.is_none() && !weapon.bullet_class.is_empty() {
                self.observer.debug(&format!(
                    "No projectile {} for {}",
                    weapon.bullet_class, weapon.info.macro_name
                ));
            }
            let stats = EquipmentStats::Weapon(weapon_stats(&weapon, projectile));
            let row = equipment_row(weapon.info, weapon.kind, stats, &self.prices);
            self.batch.equipment.push(row);
        }
    }

    fn shields(&mut self, shields: Vec<ShieldRecord>) {
        for shield in shields {
            if !self.admit_equipment(&shield.info.macro_name, EquipmentKind::Shield) {
                continue;
            }
            let stats = EquipmentStats::Shield(shield.recharge);
            let row = equipment_row(shield.info, EquipmentKind::Shield, stats, &self.prices);
            self.batch.equipment.push(row);
        }
    }

    fn engines(&mut self, engines: Vec<EngineRecord>) {
        for engine in engines {
            if !self.admit_equipment(&engine.info.macro_name, EquipmentKind::Engine) {
                continue;
            }
            let stats = EquipmentStats::Engine(engine_stats(&engine));
            let row = equipment_row(engine.info, EquipmentKind::Engine, stats, &self.prices);
            self.batch.equipment.push(row);
        }
    }

    fn thrusters(&mut self, thrusters: Vec<ThrusterRecord>) {
        for thruster in thrusters {
            if !self.admit_equipment(&thruster.info.macro_name, EquipmentKind::Thruster) {
                continue;
            }
            let stats = EquipmentStats::Thruster(thruster.thrust);
            let row = equipment_row(thruster.info, EquipmentKind::Thruster, stats, &self.prices);
            self.batch.equipment.push(row);
        }
    }

    fn consumables(&mut self, wares: &[TradableRecord]) {
        let mut seen = HashSet::new();
        for ware in wares {
            let Some(kind) = consumable_kind(&ware.id, &ware.name) else {
                continue;
            };
            if !seen.insert(ware.id.as_str()) {
                self.tallies.consumables.duplicates += 1;
                continue;
            }
            self.tallies.consumables.kept += 1;
            self.batch.consumables.push(Consumable {
                ware_id: ware.id.clone(),
                macro_name: ware.component_ref.clone().filter(|r| !r.is_empty()),
                kind,
                name: ware.name.clone(),
                description: ware.description.clone(),
                size: size_from_name(&ware.id),
                mk_level: mk_level_from_name(&ware.name),
                tags: ware.tags.join(","),
                price: ware.price,
            });
        }
    }
}

/// Apply exclusions and joins, producing the rows to persist
pub fn build_batch(entities: ParsedEntities, observer: &dyn Observer) -> (Batch, Tallies) {
    let prices = PriceBook::from_wares(&entities.wares);
    observer.info(&format!("Built price lookup for {} wares", prices.len()));

    let mut builder = Builder {
        prices,
        observer,
        seen_equipment: HashSet::new(),
        batch: Batch::default(),
        tallies: Tallies::default(),
    };
    builder.crafts(entities.crafts);
    builder.weapons(entities.weapons, &entities.projectiles);
    builder.shields(entities.shields);
    builder.engines(entities.engines);
    builder.thrusters(entities.thrusters);
    builder.consumables(&entities.wares);

    let tallies = &builder.tallies;
    for (what, tally) in [
        ("craft", &tallies.crafts),
        ("weapons", &tallies.weapons),
        ("shields", &tallies.shields),
        ("engines", &tallies.engines),
        ("thrusters", &tallies.thrusters),
    ] {
        observer.info(&format!(
            "Kept {} {what} ({} excluded)",
            tally.kept,
            tally.excluded_total()
        ));
    }
    observer.info(&format!("Derived {} consumables", tallies.consumables.kept));

    (builder.batch, builder.tallies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::RecordingObserver;
    use crate::observer::NullObserver;
    use tracing::Level;
    use x4_db::{ShieldStats, ThrusterStats};

    fn info(macro_name: &str) -> EquipmentInfo {
        EquipmentInfo {
            macro_name: macro_name.to_string(),
            name: macro_name.to_string(),
            mk_level: 1,
            ..Default::default()
        }
    }

    fn weapon(macro_name: &str, bullet: &str) -> WeaponRecord {
        WeaponRecord {
            info: info(macro_name),
            kind: EquipmentKind::Weapon,
            heat_overheat: 40.0,
            heat_cooldelay: 0.5,
            heat_coolrate: 3000.0,
            heat_reenable: 4000.0,
            rotation_speed_max: 120.0,
            rotation_accel_max: 0.0,
            bullet_class: bullet.to_string(),
        }
    }

    fn ware(id: &str, name: &str, component_ref: Option<&str>, average: i64) -> TradableRecord {
        TradableRecord {
            id: id.to_string(),
            name: name.to_string(),
            tags: vec!["equipment".to_string(), "weapon".to_string()],
            price: Price {
                min: average - 10,
                average,
                max: average + 10,
            },
            component_ref: component_ref.map(str::to_string),
            ..Default::default()
        }
    }

    fn craft(macro_name: &str, hull: i64) -> CraftRecord {
        CraftRecord {
            macro_name: macro_name.to_string(),
            ship_class: "ship_s".to_string(),
            size: "s".to_string(),
            makerrace: "argon".to_string(),
            hull,
            mass: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_weapon_stats_from_projectile() {
        let projectile = ProjectileRecord {
            macro_name: "bullet_a_macro".to_string(),
            speed: 4000.0,
            lifetime: 1.5,
            range: 6000.0,
            damage: 100.0,
            heat: 150.0,
            reload_rate: 4.0,
            ..Default::default()
        };
        let stats = weapon_stats(&weapon("weapon_a_macro", "bullet_a_macro"), Some(&projectile));
        assert_eq!(stats.damage, 100.0);
        assert_eq!(stats.fire_rate, 4.0);
        assert_eq!(stats.dps, 400.0);
        assert_eq!(stats.range, 6000.0);
        assert_eq!(stats.heat_per_shot, 150.0);
        assert_eq!(stats.heat_dissipation, 3000.0);
        assert_eq!(stats.overheat_time, 0.5);
        assert_eq!(stats.rotation_speed, 120.0);
    }

    #[test]
    fn test_weapon_stats_without_projectile() {
        let stats = weapon_stats(&weapon("weapon_a_macro", "bullet_missing_macro"), None);
        assert_eq!(stats.dps, 0.0);
        assert_eq!(stats.heat_per_shot, 40.0);
        assert_eq!(stats.bullet_class, "bullet_missing_macro");

        let negative = ProjectileRecord {
            damage: 10.0,
            reload_rate: -1.0,
            ..Default::default()
        };
        let stats = weapon_stats(&weapon("weapon_a_macro", ""), Some(&negative));
        assert_eq!(stats.fire_rate, 0.0);
        assert_eq!(stats.dps, 0.0);
    }

    #[test]
    fn test_consumable_kinds_in_order() {
        assert_eq!(
            consumable_kind("missile_torpedo_heavy_mk1", "Heavy Torpedo Missile"),
            Some(ConsumableKind::Missile)
        );
        assert_eq!(consumable_kind("mine_01", "Friend/Foe Mine"), Some(ConsumableKind::Mine));
        assert_eq!(consumable_kind("ship_miner", "Mining Drone Miner"), Some(ConsumableKind::Drone));
        assert_eq!(
            consumable_kind("resourceprobe_01", "Resource Probe"),
            Some(ConsumableKind::Satellite)
        );
        assert_eq!(
            consumable_kind("lasertower_player_s", "Laser Tower Mk1"),
            Some(ConsumableKind::LaserTower)
        );
        assert_eq!(
            consumable_kind("dronecomponents", "Drone Components"),
            None
        );
        assert_eq!(
            consumable_kind("countermeasure_flares_01", "Flares"),
            Some(ConsumableKind::Countermeasure)
        );
        assert_eq!(consumable_kind("energycells", "Energy Cells"), None);
    }

    #[test]
    fn test_mk_level_from_name() {
        assert_eq!(mk_level_from_name("Heavy Torpedo Missile Mk2"), 2);
        assert_eq!(mk_level_from_name("Laser Tower MK 3"), 3);
        assert_eq!(mk_level_from_name("Flares"), 1);
    }

    #[test]
    fn test_price_book_joins_by_component_ref() {
        let prices = PriceBook::from_wares(&[
            ware("weapon_a", "A", Some("weapon_a_macro"), 1000),
            ware("loose", "Loose", None, 5),
        ]);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.price("weapon_a_macro").average, 1000);
        assert_eq!(prices.ware_id("weapon_a_macro").as_deref(), Some("weapon_a"));
        assert_eq!(prices.price("weapon_b_macro"), Price::default());
    }

    #[test]
    fn test_build_batch() {
        let mut projectiles = BTreeMap::new();
        projectiles.insert(
            "bullet_a_macro".to_string(),
            ProjectileRecord {
                macro_name: "bullet_a_macro".to_string(),
                damage: 50.0,
                reload_rate: 2.0,
                ..Default::default()
            },
        );
        let entities = ParsedEntities {
            wares: vec![
                ware("weapon_a", "Pulse Laser", Some("weapon_a_macro"), 1000),
                ware("ship_a", "Fighter", Some("ship_arg_s_fighter_01_a_macro"), 90000),
                ware("missile_light_mk2", "Light Missile Mk2", Some("missile_light_mk2_macro"), 50),
            ],
            crafts: vec![
                craft("ship_arg_s_fighter_01_a_macro", 3000),
                craft("ship_arg_s_fighter_01_a_macro", 3000),
                craft("struct_arg_dock_macro", 0),
            ],
            weapons: vec![
                weapon("weapon_a_macro", "bullet_a_macro"),
                weapon("weapon_gen_s_laser_video_macro", "bullet_a_macro"),
            ],
            projectiles,
            shields: vec![ShieldRecord {
                info: info("shield_arg_s_standard_01_mk1_macro"),
                hull_integrated: true,
                recharge: ShieldStats {
                    capacity: 500,
                    recharge_rate: 50.0,
                    recharge_delay: 1.0,
                },
            }],
            engines: vec![EngineRecord {
                info: info("engine_missile_light_macro"),
                ..Default::default()
            }],
            thrusters: vec![ThrusterRecord {
                info: info("weapon_a_macro"),
                hull_integrated: true,
                thrust: ThrusterStats::default(),
            }],
        };

        let observer = RecordingObserver::default();
        let (batch, tallies) = build_batch(entities, &observer);

        assert_eq!(batch.crafts.len(), 1);
        assert_eq!(batch.crafts[0].price.average, 90000);
        assert_eq!(batch.crafts[0].ware_id.as_deref(), Some("ship_a"));
        assert_eq!(tallies.crafts.duplicates, 1);
        assert_eq!(tallies.crafts.excluded["station module (0 hull)"], 1);

        let macros: Vec<_> = batch.equipment.iter().map(|e| e.macro_name.as_str()).collect();
        assert_eq!(macros, vec!["weapon_a_macro", "shield_arg_s_standard_01_mk1_macro"]);
        let laser = &batch.equipment[0];
        assert_eq!(laser.price.average, 1000);
        assert_eq!(laser.tags, "equipment,weapon");
        match &laser.stats {
            Some(EquipmentStats::Weapon(stats)) => assert_eq!(stats.dps, 100.0),
            other => panic!("expected weapon stats, got {other:?}"),
        }
        assert_eq!(batch.equipment[1].price, Price::default());

        assert_eq!(tallies.weapons.excluded["video macro (UI only)"], 1);
        assert_eq!(tallies.engines.excluded["missile engine (internal)"], 1);
        assert_eq!(tallies.thrusters.duplicates, 1);
        assert_eq!(observer.messages_at(Level::WARN).len(), 2);

        assert_eq!(batch.consumables.len(), 1);
        let missile = &batch.consumables[0];
        assert_eq!(missile.kind, ConsumableKind::Missile);
        assert_eq!(missile.mk_level, 2);
        assert_eq!(missile.macro_name.as_deref(), Some("missile_light_mk2_macro"));
        assert_eq!(missile.size, None);
    }

    #[test]
    fn test_empty_entities() {
        let (batch, tallies) = build_batch(ParsedEntities::default(), &NullObserver);
        assert_eq!(batch, Batch::default());
        assert_eq!(tallies, Tallies::default());
    }
}
