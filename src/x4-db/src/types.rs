//! Catalog row types.
//!
//! These are what the pipeline hands to a repository and what queries return.
//! Physics groups are shared with the parsers so a parsed craft carries them
//! through unchanged.

use serde::{Deserialize, Serialize};

/// Error converting a stored string back into an enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid equipment kind: {0}")]
    InvalidEquipmentKind(String),

    #[error("Invalid consumable kind: {0}")]
    InvalidConsumableKind(String),
}

/// Installable equipment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    Weapon,
    Turret,
    Shield,
    Engine,
    Thruster,
}

impl EquipmentKind {
    pub const ALL: [EquipmentKind; 5] = [
        Self::Weapon,
        Self::Turret,
        Self::Shield,
        Self::Engine,
        Self::Thruster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Turret => "turret",
            Self::Shield => "shield",
            Self::Engine => "engine",
            Self::Thruster => "thruster",
        }
    }
}

impl std::fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EquipmentKind {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::InvalidEquipmentKind(s.to_string()))
    }
}

/// Consumable ware category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumableKind {
    Missile,
    Mine,
    Satellite,
    LaserTower,
    Drone,
    Countermeasure,
}

impl std::fmt::Display for ConsumableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missile => write!(f, "missile"),
            Self::Mine => write!(f, "mine"),
            Self::Satellite => write!(f, "satellite"),
            Self::LaserTower => write!(f, "laser_tower"),
            Self::Drone => write!(f, "drone"),
            Self::Countermeasure => write!(f, "countermeasure"),
        }
    }
}

impl std::str::FromStr for ConsumableKind {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missile" => Ok(Self::Missile),
            "mine" => Ok(Self::Mine),
            "satellite" => Ok(Self::Satellite),
            "laser_tower" => Ok(Self::LaserTower),
            "drone" => Ok(Self::Drone),
            "countermeasure" => Ok(Self::Countermeasure),
            _ => Err(ParseError::InvalidConsumableKind(s.to_string())),
        }
    }
}

/// Trade price range in credits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub min: i64,
    pub average: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Inertia {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drag {
    pub forward: f64,
    pub reverse: f64,
    pub horizontal: f64,
    pub vertical: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Rate-of-change limits on acceleration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Jerk {
    pub forward_accel: f64,
    pub forward_decel: f64,
    pub forward_ratio: f64,
    pub boost_accel: f64,
    pub boost_ratio: f64,
    pub travel_accel: f64,
    pub travel_decel: f64,
    pub travel_ratio: f64,
    pub strafe: f64,
    pub angular: f64,
}

/// Onboard capacities other than cargo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub missiles: i64,
    pub drones: i64,
    pub units: i64,
    pub crew: i64,
}

/// Equipment attachment point on a craft
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    /// `None` when the slot's category could not be inferred
    pub kind: Option<EquipmentKind>,
    pub size: Option<String>,
    pub tags: String,
}

impl Slot {
    pub fn kind_label(&self) -> &'static str {
        self.kind.as_ref().map_or("unknown", EquipmentKind::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Craft {
    pub macro_name: String,
    pub ware_id: Option<String>,
    pub name: String,
    pub basename: String,
    pub description: String,
    pub variation: String,
    pub short_variation: String,
    pub makerrace: String,
    pub icon: String,
    pub size: String,
    pub ship_class: String,
    pub ship_type: String,
    pub purpose: String,
    pub hull: i64,
    pub mass: f64,
    pub explosion_damage: f64,
    pub explosion_damage_shield: f64,
    pub cargo_capacity: i64,
    pub storage: Storage,
    pub secrecy_level: i64,
    pub inertia: Inertia,
    pub drag: Drag,
    pub forward_accfactor: f64,
    pub jerk: Jerk,
    pub thruster_tags: String,
    pub price: Price,
    /// Loaded by `get_craft`; empty in listings
    #[serde(default)]
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub bullet_class: String,
    pub damage: f64,
    pub fire_rate: f64,
    pub dps: f64,
    pub projectile_speed: f64,
    pub projectile_lifetime: f64,
    pub range: f64,
    pub heat_per_shot: f64,
    pub heat_dissipation: f64,
    pub overheat_time: f64,
    pub reenable_time: f64,
    pub rotation_speed: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShieldStats {
    pub capacity: i64,
    pub recharge_rate: f64,
    pub recharge_delay: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub forward_thrust: f64,
    pub reverse_thrust: f64,
    pub boost_thrust: f64,
    pub boost_duration: f64,
    pub boost_recharge: f64,
    pub travel_thrust: f64,
    pub travel_charge_time: f64,
    pub travel_attack_time: f64,
    pub travel_release_time: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrusterStats {
    pub strafe: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Kind-specific stats, stored in one table per variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EquipmentStats {
    Weapon(WeaponStats),
    Shield(ShieldStats),
    Engine(EngineStats),
    Thruster(ThrusterStats),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub macro_name: String,
    pub ware_id: Option<String>,
    pub kind: EquipmentKind,
    pub name: String,
    pub description: String,
    pub makerrace: String,
    pub size: Option<String>,
    pub mk_level: i64,
    pub hull: i64,
    pub tags: String,
    pub price: Price,
    /// Loaded by `get_equipment`; `None` in listings
    #[serde(default)]
    pub stats: Option<EquipmentStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumable {
    pub ware_id: String,
    pub macro_name: Option<String>,
    pub kind: ConsumableKind,
    pub name: String,
    pub description: String,
    pub size: Option<String>,
    pub mk_level: i64,
    pub tags: String,
    pub price: Price,
}

/// Everything one extraction run persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub crafts: Vec<Craft>,
    pub equipment: Vec<Equipment>,
    pub consumables: Vec<Consumable>,
}

/// Rows written by an insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub crafts: usize,
    pub slots: usize,
    pub equipment: usize,
    pub consumables: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbStats {
    pub craft_count: i64,
    pub slot_count: i64,
    pub equipment_count: i64,
    pub consumable_count: i64,
    /// Equipment rows per kind, in kind order
    pub equipment_by_kind: Vec<(EquipmentKind, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equipment_kind_round_trips_through_strings() {
        for kind in EquipmentKind::ALL {
            assert_eq!(kind.to_string().parse::<EquipmentKind>().unwrap(), kind);
        }
        assert_eq!(
            "shieldgenerator".parse::<EquipmentKind>(),
            Err(ParseError::InvalidEquipmentKind("shieldgenerator".to_string()))
        );
    }

    #[test]
    fn test_consumable_kind_labels() {
        assert_eq!(ConsumableKind::LaserTower.to_string(), "laser_tower");
        assert_eq!("laser_tower".parse::<ConsumableKind>().unwrap(), ConsumableKind::LaserTower);
        assert!("torpedo".parse::<ConsumableKind>().is_err());
    }

    #[test]
    fn test_slot_kind_label() {
        let slot = Slot {
            name: "con_weapon_01".to_string(),
            kind: Some(EquipmentKind::Weapon),
            ..Default::default()
        };
        assert_eq!(slot.kind_label(), "weapon");
        assert_eq!(Slot::default().kind_label(), "unknown");
    }

    #[test]
    fn test_stats_serialize_with_type_tag() {
        let stats = EquipmentStats::Thruster(ThrusterStats {
            strafe: 1.0,
            ..Default::default()
        });
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["type"], "thruster");
        assert_eq!(json["strafe"], 1.0);
    }
}
