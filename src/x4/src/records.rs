//! Records produced by the entity parsers
//!
//! These mirror what the game documents say, before exclusion, pricing and
//! projectile joins turn them into catalog rows.

use serde::{Deserialize, Serialize};
use x4_db::{Drag, EquipmentKind, Inertia, Jerk, Price, ShieldStats, Slot, Storage, ThrusterStats};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CraftRecord {
    pub macro_name: String,
    pub component_ref: Option<String>,
    pub name: String,
    pub basename: String,
    pub description: String,
    pub variation: String,
    pub short_variation: String,
    pub makerrace: String,
    pub icon: String,
    pub ship_class: String,
    pub size: String,
    pub ship_type: String,
    pub purpose: String,
    pub hull: i64,
    pub mass: f64,
    pub inertia: Inertia,
    pub drag: Drag,
    pub forward_accfactor: f64,
    pub jerk: Jerk,
    pub storage: Storage,
    pub cargo_capacity: i64,
    pub explosion_damage: f64,
    pub explosion_damage_shield: f64,
    pub secrecy_level: i64,
    pub thruster_tags: String,
    pub slots: Vec<Slot>,
}

/// Fields every equipment macro carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentInfo {
    pub macro_name: String,
    pub component_ref: Option<String>,
    pub name: String,
    pub basename: String,
    pub description: String,
    pub makerrace: String,
    pub size: Option<String>,
    pub mk_level: i64,
    pub hull: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponRecord {
    pub info: EquipmentInfo,
    /// `Weapon` or `Turret`
    pub kind: EquipmentKind,
    pub heat_overheat: f64,
    pub heat_cooldelay: f64,
    pub heat_coolrate: f64,
    pub heat_reenable: f64,
    pub rotation_speed_max: f64,
    pub rotation_accel_max: f64,
    /// Macro name of the projectile this weapon fires
    pub bullet_class: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShieldRecord {
    pub info: EquipmentInfo,
    pub hull_integrated: bool,
    pub recharge: ShieldStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineRecord {
    pub info: EquipmentInfo,
    pub hull_integrated: bool,
    pub forward_thrust: f64,
    pub reverse_thrust: f64,
    pub boost_duration: f64,
    pub boost_thrust: f64,
    pub boost_recharge: f64,
    pub boost_acceleration: f64,
    pub boost_attack: f64,
    pub boost_release: f64,
    pub boost_coast: f64,
    pub travel_charge: f64,
    pub travel_thrust: f64,
    pub travel_attack: f64,
    pub travel_release: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrusterRecord {
    pub info: EquipmentInfo,
    pub hull_integrated: bool,
    pub thrust: ThrusterStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectileRecord {
    pub macro_name: String,
    pub speed: f64,
    pub lifetime: f64,
    /// `speed * lifetime`
    pub range: f64,
    pub amount: i64,
    pub barrel_amount: i64,
    pub damage: f64,
    pub repair: f64,
    pub heat: f64,
    pub reload_rate: f64,
    pub ammunition: i64,
    pub ammunition_reload: f64,
}

/// Ware category, from the first tag that names one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WareCategory {
    Ship,
    Weapon,
    Turret,
    Shield,
    Engine,
    Thruster,
    Software,
    Missile,
    Countermeasure,
    Drone,
    #[default]
    Other,
}

impl WareCategory {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "ship" => Self::Ship,
            "weapon" => Self::Weapon,
            "turret" => Self::Turret,
            "shield" => Self::Shield,
            "engine" => Self::Engine,
            "thruster" => Self::Thruster,
            "software" => Self::Software,
            "missile" => Self::Missile,
            "countermeasure" => Self::Countermeasure,
            "drone" => Self::Drone,
            _ => return None,
        })
    }

    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        tags.iter()
            .find_map(|tag| Self::from_tag(tag.as_ref()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradableRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: WareCategory,
    pub price: Price,
    /// Macro this ware sells, the join key for pricing
    pub component_ref: Option<String>,
    pub owners: Vec<String>,
}
