//! Which parsed records are not meaningful catalog entries
//!
//! Both rule lists are ordered and the first match wins. Some later rules
//! are narrower carve-outs of broader ones (Xenon craft are only excluded
//! at `xs`), so reordering changes verdicts.

use crate::records::CraftRecord;

struct Rule<T: ?Sized> {
    applies: fn(&T) -> bool,
    reason: &'static str,
}

/// Lowercased craft fields the rules look at
struct CraftKey {
    macro_name: String,
    ship_class: String,
    ship_type: String,
    makerrace: String,
    size: String,
    hull: i64,
    mass: f64,
}

impl CraftKey {
    fn new(craft: &CraftRecord) -> Self {
        Self {
            macro_name: craft.macro_name.to_ascii_lowercase(),
            ship_class: craft.ship_class.to_ascii_lowercase(),
            ship_type: craft.ship_type.to_ascii_lowercase(),
            makerrace: craft.makerrace.to_ascii_lowercase(),
            size: craft.size.to_ascii_lowercase(),
            hull: craft.hull,
            mass: craft.mass,
        }
    }

    fn name_has(&self, needle: &str) -> bool {
        self.macro_name.contains(needle)
    }
}

const CRAFT_RULES: &[Rule<CraftKey>] = &[
    Rule {
        applies: |c| c.ship_class == "spacesuit",
        reason: "spacesuit (not a ship)",
    },
    Rule {
        applies: |c| c.ship_type == "personalvehicle",
        reason: "personal vehicle (NPC mass traffic)",
    },
    Rule {
        applies: |c| c.makerrace == "khaak",
        reason: "Kha'ak ship (enemy, not capturable)",
    },
    Rule {
        applies: |c| c.makerrace == "xenon" && c.size == "xs",
        reason: "Xenon drone (not capturable)",
    },
    Rule {
        applies: |c| c.name_has("story") || c.name_has("scenario"),
        reason: "story/scenario ship (mission-specific)",
    },
    Rule {
        applies: |c| c.name_has("escapepod") || c.name_has("boardingpod"),
        reason: "pod (not a pilotable ship)",
    },
    Rule {
        applies: |c| c.ship_type == "distressdrone",
        reason: "distress drone (NPC autonomous)",
    },
    Rule {
        applies: |c| c.name_has("lasertower"),
        reason: "laser tower (consumable)",
    },
    Rule {
        applies: |c| c.name_has("drone") && !c.name_has("droneship"),
        reason: "drone (consumable)",
    },
    Rule {
        applies: |c| c.hull == 0 && c.mass == 0.0,
        reason: "station module (0 hull & mass)",
    },
    Rule {
        applies: |c| c.hull == 0,
        reason: "station module (0 hull)",
    },
    Rule {
        applies: |c| c.mass == 0.0,
        reason: "station module (0 mass)",
    },
    Rule {
        applies: |c| c.name_has("_storage_"),
        reason: "storage module",
    },
    Rule {
        applies: |c| c.name_has("_hab_"),
        reason: "habitation module",
    },
    Rule {
        applies: |c| c.name_has("_prod_"),
        reason: "production module",
    },
    Rule {
        applies: |c| c.name_has("_connection_"),
        reason: "connection structure",
    },
];

const EQUIPMENT_RULES: &[Rule<str>] = &[
    Rule {
        applies: |n| n.contains("_video_"),
        reason: "video macro (UI only)",
    },
    Rule {
        applies: |n| n.contains("_virtual_"),
        reason: "virtual macro (test item)",
    },
    Rule {
        applies: |n| n.contains("scenario"),
        reason: "scenario equipment (NPCs only)",
    },
    Rule {
        applies: |n| n.contains("story"),
        reason: "story equipment (mission-specific)",
    },
    Rule {
        applies: |n| n.contains("engine_missile_"),
        reason: "missile engine (internal)",
    },
    Rule {
        applies: |n| n.contains("engine_limpet_"),
        reason: "limpet mine engine (internal)",
    },
    Rule {
        applies: |n| n.contains("engine_special_mine_"),
        reason: "mine engine (internal)",
    },
    Rule {
        applies: |n| n.contains("engine_gen_xs_"),
        reason: "NPC drone/system engine",
    },
    Rule {
        applies: |n| n.contains("_xs_police_") && n.contains("engine_"),
        reason: "NPC police engine",
    },
    Rule {
        applies: |n| n.contains("_xs_pv_") && n.contains("engine_"),
        reason: "NPC civilian engine",
    },
    Rule {
        applies: |n| n.contains("engine_gen_xs_static"),
        reason: "static engine (decorative)",
    },
];

/// Why a craft should not be catalogued, if it shouldn't
pub fn craft_exclusion_reason(craft: &CraftRecord) -> Option<&'static str> {
    let key = CraftKey::new(craft);
    CRAFT_RULES
        .iter()
        .find(|rule| (rule.applies)(&key))
        .map(|rule| rule.reason)
}

/// Why an equipment macro should not be catalogued, if it shouldn't
pub fn equipment_exclusion_reason(macro_name: &str) -> Option<&'static str> {
    let name = macro_name.to_ascii_lowercase();
    EQUIPMENT_RULES
        .iter()
        .find(|rule| (rule.applies)(name.as_str()))
        .map(|rule| rule.reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter() -> CraftRecord {
        CraftRecord {
            macro_name: "ship_arg_s_fighter_01_a_macro".to_string(),
            ship_class: "ship_s".to_string(),
            ship_type: "fighter".to_string(),
            makerrace: "argon".to_string(),
            size: "s".to_string(),
            hull: 3000,
            mass: 12.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_hull_and_mass_excluded_positive_kept() {
        let kept = fighter();
        assert_eq!(craft_exclusion_reason(&kept), None);

        let fragment = CraftRecord {
            hull: 0,
            mass: 0.0,
            ..fighter()
        };
        assert_eq!(
            craft_exclusion_reason(&fragment),
            Some("station module (0 hull & mass)")
        );

        let massless = CraftRecord {
            mass: 0.0,
            ..fighter()
        };
        assert_eq!(craft_exclusion_reason(&massless), Some("station module (0 mass)"));
    }

    #[test]
    fn test_xenon_only_excluded_at_xs() {
        let drone = CraftRecord {
            macro_name: "ship_xen_xs_fighter_01_a_macro".to_string(),
            makerrace: "Xenon".to_string(),
            size: "xs".to_string(),
            ..fighter()
        };
        assert_eq!(craft_exclusion_reason(&drone), Some("Xenon drone (not capturable)"));

        let fighter = CraftRecord {
            macro_name: "ship_xen_s_fighter_01_a_macro".to_string(),
            makerrace: "xenon".to_string(),
            ..fighter()
        };
        assert_eq!(craft_exclusion_reason(&fighter), None);
    }

    #[test]
    fn test_first_matching_craft_rule_wins() {
        let suit = CraftRecord {
            ship_class: "SpaceSuit".to_string(),
            makerrace: "khaak".to_string(),
            hull: 0,
            ..fighter()
        };
        assert_eq!(craft_exclusion_reason(&suit), Some("spacesuit (not a ship)"));

        let droneship = CraftRecord {
            macro_name: "ship_bor_m_droneship_01_macro".to_string(),
            ..fighter()
        };
        assert_eq!(craft_exclusion_reason(&droneship), None);

        let drone = CraftRecord {
            macro_name: "ship_gen_xs_cargodrone_empty_01_a_macro".to_string(),
            ..fighter()
        };
        assert_eq!(craft_exclusion_reason(&drone), Some("drone (consumable)"));

        let story = CraftRecord {
            macro_name: "ship_arg_s_fighter_01_story_macro".to_string(),
            ..fighter()
        };
        assert_eq!(
            craft_exclusion_reason(&story),
            Some("story/scenario ship (mission-specific)")
        );
    }

    #[test]
    fn test_equipment_rules() {
        assert_eq!(equipment_exclusion_reason("weapon_arg_m_laser_01_mk1_macro"), None);
        assert_eq!(equipment_exclusion_reason("weapon_gen_s_videolaser_01_macro"), None);
        assert_eq!(
            equipment_exclusion_reason("shield_gen_s_video_01_macro"),
            Some("video macro (UI only)")
        );
        assert_eq!(
            equipment_exclusion_reason("Engine_Missile_Light_MK1_macro"),
            Some("missile engine (internal)")
        );
        assert_eq!(
            equipment_exclusion_reason("engine_gen_xs_static_01_macro"),
            Some("NPC drone/system engine")
        );
        assert_eq!(
            equipment_exclusion_reason("engine_arg_xs_police_01_mk1_macro"),
            Some("NPC police engine")
        );
        assert_eq!(equipment_exclusion_reason("thruster_arg_xs_pv_01_macro"), None);
    }
}
