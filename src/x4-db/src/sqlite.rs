//! SQLite implementation using rusqlite.

use crate::repository::*;
use crate::types::*;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;

/// Default database file name
pub const DEFAULT_DB_FILE: &str = "x4_catalog.db";

/// Written to `run_metadata` as `schema_version`
pub const SCHEMA_VERSION: &str = "1";

const CRAFT_COLUMNS: &str = "macro_name, ware_id, name, basename, description, variation, \
    short_variation, makerrace, icon, size, ship_class, ship_type, purpose, hull, mass, \
    explosion_damage, explosion_damage_shield, cargo_capacity, missile_storage, drone_storage, \
    unit_storage, crew_capacity, secrecy_level, inertia_pitch, inertia_yaw, inertia_roll, \
    drag_forward, drag_reverse, drag_horizontal, drag_vertical, drag_pitch, drag_yaw, drag_roll, \
    forward_accfactor, jerk_forward_accel, jerk_forward_decel, jerk_forward_ratio, \
    jerk_boost_accel, jerk_boost_ratio, jerk_travel_accel, jerk_travel_decel, jerk_travel_ratio, \
    jerk_strafe, jerk_angular, thruster_tags, price_min, price_avg, price_max";

const EQUIPMENT_COLUMNS: &str = "macro_name, ware_id, kind, name, description, makerrace, size, \
    mk_level, hull, tags, price_min, price_avg, price_max";

const CONSUMABLE_COLUMNS: &str = "ware_id, macro_name, kind, name, description, size, mk_level, \
    tags, price_min, price_avg, price_max";

const WEAPON_COLUMNS: &str = "equipment_macro, bullet_class, damage, fire_rate, dps, \
    projectile_speed, projectile_lifetime, range_max, heat_per_shot, heat_dissipation, \
    overheat_time, reenable_time, rotation_speed";

const SHIELD_COLUMNS: &str = "equipment_macro, capacity, recharge_rate, recharge_delay";

const ENGINE_COLUMNS: &str = "equipment_macro, forward_thrust, reverse_thrust, boost_thrust, \
    boost_duration, boost_recharge, travel_thrust, travel_charge_time, travel_attack_time, \
    travel_release_time";

const THRUSTER_COLUMNS: &str = "equipment_macro, strafe, pitch, yaw, roll";

const SLOT_COLUMNS: &str = "craft_macro, slot_index, name, kind, size, tags";

/// SQLite-backed catalog
pub struct SqliteDb {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

impl FromSql for EquipmentKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for EquipmentKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ConsumableKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for ConsumableKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

fn price_from(row: &Row<'_>) -> rusqlite::Result<Price> {
    Ok(Price {
        min: row.get("price_min")?,
        average: row.get("price_avg")?,
        max: row.get("price_max")?,
    })
}

fn row_to_craft(row: &Row<'_>) -> rusqlite::Result<Craft> {
    Ok(Craft {
        macro_name: row.get("macro_name")?,
        ware_id: row.get("ware_id")?,
        name: row.get("name")?,
        basename: row.get("basename")?,
        description: row.get("description")?,
        variation: row.get("variation")?,
        short_variation: row.get("short_variation")?,
        makerrace: row.get("makerrace")?,
        icon: row.get("icon")?,
        size: row.get("size")?,
        ship_class: row.get("ship_class")?,
        ship_type: row.get("ship_type")?,
        purpose: row.get("purpose")?,
        hull: row.get("hull")?,
        mass: row.get("mass")?,
        explosion_damage: row.get("explosion_damage")?,
        explosion_damage_shield: row.get("explosion_damage_shield")?,
        cargo_capacity: row.get("cargo_capacity")?,
        storage: Storage {
            missiles: row.get("missile_storage")?,
            drones: row.get("drone_storage")?,
            units: row.get("unit_storage")?,
            crew: row.get("crew_capacity")?,
        },
        secrecy_level: row.get("secrecy_level")?,
        inertia: Inertia {
            pitch: row.get("inertia_pitch")?,
            yaw: row.get("inertia_yaw")?,
            roll: row.get("inertia_roll")?,
        },
        drag: Drag {
            forward: row.get("drag_forward")?,
            reverse: row.get("drag_reverse")?,
            horizontal: row.get("drag_horizontal")?,
            vertical: row.get("drag_vertical")?,
            pitch: row.get("drag_pitch")?,
            yaw: row.get("drag_yaw")?,
            roll: row.get("drag_roll")?,
        },
        forward_accfactor: row.get("forward_accfactor")?,
        jerk: Jerk {
            forward_accel: row.get("jerk_forward_accel")?,
            forward_decel: row.get("jerk_forward_decel")?,
            forward_ratio: row.get("jerk_forward_ratio")?,
            boost_accel: row.get("jerk_boost_accel")?,
            boost_ratio: row.get("jerk_boost_ratio")?,
            travel_accel: row.get("jerk_travel_accel")?,
            travel_decel: row.get("jerk_travel_decel")?,
            travel_ratio: row.get("jerk_travel_ratio")?,
            strafe: row.get("jerk_strafe")?,
            angular: row.get("jerk_angular")?,
        },
        thruster_tags: row.get("thruster_tags")?,
        price: price_from(row)?,
        slots: Vec::new(),
    })
}

fn row_to_slot(row: &Row<'_>) -> rusqlite::Result<Slot> {
    let kind: String = row.get("kind")?;
    Ok(Slot {
        name: row.get("name")?,
        kind: kind.parse().ok(),
        size: row.get("size")?,
        tags: row.get("tags")?,
    })
}

fn row_to_equipment(row: &Row<'_>) -> rusqlite::Result<Equipment> {
    Ok(Equipment {
        macro_name: row.get("macro_name")?,
        ware_id: row.get("ware_id")?,
        kind: row.get("kind")?,
        name: row.get("name")?,
        description: row.get("description")?,
        makerrace: row.get("makerrace")?,
        size: row.get("size")?,
        mk_level: row.get("mk_level")?,
        hull: row.get("hull")?,
        tags: row.get("tags")?,
        price: price_from(row)?,
        stats: None,
    })
}

fn row_to_consumable(row: &Row<'_>) -> rusqlite::Result<Consumable> {
    Ok(Consumable {
        ware_id: row.get("ware_id")?,
        macro_name: row.get("macro_name")?,
        kind: row.get("kind")?,
        name: row.get("name")?,
        description: row.get("description")?,
        size: row.get("size")?,
        mk_level: row.get("mk_level")?,
        tags: row.get("tags")?,
        price: price_from(row)?,
    })
}

/// `INSERT INTO table (columns) VALUES (?1, ?2, ...)`
fn insert_sql(table: &str, columns: &str) -> String {
    let placeholders: Vec<String> = (1..=columns.split(',').count())
        .map(|i| format!("?{i}"))
        .collect();
    format!(
        "INSERT INTO {table} ({columns}) VALUES ({})",
        placeholders.join(", ")
    )
}

#[allow(clippy::too_many_lines)] // SQL schema definition
fn create_schema(conn: &Connection) -> RepoResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS crafts (
            macro_name TEXT PRIMARY KEY NOT NULL,
            ware_id TEXT,
            name TEXT NOT NULL DEFAULT '',
            basename TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            variation TEXT NOT NULL DEFAULT '',
            short_variation TEXT NOT NULL DEFAULT '',
            makerrace TEXT NOT NULL DEFAULT '',
            icon TEXT NOT NULL DEFAULT '',
            size TEXT NOT NULL DEFAULT '',
            ship_class TEXT NOT NULL DEFAULT '',
            ship_type TEXT NOT NULL DEFAULT '',
            purpose TEXT NOT NULL DEFAULT '',
            hull INTEGER NOT NULL DEFAULT 0,
            mass REAL NOT NULL DEFAULT 0,
            explosion_damage REAL NOT NULL DEFAULT 0,
            explosion_damage_shield REAL NOT NULL DEFAULT 0,
            cargo_capacity INTEGER NOT NULL DEFAULT 0,
            missile_storage INTEGER NOT NULL DEFAULT 0,
            drone_storage INTEGER NOT NULL DEFAULT 0,
            unit_storage INTEGER NOT NULL DEFAULT 0,
            crew_capacity INTEGER NOT NULL DEFAULT 0,
            secrecy_level INTEGER NOT NULL DEFAULT 0,
            inertia_pitch REAL NOT NULL DEFAULT 0,
            inertia_yaw REAL NOT NULL DEFAULT 0,
            inertia_roll REAL NOT NULL DEFAULT 0,
            drag_forward REAL NOT NULL DEFAULT 0,
            drag_reverse REAL NOT NULL DEFAULT 0,
            drag_horizontal REAL NOT NULL DEFAULT 0,
            drag_vertical REAL NOT NULL DEFAULT 0,
            drag_pitch REAL NOT NULL DEFAULT 0,
            drag_yaw REAL NOT NULL DEFAULT 0,
            drag_roll REAL NOT NULL DEFAULT 0,
            forward_accfactor REAL NOT NULL DEFAULT 1,
            jerk_forward_accel REAL NOT NULL DEFAULT 0,
            jerk_forward_decel REAL NOT NULL DEFAULT 0,
            jerk_forward_ratio REAL NOT NULL DEFAULT 0,
            jerk_boost_accel REAL NOT NULL DEFAULT 0,
            jerk_boost_ratio REAL NOT NULL DEFAULT 0,
            jerk_travel_accel REAL NOT NULL DEFAULT 0,
            jerk_travel_decel REAL NOT NULL DEFAULT 0,
            jerk_travel_ratio REAL NOT NULL DEFAULT 0,
            jerk_strafe REAL NOT NULL DEFAULT 0,
            jerk_angular REAL NOT NULL DEFAULT 0,
            thruster_tags TEXT NOT NULL DEFAULT '',
            price_min INTEGER NOT NULL DEFAULT 0,
            price_avg INTEGER NOT NULL DEFAULT 0,
            price_max INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS craft_slots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            craft_macro TEXT NOT NULL REFERENCES crafts(macro_name) ON DELETE CASCADE,
            slot_index INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            size TEXT,
            tags TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS equipment (
            macro_name TEXT PRIMARY KEY NOT NULL,
            ware_id TEXT,
            kind TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            makerrace TEXT NOT NULL DEFAULT '',
            size TEXT,
            mk_level INTEGER NOT NULL DEFAULT 1,
            hull INTEGER NOT NULL DEFAULT 0,
            tags TEXT NOT NULL DEFAULT '',
            price_min INTEGER NOT NULL DEFAULT 0,
            price_avg INTEGER NOT NULL DEFAULT 0,
            price_max INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS weapon_stats (
            equipment_macro TEXT PRIMARY KEY NOT NULL
                REFERENCES equipment(macro_name) ON DELETE CASCADE,
            bullet_class TEXT NOT NULL DEFAULT '',
            damage REAL NOT NULL DEFAULT 0,
            fire_rate REAL NOT NULL DEFAULT 0,
            dps REAL NOT NULL DEFAULT 0,
            projectile_speed REAL NOT NULL DEFAULT 0,
            projectile_lifetime REAL NOT NULL DEFAULT 0,
            range_max REAL NOT NULL DEFAULT 0,
            heat_per_shot REAL NOT NULL DEFAULT 0,
            heat_dissipation REAL NOT NULL DEFAULT 0,
            overheat_time REAL NOT NULL DEFAULT 0,
            reenable_time REAL NOT NULL DEFAULT 0,
            rotation_speed REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS shield_stats (
            equipment_macro TEXT PRIMARY KEY NOT NULL
                REFERENCES equipment(macro_name) ON DELETE CASCADE,
            capacity INTEGER NOT NULL DEFAULT 0,
            recharge_rate REAL NOT NULL DEFAULT 0,
            recharge_delay REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS engine_stats (
            equipment_macro TEXT PRIMARY KEY NOT NULL
                REFERENCES equipment(macro_name) ON DELETE CASCADE,
            forward_thrust REAL NOT NULL DEFAULT 0,
            reverse_thrust REAL NOT NULL DEFAULT 0,
            boost_thrust REAL NOT NULL DEFAULT 0,
            boost_duration REAL NOT NULL DEFAULT 0,
            boost_recharge REAL NOT NULL DEFAULT 0,
            travel_thrust REAL NOT NULL DEFAULT 0,
            travel_charge_time REAL NOT NULL DEFAULT 0,
            travel_attack_time REAL NOT NULL DEFAULT 0,
            travel_release_time REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS thruster_stats (
            equipment_macro TEXT PRIMARY KEY NOT NULL
                REFERENCES equipment(macro_name) ON DELETE CASCADE,
            strafe REAL NOT NULL DEFAULT 0,
            pitch REAL NOT NULL DEFAULT 0,
            yaw REAL NOT NULL DEFAULT 0,
            roll REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS consumables (
            ware_id TEXT PRIMARY KEY NOT NULL,
            macro_name TEXT,
            kind TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            size TEXT,
            mk_level INTEGER NOT NULL DEFAULT 1,
            tags TEXT NOT NULL DEFAULT '',
            price_min INTEGER NOT NULL DEFAULT 0,
            price_avg INTEGER NOT NULL DEFAULT 0,
            price_max INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS run_metadata (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_crafts_size ON crafts(size);
        CREATE INDEX IF NOT EXISTS idx_craft_slots_craft ON craft_slots(craft_macro);
        CREATE INDEX IF NOT EXISTS idx_equipment_kind ON equipment(kind);
        "#,
    )
    .map_err(db_err)
}

fn drop_schema(conn: &Connection) -> RepoResult<()> {
    // Children first so the implicit deletes never see dangling references
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS craft_slots;
        DROP TABLE IF EXISTS weapon_stats;
        DROP TABLE IF EXISTS shield_stats;
        DROP TABLE IF EXISTS engine_stats;
        DROP TABLE IF EXISTS thruster_stats;
        DROP TABLE IF EXISTS crafts;
        DROP TABLE IF EXISTS equipment;
        DROP TABLE IF EXISTS consumables;
        DROP TABLE IF EXISTS run_metadata;
        "#,
    )
    .map_err(db_err)
}

fn insert_crafts(conn: &Connection, crafts: &[Craft], counts: &mut BatchCounts) -> RepoResult<()> {
    let mut craft_stmt = conn
        .prepare(&insert_sql("crafts", CRAFT_COLUMNS))
        .map_err(db_err)?;
    let mut slot_stmt = conn
        .prepare(&insert_sql("craft_slots", SLOT_COLUMNS))
        .map_err(db_err)?;

    for craft in crafts {
        craft_stmt
            .execute(params![
                craft.macro_name,
                craft.ware_id,
                craft.name,
                craft.basename,
                craft.description,
                craft.variation,
                craft.short_variation,
                craft.makerrace,
                craft.icon,
                craft.size,
                craft.ship_class,
                craft.ship_type,
                craft.purpose,
                craft.hull,
                craft.mass,
                craft.explosion_damage,
                craft.explosion_damage_shield,
                craft.cargo_capacity,
                craft.storage.missiles,
                craft.storage.drones,
                craft.storage.units,
                craft.storage.crew,
                craft.secrecy_level,
                craft.inertia.pitch,
                craft.inertia.yaw,
                craft.inertia.roll,
                craft.drag.forward,
                craft.drag.reverse,
                craft.drag.horizontal,
                craft.drag.vertical,
                craft.drag.pitch,
                craft.drag.yaw,
                craft.drag.roll,
                craft.forward_accfactor,
                craft.jerk.forward_accel,
                craft.jerk.forward_decel,
                craft.jerk.forward_ratio,
                craft.jerk.boost_accel,
                craft.jerk.boost_ratio,
                craft.jerk.travel_accel,
                craft.jerk.travel_decel,
                craft.jerk.travel_ratio,
                craft.jerk.strafe,
                craft.jerk.angular,
                craft.thruster_tags,
                craft.price.min,
                craft.price.average,
                craft.price.max,
            ])
            .map_err(db_err)?;
        counts.crafts += 1;

        for (index, slot) in craft.slots.iter().enumerate() {
            slot_stmt
                .execute(params![
                    craft.macro_name,
                    index as i64,
                    slot.name,
                    slot.kind_label(),
                    slot.size,
                    slot.tags,
                ])
                .map_err(db_err)?;
            counts.slots += 1;
        }
    }
    Ok(())
}

fn insert_equipment(
    conn: &Connection,
    equipment: &[Equipment],
    counts: &mut BatchCounts,
) -> RepoResult<()> {
    let mut equipment_stmt = conn
        .prepare(&insert_sql("equipment", EQUIPMENT_COLUMNS))
        .map_err(db_err)?;
    let mut weapon_stmt = conn
        .prepare(&insert_sql("weapon_stats", WEAPON_COLUMNS))
        .map_err(db_err)?;
    let mut shield_stmt = conn
        .prepare(&insert_sql("shield_stats", SHIELD_COLUMNS))
        .map_err(db_err)?;
    let mut engine_stmt = conn
        .prepare(&insert_sql("engine_stats", ENGINE_COLUMNS))
        .map_err(db_err)?;
    let mut thruster_stmt = conn
        .prepare(&insert_sql("thruster_stats", THRUSTER_COLUMNS))
        .map_err(db_err)?;

    for item in equipment {
        equipment_stmt
            .execute(params![
                item.macro_name,
                item.ware_id,
                item.kind,
                item.name,
                item.description,
                item.makerrace,
                item.size,
                item.mk_level,
                item.hull,
                item.tags,
                item.price.min,
                item.price.average,
                item.price.max,
            ])
            .map_err(db_err)?;
        counts.equipment += 1;

        let key = &item.macro_name;
        match &item.stats {
            Some(EquipmentStats::Weapon(w)) => weapon_stmt.execute(params![
                key,
                w.bullet_class,
                w.damage,
                w.fire_rate,
                w.dps,
                w.projectile_speed,
                w.projectile_lifetime,
                w.range,
                w.heat_per_shot,
                w.heat_dissipation,
                w.overheat_time,
                w.reenable_time,
                w.rotation_speed,
            ]),
            Some(EquipmentStats::Shield(s)) => shield_stmt.execute(params![
                key,
                s.capacity,
                s.recharge_rate,
                s.recharge_delay,
            ]),
            Some(EquipmentStats::Engine(e)) => engine_stmt.execute(params![
                key,
                e.forward_thrust,
                e.reverse_thrust,
                e.boost_thrust,
                e.boost_duration,
                e.boost_recharge,
                e.travel_thrust,
                e.travel_charge_time,
                e.travel_attack_time,
                e.travel_release_time,
            ]),
            Some(EquipmentStats::Thruster(t)) => {
                thruster_stmt.execute(params![key, t.strafe, t.pitch, t.yaw, t.roll])
            }
            None => Ok(0),
        }
        .map_err(db_err)?;
    }
    Ok(())
}

fn insert_consumables(
    conn: &Connection,
    consumables: &[Consumable],
    counts: &mut BatchCounts,
) -> RepoResult<()> {
    let mut stmt = conn
        .prepare(&insert_sql("consumables", CONSUMABLE_COLUMNS))
        .map_err(db_err)?;
    for item in consumables {
        stmt.execute(params![
            item.ware_id,
            item.macro_name,
            item.kind,
            item.name,
            item.description,
            item.size,
            item.mk_level,
            item.tags,
            item.price.min,
            item.price.average,
            item.price.max,
        ])
        .map_err(db_err)?;
        counts.consumables += 1;
    }
    Ok(())
}

fn insert_all(conn: &Connection, batch: &Batch) -> RepoResult<BatchCounts> {
    let mut counts = BatchCounts::default();
    insert_crafts(conn, &batch.crafts, &mut counts)?;
    insert_equipment(conn, &batch.equipment, &mut counts)?;
    insert_consumables(conn, &batch.consumables, &mut counts)?;
    Ok(counts)
}

impl SqliteDb {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> RepoResult<i64> {
        self.conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(db_err)
    }

    fn stats_for(&self, macro_name: &str, kind: EquipmentKind) -> RepoResult<Option<EquipmentStats>> {
        let key = params![macro_name];
        let stats = match kind {
            EquipmentKind::Weapon | EquipmentKind::Turret => self
                .conn
                .query_row(
                    &format!("SELECT {WEAPON_COLUMNS} FROM weapon_stats WHERE equipment_macro = ?1"),
                    key,
                    |row| {
                        Ok(EquipmentStats::Weapon(WeaponStats {
                            bullet_class: row.get("bullet_class")?,
                            damage: row.get("damage")?,
                            fire_rate: row.get("fire_rate")?,
                            dps: row.get("dps")?,
                            projectile_speed: row.get("projectile_speed")?,
                            projectile_lifetime: row.get("projectile_lifetime")?,
                            range: row.get("range_max")?,
                            heat_per_shot: row.get("heat_per_shot")?,
                            heat_dissipation: row.get("heat_dissipation")?,
                            overheat_time: row.get("overheat_time")?,
                            reenable_time: row.get("reenable_time")?,
                            rotation_speed: row.get("rotation_speed")?,
                        }))
                    },
                )
                .optional(),
            EquipmentKind::Shield => self
                .conn
                .query_row(
                    &format!("SELECT {SHIELD_COLUMNS} FROM shield_stats WHERE equipment_macro = ?1"),
                    key,
                    |row| {
                        Ok(EquipmentStats::Shield(ShieldStats {
                            capacity: row.get("capacity")?,
                            recharge_rate: row.get("recharge_rate")?,
                            recharge_delay: row.get("recharge_delay")?,
                        }))
                    },
                )
                .optional(),
            EquipmentKind::Engine => self
                .conn
                .query_row(
                    &format!("SELECT {ENGINE_COLUMNS} FROM engine_stats WHERE equipment_macro = ?1"),
                    key,
                    |row| {
                        Ok(EquipmentStats::Engine(EngineStats {
                            forward_thrust: row.get("forward_thrust")?,
                            reverse_thrust: row.get("reverse_thrust")?,
                            boost_thrust: row.get("boost_thrust")?,
                            boost_duration: row.get("boost_duration")?,
                            boost_recharge: row.get("boost_recharge")?,
                            travel_thrust: row.get("travel_thrust")?,
                            travel_charge_time: row.get("travel_charge_time")?,
                            travel_attack_time: row.get("travel_attack_time")?,
                            travel_release_time: row.get("travel_release_time")?,
                        }))
                    },
                )
                .optional(),
            EquipmentKind::Thruster => self
                .conn
                .query_row(
                    &format!(
                        "SELECT {THRUSTER_COLUMNS} FROM thruster_stats WHERE equipment_macro = ?1"
                    ),
                    key,
                    |row| {
                        Ok(EquipmentStats::Thruster(ThrusterStats {
                            strafe: row.get("strafe")?,
                            pitch: row.get("pitch")?,
                            yaw: row.get("yaw")?,
                            roll: row.get("roll")?,
                        }))
                    },
                )
                .optional(),
        };
        stats.map_err(db_err)
    }
}

impl CatalogRepository for SqliteDb {
    fn init(&self) -> RepoResult<()> {
        create_schema(&self.conn)
    }

    fn recreate(&self) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction().map_err(db_err)?;
        drop_schema(&tx)?;
        create_schema(&tx)?;
        tx.commit().map_err(db_err)
    }

    fn insert_batch(&self, batch: &Batch) -> RepoResult<BatchCounts> {
        let tx = self.conn.unchecked_transaction().map_err(db_err)?;
        let counts = insert_all(&tx, batch)?;
        tx.commit().map_err(db_err)?;
        Ok(counts)
    }

    fn replace_all(&self, batch: &Batch) -> RepoResult<BatchCounts> {
        // Dropping the transaction without commit rolls everything back
        let tx = self.conn.unchecked_transaction().map_err(db_err)?;
        drop_schema(&tx)?;
        create_schema(&tx)?;
        let counts = insert_all(&tx, batch)?;
        tx.commit().map_err(db_err)?;
        Ok(counts)
    }

    fn get_craft(&self, macro_name: &str) -> RepoResult<Option<Craft>> {
        let craft = self
            .conn
            .query_row(
                &format!("SELECT {CRAFT_COLUMNS} FROM crafts WHERE macro_name = ?1"),
                params![macro_name],
                row_to_craft,
            )
            .optional()
            .map_err(db_err)?;

        match craft {
            Some(mut craft) => {
                craft.slots = self.slots_for(macro_name)?;
                Ok(Some(craft))
            }
            None => Ok(None),
        }
    }

    fn list_crafts(&self, size: Option<&str>) -> RepoResult<Vec<Craft>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {CRAFT_COLUMNS} FROM crafts
                 WHERE (?1 IS NULL OR size = ?1)
                 ORDER BY name, macro_name"
            ))
            .map_err(db_err)?;
        let crafts = stmt
            .query_map(params![size], row_to_craft)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(crafts)
    }

    fn slots_for(&self, macro_name: &str) -> RepoResult<Vec<Slot>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name, kind, size, tags FROM craft_slots
                 WHERE craft_macro = ?1 ORDER BY slot_index",
            )
            .map_err(db_err)?;
        let slots = stmt
            .query_map(params![macro_name], row_to_slot)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(slots)
    }

    fn delete_craft(&self, macro_name: &str) -> RepoResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM crafts WHERE macro_name = ?1", params![macro_name])
            .map_err(db_err)?;
        Ok(rows > 0)
    }

    fn get_equipment(&self, macro_name: &str) -> RepoResult<Option<Equipment>> {
        let equipment = self
            .conn
            .query_row(
                &format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE macro_name = ?1"),
                params![macro_name],
                row_to_equipment,
            )
            .optional()
            .map_err(db_err)?;

        match equipment {
            Some(mut equipment) => {
                equipment.stats = self.stats_for(macro_name, equipment.kind)?;
                Ok(Some(equipment))
            }
            None => Ok(None),
        }
    }

    fn list_equipment(&self, kind: Option<EquipmentKind>) -> RepoResult<Vec<Equipment>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {EQUIPMENT_COLUMNS} FROM equipment
                 WHERE (?1 IS NULL OR kind = ?1)
                 ORDER BY name, macro_name"
            ))
            .map_err(db_err)?;
        let equipment = stmt
            .query_map(params![kind], row_to_equipment)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(equipment)
    }

    fn list_consumables(&self) -> RepoResult<Vec<Consumable>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {CONSUMABLE_COLUMNS} FROM consumables ORDER BY kind, name, ware_id"
            ))
            .map_err(db_err)?;
        let consumables = stmt
            .query_map([], row_to_consumable)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(consumables)
    }

    fn set_metadata(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO run_metadata (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn get_metadata(&self, key: &str) -> RepoResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM run_metadata WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    fn stats(&self) -> RepoResult<DbStats> {
        let mut equipment_by_kind = Vec::new();
        for kind in EquipmentKind::ALL {
            let count: i64 = self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM equipment WHERE kind = ?1",
                    params![kind],
                    |row| row.get(0),
                )
                .map_err(db_err)?;
            equipment_by_kind.push((kind, count));
        }

        Ok(DbStats {
            craft_count: self.count("SELECT COUNT(*) FROM crafts")?,
            slot_count: self.count("SELECT COUNT(*) FROM craft_slots")?,
            equipment_count: self.count("SELECT COUNT(*) FROM equipment")?,
            consumable_count: self.count("SELECT COUNT(*) FROM consumables")?,
            equipment_by_kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> SqliteDb {
        let db = SqliteDb::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn craft(macro_name: &str, size: &str, slots: usize) -> Craft {
        Craft {
            macro_name: macro_name.to_string(),
            name: macro_name.to_uppercase(),
            size: size.to_string(),
            hull: 1000,
            mass: 12.5,
            forward_accfactor: 1.0,
            cargo_capacity: 350,
            slots: (0..slots)
                .map(|i| Slot {
                    name: format!("con_weapon_{:02}", i + 1),
                    kind: Some(EquipmentKind::Weapon),
                    size: Some(size.to_string()),
                    tags: "weapon standard".to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn equipment(macro_name: &str, kind: EquipmentKind, stats: Option<EquipmentStats>) -> Equipment {
        Equipment {
            macro_name: macro_name.to_string(),
            ware_id: Some(macro_name.trim_end_matches("_macro").to_string()),
            kind,
            name: macro_name.to_string(),
            description: String::new(),
            makerrace: "argon".to_string(),
            size: Some("s".to_string()),
            mk_level: 1,
            hull: 500,
            tags: String::new(),
            price: Price {
                min: 10,
                average: 20,
                max: 30,
            },
            stats,
        }
    }

    fn sample_batch() -> Batch {
        Batch {
            crafts: vec![craft("ship_arg_s_fighter_01_a_macro", "s", 2), craft("ship_arg_m_frigate_01_a_macro", "m", 1)],
            equipment: vec![
                equipment(
                    "weapon_gen_s_laser_01_mk1_macro",
                    EquipmentKind::Weapon,
                    Some(EquipmentStats::Weapon(WeaponStats {
                        bullet_class: "bullet_gen_s_laser_01_mk1_macro".to_string(),
                        damage: 40.0,
                        fire_rate: 4.0,
                        dps: 160.0,
                        ..Default::default()
                    })),
                ),
                equipment(
                    "shield_arg_s_standard_01_mk1_macro",
                    EquipmentKind::Shield,
                    Some(EquipmentStats::Shield(ShieldStats {
                        capacity: 800,
                        recharge_rate: 50.0,
                        recharge_delay: 2.0,
                    })),
                ),
                equipment("engine_arg_s_allround_01_mk1_macro", EquipmentKind::Engine, None),
            ],
            consumables: vec![Consumable {
                ware_id: "missile_heatseeker_light_mk1".to_string(),
                macro_name: Some("missile_heatseeker_light_mk1_macro".to_string()),
                kind: ConsumableKind::Missile,
                name: "Light Heatseeker Missile".to_string(),
                description: String::new(),
                size: None,
                mk_level: 1,
                tags: "equipment missile".to_string(),
                price: Price::default(),
            }],
        }
    }

    #[test]
    fn test_init_creates_tables() {
        let db = setup_db();
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM crafts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        // Idempotent
        db.init().unwrap();
    }

    #[test]
    fn test_insert_and_get_craft_with_slots() {
        let db = setup_db();
        let counts = db.insert_batch(&sample_batch()).unwrap();
        assert_eq!(
            counts,
            BatchCounts {
                crafts: 2,
                slots: 3,
                equipment: 3,
                consumables: 1
            }
        );

        let craft = db.get_craft("ship_arg_s_fighter_01_a_macro").unwrap().unwrap();
        assert_eq!(craft.cargo_capacity, 350);
        assert_eq!(craft.mass, 12.5);
        let names: Vec<_> = craft.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["con_weapon_01", "con_weapon_02"]);
        assert_eq!(craft.slots[0].kind, Some(EquipmentKind::Weapon));

        assert!(db.get_craft("ship_missing_macro").unwrap().is_none());
    }

    #[test]
    fn test_list_crafts_by_size() {
        let db = setup_db();
        db.insert_batch(&sample_batch()).unwrap();

        assert_eq!(db.list_crafts(None).unwrap().len(), 2);
        let medium = db.list_crafts(Some("m")).unwrap();
        assert_eq!(medium.len(), 1);
        assert_eq!(medium[0].macro_name, "ship_arg_m_frigate_01_a_macro");
        assert!(medium[0].slots.is_empty());
    }

    #[test]
    fn test_unknown_slot_kind_round_trips() {
        let db = setup_db();
        let mut ship = craft("ship_a_macro", "s", 0);
        ship.slots.push(Slot {
            name: "con_dock_01".to_string(),
            kind: None,
            size: None,
            tags: String::new(),
        });
        db.insert_batch(&Batch {
            crafts: vec![ship],
            ..Default::default()
        })
        .unwrap();

        let slots = db.slots_for("ship_a_macro").unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].kind, None);
    }

    #[test]
    fn test_delete_craft_cascades_slots() {
        let db = setup_db();
        db.insert_batch(&sample_batch()).unwrap();

        assert!(db.delete_craft("ship_arg_s_fighter_01_a_macro").unwrap());
        assert!(!db.delete_craft("ship_arg_s_fighter_01_a_macro").unwrap());
        assert!(db.slots_for("ship_arg_s_fighter_01_a_macro").unwrap().is_empty());
        assert_eq!(db.stats().unwrap().slot_count, 1);
    }

    #[test]
    fn test_equipment_stats_by_kind() {
        let db = setup_db();
        db.insert_batch(&sample_batch()).unwrap();

        let weapon = db.get_equipment("weapon_gen_s_laser_01_mk1_macro").unwrap().unwrap();
        match weapon.stats {
            Some(EquipmentStats::Weapon(stats)) => assert_eq!(stats.dps, 160.0),
            other => panic!("unexpected stats: {other:?}"),
        }
        assert_eq!(weapon.price.average, 20);

        let engine = db.get_equipment("engine_arg_s_allround_01_mk1_macro").unwrap().unwrap();
        assert_eq!(engine.stats, None);

        let shields = db.list_equipment(Some(EquipmentKind::Shield)).unwrap();
        assert_eq!(shields.len(), 1);
        assert_eq!(shields[0].kind, EquipmentKind::Shield);
        assert!(shields[0].stats.is_none());
    }

    #[test]
    fn test_deleting_equipment_cascades_stats() {
        let db = setup_db();
        db.insert_batch(&sample_batch()).unwrap();
        db.conn
            .execute(
                "DELETE FROM equipment WHERE macro_name = ?1",
                params!["shield_arg_s_standard_01_mk1_macro"],
            )
            .unwrap();
        let remaining: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM shield_stats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_consumables() {
        let db = setup_db();
        db.insert_batch(&sample_batch()).unwrap();
        let consumables = db.list_consumables().unwrap();
        assert_eq!(consumables.len(), 1);
        assert_eq!(consumables[0].kind, ConsumableKind::Missile);
    }

    #[test]
    fn test_replace_all_rebuilds() {
        let db = setup_db();
        db.insert_batch(&sample_batch()).unwrap();
        db.set_metadata("craft_count", "2").unwrap();

        let replacement = Batch {
            crafts: vec![craft("ship_tel_s_scout_01_a_macro", "s", 0)],
            ..Default::default()
        };
        let counts = db.replace_all(&replacement).unwrap();
        assert_eq!(counts.crafts, 1);

        let stats = db.stats().unwrap();
        assert_eq!(stats.craft_count, 1);
        assert_eq!(stats.equipment_count, 0);
        assert_eq!(db.get_metadata("craft_count").unwrap(), None);
    }

    #[test]
    fn test_failed_replace_keeps_previous_contents() {
        let db = setup_db();
        db.insert_batch(&sample_batch()).unwrap();

        let duplicate = Batch {
            crafts: vec![craft("ship_dup_macro", "s", 1), craft("ship_dup_macro", "s", 1)],
            ..Default::default()
        };
        assert!(matches!(db.replace_all(&duplicate), Err(RepoError::Database(_))));

        let stats = db.stats().unwrap();
        assert_eq!(stats.craft_count, 2);
        assert_eq!(stats.slot_count, 3);
        assert_eq!(stats.equipment_count, 3);
        assert!(db.get_craft("ship_dup_macro").unwrap().is_none());
    }

    #[test]
    fn test_metadata_upsert() {
        let db = setup_db();
        assert_eq!(db.get_metadata("schema_version").unwrap(), None);
        db.set_metadata("schema_version", "0").unwrap();
        db.set_metadata("schema_version", SCHEMA_VERSION).unwrap();
        assert_eq!(db.get_metadata("schema_version").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_stats_by_kind() {
        let db = setup_db();
        db.insert_batch(&sample_batch()).unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(
            stats.equipment_by_kind,
            vec![
                (EquipmentKind::Weapon, 1),
                (EquipmentKind::Turret, 0),
                (EquipmentKind::Shield, 1),
                (EquipmentKind::Engine, 1),
                (EquipmentKind::Thruster, 0),
            ]
        );
        assert_eq!(stats.consumable_count, 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_DB_FILE);
        {
            let db = SqliteDb::open(&path).unwrap();
            db.init().unwrap();
            db.insert_batch(&sample_batch()).unwrap();
        }
        let db = SqliteDb::open(&path).unwrap();
        assert_eq!(db.stats().unwrap().craft_count, 2);
    }
}
