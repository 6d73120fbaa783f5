//! Row-level reads and writes. Every function takes the connection (or the
//! open transaction's connection) explicitly and never touches the cache.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use wf_core::{
    AttrType, AttrValue, AttributeMap, Constraint, Container, ItemKey, Place, Portal, Spot,
    Thing, World, WorldMeta,
};

use crate::error::{PersistError, PersistResult};

/// Which item table a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    Place,
    Thing,
}

// ---------------------------------------------------------------------------
// World metadata
// ---------------------------------------------------------------------------

pub(crate) fn read_meta(conn: &Connection) -> PersistResult<Option<WorldMeta>> {
    let mut stmt = conn.prepare("SELECT key, value FROM meta")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let values: BTreeMap<String, String> = rows.collect::<Result<_, _>>()?;

    let Some(name) = values.get("name") else {
        return Ok(None);
    };
    let mut meta = WorldMeta::new(name.clone());
    if let Some(raw) = values.get("created_at") {
        meta.created_at = parse_time(raw)?;
    }
    if let Some(raw) = values.get("updated_at") {
        meta.updated_at = parse_time(raw)?;
    }
    Ok(Some(meta))
}

fn parse_time(raw: &str) -> PersistResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PersistError::Corrupt(format!("bad timestamp \"{raw}\": {e}")))
}

pub(crate) fn write_meta(conn: &Connection, meta: &WorldMeta) -> PersistResult<()> {
    let entries = [
        ("name", meta.name.clone()),
        ("created_at", meta.created_at.to_rfc3339()),
        ("updated_at", meta.updated_at.to_rfc3339()),
    ];
    for (key, value) in entries {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Dimensions and declarations
// ---------------------------------------------------------------------------

pub(crate) fn read_dimensions(conn: &Connection) -> PersistResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM dimension ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<_, _>>()?;
    Ok(names)
}

pub(crate) fn write_dimension(conn: &Connection, name: &str) -> PersistResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO dimension (name) VALUES (?1)",
        params![name],
    )?;
    Ok(())
}

pub(crate) fn read_declarations(conn: &Connection) -> PersistResult<Vec<(String, Constraint)>> {
    let mut stmt = conn.prepare("SELECT name, type, lower, upper FROM attribute ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut permitted_stmt =
        conn.prepare("SELECT value FROM permitted WHERE attribute = ?1 ORDER BY rowid")?;
    let mut declarations = Vec::with_capacity(rows.len());
    for (name, type_tag, lower, upper) in rows {
        let type_tag = type_tag
            .map(|t| t.parse::<AttrType>())
            .transpose()
            .map_err(PersistError::Corrupt)?;
        let permitted = permitted_stmt
            .query_map(params![name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .iter()
            .map(|raw| serde_json::from_str::<AttrValue>(raw))
            .collect::<Result<Vec<_>, _>>()?;
        declarations.push((name, Constraint::from_parts(type_tag, lower, upper, permitted)));
    }
    Ok(declarations)
}

pub(crate) fn write_declaration(
    conn: &Connection,
    name: &str,
    constraint: &Constraint,
) -> PersistResult<()> {
    conn.execute(
        "INSERT INTO attribute (name, type, lower, upper) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET
            type = excluded.type,
            lower = excluded.lower,
            upper = excluded.upper",
        params![
            name,
            constraint.type_tag().map(|t| t.as_str()),
            constraint.lower(),
            constraint.upper(),
        ],
    )?;
    conn.execute("DELETE FROM permitted WHERE attribute = ?1", params![name])?;
    for value in constraint.permitted() {
        conn.execute(
            "INSERT OR IGNORE INTO permitted (attribute, value) VALUES (?1, ?2)",
            params![name, serde_json::to_string(value)?],
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Item lookups
// ---------------------------------------------------------------------------

pub(crate) fn item_kind(conn: &Connection, key: &ItemKey) -> PersistResult<Option<ItemKind>> {
    let kind = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM place WHERE dimension = ?1 AND name = ?2),
                    EXISTS (SELECT 1 FROM thing WHERE dimension = ?1 AND name = ?2)",
            params![key.dimension, key.name],
            |row| Ok((row.get::<_, bool>(0)?, row.get::<_, bool>(1)?)),
        )
        .map(|found| match found {
            (true, _) => Some(ItemKind::Place),
            (false, true) => Some(ItemKind::Thing),
            (false, false) => None,
        })?;
    Ok(kind)
}

/// Origin and destination of the stored portal with this name.
pub(crate) fn read_portal_ends(
    conn: &Connection,
    key: &ItemKey,
) -> PersistResult<Option<(String, String)>> {
    let ends = conn
        .query_row(
            "SELECT from_place, to_place FROM portal WHERE dimension = ?1 AND name = ?2",
            params![key.dimension, key.name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(ends)
}

pub(crate) fn read_spot(conn: &Connection, key: &ItemKey) -> PersistResult<Option<Spot>> {
    let spot = conn
        .query_row(
            "SELECT x, y, r, spotgraph FROM spot WHERE dimension = ?1 AND place = ?2",
            params![key.dimension, key.name],
            |row| {
                Ok(Spot {
                    x: row.get(0)?,
                    y: row.get(1)?,
                    r: row.get(2)?,
                    spotgraph: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(spot)
}

/// Build the place stored under `key`, with attributes left unloaded.
pub(crate) fn read_place(conn: &Connection, key: &ItemKey) -> PersistResult<Place> {
    let place = Place::new(key.clone(), AttributeMap::unloaded());
    Ok(match read_spot(conn, key)? {
        Some(spot) => place.with_spot(spot),
        None => place,
    })
}

pub(crate) fn read_outgoing(conn: &Connection, origin: &ItemKey) -> PersistResult<Vec<Portal>> {
    let mut stmt = conn.prepare(
        "SELECT name, to_place, weight, passable FROM portal
         WHERE dimension = ?1 AND from_place = ?2
         ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map(params![origin.dimension, origin.name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut portals = Vec::with_capacity(rows.len());
    for (name, to_place, weight, passable) in rows {
        let portal = Portal::new(origin.sibling(name), origin.name.clone(), to_place, weight)?
            .with_passable(passable);
        portals.push(portal);
    }
    Ok(portals)
}

/// Names of things directly inside `container`.
pub(crate) fn read_contents(conn: &Connection, container: &ItemKey) -> PersistResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT contained FROM containment
         WHERE dimension = ?1 AND container = ?2
         ORDER BY contained",
    )?;
    let names = stmt
        .query_map(params![container.dimension, container.name], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<Result<_, _>>()?;
    Ok(names)
}

/// Every stored place name of a dimension.
pub(crate) fn read_place_names(conn: &Connection, dimension: &str) -> PersistResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM place WHERE dimension = ?1 ORDER BY name")?;
    let names = stmt
        .query_map(params![dimension], |row| row.get::<_, String>(0))?
        .collect::<Result<_, _>>()?;
    Ok(names)
}

/// Where storage last put a thing.
pub(crate) fn read_container(conn: &Connection, thing: &ItemKey) -> PersistResult<Option<Container>> {
    let row = conn
        .query_row(
            "SELECT c.container,
                    EXISTS (SELECT 1 FROM place p
                            WHERE p.dimension = c.dimension AND p.name = c.container)
             FROM containment c
             WHERE c.dimension = ?1 AND c.contained = ?2",
            params![thing.dimension, thing.name],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)),
        )
        .optional()?;
    Ok(row.map(|(name, is_place)| {
        if is_place {
            Container::Place(name)
        } else {
            Container::Thing(name)
        }
    }))
}

pub(crate) fn read_attributes(
    conn: &Connection,
    owner: &ItemKey,
) -> PersistResult<BTreeMap<String, AttrValue>> {
    let mut stmt = conn.prepare(
        "SELECT attribute, value FROM attribution
         WHERE dimension = ?1 AND attributed_to = ?2",
    )?;
    let rows = stmt
        .query_map(params![owner.dimension, owner.name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let mut values = BTreeMap::new();
    for (name, raw) in rows {
        values.insert(name, serde_json::from_str(&raw)?);
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Item writes
// ---------------------------------------------------------------------------

/// Make sure the identity rows for an item exist, leaving everything else alone.
pub(crate) fn write_identity(conn: &Connection, key: &ItemKey, kind: ItemKind) -> PersistResult<()> {
    write_dimension(conn, &key.dimension)?;
    conn.execute(
        "INSERT OR IGNORE INTO item (dimension, name) VALUES (?1, ?2)",
        params![key.dimension, key.name],
    )?;
    let sql = match kind {
        ItemKind::Place => "INSERT OR IGNORE INTO place (dimension, name) VALUES (?1, ?2)",
        ItemKind::Thing => "INSERT OR IGNORE INTO thing (dimension, name) VALUES (?1, ?2)",
    };
    conn.execute(sql, params![key.dimension, key.name])?;
    Ok(())
}

/// Write a place with its spot, outgoing portals, and attributes.
pub(crate) fn write_place(conn: &Connection, world: &World, key: &ItemKey) -> PersistResult<()> {
    let place = world
        .place(key)
        .ok_or_else(|| PersistError::NotFound(key.clone()))?;
    write_identity(conn, key, ItemKind::Place)?;

    match place.spot() {
        Some(spot) => {
            conn.execute(
                "INSERT INTO spot (dimension, place, x, y, r, spotgraph)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(dimension, place) DO UPDATE SET
                    x = excluded.x,
                    y = excluded.y,
                    r = excluded.r,
                    spotgraph = excluded.spotgraph",
                params![key.dimension, key.name, spot.x, spot.y, spot.r, spot.spotgraph],
            )?;
        }
        None => {
            conn.execute(
                "DELETE FROM spot WHERE dimension = ?1 AND place = ?2",
                params![key.dimension, key.name],
            )?;
        }
    }

    write_portals(conn, key, &world.neighbors(key))?;
    write_attributes(conn, key, place.attributes())
}

/// Replace the stored outgoing portals of `origin` with `portals`.
fn write_portals(conn: &Connection, origin: &ItemKey, portals: &[&Portal]) -> PersistResult<()> {
    let current: BTreeSet<&str> = portals.iter().map(|p| p.destination()).collect();
    let stored: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT to_place FROM portal WHERE dimension = ?1 AND from_place = ?2")?;
        let names = stmt
            .query_map(params![origin.dimension, origin.name], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<_, _>>()?;
        names
    };

    let mut removed = 0;
    for to_place in stored.iter().filter(|to| !current.contains(to.as_str())) {
        removed += conn.execute(
            "DELETE FROM portal WHERE dimension = ?1 AND from_place = ?2 AND to_place = ?3",
            params![origin.dimension, origin.name, to_place],
        )?;
    }

    for portal in portals {
        write_identity(conn, &portal.destination_key(), ItemKind::Place)?;
        // The name may still sit on another edge if the portal was replaced.
        conn.execute(
            "DELETE FROM portal
             WHERE dimension = ?1 AND name = ?2 AND NOT (from_place = ?3 AND to_place = ?4)",
            params![
                origin.dimension,
                portal.name(),
                portal.origin(),
                portal.destination()
            ],
        )?;
        conn.execute(
            "INSERT INTO portal (dimension, from_place, to_place, name, weight, passable)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(dimension, from_place, to_place) DO UPDATE SET
                name = excluded.name,
                weight = excluded.weight,
                passable = excluded.passable",
            params![
                origin.dimension,
                portal.origin(),
                portal.destination(),
                portal.name(),
                portal.weight(),
                portal.is_passable(),
            ],
        )?;
    }
    debug!(place = %origin, kept = portals.len(), removed, "wrote portals");
    Ok(())
}

/// Write a thing's containment row and attributes.
pub(crate) fn write_thing(conn: &Connection, world: &World, key: &ItemKey) -> PersistResult<()> {
    let thing = world
        .thing(key)
        .ok_or_else(|| PersistError::NotFound(key.clone()))?;
    write_identity(conn, key, ItemKind::Thing)?;
    write_container_chain(conn, world, thing)?;
    conn.execute(
        "INSERT OR REPLACE INTO containment (dimension, contained, container)
         VALUES (?1, ?2, ?3)",
        params![key.dimension, key.name, thing.location().name()],
    )?;
    write_attributes(conn, key, thing.attributes())
}

/// Give every container above `thing` an identity row, and a containment
/// row where storage has none, so the new row's references hold.
fn write_container_chain(conn: &Connection, world: &World, thing: &Thing) -> PersistResult<()> {
    let dimension = &thing.key().dimension;
    let mut location = thing.location().clone();
    loop {
        let container_key = location.key_in(dimension);
        if matches!(location, Container::Place(_)) {
            return write_identity(conn, &container_key, ItemKind::Place);
        }
        write_identity(conn, &container_key, ItemKind::Thing)?;
        let outer = world
            .thing(&container_key)
            .ok_or_else(|| PersistError::NotFound(container_key.clone()))?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO containment (dimension, contained, container)
             VALUES (?1, ?2, ?3)",
            params![dimension, container_key.name, outer.location().name()],
        )?;
        if inserted == 0 {
            return Ok(());
        }
        location = outer.location().clone();
    }
}

/// Upsert in-memory attribute values. When the full set is loaded, stored
/// values missing from memory are deleted too.
fn write_attributes(conn: &Connection, owner: &ItemKey, attributes: &AttributeMap) -> PersistResult<()> {
    if attributes.is_loaded() {
        let stored: Vec<String> = {
            let mut stmt = conn.prepare(
                "SELECT attribute FROM attribution WHERE dimension = ?1 AND attributed_to = ?2",
            )?;
            let names = stmt
                .query_map(params![owner.dimension, owner.name], |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<Result<_, _>>()?;
            names
        };
        for name in stored.iter().filter(|n| attributes.get(n).is_none()) {
            conn.execute(
                "DELETE FROM attribution
                 WHERE attribute = ?1 AND dimension = ?2 AND attributed_to = ?3",
                params![name, owner.dimension, owner.name],
            )?;
        }
    }

    for (name, value) in attributes.iter() {
        // Undeclared attributes get an unconstrained row.
        conn.execute(
            "INSERT OR IGNORE INTO attribute (name) VALUES (?1)",
            params![name],
        )?;
        conn.execute(
            "INSERT INTO attribution (attribute, dimension, attributed_to, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(attribute, dimension, attributed_to) DO UPDATE SET
                value = excluded.value",
            params![name, owner.dimension, owner.name, serde_json::to_string(value)?],
        )?;
    }
    Ok(())
}

/// Delete an item; foreign keys cascade to every row that mentions it.
pub(crate) fn delete_item(conn: &Connection, key: &ItemKey) -> PersistResult<()> {
    let deleted = conn.execute(
        "DELETE FROM item WHERE dimension = ?1 AND name = ?2",
        params![key.dimension, key.name],
    )?;
    debug!(item = %key, deleted, "deleted item");
    Ok(())
}
