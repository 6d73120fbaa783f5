use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, warn};
use wf_core::{
    AttrValue, AttributeMap, Change, Constraint, Container, ItemKey, Place, PlaceRef, PortalRef,
    Spot, Thing, ThingRef, Tombstone, World, WorldError, WorldMeta,
};

use crate::config::CacheOptions;
use crate::error::{PersistError, PersistResult};
use crate::rows::{self, ItemKind};
use crate::schema;

/// An identity-mapped cache between a [`World`] and a SQLite database.
///
/// Each stored item is materialised at most once; later lookups borrow the
/// same resident object. Mutations go through the cache so it can consult
/// storage first, and are written back by the `save_*` family.
///
/// Saves run inside an open transaction. `commit = false` leaves it open so
/// several saves land in one durable [`commit`](Self::commit).
#[derive(Debug)]
pub struct WorldCache {
    conn: Connection,
    world: World,
    /// Changes written in the open transaction, restored if it fails to commit.
    uncommitted: Vec<Change>,
    uncommitted_tombstones: Vec<Tombstone>,
}

impl WorldCache {
    /// Open (or create) a database file with default options.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        Self::open_with(path, CacheOptions::default())
    }

    /// Open (or create) a database file.
    pub fn open_with(path: impl AsRef<Path>, options: CacheOptions) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        let mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            &options.journal_mode,
            |row| row.get(0),
        )?;
        debug!(journal_mode = %mode, "opened database file");
        Self::from_connection(conn, &options)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory() -> PersistResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, &CacheOptions::default())
    }

    fn from_connection(conn: Connection, options: &CacheOptions) -> PersistResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::migrate(&conn)?;

        let meta = match rows::read_meta(&conn)? {
            Some(meta) => meta,
            None => {
                let meta = WorldMeta::new(options.default_world_name.clone());
                rows::write_meta(&conn, &meta)?;
                meta
            }
        };
        let mut world = World::new(meta);
        for name in rows::read_dimensions(&conn)? {
            world.restore_dimension(&name);
        }
        for (name, constraint) in rows::read_declarations(&conn)? {
            world.restore_declaration(&name, constraint);
        }
        info!(world = %world.meta.name, "opened world cache");

        Ok(Self {
            conn,
            world,
            uncommitted: Vec::new(),
            uncommitted_tombstones: Vec::new(),
        })
    }

    /// The resident world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The resident world, for callers (like a simulation tick) that mutate
    /// items already loaded. Changes are still tracked for saving.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Rename the world. Written on the next commit.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.world.meta.name = name.into();
    }

    // -----------------------------------------------------------------------
    // Materialisation
    // -----------------------------------------------------------------------

    /// The place stored under `(dimension, name)`.
    ///
    /// On a miss the place is read from storage together with everything
    /// reachable through its outgoing portals and every thing inside those
    /// places. Attribute values stay unloaded until [`attributes`](Self::attributes).
    pub fn get_place(&mut self, dimension: &str, name: &str) -> PersistResult<&Place> {
        let key = ItemKey::new(dimension, name);
        if self.world.place(&key).is_some() {
            debug!(place = %key, "cache hit");
        } else {
            self.load_place(&key)?;
        }
        self.world
            .place(&key)
            .ok_or(PersistError::NotFound(key))
    }

    /// The thing stored under `(dimension, name)`, loaded through the place at
    /// the root of its containment chain.
    pub fn get_thing(&mut self, dimension: &str, name: &str) -> PersistResult<&Thing> {
        let key = ItemKey::new(dimension, name);
        if self.world.thing(&key).is_some() {
            debug!(thing = %key, "cache hit");
        } else {
            let root = self.root_place_of(&key)?;
            if self.world.place(&root).is_some() {
                self.load_contents(&root, Container::Place(root.name.clone()))?;
            } else {
                self.load_place(&root)?;
            }
        }
        self.world
            .thing(&key)
            .ok_or(PersistError::NotFound(key))
    }

    /// Attribute values of a place or thing, merged with storage on first access.
    pub fn attributes(&mut self, key: &ItemKey) -> PersistResult<&AttributeMap> {
        self.ensure_item(key)?;
        let loaded = self
            .world
            .attributes(key)
            .is_some_and(AttributeMap::is_loaded);
        if !loaded {
            let stored = rows::read_attributes(&self.conn, key)?;
            debug!(item = %key, count = stored.len(), "loaded attributes");
            self.world.restore_attributes(key, stored)?;
        }
        self.world
            .attributes(key)
            .ok_or_else(|| PersistError::NotFound(key.clone()))
    }

    /// Drop an item from memory without touching storage. The next lookup
    /// reads it again. Returns whether anything was resident.
    pub fn forget(&mut self, key: &ItemKey) -> bool {
        self.world.evict(key)
    }

    /// Materialise every stored place of a dimension (and so every portal and
    /// thing in it), including things forgotten from resident places. Returns how many places are resident afterwards.
    pub fn load_dimension(&mut self, dimension: &str) -> PersistResult<usize> {
        for name in rows::read_place_names(&self.conn, dimension)? {
            let key = ItemKey::new(dimension, name);
            if self.is_tombstoned(&key) {
                continue;
            }
            if self.world.place(&key).is_some() {
                self.load_contents(&key, Container::Place(key.name.clone()))?;
            } else {
                self.load_place(&key)?;
            }
        }
        Ok(self
            .world
            .dimension(dimension)
            .map_or(0, |d| d.places().count()))
    }

    fn load_place(&mut self, key: &PlaceRef) -> PersistResult<()> {
        if self.is_tombstoned(key) || rows::item_kind(&self.conn, key)? != Some(ItemKind::Place) {
            return Err(PersistError::NotFound(key.clone()));
        }
        debug!(place = %key, "cache miss");
        self.world.restore_dimension(&key.dimension);

        let mut pending = VecDeque::from([key.name.clone()]);
        let mut loaded = 0;
        while let Some(name) = pending.pop_front() {
            let place_key = key.sibling(name);
            if self.world.place(&place_key).is_some() {
                continue;
            }
            self.world
                .restore_place(rows::read_place(&self.conn, &place_key)?)?;
            loaded += 1;

            for portal in rows::read_outgoing(&self.conn, &place_key)? {
                let destination = portal.destination_key();
                if self.is_tombstoned(&destination) {
                    continue;
                }
                if self.world.portal(portal.key()).is_none() {
                    self.world.restore_portal(portal)?;
                }
                if self.world.place(&destination).is_none() {
                    pending.push_back(destination.name);
                }
            }
            self.load_contents(&place_key, Container::Place(place_key.name.clone()))?;
        }
        debug!(place = %key, loaded, "materialised places");
        Ok(())
    }

    /// Restore every stored thing below `container`, outermost first.
    fn load_contents(&mut self, place: &PlaceRef, container: Container) -> PersistResult<()> {
        let mut pending = VecDeque::from([container]);
        let mut seen = BTreeSet::new();
        while let Some(container) = pending.pop_front() {
            let container_key = container.key_in(&place.dimension);
            for name in rows::read_contents(&self.conn, &container_key)? {
                let key = place.sibling(name);
                if self.is_tombstoned(&key) || !seen.insert(key.name.clone()) {
                    continue;
                }
                // Resident things may have moved in memory; memory wins, but
                // their stored contents may still be missing.
                if self.world.thing(&key).is_none() {
                    self.world.restore_thing(Thing::new(
                        key.clone(),
                        container.clone(),
                        AttributeMap::unloaded(),
                    ))?;
                }
                pending.push_back(Container::Thing(key.name));
            }
        }
        Ok(())
    }

    fn root_place_of(&self, thing: &ThingRef) -> PersistResult<PlaceRef> {
        let mut current = thing.clone();
        let mut seen = BTreeSet::new();
        loop {
            match rows::read_container(&self.conn, &current)? {
                Some(Container::Place(name)) => return Ok(thing.sibling(name)),
                Some(Container::Thing(name)) => {
                    if !seen.insert(name.clone()) {
                        return Err(PersistError::Corrupt(format!(
                            "containment cycle stored above {thing}"
                        )));
                    }
                    current = thing.sibling(name);
                }
                None => return Err(PersistError::NotFound(thing.clone())),
            }
        }
    }

    /// Make a place or thing resident, wherever it is stored.
    fn ensure_item(&mut self, key: &ItemKey) -> PersistResult<ItemKind> {
        if self.world.place(key).is_some() {
            return Ok(ItemKind::Place);
        }
        if self.world.thing(key).is_some() {
            return Ok(ItemKind::Thing);
        }
        match rows::item_kind(&self.conn, key)? {
            Some(ItemKind::Place) if !self.is_tombstoned(key) => {
                self.load_place(key)?;
                Ok(ItemKind::Place)
            }
            Some(ItemKind::Thing) if !self.is_tombstoned(key) => {
                self.get_thing(&key.dimension, &key.name)?;
                Ok(ItemKind::Thing)
            }
            _ => Err(PersistError::NotFound(key.clone())),
        }
    }

    /// Like [`ensure_item`](Self::ensure_item) but absence is not an error.
    fn try_ensure_item(&mut self, key: &ItemKey) -> PersistResult<bool> {
        match self.ensure_item(key) {
            Ok(_) => Ok(true),
            Err(PersistError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn is_tombstoned(&self, key: &ItemKey) -> bool {
        self.world
            .tombstones()
            .iter()
            .chain(&self.uncommitted_tombstones)
            .any(|t| t.key() == key)
    }

    /// Whether storage still holds an item that memory has not removed.
    fn stored_item_exists(&self, key: &ItemKey) -> PersistResult<bool> {
        Ok(!self.is_tombstoned(key) && rows::item_kind(&self.conn, key)?.is_some())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a dimension. Returns whether it was new.
    pub fn add_dimension(&mut self, name: &str) -> bool {
        self.world.add_dimension(name)
    }

    /// Create a place; fails with `DuplicateKey` if memory or storage has it.
    pub fn add_place(
        &mut self,
        dimension: &str,
        name: &str,
        attrs: BTreeMap<String, AttrValue>,
    ) -> PersistResult<PlaceRef> {
        let key = ItemKey::new(dimension, name);
        if self.stored_item_exists(&key)? {
            return Err(WorldError::DuplicateKey(key).into());
        }
        Ok(self.world.add_place(dimension, name, attrs)?)
    }

    /// Create a portal between two stored or resident places.
    pub fn add_portal(
        &mut self,
        dimension: &str,
        name: &str,
        origin: &str,
        destination: &str,
        weight: f64,
    ) -> PersistResult<PortalRef> {
        let key = ItemKey::new(dimension, name);
        self.try_ensure_item(&key.sibling(origin))?;
        self.try_ensure_item(&key.sibling(destination))?;
        if self.world.portal(&key).is_none() && self.stored_portal_exists(&key)? {
            return Err(WorldError::DuplicateKey(key).into());
        }
        Ok(self
            .world
            .add_portal(dimension, name, origin, destination, weight)?)
    }

    /// Ensure a portal from `a` to `b` exists.
    pub fn connect(&mut self, a: &PlaceRef, b: &PlaceRef) -> PersistResult<PortalRef> {
        self.try_ensure_item(a)?;
        self.try_ensure_item(b)?;
        Ok(self.world.connect(a, b)?)
    }

    /// Remove a portal.
    pub fn remove_portal(&mut self, key: &PortalRef) -> PersistResult<()> {
        if self.world.portal(key).is_none() {
            // Loading every place is not an option; look the portal up by name.
            let origin = self.portal_origin(key)?;
            self.ensure_item(&origin)?;
        }
        self.world.remove_portal(key)?;
        Ok(())
    }

    fn portal_origin(&self, key: &PortalRef) -> PersistResult<PlaceRef> {
        rows::read_portal_ends(&self.conn, key)?
            .map(|(origin, _)| key.sibling(origin))
            .ok_or_else(|| PersistError::NotFound(key.clone()))
    }

    /// Whether storage holds a portal under this name that memory has not
    /// dropped. A resident origin holds all of its stored outgoing portals,
    /// so a stored one missing from memory there has been removed.
    fn stored_portal_exists(&self, key: &PortalRef) -> PersistResult<bool> {
        let Some((origin, destination)) = rows::read_portal_ends(&self.conn, key)? else {
            return Ok(false);
        };
        let origin = key.sibling(origin);
        let destination = key.sibling(destination);
        Ok(self.world.place(&origin).is_none()
            && !self.is_tombstoned(&origin)
            && !self.is_tombstoned(&destination))
    }

    /// Create a thing inside a stored or resident container.
    pub fn add_thing(
        &mut self,
        dimension: &str,
        name: &str,
        location: Container,
    ) -> PersistResult<ThingRef> {
        let key = ItemKey::new(dimension, name);
        if self.stored_item_exists(&key)? {
            return Err(WorldError::DuplicateKey(key).into());
        }
        self.try_ensure_item(&location.key_in(dimension))?;
        Ok(self.world.add_thing(dimension, name, location)?)
    }

    /// Move a thing, loading both it and the container first.
    pub fn move_thing(&mut self, thing: &ThingRef, container: Container) -> PersistResult<()> {
        self.ensure_item(thing)?;
        self.try_ensure_item(&container.key_in(&thing.dimension))?;
        self.world.move_thing(thing, container)?;
        Ok(())
    }

    /// Remove an empty place and its incident portals.
    pub fn remove_place(&mut self, key: &PlaceRef) -> PersistResult<Place> {
        self.ensure_item(key)?;
        Ok(self.world.remove_place(key)?)
    }

    /// Remove a thing that holds nothing.
    pub fn remove_thing(&mut self, key: &ThingRef) -> PersistResult<Thing> {
        self.ensure_item(key)?;
        Ok(self.world.remove_thing(key)?)
    }

    /// Set or clear a place's spot.
    pub fn set_spot(&mut self, key: &PlaceRef, spot: Option<Spot>) -> PersistResult<()> {
        self.ensure_item(key)?;
        Ok(self.world.set_spot(key, spot)?)
    }

    /// Declare the constraint for an attribute name.
    pub fn declare_attribute(&mut self, name: &str, constraint: Constraint) {
        self.world.declare_attribute(name, constraint);
    }

    /// Assign an attribute of a place or thing.
    pub fn set_attribute(
        &mut self,
        key: &ItemKey,
        attr: &str,
        value: AttrValue,
    ) -> PersistResult<Option<AttrValue>> {
        self.ensure_item(key)?;
        Ok(self.world.set_attribute(key, attr, value)?)
    }

    /// Remove an attribute value. The stored set is loaded first so the
    /// removal reaches storage on the next save.
    pub fn unset_attribute(&mut self, key: &ItemKey, attr: &str) -> PersistResult<Option<AttrValue>> {
        self.attributes(key)?;
        Ok(self.world.unset_attribute(key, attr)?)
    }

    // -----------------------------------------------------------------------
    // Saving
    // -----------------------------------------------------------------------

    /// Write a dimension row.
    pub fn save_dimension(&mut self, name: &str, commit: bool) -> PersistResult<()> {
        let change = Change::Dimension(name.to_string());
        self.run_save(commit, Vec::new(), |conn, _| {
            rows::write_dimension(conn, name)?;
            Ok(vec![change])
        })
    }

    /// Write every pending attribute declaration.
    pub fn save_declarations(&mut self, commit: bool) -> PersistResult<()> {
        let pending: Vec<Change> = self
            .world
            .pending_changes()
            .filter(|c| matches!(c, Change::Declaration(_)))
            .cloned()
            .collect();
        self.run_save(commit, Vec::new(), |conn, world| {
            write_declarations(conn, world, &pending)?;
            Ok(pending)
        })
    }

    /// Write a place: its spot, attributes, and outgoing portals. Stored
    /// portals that no longer exist in memory are deleted.
    pub fn save_place(&mut self, key: &PlaceRef, commit: bool) -> PersistResult<()> {
        if self.world.place(key).is_none() {
            return Err(PersistError::NotFound(key.clone()));
        }
        self.run_save(commit, Vec::new(), |conn, world| {
            rows::write_place(conn, world, key)?;
            Ok(vec![Change::Place(key.clone())])
        })
    }

    /// Write a thing: its containment row and attributes.
    pub fn save_thing(&mut self, key: &ThingRef, commit: bool) -> PersistResult<()> {
        if self.world.thing(key).is_none() {
            return Err(PersistError::NotFound(key.clone()));
        }
        self.run_save(commit, Vec::new(), |conn, world| {
            rows::write_thing(conn, world, key)?;
            Ok(vec![Change::Thing(key.clone())])
        })
    }

    /// Write every pending change and removal.
    pub fn save_all(&mut self, commit: bool) -> PersistResult<()> {
        let mut pending: Vec<Change> = self.world.pending_changes().cloned().collect();
        // Outer containers before the things inside them.
        pending.sort_by_key(|change| match change {
            Change::Dimension(_) => (0, 0),
            Change::Declaration(_) => (1, 0),
            Change::Place(_) => (2, 0),
            Change::Thing(key) => (3, self.depth_of(key)),
        });
        let tombstones = self.world.take_tombstones();
        debug!(
            changes = pending.len(),
            removals = tombstones.len(),
            "saving pending changes"
        );

        let removals = tombstones.clone();
        self.run_save(commit, tombstones, move |conn, world| {
            for tombstone in &removals {
                rows::delete_item(conn, tombstone.key())?;
            }
            for change in &pending {
                match change {
                    Change::Dimension(name) => rows::write_dimension(conn, name)?,
                    Change::Declaration(_) => {
                        write_declarations(conn, world, std::slice::from_ref(change))?
                    }
                    Change::Place(key) => rows::write_place(conn, world, key)?,
                    Change::Thing(key) => rows::write_thing(conn, world, key)?,
                }
            }
            Ok(pending)
        })
    }

    fn depth_of(&self, thing: &ThingRef) -> usize {
        let Some(dim) = self.world.dimension(&thing.dimension) else {
            return 0;
        };
        let mut depth = 0;
        let mut current = dim.thing(&thing.name);
        while let Some(Container::Thing(outer)) = current.map(Thing::location) {
            depth += 1;
            current = dim.thing(outer);
            if depth > dim.things().count() {
                break;
            }
        }
        depth
    }

    /// Make the open transaction durable, writing world metadata with it.
    ///
    /// If the commit fails everything written since the last commit is rolled
    /// back and marked pending again.
    pub fn commit(&mut self) -> PersistResult<()> {
        self.begin()?;
        self.world.meta.updated_at = Utc::now();
        let result = rows::write_meta(&self.conn, &self.world.meta)
            .and_then(|()| self.conn.execute_batch("COMMIT").map_err(PersistError::from));
        match result {
            Ok(()) => {
                info!(
                    changes = self.uncommitted.len(),
                    removals = self.uncommitted_tombstones.len(),
                    "committed world"
                );
                self.uncommitted.clear();
                self.uncommitted_tombstones.clear();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "commit failed, rolling back");
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "rollback failed");
                }
                for change in self.uncommitted.drain(..) {
                    self.world.mark_dirty(change);
                }
                let tombstones = std::mem::take(&mut self.uncommitted_tombstones);
                self.world.restore_tombstones(tombstones);
                Err(e)
            }
        }
    }

    /// Whether a transaction is open with saves not yet committed.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn begin(&self) -> PersistResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    /// Run one save inside a savepoint of the open transaction.
    ///
    /// `write` reports which changes it stored; they are marked clean only if
    /// it succeeds. On failure the savepoint is rolled back, the changes stay
    /// pending, and `tombstones` are handed back to the world.
    fn run_save<F>(&mut self, commit: bool, tombstones: Vec<Tombstone>, write: F) -> PersistResult<()>
    where
        F: FnOnce(&Connection, &World) -> PersistResult<Vec<Change>>,
    {
        self.begin()?;
        self.conn.execute_batch("SAVEPOINT wf_save")?;

        let result = write(&self.conn, &self.world).and_then(|saved| {
            self.conn.execute_batch("RELEASE wf_save")?;
            Ok(saved)
        });
        match result {
            Ok(saved) => {
                for change in &saved {
                    self.world.mark_clean(change);
                }
                debug!(saved = saved.len(), "saved");
                self.uncommitted.extend(saved);
                self.uncommitted_tombstones.extend(tombstones);
            }
            Err(e) => {
                warn!(error = %e, "save failed, rolling back to savepoint");
                if let Err(rollback) = self
                    .conn
                    .execute_batch("ROLLBACK TO wf_save; RELEASE wf_save")
                {
                    warn!(error = %rollback, "savepoint rollback failed");
                }
                self.world.restore_tombstones(tombstones);
                return Err(e);
            }
        }

        if commit {
            self.commit()?;
        }
        Ok(())
    }
}

fn write_declarations(conn: &Connection, world: &World, changes: &[Change]) -> PersistResult<()> {
    for change in changes {
        if let Change::Declaration(name) = change {
            if let Some(constraint) = world.declaration(name) {
                rows::write_declaration(conn, name, constraint)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_line() -> WorldCache {
        let mut cache = WorldCache::open_in_memory().unwrap();
        for name in ["A", "B", "C"] {
            cache.add_place("d", name, BTreeMap::new()).unwrap();
        }
        cache.add_portal("d", "ab", "A", "B", 1.0).unwrap();
        cache.add_portal("d", "bc", "B", "C", 1.0).unwrap();
        cache.save_all(true).unwrap();
        cache
    }

    #[test]
    fn fresh_database_gets_default_name() {
        let cache = WorldCache::open_in_memory().unwrap();
        assert_eq!(cache.world().meta.name, "Untitled");
        assert!(!cache.in_transaction());
    }

    #[test]
    fn save_all_clears_pending() {
        let cache = cache_with_line();
        assert!(!cache.world().has_pending());
        assert!(!cache.in_transaction());
    }

    #[test]
    fn forgotten_place_reloads_with_portals() {
        let mut cache = cache_with_line();
        for name in ["A", "B", "C"] {
            assert!(cache.forget(&ItemKey::new("d", name)));
        }
        cache.get_place("d", "A").unwrap();
        // Loading A pulls in everything reachable from it.
        assert!(cache.world().place(&ItemKey::new("d", "C")).is_some());
        let a = ItemKey::new("d", "A");
        assert_eq!(cache.world().neighbors(&a).len(), 1);
    }

    #[test]
    fn missing_place_is_not_found() {
        let mut cache = cache_with_line();
        let err = cache.get_place("d", "Nowhere").unwrap_err();
        assert!(matches!(err, PersistError::NotFound(_)));
    }

    #[test]
    fn duplicate_checks_consult_storage() {
        let mut cache = cache_with_line();
        cache.forget(&ItemKey::new("d", "A"));
        let err = cache.add_place("d", "A", BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::World(WorldError::DuplicateKey(_))
        ));
    }

    #[test]
    fn uncommitted_save_leaves_transaction_open() {
        let mut cache = cache_with_line();
        cache.add_place("d", "D", BTreeMap::new()).unwrap();
        cache
            .save_place(&ItemKey::new("d", "D"), false)
            .unwrap();
        assert!(cache.in_transaction());
        cache.commit().unwrap();
        assert!(!cache.in_transaction());
    }

    #[test]
    fn failed_save_keeps_change_pending() {
        let mut cache = cache_with_line();
        let a = ItemKey::new("d", "A");
        cache.set_spot(&a, Some(Spot::at(1.0, 1.0))).unwrap();
        cache
            .conn
            .execute_batch("DROP TABLE spot")
            .unwrap();
        assert!(cache.save_place(&a, true).is_err());
        assert!(cache.world().is_dirty(&Change::Place(a)));
    }
}
