use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::attribute::{AttrValue, AttributeMap, Constraint};
use crate::change::{Change, Tombstone};
use crate::error::{WorldError, WorldResult};
use crate::key::{Container, ItemKey, PlaceRef, PortalRef, ThingRef};
use crate::place::{Place, Spot};
use crate::portal::Portal;
use crate::thing::Thing;

/// Metadata about the world itself.
#[derive(Debug, Clone)]
pub struct WorldMeta {
    /// Human-readable world name.
    pub name: String,
    /// When the world was first created.
    pub created_at: DateTime<Utc>,
    /// When the world was last committed to storage.
    pub updated_at: DateTime<Utc>,
}

impl WorldMeta {
    /// Metadata for a world created now.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One named graph of places and portals, plus the things inside it.
#[derive(Debug, Clone)]
pub struct Dimension {
    name: String,
    places: BTreeMap<String, Place>,
    portals: BTreeMap<String, Portal>,
    things: BTreeMap<String, Thing>,

    // Indexes. Portal lists keep insertion order.
    outgoing: HashMap<String, Vec<String>>,
    incoming: HashMap<String, Vec<String>>,
    by_endpoints: HashMap<(String, String), String>,
    place_contents: HashMap<String, BTreeSet<String>>,
}

impl Dimension {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            places: BTreeMap::new(),
            portals: BTreeMap::new(),
            things: BTreeMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            by_endpoints: HashMap::new(),
            place_contents: HashMap::new(),
        }
    }

    /// The dimension's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a place by name.
    pub fn place(&self, name: &str) -> Option<&Place> {
        self.places.get(name)
    }

    /// Look up a portal by name.
    pub fn portal(&self, name: &str) -> Option<&Portal> {
        self.portals.get(name)
    }

    /// Look up a thing by name.
    pub fn thing(&self, name: &str) -> Option<&Thing> {
        self.things.get(name)
    }

    /// All resident places, in name order.
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    /// All resident portals, in name order.
    pub fn portals(&self) -> impl Iterator<Item = &Portal> {
        self.portals.values()
    }

    /// All resident things, in name order.
    pub fn things(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    /// Outgoing portals of a place, in creation order.
    pub fn outgoing(&self, place: &str) -> Vec<&Portal> {
        self.portal_list(self.outgoing.get(place))
    }

    /// Incoming portals of a place, in creation order.
    pub fn incoming(&self, place: &str) -> Vec<&Portal> {
        self.portal_list(self.incoming.get(place))
    }

    /// The portal from `origin` to `destination`, if any.
    pub fn portal_between(&self, origin: &str, destination: &str) -> Option<&Portal> {
        self.by_endpoints
            .get(&(origin.to_string(), destination.to_string()))
            .and_then(|name| self.portals.get(name))
    }

    /// Names of the things directly inside a container.
    pub fn contents_of(&self, container: &Container) -> Vec<&Thing> {
        let names = match container {
            Container::Place(p) => self.place_contents.get(p),
            Container::Thing(t) => self.things.get(t).map(|t| &t.contents),
        };
        names
            .map(|names| names.iter().filter_map(|n| self.things.get(n)).collect())
            .unwrap_or_default()
    }

    fn portal_list(&self, names: Option<&Vec<String>>) -> Vec<&Portal> {
        names
            .map(|names| names.iter().filter_map(|n| self.portals.get(n)).collect())
            .unwrap_or_default()
    }

    fn has_item(&self, name: &str) -> bool {
        self.places.contains_key(name) || self.things.contains_key(name)
    }

    fn container_exists(&self, container: &Container) -> bool {
        match container {
            Container::Place(p) => self.places.contains_key(p),
            Container::Thing(t) => self.things.contains_key(t),
        }
    }

    /// Whether `thing` sits (transitively) inside the item named `container`.
    fn is_inside(&self, thing: &str, container: &str) -> bool {
        let mut current = match self.things.get(thing) {
            Some(t) => t.location(),
            None => return false,
        };
        // Bounded by the number of things; containment is acyclic.
        for _ in 0..=self.things.len() {
            if current.name() == container {
                return true;
            }
            match current {
                Container::Place(_) => return false,
                Container::Thing(t) => match self.things.get(t) {
                    Some(outer) => current = outer.location(),
                    None => return false,
                },
            }
        }
        false
    }

    fn attach(&mut self, thing: &str, container: &Container) {
        match container {
            Container::Place(p) => {
                self.place_contents
                    .entry(p.clone())
                    .or_default()
                    .insert(thing.to_string());
            }
            Container::Thing(t) => {
                if let Some(outer) = self.things.get_mut(t) {
                    outer.contents.insert(thing.to_string());
                }
            }
        }
    }

    fn detach(&mut self, thing: &str, container: &Container) {
        match container {
            Container::Place(p) => {
                if let Some(names) = self.place_contents.get_mut(p) {
                    names.remove(thing);
                }
            }
            Container::Thing(t) => {
                if let Some(outer) = self.things.get_mut(t) {
                    outer.contents.remove(thing);
                }
            }
        }
    }

    fn index_portal(&mut self, portal: Portal) {
        let name = portal.name().to_string();
        self.outgoing
            .entry(portal.origin().to_string())
            .or_default()
            .push(name.clone());
        self.incoming
            .entry(portal.destination().to_string())
            .or_default()
            .push(name.clone());
        self.by_endpoints.insert(
            (
                portal.origin().to_string(),
                portal.destination().to_string(),
            ),
            name.clone(),
        );
        self.portals.insert(name, portal);
    }

    fn unindex_portal(&mut self, name: &str) -> Option<Portal> {
        let portal = self.portals.remove(name)?;
        if let Some(names) = self.outgoing.get_mut(portal.origin()) {
            names.retain(|n| n != name);
        }
        if let Some(names) = self.incoming.get_mut(portal.destination()) {
            names.retain(|n| n != name);
        }
        self.by_endpoints.remove(&(
            portal.origin().to_string(),
            portal.destination().to_string(),
        ));
        Some(portal)
    }

    /// Names of a thing and everything inside it, outermost first.
    fn subtree(&self, thing: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut queue = VecDeque::from([thing.to_string()]);
        while let Some(name) = queue.pop_front() {
            if let Some(t) = self.things.get(&name) {
                queue.extend(t.contents.iter().cloned());
                names.push(name);
            }
        }
        names
    }
}

/// The world graph. Owns every dimension and records pending changes for
/// storage; it never performs I/O itself.
#[derive(Debug, Clone)]
pub struct World {
    /// Metadata about the world.
    pub meta: WorldMeta,
    dimensions: BTreeMap<String, Dimension>,
    declarations: BTreeMap<String, Constraint>,
    dirty: BTreeSet<Change>,
    tombstones: Vec<Tombstone>,
}

impl World {
    /// An empty world.
    pub fn new(meta: WorldMeta) -> Self {
        Self {
            meta,
            dimensions: BTreeMap::new(),
            declarations: BTreeMap::new(),
            dirty: BTreeSet::new(),
            tombstones: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Dimensions
    // -----------------------------------------------------------------------

    /// Create a dimension if it does not exist yet. Returns whether it was created.
    pub fn add_dimension(&mut self, name: &str) -> bool {
        if self.dimensions.contains_key(name) {
            return false;
        }
        self.dimensions
            .insert(name.to_string(), Dimension::new(name));
        self.dirty.insert(Change::Dimension(name.to_string()));
        debug!(dimension = name, "created dimension");
        true
    }

    /// Look up a dimension.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.get(name)
    }

    /// All resident dimensions, in name order.
    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.values()
    }

    fn require_dimension(&self, name: &str) -> WorldResult<&Dimension> {
        self.dimensions
            .get(name)
            .ok_or_else(|| WorldError::UnknownDimension(name.to_string()))
    }

    fn dimension_mut(&mut self, name: &str) -> WorldResult<&mut Dimension> {
        self.dimensions
            .get_mut(name)
            .ok_or_else(|| WorldError::UnknownDimension(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Places
    // -----------------------------------------------------------------------

    /// Add a place, creating its dimension if needed.
    pub fn add_place(
        &mut self,
        dimension: &str,
        name: &str,
        attrs: BTreeMap<String, AttrValue>,
    ) -> WorldResult<PlaceRef> {
        let key = ItemKey::new(dimension, name);
        if self.dimension(dimension).is_some_and(|d| d.has_item(name)) {
            return Err(WorldError::DuplicateKey(key));
        }
        for (attr, value) in &attrs {
            self.validate(attr, value)?;
        }

        self.add_dimension(dimension);
        let place = Place::new(key.clone(), AttributeMap::loaded(attrs));
        self.dimension_mut(dimension)?
            .places
            .insert(name.to_string(), place);
        self.dirty.insert(Change::Place(key.clone()));
        Ok(key)
    }

    /// Look up a place.
    pub fn place(&self, key: &PlaceRef) -> Option<&Place> {
        self.dimension(&key.dimension)?.place(&key.name)
    }

    /// Set or clear a place's display spot.
    pub fn set_spot(&mut self, key: &PlaceRef, spot: Option<Spot>) -> WorldResult<()> {
        let place = self
            .dimension_mut(&key.dimension)?
            .places
            .get_mut(&key.name)
            .ok_or_else(|| WorldError::NotFound(key.clone()))?;
        place.set_spot(spot);
        self.dirty.insert(Change::Place(key.clone()));
        Ok(())
    }

    /// Remove an empty place together with every portal touching it.
    pub fn remove_place(&mut self, key: &PlaceRef) -> WorldResult<Place> {
        let dim = self.require_dimension(&key.dimension)?;
        if dim.place(&key.name).is_none() {
            return Err(WorldError::NotFound(key.clone()));
        }
        if dim
            .place_contents
            .get(&key.name)
            .is_some_and(|names| !names.is_empty())
        {
            return Err(WorldError::Occupied(key.clone()));
        }

        let outgoing: Vec<String> = dim
            .outgoing(&key.name)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        let incoming: Vec<(String, String)> = dim
            .incoming(&key.name)
            .iter()
            .map(|p| (p.name().to_string(), p.origin().to_string()))
            .collect();

        let dim = self.dimension_mut(&key.dimension)?;
        for name in &outgoing {
            dim.unindex_portal(name);
        }
        for (name, _) in &incoming {
            dim.unindex_portal(name);
        }
        dim.outgoing.remove(&key.name);
        dim.incoming.remove(&key.name);
        dim.place_contents.remove(&key.name);
        let place = dim
            .places
            .remove(&key.name)
            .ok_or_else(|| WorldError::NotFound(key.clone()))?;

        for (_, origin) in incoming {
            self.dirty.insert(Change::Place(key.sibling(origin)));
        }
        self.dirty.remove(&Change::Place(key.clone()));
        self.tombstones.push(Tombstone::Place(key.clone()));
        debug!(place = %key, "removed place");
        Ok(place)
    }

    // -----------------------------------------------------------------------
    // Portals
    // -----------------------------------------------------------------------

    /// Add a portal between two existing places of `dimension`.
    pub fn add_portal(
        &mut self,
        dimension: &str,
        name: &str,
        origin: &str,
        destination: &str,
        weight: f64,
    ) -> WorldResult<PortalRef> {
        let portal = Portal::new(ItemKey::new(dimension, name), origin, destination, weight)?;
        self.insert_portal(portal)
    }

    /// Add a fully built portal (for example one with an admit rule).
    pub fn insert_portal(&mut self, portal: Portal) -> WorldResult<PortalRef> {
        let key = portal.key().clone();
        self.check_portal(&portal, None)?;
        let origin = portal.origin_key();
        self.dimension_mut(&key.dimension)?.index_portal(portal);
        self.dirty.insert(Change::Place(origin));
        Ok(key)
    }

    /// Ensure a one-way portal from `a` to `b` exists, returning it.
    ///
    /// Calling this again for a connected pair is a no-op.
    pub fn connect(&mut self, a: &PlaceRef, b: &PlaceRef) -> WorldResult<PortalRef> {
        if a.dimension != b.dimension {
            return Err(WorldError::InvalidEdge {
                key: a.sibling(Portal::default_name(&a.name, &b.name)),
                reason: format!("{b} is in another dimension"),
            });
        }
        if let Some(existing) = self.portal_between(a, b) {
            return Ok(existing.key().clone());
        }
        let name = Portal::default_name(&a.name, &b.name);
        self.add_portal(&a.dimension, &name, &a.name, &b.name, 1.0)
    }

    /// Swap a portal for a new version with the same key.
    pub fn replace_portal(&mut self, portal: Portal) -> WorldResult<Portal> {
        let key = portal.key().clone();
        let old_origin = self
            .portal(&key)
            .ok_or_else(|| WorldError::NotFound(key.clone()))?
            .origin_key();
        self.check_portal(&portal, Some(&key.name))?;

        let new_origin = portal.origin_key();
        let dim = self.dimension_mut(&key.dimension)?;
        let old = dim
            .unindex_portal(&key.name)
            .ok_or_else(|| WorldError::NotFound(key.clone()))?;
        dim.index_portal(portal);
        self.dirty.insert(Change::Place(old_origin));
        self.dirty.insert(Change::Place(new_origin));
        Ok(old)
    }

    /// Remove a portal.
    pub fn remove_portal(&mut self, key: &PortalRef) -> WorldResult<Portal> {
        let portal = self
            .dimension_mut(&key.dimension)?
            .unindex_portal(&key.name)
            .ok_or_else(|| WorldError::NotFound(key.clone()))?;
        self.dirty.insert(Change::Place(portal.origin_key()));
        Ok(portal)
    }

    fn check_portal(&self, portal: &Portal, replacing: Option<&str>) -> WorldResult<()> {
        let key = portal.key();
        let dim = self
            .dimension(&key.dimension)
            .ok_or_else(|| WorldError::InvalidEdge {
                key: key.clone(),
                reason: format!("unknown dimension \"{}\"", key.dimension),
            })?;
        for endpoint in [portal.origin(), portal.destination()] {
            if dim.place(endpoint).is_none() {
                return Err(WorldError::InvalidEdge {
                    key: key.clone(),
                    reason: format!("unknown place \"{endpoint}\""),
                });
            }
        }
        if replacing.is_none() && dim.portals.contains_key(&key.name) {
            return Err(WorldError::DuplicateKey(key.clone()));
        }
        if let Some(existing) = dim.portal_between(portal.origin(), portal.destination()) {
            if Some(existing.name()) != replacing {
                return Err(WorldError::DuplicateKey(existing.key().clone()));
            }
        }
        Ok(())
    }

    /// Look up a portal.
    pub fn portal(&self, key: &PortalRef) -> Option<&Portal> {
        self.dimension(&key.dimension)?.portal(&key.name)
    }

    // -----------------------------------------------------------------------
    // Things
    // -----------------------------------------------------------------------

    /// Add a thing inside an existing container.
    pub fn add_thing(
        &mut self,
        dimension: &str,
        name: &str,
        location: Container,
    ) -> WorldResult<ThingRef> {
        let key = ItemKey::new(dimension, name);
        let dim = self.require_dimension(dimension)?;
        if dim.has_item(name) {
            return Err(WorldError::DuplicateKey(key));
        }
        if !dim.container_exists(&location) {
            return Err(WorldError::NotFound(location.key_in(dimension)));
        }

        let dim = self.dimension_mut(dimension)?;
        dim.attach(name, &location);
        dim.things.insert(
            name.to_string(),
            Thing::new(key.clone(), location, AttributeMap::loaded(BTreeMap::new())),
        );
        self.dirty.insert(Change::Thing(key.clone()));
        Ok(key)
    }

    /// Look up a thing.
    pub fn thing(&self, key: &ThingRef) -> Option<&Thing> {
        self.dimension(&key.dimension)?.thing(&key.name)
    }

    /// Move a thing into a new container.
    ///
    /// Fails with [`WorldError::ContainmentCycle`] if the container is the
    /// thing itself or sits inside it; containment is left unchanged.
    pub fn move_thing(&mut self, thing: &ThingRef, new_container: Container) -> WorldResult<()> {
        let dim = self.require_dimension(&thing.dimension)?;
        let current = dim
            .thing(&thing.name)
            .ok_or_else(|| WorldError::NotFound(thing.clone()))?
            .location()
            .clone();
        let container_key = new_container.key_in(&thing.dimension);
        if !dim.container_exists(&new_container) {
            return Err(WorldError::NotFound(container_key));
        }
        if let Container::Thing(target) = &new_container {
            if *target == thing.name || dim.is_inside(target, &thing.name) {
                return Err(WorldError::ContainmentCycle {
                    thing: thing.clone(),
                    container: container_key,
                });
            }
        }
        if current == new_container {
            return Ok(());
        }

        let dim = self.dimension_mut(&thing.dimension)?;
        dim.detach(&thing.name, &current);
        dim.attach(&thing.name, &new_container);
        if let Some(t) = dim.things.get_mut(&thing.name) {
            t.set_location(new_container.clone());
        }
        self.dirty.insert(Change::Thing(thing.clone()));
        trace!(thing = %thing, from = %current, to = %new_container, "moved thing");
        Ok(())
    }

    /// Whether `inner` sits (transitively) inside `outer`, a place or thing.
    pub fn contains_transitively(&self, outer: &ItemKey, inner: &ThingRef) -> bool {
        outer.dimension == inner.dimension
            && self
                .dimension(&inner.dimension)
                .is_some_and(|d| d.is_inside(&inner.name, &outer.name))
    }

    /// Things directly inside a container of `dimension`.
    pub fn contents(&self, dimension: &str, container: &Container) -> Vec<&Thing> {
        self.dimension(dimension)
            .map(|d| d.contents_of(container))
            .unwrap_or_default()
    }

    /// Remove a thing that holds nothing.
    pub fn remove_thing(&mut self, key: &ThingRef) -> WorldResult<Thing> {
        let dim = self.require_dimension(&key.dimension)?;
        let thing = dim
            .thing(&key.name)
            .ok_or_else(|| WorldError::NotFound(key.clone()))?;
        if !thing.contents.is_empty() {
            return Err(WorldError::Occupied(key.clone()));
        }
        let location = thing.location().clone();

        let dim = self.dimension_mut(&key.dimension)?;
        dim.detach(&key.name, &location);
        let thing = dim
            .things
            .remove(&key.name)
            .ok_or_else(|| WorldError::NotFound(key.clone()))?;
        self.dirty.remove(&Change::Thing(key.clone()));
        self.tombstones.push(Tombstone::Thing(key.clone()));
        debug!(thing = %key, "removed thing");
        Ok(thing)
    }

    // -----------------------------------------------------------------------
    // Graph queries
    // -----------------------------------------------------------------------

    /// Outgoing portals of a place.
    pub fn neighbors(&self, place: &PlaceRef) -> Vec<&Portal> {
        self.dimension(&place.dimension)
            .map(|d| d.outgoing(&place.name))
            .unwrap_or_default()
    }

    /// Incoming portals of a place.
    pub fn incoming(&self, place: &PlaceRef) -> Vec<&Portal> {
        self.dimension(&place.dimension)
            .map(|d| d.incoming(&place.name))
            .unwrap_or_default()
    }

    /// The portal from `a` to `b`, if any.
    pub fn portal_between(&self, a: &PlaceRef, b: &PlaceRef) -> Option<&Portal> {
        if a.dimension != b.dimension {
            return None;
        }
        self.dimension(&a.dimension)?.portal_between(&a.name, &b.name)
    }

    /// Names of every place reachable from `place` along portal directions,
    /// including `place` itself.
    pub fn reachable_from(&self, place: &PlaceRef) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let Some(dim) = self.dimension(&place.dimension) else {
            return seen;
        };
        if dim.place(&place.name).is_none() {
            return seen;
        }
        let mut queue = VecDeque::from([place.name.clone()]);
        seen.insert(place.name.clone());
        while let Some(current) = queue.pop_front() {
            for portal in dim.outgoing(&current) {
                if seen.insert(portal.destination().to_string()) {
                    queue.push_back(portal.destination().to_string());
                }
            }
        }
        seen
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Declare (or replace) the constraint for an attribute name.
    pub fn declare_attribute(&mut self, name: &str, constraint: Constraint) {
        self.declarations.insert(name.to_string(), constraint);
        self.dirty.insert(Change::Declaration(name.to_string()));
    }

    /// The declared constraint for an attribute.
    pub fn declaration(&self, name: &str) -> Option<&Constraint> {
        self.declarations.get(name)
    }

    /// Every declaration, in name order.
    pub fn declarations(&self) -> impl Iterator<Item = (&String, &Constraint)> {
        self.declarations.iter()
    }

    fn validate(&self, attr: &str, value: &AttrValue) -> WorldResult<()> {
        match self.declarations.get(attr) {
            Some(constraint) if !constraint.accepts(value) => {
                Err(WorldError::ConstraintViolation {
                    attribute: attr.to_string(),
                    value: value.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Attribute values of a place or thing.
    pub fn attributes(&self, key: &ItemKey) -> Option<&AttributeMap> {
        let dim = self.dimension(&key.dimension)?;
        dim.place(&key.name)
            .map(|p| p.attributes())
            .or_else(|| dim.thing(&key.name).map(|t| t.attributes()))
    }

    /// Assign an attribute of a place or thing, checked against its declaration.
    pub fn set_attribute(
        &mut self,
        key: &ItemKey,
        attr: &str,
        value: AttrValue,
    ) -> WorldResult<Option<AttrValue>> {
        self.validate(attr, &value)?;
        let (map, change) = self.attributes_mut(key)?;
        let previous = map.insert(attr.to_string(), value);
        self.dirty.insert(change);
        Ok(previous)
    }

    /// Remove an attribute value from a place or thing.
    pub fn unset_attribute(&mut self, key: &ItemKey, attr: &str) -> WorldResult<Option<AttrValue>> {
        let (map, change) = self.attributes_mut(key)?;
        let previous = map.remove(attr);
        if previous.is_some() {
            self.dirty.insert(change);
        }
        Ok(previous)
    }

    fn attributes_mut(&mut self, key: &ItemKey) -> WorldResult<(&mut AttributeMap, Change)> {
        let dim = self.dimension_mut(&key.dimension)?;
        if let Some(place) = dim.places.get_mut(&key.name) {
            return Ok((&mut place.attributes, Change::Place(key.clone())));
        }
        match dim.things.get_mut(&key.name) {
            Some(thing) => Ok((&mut thing.attributes, Change::Thing(key.clone()))),
            None => Err(WorldError::NotFound(key.clone())),
        }
    }

    // -----------------------------------------------------------------------
    // Pending changes
    // -----------------------------------------------------------------------

    /// Everything changed since storage last saw it.
    pub fn pending_changes(&self) -> impl Iterator<Item = &Change> {
        self.dirty.iter()
    }

    /// Whether a change is pending.
    pub fn is_dirty(&self, change: &Change) -> bool {
        self.dirty.contains(change)
    }

    /// Whether anything at all awaits saving.
    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty() || !self.tombstones.is_empty()
    }

    /// Flag a change as pending again, e.g. after a failed save.
    pub fn mark_dirty(&mut self, change: Change) {
        self.dirty.insert(change);
    }

    /// Clear a pending change once storage holds it. Returns whether it was pending.
    pub fn mark_clean(&mut self, change: &Change) -> bool {
        self.dirty.remove(change)
    }

    /// Removals not yet applied to storage.
    pub fn tombstones(&self) -> &[Tombstone] {
        &self.tombstones
    }

    /// Take every pending removal.
    pub fn take_tombstones(&mut self) -> Vec<Tombstone> {
        std::mem::take(&mut self.tombstones)
    }

    /// Put back removals that storage failed to apply, ahead of newer ones.
    pub fn restore_tombstones(&mut self, mut tombstones: Vec<Tombstone>) {
        tombstones.append(&mut self.tombstones);
        self.tombstones = tombstones;
    }

    // -----------------------------------------------------------------------
    // Materialisation from storage
    //
    // These insert already-persisted state and do not mark anything dirty.
    // -----------------------------------------------------------------------

    /// Register a dimension read from storage.
    pub fn restore_dimension(&mut self, name: &str) {
        self.dimensions
            .entry(name.to_string())
            .or_insert_with(|| Dimension::new(name));
    }

    /// Register a place read from storage.
    pub fn restore_place(&mut self, place: Place) -> WorldResult<()> {
        let key = place.key().clone();
        self.restore_dimension(&key.dimension);
        let dim = self.dimension_mut(&key.dimension)?;
        if dim.has_item(&key.name) {
            return Err(WorldError::DuplicateKey(key));
        }
        dim.places.insert(key.name.clone(), place);
        Ok(())
    }

    /// Register a portal read from storage. Its endpoints are not checked so
    /// a batch may be restored in any order.
    pub fn restore_portal(&mut self, portal: Portal) -> WorldResult<()> {
        let key = portal.key().clone();
        let dim = self.dimension_mut(&key.dimension)?;
        if dim.portals.contains_key(&key.name) {
            return Err(WorldError::DuplicateKey(key));
        }
        dim.index_portal(portal);
        Ok(())
    }

    /// Register a thing read from storage; its container should already be resident.
    pub fn restore_thing(&mut self, thing: Thing) -> WorldResult<()> {
        let key = thing.key().clone();
        let dim = self.dimension_mut(&key.dimension)?;
        if dim.has_item(&key.name) {
            return Err(WorldError::DuplicateKey(key));
        }
        let location = thing.location().clone();
        dim.things.insert(key.name.clone(), thing);
        dim.attach(&key.name, &location);
        Ok(())
    }

    /// Merge stored attribute values under the in-memory ones.
    pub fn restore_attributes(
        &mut self,
        key: &ItemKey,
        stored: BTreeMap<String, AttrValue>,
    ) -> WorldResult<()> {
        let (map, _) = self.attributes_mut(key)?;
        map.merge_stored(stored);
        Ok(())
    }

    /// Register a declaration read from storage.
    pub fn restore_declaration(&mut self, name: &str, constraint: Constraint) {
        self.declarations.insert(name.to_string(), constraint);
    }

    /// Drop a place (with its outgoing portals and contents) or a thing
    /// subtree from memory without recording a removal.
    pub fn evict(&mut self, key: &ItemKey) -> bool {
        let Some(dim) = self.dimensions.get_mut(&key.dimension) else {
            return false;
        };

        let mut evicted = Vec::new();
        if dim.places.contains_key(&key.name) {
            let roots: Vec<String> = dim
                .place_contents
                .remove(&key.name)
                .map(|names| names.into_iter().collect())
                .unwrap_or_default();
            for root in roots {
                for name in dim.subtree(&root) {
                    dim.things.remove(&name);
                    evicted.push(Change::Thing(key.sibling(name)));
                }
            }
            let outgoing = dim.outgoing.remove(&key.name).unwrap_or_default();
            for name in outgoing {
                dim.unindex_portal(&name);
            }
            dim.places.remove(&key.name);
            evicted.push(Change::Place(key.clone()));
        } else if let Some(thing) = dim.things.get(&key.name) {
            let location = thing.location().clone();
            dim.detach(&key.name, &location);
            for name in dim.subtree(&key.name) {
                dim.things.remove(&name);
                evicted.push(Change::Thing(key.sibling(name)));
            }
        } else {
            return false;
        }

        for change in &evicted {
            self.dirty.remove(change);
        }
        debug!(item = %key, count = evicted.len(), "evicted from memory");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrType;

    fn test_world() -> World {
        World::new(WorldMeta::new("Test World"))
    }

    fn no_attrs() -> BTreeMap<String, AttrValue> {
        BTreeMap::new()
    }

    /// A -> B -> C in dimension "d".
    fn line_world() -> World {
        let mut world = test_world();
        for name in ["A", "B", "C"] {
            world.add_place("d", name, no_attrs()).unwrap();
        }
        world.add_portal("d", "ab", "A", "B", 1.0).unwrap();
        world.add_portal("d", "bc", "B", "C", 2.0).unwrap();
        world
    }

    #[test]
    fn add_and_get_place() {
        let mut world = test_world();
        let key = world.add_place("d", "Tavern", no_attrs()).unwrap();
        assert_eq!(world.place(&key).unwrap().name(), "Tavern");
        assert!(world.dimension("d").is_some());
    }

    #[test]
    fn duplicate_place_rejected() {
        let mut world = test_world();
        world.add_place("d", "Tavern", no_attrs()).unwrap();
        let err = world.add_place("d", "Tavern", no_attrs()).unwrap_err();
        assert_eq!(err, WorldError::DuplicateKey(ItemKey::new("d", "Tavern")));
    }

    #[test]
    fn same_name_in_other_dimension_allowed() {
        let mut world = test_world();
        world.add_place("d", "Tavern", no_attrs()).unwrap();
        assert!(world.add_place("e", "Tavern", no_attrs()).is_ok());
    }

    #[test]
    fn portal_self_loop_rejected() {
        let mut world = line_world();
        let err = world.add_portal("d", "aa", "A", "A", 1.0).unwrap_err();
        assert!(matches!(err, WorldError::InvalidEdge { .. }));
    }

    #[test]
    fn portal_unknown_endpoint_rejected() {
        let mut world = line_world();
        let err = world.add_portal("d", "az", "A", "Z", 1.0).unwrap_err();
        assert!(matches!(err, WorldError::InvalidEdge { .. }));
    }

    #[test]
    fn duplicate_portal_pair_rejected() {
        let mut world = line_world();
        let err = world.add_portal("d", "ab2", "A", "B", 5.0).unwrap_err();
        assert_eq!(err, WorldError::DuplicateKey(ItemKey::new("d", "ab")));
    }

    #[test]
    fn neighbors_are_outgoing_only() {
        let world = line_world();
        let b = ItemKey::new("d", "B");
        let out: Vec<_> = world.neighbors(&b).iter().map(|p| p.name()).collect();
        assert_eq!(out, vec!["bc"]);
        let inc: Vec<_> = world.incoming(&b).iter().map(|p| p.name()).collect();
        assert_eq!(inc, vec!["ab"]);
    }

    #[test]
    fn connect_is_idempotent() {
        let mut world = line_world();
        let a = ItemKey::new("d", "A");
        let c = ItemKey::new("d", "C");
        let first = world.connect(&a, &c).unwrap();
        let second = world.connect(&a, &c).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.name, "portal[A->C]");
        assert_eq!(world.neighbors(&a).len(), 2);

        // Existing portal is reused even under another name.
        let b = ItemKey::new("d", "B");
        assert_eq!(world.connect(&a, &b).unwrap().name, "ab");
    }

    #[test]
    fn replace_portal_swaps_endpoints() {
        let mut world = line_world();
        let replacement = Portal::new(ItemKey::new("d", "ab"), "A", "C", 4.0).unwrap();
        let old = world.replace_portal(replacement).unwrap();
        assert_eq!(old.destination(), "B");
        let a = ItemKey::new("d", "A");
        assert_eq!(world.neighbors(&a)[0].destination(), "C");
        assert!(world.portal_between(&a, &ItemKey::new("d", "B")).is_none());
    }

    #[test]
    fn reachable_follows_direction() {
        let world = line_world();
        let reach = world.reachable_from(&ItemKey::new("d", "B"));
        assert_eq!(reach.into_iter().collect::<Vec<_>>(), vec!["B", "C"]);
    }

    #[test]
    fn things_nest_and_move() {
        let mut world = line_world();
        let bag = world
            .add_thing("d", "Bag", Container::Place("A".into()))
            .unwrap();
        let coin = world
            .add_thing("d", "Coin", Container::Thing("Bag".into()))
            .unwrap();
        assert!(world.contains_transitively(&ItemKey::new("d", "A"), &coin));
        assert!(world.contains_transitively(&bag, &coin));
        assert!(!world.contains_transitively(&coin, &bag));

        world.move_thing(&bag, Container::Place("B".into())).unwrap();
        assert!(world.contains_transitively(&ItemKey::new("d", "B"), &coin));
        assert!(world.contents("d", &Container::Place("A".into())).is_empty());
        assert_eq!(world.contents("d", &Container::Place("B".into())).len(), 1);
    }

    #[test]
    fn containment_cycle_rejected_and_state_unchanged() {
        let mut world = line_world();
        let box_ = world
            .add_thing("d", "Box", Container::Place("A".into()))
            .unwrap();
        world
            .add_thing("d", "Pouch", Container::Thing("Box".into()))
            .unwrap();
        world
            .add_thing("d", "Locket", Container::Thing("Pouch".into()))
            .unwrap();

        let err = world
            .move_thing(&box_, Container::Thing("Locket".into()))
            .unwrap_err();
        assert!(matches!(err, WorldError::ContainmentCycle { .. }));
        assert_eq!(
            world.thing(&box_).unwrap().location(),
            &Container::Place("A".into())
        );

        let err = world
            .move_thing(&box_, Container::Thing("Box".into()))
            .unwrap_err();
        assert!(matches!(err, WorldError::ContainmentCycle { .. }));
    }

    #[test]
    fn move_into_missing_container_fails() {
        let mut world = line_world();
        let t = world
            .add_thing("d", "Rock", Container::Place("A".into()))
            .unwrap();
        let err = world
            .move_thing(&t, Container::Place("Nowhere".into()))
            .unwrap_err();
        assert!(matches!(err, WorldError::NotFound(_)));
    }

    #[test]
    fn remove_place_drops_incident_portals() {
        let mut world = line_world();
        world.remove_place(&ItemKey::new("d", "B")).unwrap();
        let dim = world.dimension("d").unwrap();
        assert_eq!(dim.portals().count(), 0);
        assert!(world.is_dirty(&Change::Place(ItemKey::new("d", "A"))));
        assert_eq!(
            world.tombstones(),
            &[Tombstone::Place(ItemKey::new("d", "B"))]
        );
    }

    #[test]
    fn occupied_place_cannot_be_removed() {
        let mut world = line_world();
        world
            .add_thing("d", "Rock", Container::Place("A".into()))
            .unwrap();
        let err = world.remove_place(&ItemKey::new("d", "A")).unwrap_err();
        assert!(matches!(err, WorldError::Occupied(_)));
    }

    #[test]
    fn declared_attribute_is_enforced() {
        let mut world = line_world();
        world.declare_attribute(
            "stickiness",
            Constraint::new()
                .of_type(AttrType::Int)
                .between(-10.0, 10.0)
                .permit("unknown"),
        );
        let glue = world
            .add_thing("d", "Glue", Container::Place("A".into()))
            .unwrap();

        let err = world
            .set_attribute(&glue, "stickiness", AttrValue::Int(15))
            .unwrap_err();
        assert!(matches!(err, WorldError::ConstraintViolation { .. }));
        assert!(world.attributes(&glue).unwrap().get("stickiness").is_none());

        world
            .set_attribute(&glue, "stickiness", AttrValue::from("unknown"))
            .unwrap();
        assert_eq!(
            world.attributes(&glue).unwrap().get("stickiness"),
            Some(&AttrValue::from("unknown"))
        );
    }

    #[test]
    fn add_place_validates_initial_attributes() {
        let mut world = test_world();
        world.declare_attribute("depth", Constraint::new().of_type(AttrType::Int));
        let mut attrs = BTreeMap::new();
        attrs.insert("depth".to_string(), AttrValue::from("deep"));
        assert!(world.add_place("d", "Well", attrs).is_err());
        assert!(world.dimension("d").is_none());
    }

    #[test]
    fn mutations_mark_dirty() {
        let mut world = line_world();
        let a = ItemKey::new("d", "A");
        world.mark_clean(&Change::Place(a.clone()));
        world.set_spot(&a, Some(Spot::at(0.0, 0.0))).unwrap();
        assert!(world.is_dirty(&Change::Place(a)));
        assert!(world.is_dirty(&Change::Dimension("d".into())));
    }

    #[test]
    fn evict_place_takes_contents_and_outgoing() {
        let mut world = line_world();
        world
            .add_thing("d", "Bag", Container::Place("A".into()))
            .unwrap();
        world
            .add_thing("d", "Coin", Container::Thing("Bag".into()))
            .unwrap();
        assert!(world.evict(&ItemKey::new("d", "A")));
        let dim = world.dimension("d").unwrap();
        assert!(dim.place("A").is_none());
        assert!(dim.thing("Coin").is_none());
        assert!(dim.portal("ab").is_none());
        assert!(dim.portal("bc").is_some());
        assert!(world.tombstones().is_empty());
    }
}
