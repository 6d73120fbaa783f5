use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashMap, VecDeque};

use tracing::debug;
use wf_core::{ItemKey, PlaceRef, Portal, PortalRef, Thing, World, WorldError, WorldResult};

/// A candidate edge waiting in the spanning-tree frontier.
///
/// Ordered by weight, then by the order it was discovered in.
#[derive(Debug)]
struct Candidate {
    weight: f64,
    seq: usize,
    portal: String,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Portals chosen by [`PathBuilder::spanning_tree`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpanningTree {
    /// Chosen portals, in the order they joined the tree.
    pub portals: Vec<PortalRef>,
    /// Names of the spanned places.
    pub places: BTreeSet<String>,
    /// Sum of the chosen portals' weights.
    pub total_weight: f64,
}

impl SpanningTree {
    /// Whether the tree uses this portal.
    pub fn contains(&self, portal: &PortalRef) -> bool {
        self.portals.contains(portal)
    }

    /// Portals leading from `from` to `to` using only tree portals in their
    /// own direction. `None` when the tree offers no such route.
    pub fn route(
        &self,
        world: &World,
        from: &PlaceRef,
        to: &PlaceRef,
    ) -> Option<Vec<PortalRef>> {
        let mut outgoing: HashMap<&str, Vec<&Portal>> = HashMap::new();
        for key in &self.portals {
            let portal = world.portal(key)?;
            outgoing.entry(portal.origin()).or_default().push(portal);
        }
        if from.dimension != to.dimension || !self.places.contains(&from.name) {
            return None;
        }
        breadth_first(from, to, |place| outgoing.get(place).cloned().unwrap_or_default())
    }
}

/// Route suggestions over a dimension's portals.
pub struct PathBuilder;

impl PathBuilder {
    /// Grow a minimum spanning tree from `start_portal` with Prim's algorithm.
    ///
    /// Portals are treated as undirected for spanning purposes. The cheapest
    /// portal touching the tree joins next; equal weights go to the portal
    /// discovered first. A disconnected dimension yields a tree over the
    /// component containing `start_portal`.
    pub fn spanning_tree(
        world: &World,
        dimension: &str,
        start_portal: &str,
    ) -> WorldResult<SpanningTree> {
        let dim = world
            .dimension(dimension)
            .ok_or_else(|| WorldError::UnknownDimension(dimension.to_string()))?;
        let start = dim
            .portal(start_portal)
            .ok_or_else(|| WorldError::NotFound(ItemKey::new(dimension, start_portal)))?;

        let mut tree = SpanningTree {
            portals: vec![start.key().clone()],
            places: BTreeSet::from([
                start.origin().to_string(),
                start.destination().to_string(),
            ]),
            total_weight: start.weight(),
        };
        let mut frontier = BinaryHeap::new();
        let mut seq = 0;
        let mut push_incident = |frontier: &mut BinaryHeap<Reverse<Candidate>>, place: &str| {
            for portal in dim.outgoing(place).into_iter().chain(dim.incoming(place)) {
                frontier.push(Reverse(Candidate {
                    weight: portal.weight(),
                    seq,
                    portal: portal.name().to_string(),
                }));
                seq += 1;
            }
        };
        push_incident(&mut frontier, start.origin());
        push_incident(&mut frontier, start.destination());

        while let Some(Reverse(candidate)) = frontier.pop() {
            let Some(portal) = dim.portal(&candidate.portal) else {
                continue;
            };
            let new_place = match (
                tree.places.contains(portal.origin()),
                tree.places.contains(portal.destination()),
            ) {
                (true, false) => portal.destination(),
                (false, true) => portal.origin(),
                _ => continue,
            };
            tree.places.insert(new_place.to_string());
            tree.portals.push(portal.key().clone());
            tree.total_weight += portal.weight();
            push_incident(&mut frontier, new_place);
        }

        debug!(
            dimension,
            portals = tree.portals.len(),
            places = tree.places.len(),
            total_weight = tree.total_weight,
            "built spanning tree"
        );
        Ok(tree)
    }

    /// Fewest-step route from `from` to `to` along passable portals.
    ///
    /// With a `traveler`, portals whose admit rule rejects it are skipped too.
    /// Fails with [`WorldError::NotFound`] naming `to` when it is unreachable.
    pub fn find_route(
        world: &World,
        from: &PlaceRef,
        to: &PlaceRef,
        traveler: Option<&Thing>,
    ) -> WorldResult<Vec<PortalRef>> {
        if world.place(from).is_none() {
            return Err(WorldError::NotFound(from.clone()));
        }
        let allowed = |portal: &Portal| match traveler {
            Some(thing) => portal.admits(thing),
            None => portal.is_passable(),
        };
        let route = if from.dimension == to.dimension {
            breadth_first(from, to, |place| {
                world
                    .neighbors(&from.sibling(place))
                    .into_iter()
                    .filter(|p| allowed(*p))
                    .collect()
            })
        } else {
            None
        };
        route.ok_or_else(|| WorldError::NotFound(to.clone()))
    }
}

/// Breadth-first search from `from` to `to`, returning the portals taken.
fn breadth_first<'w, F>(
    from: &PlaceRef,
    to: &PlaceRef,
    mut outgoing: F,
) -> Option<Vec<PortalRef>>
where
    F: FnMut(&str) -> Vec<&'w Portal>,
{
    let mut visited: HashMap<String, Option<&'w Portal>> = HashMap::new();
    let mut queue = VecDeque::new();

    visited.insert(from.name.clone(), None);
    queue.push_back(from.name.clone());

    while let Some(current) = queue.pop_front() {
        if current == to.name {
            // Walk the parent links back to the start.
            let mut route = Vec::new();
            let mut node = current;
            while let Some(&Some(portal)) = visited.get(&node) {
                route.push(portal.key().clone());
                node = portal.origin().to_string();
            }
            route.reverse();
            return Some(route);
        }

        for portal in outgoing(&current) {
            if !visited.contains_key(portal.destination()) {
                visited.insert(portal.destination().to_string(), Some(portal));
                queue.push_back(portal.destination().to_string());
            }
        }
    }
    None
}
