use std::fmt;
use std::sync::Arc;

use crate::error::{WorldError, WorldResult};
use crate::key::ItemKey;
use crate::thing::Thing;

/// Predicate deciding whether a traveller may pass through a portal.
pub type AdmitRule = Arc<dyn Fn(&Thing) -> bool + Send + Sync>;

/// A directed, weighted edge between two places of one dimension.
///
/// Portals are immutable once built; edits go through
/// [`World::replace_portal`](crate::World::replace_portal).
#[derive(Clone)]
pub struct Portal {
    key: ItemKey,
    origin: String,
    destination: String,
    weight: f64,
    passable: bool,
    admit: Option<AdmitRule>,
}

impl fmt::Debug for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portal")
            .field("key", &self.key)
            .field("origin", &self.origin)
            .field("destination", &self.destination)
            .field("weight", &self.weight)
            .field("passable", &self.passable)
            .field("admit", &self.admit.is_some())
            .finish()
    }
}

impl Portal {
    /// Build a portal, rejecting self-loops and negative or non-finite weights.
    pub fn new(
        key: ItemKey,
        origin: impl Into<String>,
        destination: impl Into<String>,
        weight: f64,
    ) -> WorldResult<Self> {
        let origin = origin.into();
        let destination = destination.into();
        if origin == destination {
            return Err(WorldError::InvalidEdge {
                key,
                reason: format!("origin and destination are both \"{origin}\""),
            });
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(WorldError::InvalidEdge {
                key,
                reason: format!("weight {weight} is not a non-negative number"),
            });
        }
        Ok(Self {
            key,
            origin,
            destination,
            weight,
            passable: true,
            admit: None,
        })
    }

    /// The name given to portals created without one.
    pub fn default_name(origin: &str, destination: &str) -> String {
        format!("portal[{origin}->{destination}]")
    }

    /// Set the passability flag.
    pub fn with_passable(mut self, passable: bool) -> Self {
        self.passable = passable;
        self
    }

    /// Restrict who may pass.
    pub fn with_admit(mut self, rule: AdmitRule) -> Self {
        self.admit = Some(rule);
        self
    }

    /// The portal's key.
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    /// The portal's name.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Name of the place the portal leaves.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Name of the place the portal leads to.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Key of the origin place.
    pub fn origin_key(&self) -> ItemKey {
        self.key.sibling(self.origin.clone())
    }

    /// Key of the destination place.
    pub fn destination_key(&self) -> ItemKey {
        self.key.sibling(self.destination.clone())
    }

    /// Traversal cost.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Whether the portal is open at all.
    pub fn is_passable(&self) -> bool {
        self.passable
    }

    /// Whether `traveler` may pass through.
    pub fn admits(&self, traveler: &Thing) -> bool {
        self.passable && self.admit.as_ref().is_none_or(|rule| rule(traveler))
    }

    /// Whether `place` is one of the endpoints.
    pub fn touches(&self, place: &str) -> bool {
        self.origin == place || self.destination == place
    }

    /// Whether this portal's destination is where `next` starts.
    pub fn leads_into(&self, next: &Portal) -> bool {
        self.key.dimension == next.key.dimension && self.destination == next.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttrValue, AttributeMap};
    use crate::key::Container;

    fn key(name: &str) -> ItemKey {
        ItemKey::new("d", name)
    }

    #[test]
    fn self_loop_rejected() {
        let err = Portal::new(key("p"), "A", "A", 1.0).unwrap_err();
        assert!(matches!(err, WorldError::InvalidEdge { .. }));
    }

    #[test]
    fn negative_weight_rejected() {
        assert!(Portal::new(key("p"), "A", "B", -1.0).is_err());
        assert!(Portal::new(key("p"), "A", "B", f64::NAN).is_err());
        assert!(Portal::new(key("p"), "A", "B", 0.0).is_ok());
    }

    #[test]
    fn default_name_format() {
        assert_eq!(Portal::default_name("A", "B"), "portal[A->B]");
    }

    #[test]
    fn admits_respects_flag_and_rule() {
        let mut attrs = AttributeMap::default();
        attrs.insert("key".into(), AttrValue::Bool(true));
        let holder = Thing::new(key("Hero"), Container::Place("A".into()), attrs);
        let stranger = Thing::new(
            key("Rat"),
            Container::Place("A".into()),
            AttributeMap::default(),
        );

        let gate = Portal::new(key("gate"), "A", "B", 1.0)
            .unwrap()
            .with_admit(Arc::new(|t: &Thing| t.attributes().get("key").is_some()));
        assert!(gate.admits(&holder));
        assert!(!gate.admits(&stranger));

        let closed = gate.clone().with_passable(false);
        assert!(!closed.admits(&holder));
    }

    #[test]
    fn leads_into_checks_endpoints() {
        let ab = Portal::new(key("ab"), "A", "B", 1.0).unwrap();
        let bc = Portal::new(key("bc"), "B", "C", 1.0).unwrap();
        assert!(ab.leads_into(&bc));
        assert!(!bc.leads_into(&ab));
    }
}
