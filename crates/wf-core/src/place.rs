use crate::attribute::AttributeMap;
use crate::key::ItemKey;

/// Where a place is drawn: a circle on a named spot graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// Radius of the drawn spot.
    pub r: f64,
    /// The spot graph (board) this spot belongs to.
    pub spotgraph: String,
}

impl Spot {
    /// A spot at `(x, y)` with unit radius on the default board.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            r: 1.0,
            spotgraph: "default".to_string(),
        }
    }

    /// Linear interpolation towards `other` by `t` in `[0, 1]`.
    pub fn lerp(&self, other: &Spot, t: f64) -> (f64, f64) {
        (
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// A vertex of a dimension's graph.
#[derive(Debug, Clone)]
pub struct Place {
    key: ItemKey,
    spot: Option<Spot>,
    pub(crate) attributes: AttributeMap,
}

impl Place {
    /// A place with loaded (possibly empty) attributes.
    pub fn new(key: ItemKey, attributes: AttributeMap) -> Self {
        Self {
            key,
            spot: None,
            attributes,
        }
    }

    /// Attach a display spot.
    pub fn with_spot(mut self, spot: Spot) -> Self {
        self.spot = Some(spot);
        self
    }

    /// The place's key.
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    /// The place's name.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// The display spot, if one was set.
    pub fn spot(&self) -> Option<&Spot> {
        self.spot.as_ref()
    }

    /// Attribute values held in memory.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub(crate) fn set_spot(&mut self, spot: Option<Spot>) {
        self.spot = spot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_halfway() {
        let a = Spot::at(0.0, 0.0);
        let b = Spot::at(10.0, 4.0);
        assert_eq!(a.lerp(&b, 0.5), (5.0, 2.0));
    }

    #[test]
    fn with_spot_sets_spot() {
        let place = Place::new(ItemKey::new("d", "Hall"), AttributeMap::default())
            .with_spot(Spot::at(1.0, 2.0));
        assert_eq!(place.spot().map(|s| s.x), Some(1.0));
        assert_eq!(place.name(), "Hall");
    }
}
