use std::fmt;

/// Identity of a place, portal, or thing: a name scoped by its dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    /// The dimension the name belongs to.
    pub dimension: String,
    /// The name, unique within its dimension.
    pub name: String,
}

impl ItemKey {
    /// Create a key for `name` in `dimension`.
    pub fn new(dimension: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            name: name.into(),
        }
    }

    /// A key for another name in the same dimension.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.dimension.clone(), name)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dimension, self.name)
    }
}

/// Handle to a place.
pub type PlaceRef = ItemKey;
/// Handle to a portal.
pub type PortalRef = ItemKey;
/// Handle to a thing.
pub type ThingRef = ItemKey;

/// Where a thing is: directly in a place, or inside another thing.
///
/// Names are resolved within the dimension of the thing being located.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Container {
    /// Directly inside a place.
    Place(String),
    /// Inside another thing.
    Thing(String),
}

impl Container {
    /// The container's name, regardless of kind.
    pub fn name(&self) -> &str {
        match self {
            Self::Place(name) | Self::Thing(name) => name,
        }
    }

    /// The container's key in `dimension`.
    pub fn key_in(&self, dimension: &str) -> ItemKey {
        ItemKey::new(dimension, self.name())
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Place(name) => write!(f, "place {name}"),
            Self::Thing(name) => write!(f, "thing {name}"),
        }
    }
}
