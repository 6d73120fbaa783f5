use crate::key::ItemKey;

/// Something in memory that differs from what storage last saw.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Change {
    /// A dimension was created.
    Dimension(String),
    /// A place, its spot, attributes, or outgoing portals changed.
    Place(ItemKey),
    /// A thing, its location, or attributes changed.
    Thing(ItemKey),
    /// An attribute declaration was added or replaced.
    Declaration(String),
}

impl Change {
    /// The item key this change concerns, if it concerns an item.
    pub fn item(&self) -> Option<&ItemKey> {
        match self {
            Self::Place(key) | Self::Thing(key) => Some(key),
            Self::Dimension(_) | Self::Declaration(_) => None,
        }
    }
}

/// A removal that storage has not applied yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tombstone {
    /// A place and its outgoing portals were removed.
    Place(ItemKey),
    /// A thing was removed.
    Thing(ItemKey),
}

impl Tombstone {
    /// The removed item's key.
    pub fn key(&self) -> &ItemKey {
        match self {
            Self::Place(key) | Self::Thing(key) => key,
        }
    }
}
