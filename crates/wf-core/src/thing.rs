use std::collections::BTreeSet;

use crate::attribute::AttributeMap;
use crate::key::{Container, ItemKey};

/// A mobile entity located in a place or inside another thing.
#[derive(Debug, Clone)]
pub struct Thing {
    key: ItemKey,
    location: Container,
    pub(crate) contents: BTreeSet<String>,
    pub(crate) attributes: AttributeMap,
}

impl Thing {
    /// A thing at `location` with no contents.
    pub fn new(key: ItemKey, location: Container, attributes: AttributeMap) -> Self {
        Self {
            key,
            location,
            contents: BTreeSet::new(),
            attributes,
        }
    }

    /// The thing's key.
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    /// The thing's name.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Where the thing is.
    pub fn location(&self) -> &Container {
        &self.location
    }

    /// Names of the things directly inside this one.
    pub fn contents(&self) -> &BTreeSet<String> {
        &self.contents
    }

    /// Attribute values held in memory.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub(crate) fn set_location(&mut self, location: Container) {
        self.location = location;
    }
}
