//! Core types for Wayfarer: places, portals, things, and the world graph.
//!
//! A [`World`] holds one or more dimensions. Each dimension is a directed,
//! weighted graph of [`Place`]s joined by [`Portal`]s, populated by
//! [`Thing`]s that sit in a place or inside another thing. The world performs
//! no I/O: every mutation is recorded as a pending [`Change`] so a storage
//! layer can persist it later.

/// Attribute values, types, and constraint checks.
pub mod attribute;
/// Pending-change bookkeeping consumed by storage layers.
pub mod change;
/// Error types used throughout the crate.
pub mod error;
/// Item keys and containment locations.
pub mod key;
/// Places (graph vertices) and their display spots.
pub mod place;
/// Portals (directed, weighted graph edges).
pub mod portal;
/// Things (mobile, containable entities).
pub mod thing;
/// The world graph that owns every dimension.
pub mod world;

/// Re-export attribute types.
pub use attribute::{AttrType, AttrValue, AttributeMap, Check, Constraint};
/// Re-export change tracking types.
pub use change::{Change, Tombstone};
/// Re-export error types.
pub use error::{WorldError, WorldResult};
/// Re-export key types.
pub use key::{Container, ItemKey, PlaceRef, PortalRef, ThingRef};
/// Re-export place types.
pub use place::{Place, Spot};
/// Re-export portal types.
pub use portal::{AdmitRule, Portal};
/// Re-export thing types.
pub use thing::Thing;
/// Re-export world model types.
pub use world::{Dimension, World, WorldMeta};
