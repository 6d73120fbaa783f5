use crate::key::ItemKey;

/// Alias for `Result<T, WorldError>`.
pub type WorldResult<T> = Result<T, WorldError>;

/// Errors that can occur when manipulating a world.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    /// A place, portal, or thing with the same key already exists.
    #[error("duplicate key: {0}")]
    DuplicateKey(ItemKey),

    /// The requested item does not exist.
    #[error("not found: {0}")]
    NotFound(ItemKey),

    /// The requested dimension was never created.
    #[error("unknown dimension: \"{0}\"")]
    UnknownDimension(String),

    /// A portal would be malformed (self-loop, unknown endpoint, bad weight).
    #[error("invalid edge {key}: {reason}")]
    InvalidEdge {
        /// The offending portal.
        key: ItemKey,
        /// Why the portal was rejected.
        reason: String,
    },

    /// The move would make a thing (transitively) contain itself.
    #[error("moving {thing} into {container} would create a containment cycle")]
    ContainmentCycle {
        /// The thing being moved.
        thing: ItemKey,
        /// The requested new container.
        container: ItemKey,
    },

    /// Two consecutive route steps do not meet.
    #[error("route is disconnected at step {index}: {from} does not lead into {to}")]
    DisconnectedRoute {
        /// Index of the step whose destination does not match the next origin.
        index: usize,
        /// That step's portal.
        from: ItemKey,
        /// The following step's portal.
        to: ItemKey,
    },

    /// An attribute value was rejected by its declared constraint.
    #[error("value {value} rejected by attribute \"{attribute}\"")]
    ConstraintViolation {
        /// The attribute name.
        attribute: String,
        /// The rejected value, rendered.
        value: String,
    },

    /// A container cannot be removed while it still holds things.
    #[error("{0} still contains things")]
    Occupied(ItemKey),
}
