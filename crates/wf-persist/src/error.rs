use wf_core::{ItemKey, WorldError};

/// Alias for `Result<T, PersistError>`.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors raised by the world cache.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The in-memory world rejected the operation.
    #[error(transparent)]
    World(#[from] WorldError),

    /// The database failed; the save in flight was rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// An attribute value could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// No such item in memory or in storage.
    #[error("not found: {0}")]
    NotFound(ItemKey),

    /// Stored rows that do not describe a valid world.
    #[error("corrupt storage: {0}")]
    Corrupt(String),
}
