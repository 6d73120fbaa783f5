//! Identity-mapped SQLite persistence for Wayfarer worlds.
//!
//! [`WorldCache`] owns a [`wf_core::World`] and a database connection. Items
//! are read from storage lazily, at most once per key, and pending changes
//! recorded by the world are written back by explicit saves.

/// The cache itself.
pub mod cache;
/// Options applied when opening a database.
pub mod config;
/// Error types for storage operations.
pub mod error;
mod rows;
/// Table definitions and migration.
pub mod schema;

/// Re-export the cache.
pub use cache::WorldCache;
/// Re-export cache options.
pub use config::CacheOptions;
/// Re-export error types.
pub use error::{PersistError, PersistResult};
