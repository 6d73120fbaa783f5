pub mod attribute;
pub mod init;
pub mod place;
pub mod show;
pub mod thing;
pub mod travel;
pub mod tree;

use std::path::Path;

use wf_core::Container;
use wf_persist::{PersistError, WorldCache};

/// Open the world database, reporting failures as plain text.
fn open(db: &Path) -> Result<WorldCache, String> {
    WorldCache::open(db).map_err(|e| format!("cannot open {}: {e}", db.display()))
}

/// Write every pending change and commit.
fn save(cache: &mut WorldCache) -> Result<(), String> {
    cache
        .save_all(true)
        .map_err(|e| format!("cannot save world: {e}"))
}

/// Resolve a container name: a place if one has that name, else a thing.
fn container(cache: &mut WorldCache, dimension: &str, name: &str) -> Result<Container, String> {
    match cache.get_place(dimension, name) {
        Ok(_) => return Ok(Container::Place(name.to_string())),
        Err(PersistError::NotFound(_)) => {}
        Err(e) => return Err(e.to_string()),
    }
    match cache.get_thing(dimension, name) {
        Ok(_) => Ok(Container::Thing(name.to_string())),
        Err(PersistError::NotFound(_)) => Err(format!(
            "no place or thing named \"{name}\" in dimension {dimension}"
        )),
        Err(e) => Err(e.to_string()),
    }
}
