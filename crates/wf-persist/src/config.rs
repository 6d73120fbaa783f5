/// Options applied when a cache opens its database.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// SQLite journal mode for file databases. Ignored in memory.
    pub journal_mode: String,
    /// Name given to the world when the database holds none yet.
    pub default_world_name: String,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".to_string(),
            default_world_name: "Untitled".to_string(),
        }
    }
}

impl CacheOptions {
    /// Set the journal mode.
    pub fn with_journal_mode(mut self, mode: impl Into<String>) -> Self {
        self.journal_mode = mode.into();
        self
    }

    /// Set the name used for a fresh world.
    pub fn with_default_world_name(mut self, name: impl Into<String>) -> Self {
        self.default_world_name = name.into();
        self
    }
}
