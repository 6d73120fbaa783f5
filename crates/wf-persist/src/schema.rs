use rusqlite::{Connection, params};

/// Version recorded in `schema_migrations` by [`migrate`].
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dimension (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS types (
    name TEXT PRIMARY KEY
);

INSERT OR IGNORE INTO types (name) VALUES ('int'), ('bool'), ('str'), ('float');

CREATE TABLE IF NOT EXISTS item (
    dimension TEXT NOT NULL REFERENCES dimension(name) ON DELETE CASCADE,
    name TEXT NOT NULL,
    PRIMARY KEY (dimension, name)
);

CREATE TABLE IF NOT EXISTS place (
    dimension TEXT NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (dimension, name),
    FOREIGN KEY (dimension, name) REFERENCES item(dimension, name) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS thing (
    dimension TEXT NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (dimension, name),
    FOREIGN KEY (dimension, name) REFERENCES item(dimension, name) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS portal (
    dimension TEXT NOT NULL,
    from_place TEXT NOT NULL,
    to_place TEXT NOT NULL,
    name TEXT NOT NULL,
    weight REAL NOT NULL CHECK (weight >= 0),
    passable INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (dimension, from_place, to_place),
    UNIQUE (dimension, name),
    CHECK (from_place <> to_place),
    FOREIGN KEY (dimension, from_place) REFERENCES place(dimension, name) ON DELETE CASCADE,
    FOREIGN KEY (dimension, to_place) REFERENCES place(dimension, name) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS containment (
    dimension TEXT NOT NULL,
    contained TEXT NOT NULL,
    container TEXT NOT NULL,
    PRIMARY KEY (dimension, contained, container),
    UNIQUE (dimension, contained),
    CHECK (contained <> container),
    FOREIGN KEY (dimension, contained) REFERENCES item(dimension, name) ON DELETE CASCADE,
    FOREIGN KEY (dimension, container) REFERENCES item(dimension, name) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS spot (
    dimension TEXT NOT NULL,
    place TEXT NOT NULL,
    x REAL NOT NULL,
    y REAL NOT NULL,
    r REAL NOT NULL,
    spotgraph TEXT NOT NULL,
    PRIMARY KEY (dimension, place),
    FOREIGN KEY (dimension, place) REFERENCES place(dimension, name) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS attribute (
    name TEXT PRIMARY KEY,
    type TEXT REFERENCES types(name),
    lower REAL,
    upper REAL
);

CREATE TABLE IF NOT EXISTS permitted (
    attribute TEXT NOT NULL REFERENCES attribute(name) ON DELETE CASCADE,
    value TEXT NOT NULL,
    PRIMARY KEY (attribute, value)
);

CREATE TABLE IF NOT EXISTS attribution (
    attribute TEXT NOT NULL REFERENCES attribute(name) ON DELETE CASCADE,
    dimension TEXT NOT NULL,
    attributed_to TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (attribute, dimension, attributed_to),
    FOREIGN KEY (dimension, attributed_to) REFERENCES item(dimension, name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_containment_container ON containment(dimension, container);
CREATE INDEX IF NOT EXISTS idx_attribution_owner ON attribution(dimension, attributed_to);
";

/// Create every table the cache uses. Safe to run on an existing database.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (?1, ?2)",
        params![SCHEMA_VERSION, "initial"],
    )?;
    Ok(())
}
