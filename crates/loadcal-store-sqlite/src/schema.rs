//! SQL schema for the load calendar store.
//!
//! Dates are `YYYY-MM-DD` text so range predicates compare lexically.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS entities (
    id               TEXT PRIMARY KEY,
    kind             TEXT NOT NULL CHECK (kind IN ('person', 'group')),
    title            TEXT NOT NULL,
    default_capacity REAL NOT NULL DEFAULT 5.0 CHECK (default_capacity >= 0),
    employee_id      TEXT UNIQUE,
    created_at       TEXT NOT NULL     -- RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id  TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    person_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    PRIMARY KEY (group_id, person_id)
);

CREATE TABLE IF NOT EXISTS capacity_overrides (
    entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    date      TEXT NOT NULL,
    capacity  REAL NOT NULL CHECK (capacity >= 0),
    PRIMARY KEY (entity_id, date)
);

CREATE TABLE IF NOT EXISTS loads (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT UNIQUE,          -- NULLs never conflict
    title       TEXT NOT NULL,
    source      TEXT,
    url         TEXT,
    date        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS load_assignments (
    load_id   INTEGER NOT NULL REFERENCES loads(id) ON DELETE CASCADE,
    person_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    weight    REAL NOT NULL DEFAULT 1.0 CHECK (weight >= 0),
    PRIMARY KEY (load_id, person_id)
);

CREATE INDEX IF NOT EXISTS loads_date_idx          ON loads(date);
CREATE INDEX IF NOT EXISTS assignments_person_idx  ON load_assignments(person_id);
CREATE INDEX IF NOT EXISTS group_members_person_idx ON group_members(person_id);

PRAGMA user_version = 1;
";
