//! Database schema for the workflow engine.
//!
//! All timestamps are stored as RFC 3339 TEXT. Status columns hold the
//! lowercase canonical enum strings.

use sqlx::sqlite::SqlitePool;

const SCHEMA_SQL: &str = r#"
-- Lost-item reports. Contact fields and user_id are optional: reports may
-- be anonymous.
CREATE TABLE IF NOT EXISTS lost_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT,
    color TEXT,
    serial_number TEXT,
    first_name TEXT,
    last_name TEXT,
    loster_phone TEXT,
    loster_email TEXT,
    user_id INTEGER,
    status TEXT NOT NULL DEFAULT 'lost'
        CHECK (status IN ('lost', 'claimed')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lost_items_serial
    ON lost_items(serial_number, status);

-- Found-item reports, the finder-side mirror of lost_items.
CREATE TABLE IF NOT EXISTS found_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT,
    color TEXT,
    serial_number TEXT,
    first_name TEXT,
    last_name TEXT,
    founder_phone TEXT,
    founder_email TEXT,
    user_id INTEGER,
    status TEXT NOT NULL DEFAULT 'found'
        CHECK (status IN ('found', 'claimed')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_found_items_serial
    ON found_items(serial_number, status);

-- Matches: one row per (lost, found) pair, ever. The UNIQUE constraint is
-- what keeps concurrent scans from creating duplicates; inserts treat a
-- conflict as "match already exists", not as an error. The loster_*,
-- founder_*, device_name and serial_number columns are a snapshot taken at
-- match time and are never written again.
CREATE TABLE IF NOT EXISTS matches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lost_item_id INTEGER NOT NULL REFERENCES lost_items(id),
    found_item_id INTEGER NOT NULL REFERENCES found_items(id),
    match_status TEXT NOT NULL DEFAULT 'unclaimed'
        CHECK (match_status IN ('unclaimed', 'claimed')),
    match_date TEXT NOT NULL,
    claimed_at TEXT,
    loster_name TEXT,
    loster_phone TEXT,
    loster_email TEXT,
    founder_name TEXT,
    founder_phone TEXT,
    founder_email TEXT,
    device_name TEXT NOT NULL,
    serial_number TEXT NOT NULL,
    UNIQUE(lost_item_id, found_item_id)
);

-- Returns: append-only audit of finalized handovers, written only by the
-- claim transaction, exactly once per claimed match.
CREATE TABLE IF NOT EXISTS returns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lost_item_id INTEGER NOT NULL REFERENCES lost_items(id),
    found_item_id INTEGER NOT NULL REFERENCES found_items(id),
    owner_user_id INTEGER,
    finder_user_id INTEGER,
    owner_name TEXT,
    owner_email TEXT,
    finder_name TEXT,
    finder_email TEXT,
    confirmation INTEGER NOT NULL DEFAULT 1,
    claimed_by INTEGER NOT NULL,
    notes TEXT,
    claimed_at TEXT NOT NULL
);
"#;

/// Create all tables and indexes if they do not exist yet. Idempotent.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
