//! SQL schema for the Roster SQLite store.
//!
//! Table and view names take an optional prefix so the objects can live in
//! a namespaced schema. The DDL is idempotent thanks to
//! `CREATE ... IF NOT EXISTS`.

/// Full schema DDL for the given table-name prefix (may be empty).
pub fn schema_sql(prefix: &str) -> String {
  format!(
    "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS {p}participants (
    id                 INTEGER PRIMARY KEY,
    name               TEXT NOT NULL,            -- uppercased natural key
    display_name       TEXT NOT NULL,
    participant_type   TEXT NOT NULL,
    state              TEXT,                     -- NULL means ACTIVE
    description        TEXT,
    email              TEXT,
    external_reference TEXT,
    hashed_password    TEXT,
    update_count       INTEGER NOT NULL DEFAULT 0,
    created_by         TEXT NOT NULL,
    created_timestamp  TEXT NOT NULL,            -- RFC 3339 UTC
    updated_by         TEXT,
    updated_timestamp  TEXT,
    CONSTRAINT participants_ak1 UNIQUE (participant_type, name),
    CONSTRAINT participants_ak2 UNIQUE (participant_type, display_name),
    CONSTRAINT participants_chk1 CHECK
        (participant_type IN ('SYSTEM', 'HUMAN', 'ROLE', 'ORG_UNIT')),
    CONSTRAINT participants_chk2 CHECK
        (state IS NULL OR state IN ('ACTIVE', 'TERMINATED'))
);

-- Edges are hard-deleted, never versioned. Termination of an endpoint
-- hides an edge from traversals but leaves the row in place for audit.
CREATE TABLE IF NOT EXISTS {p}participant_relations (
    id                INTEGER PRIMARY KEY,
    source_id         INTEGER NOT NULL
        REFERENCES {p}participants(id) ON DELETE CASCADE,
    target_id         INTEGER NOT NULL
        REFERENCES {p}participants(id) ON DELETE CASCADE,
    relation_type     TEXT NOT NULL,
    created_by        TEXT NOT NULL,
    created_timestamp TEXT NOT NULL,
    CONSTRAINT participant_relations_ak1
        UNIQUE (source_id, target_id, relation_type),
    CONSTRAINT participant_relations_chk1 CHECK
        (relation_type IN ('GRANT', 'MEMBER_OF', 'PROXY_OF'))
);

CREATE INDEX IF NOT EXISTS {p}participant_relations_fk2
    ON {p}participant_relations(target_id);

CREATE VIEW IF NOT EXISTS {p}participant_relations_v AS
SELECT r.id,
       p1.id                        AS source_id,
       p1.name                      AS source_name,
       p1.display_name              AS source_display_name,
       p1.participant_type          AS source_type,
       COALESCE(p1.state, 'ACTIVE') AS source_state,
       r.relation_type,
       p2.id                        AS target_id,
       p2.name                      AS target_name,
       p2.display_name              AS target_display_name,
       p2.participant_type          AS target_type,
       COALESCE(p2.state, 'ACTIVE') AS target_state,
       r.created_by,
       r.created_timestamp
  FROM {p}participant_relations r
  JOIN {p}participants p1 ON r.source_id = p1.id
  JOIN {p}participants p2 ON r.target_id = p2.id;
",
    p = prefix
  )
}

/// Convenience for opening a connection against an initialized schema.
pub fn init(conn: &rusqlite::Connection, prefix: &str) -> rusqlite::Result<()> {
  conn.execute_batch(&schema_sql(prefix))
}
