//! SQL migration definitions for the docdigest database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: files, chunks, summaries",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Ingested source files
CREATE TABLE IF NOT EXISTS files (
    id            TEXT PRIMARY KEY,
    original_name TEXT NOT NULL,
    content_type  TEXT,
    size          INTEGER NOT NULL,
    content_hash  TEXT NOT NULL,
    uploaded_at   TEXT NOT NULL
);

-- Extracted fragments, ordered by seq within a file
CREATE TABLE IF NOT EXISTS chunks (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    seq     INTEGER NOT NULL,
    text    TEXT NOT NULL,
    page    INTEGER,
    source  TEXT,
    UNIQUE(file_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_chunks_file_seq ON chunks(file_id, seq);

-- Append-only summaries; file_id is NULL for combined summaries
CREATE TABLE IF NOT EXISTS summaries (
    id           TEXT PRIMARY KEY,
    file_id      TEXT REFERENCES files(id),
    summary_text TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_summaries_file ON summaries(file_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
