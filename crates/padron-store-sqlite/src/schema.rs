//! SQL schema for the Padron SQLite store.
//!
//! Executed once at connection startup. Both tables exist in every file;
//! a secondary log store simply never touches `personas`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS personas (
    id              TEXT PRIMARY KEY,
    document_type   TEXT NOT NULL,
    document_number TEXT NOT NULL,
    first_name      TEXT NOT NULL,
    middle_name     TEXT NOT NULL DEFAULT '',
    last_name       TEXT NOT NULL,
    birth_date      TEXT NOT NULL,   -- YYYY-MM-DD
    gender          TEXT NOT NULL,
    email           TEXT NOT NULL,
    phone           TEXT NOT NULL,
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC, fixed nanosecond precision
    updated_at      TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS personas_document_idx ON personas(document_number);
CREATE INDEX IF NOT EXISTS personas_created_idx ON personas(created_at);

-- Audit journal. Append-only: no UPDATE or DELETE is ever issued.
CREATE TABLE IF NOT EXISTS logs (
    id                     TEXT PRIMARY KEY,
    action                 TEXT NOT NULL,
    details                TEXT NOT NULL,
    category               TEXT NOT NULL,
    timestamp              TEXT NOT NULL,
    provenance             TEXT NOT NULL,   -- 'secundario' | 'primario'
    secondary_acknowledged INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS logs_timestamp_idx ON logs(timestamp);

PRAGMA user_version = 1;
";
