//! SQL schema for the inbox SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Rows are never updated; the only mutation is a target-scoped DELETE.
CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    sender     VARCHAR(100) NOT NULL,
    target     VARCHAR(100) NOT NULL,
    text       TEXT NOT NULL,
    sent_time  TEXT NOT NULL    -- RFC 3339 UTC, fixed microsecond width
);

-- One watermark per recipient.
CREATE TABLE IF NOT EXISTS read_cursors (
    id                          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id                     VARCHAR(100) NOT NULL UNIQUE,
    last_message_read_timestamp TEXT
);

CREATE INDEX IF NOT EXISTS messages_target_time_idx ON messages(target, sent_time);

PRAGMA user_version = 1;
";
