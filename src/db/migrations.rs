use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: Account store for the login boundary.
-- Messages are never persisted; the relay is in-memory only.

CREATE TABLE users (
    id TEXT PRIMARY KEY,
    phone TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);
",
    )])
}
