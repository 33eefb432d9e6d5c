pub mod migrations;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Type alias for the shared database connection.
/// rusqlite is synchronous — we wrap in Arc<Mutex> for thread safety
/// with tokio::task::spawn_blocking for DB operations.
pub type DbPool = Arc<Mutex<Connection>>;

/// One row of the users table.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub phone: String,
    pub password_hash: String,
}

/// Initialize the SQLite database: create data directory if needed,
/// open (or create) the database file, enable WAL mode, and run migrations.
pub fn init_db(data_dir: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    // Ensure data directory exists
    std::fs::create_dir_all(data_dir)?;

    let db_path = Path::new(data_dir).join("hotline.db");
    let mut conn = Connection::open(&db_path)?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let migrations = migrations::migrations();
    migrations.to_latest(&mut conn)?;

    tracing::info!("Database initialized at {}", db_path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

/// Fetch a user by phone number. Returns None if no such account exists.
pub fn user_by_phone(conn: &Connection, phone: &str) -> rusqlite::Result<Option<UserRow>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT id, phone, password_hash FROM users WHERE phone = ?1",
        rusqlite::params![phone],
        |row| {
            Ok(UserRow {
                id: row.get(0)?,
                phone: row.get(1)?,
                password_hash: row.get(2)?,
            })
        },
    )
    .optional()
}
