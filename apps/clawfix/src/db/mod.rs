pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::error::Result;

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::initialize(conn)
    }

    /// Open a private in-memory database, gone when the handle drops.
    ///
    /// Without a configured path the app runs cache-only instead.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        // Concurrent CLI invocations share the file
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        // Initialize schema (creates tables if they don't exist)
        schema::init_database(&conn)?;

        // Run migrations for schema updates
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Create an in-memory database for testing
///
/// This creates a fully initialized database with schema and migrations
/// applied, useful for unit tests.
#[cfg(test)]
pub fn create_test_database() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}
