use rusqlite::{Connection, Result};

/// Current schema version - increment this when adding new migrations
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table if it doesn't exist
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    let current_version = get_current_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        set_version(conn, 1)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        set_version(conn, 2)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<i32> {
    let result: Result<i32> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    );
    Ok(result.unwrap_or(0))
}

/// Set the schema version after a successful migration
fn set_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let columns = conn
        .prepare(&format!("PRAGMA table_info({})", table))?
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>>>()?;
    Ok(columns)
}

/// Migration v1: Record feedback outcome directly on the diagnosis row
fn migrate_v1(conn: &Connection) -> Result<()> {
    let columns = table_columns(conn, "diagnoses")?;

    if !columns.contains(&"outcome".to_string()) {
        conn.execute_batch("ALTER TABLE diagnoses ADD COLUMN outcome TEXT;")?;
    }

    Ok(())
}

/// Migration v2: Indexes for the statistics view
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_diagnoses_created
            ON diagnoses(created_at);

        CREATE INDEX IF NOT EXISTS idx_pattern_stats_detected
            ON pattern_stats(detected_count DESC);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        schema::init_database(&conn).unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_current_version(&conn).unwrap(), CURRENT_VERSION);
        let columns = table_columns(&conn, "diagnoses").unwrap();
        assert!(columns.contains(&"outcome".to_string()));
    }
}
