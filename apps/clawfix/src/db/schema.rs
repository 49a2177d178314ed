use rusqlite::{Connection, Result};

pub fn init_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Diagnosis results, one row per fix id
        CREATE TABLE IF NOT EXISTS diagnoses (
            fix_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            issues TEXT NOT NULL,
            rule_ids TEXT NOT NULL,
            analysis TEXT NOT NULL,
            ai_insights TEXT NOT NULL DEFAULT '',
            fix_script TEXT NOT NULL,
            model TEXT NOT NULL,
            host_hash TEXT,
            os TEXT,
            arch TEXT,
            node_version TEXT,
            openclaw_version TEXT
        );

        -- Feedback reports (append-only)
        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            fix_id TEXT NOT NULL,
            success INTEGER NOT NULL,
            issues_remaining INTEGER,
            comment TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_feedback_fix
            ON feedback(fix_id);

        -- Per-rule counters
        CREATE TABLE IF NOT EXISTS pattern_stats (
            rule_id TEXT PRIMARY KEY,
            detected_count INTEGER NOT NULL DEFAULT 0,
            fixed_count INTEGER NOT NULL DEFAULT 0,
            success_rate REAL NOT NULL DEFAULT 0,
            first_seen TEXT NOT NULL DEFAULT (datetime('now')),
            last_seen TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    Ok(())
}
