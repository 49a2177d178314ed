//! Database repository for diagnoses, feedback and pattern statistics.
//!
//! `DiagnosisRepository` holds the synchronous SQL. `SqliteBackend` wraps it
//! as a [`DurableBackend`], running every call on the blocking pool.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::Database;
use crate::error::{ClawfixError, Result};
use crate::snapshot::Provenance;

use super::models::{
    DiagnosisResult, FeedbackRequest, Issue, Outcome, PatternStats, RuleId, Severity,
    StatsSource, StatsSummary, TOP_ISSUES_LIMIT,
};
use super::rules::catalog::CATALOG;
use super::store::DurableBackend;

/// Repository for diagnostics database operations.
pub struct DiagnosisRepository;

/// Conversion failure for a column whose text does not parse.
fn conversion_failure<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

/// Parse a database row into a DiagnosisResult.
///
/// A corrupt `created_at` or `issues` column is an error, not a default.
fn parse_diagnosis(row: &Row) -> rusqlite::Result<DiagnosisResult> {
    let created_at: DateTime<Utc> = row
        .get::<_, String>(1)?
        .parse()
        .map_err(|e| conversion_failure(1, e))?;
    let issues: Vec<Issue> = serde_json::from_str(&row.get::<_, String>(2)?)
        .map_err(|e| conversion_failure(2, e))?;
    Ok(DiagnosisResult {
        fix_id: row.get(0)?,
        created_at,
        issues,
        analysis: row.get(3)?,
        ai_insights: row.get(4)?,
        fix_script: row.get(5)?,
        model: row.get(6)?,
        provenance: Provenance {
            host_hash: row.get(7)?,
            os: row.get(8)?,
            arch: row.get(9)?,
            node_version: row.get(10)?,
            openclaw_version: row.get(11)?,
        },
        outcome: row.get::<_, Option<String>>(12)?.map(|s| Outcome::parse(&s)),
    })
}

fn parse_pattern_stats(row: &Row) -> rusqlite::Result<PatternStats> {
    Ok(PatternStats {
        rule_id: row.get(0)?,
        detected: row.get::<_, i64>(1)?.max(0) as u64,
        fixed: row.get::<_, i64>(2)?.max(0) as u64,
        success_rate: row.get(3)?,
    })
}

/// Rule ids with duplicates removed, first occurrence kept.
fn unique(rule_ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    rule_ids
        .iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect()
}

fn count(conn: &rusqlite::Connection, sql: &str) -> Result<u64> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

impl DiagnosisRepository {
    // =========================================================================
    // Diagnoses
    // =========================================================================

    /// Insert a diagnosis, or refresh it if the fix id already exists.
    pub fn save(db: &Database, result: &DiagnosisResult) -> Result<()> {
        let issues_json = serde_json::to_string(&result.issues)?;
        let rule_ids_json = serde_json::to_string(&result.rule_ids())?;
        let conn = db.conn.lock()?;

        conn.execute(
            "INSERT INTO diagnoses (fix_id, created_at, issues, rule_ids, analysis, ai_insights,
                                    fix_script, model, host_hash, os, arch, node_version,
                                    openclaw_version, outcome)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(fix_id) DO UPDATE SET
                issues = excluded.issues,
                rule_ids = excluded.rule_ids,
                analysis = excluded.analysis,
                ai_insights = excluded.ai_insights,
                fix_script = excluded.fix_script,
                model = excluded.model",
            params![
                result.fix_id,
                result.created_at.to_rfc3339(),
                issues_json,
                rule_ids_json,
                result.analysis,
                result.ai_insights,
                result.fix_script,
                result.model,
                result.provenance.host_hash,
                result.provenance.os,
                result.provenance.arch,
                result.provenance.node_version,
                result.provenance.openclaw_version,
                result.outcome.map(|o| o.as_str()),
            ],
        )?;

        Ok(())
    }

    /// Get a diagnosis by fix id.
    pub fn find(db: &Database, fix_id: &str) -> Result<Option<DiagnosisResult>> {
        let conn = db.conn.lock()?;

        let result = conn
            .query_row(
                "SELECT fix_id, created_at, issues, analysis, ai_insights, fix_script, model,
                        host_hash, os, arch, node_version, openclaw_version, outcome
                 FROM diagnoses WHERE fix_id = ?1",
                params![fix_id],
                parse_diagnosis,
            )
            .optional()?;

        Ok(result)
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    /// Append a feedback report and record the outcome on the diagnosis.
    /// Returns the outcome the diagnosis carried before.
    ///
    /// Unknown fix ids are still recorded.
    pub fn add_feedback(
        db: &Database,
        fix_id: &str,
        feedback: &FeedbackRequest,
    ) -> Result<Option<Outcome>> {
        let mut conn = db.conn.lock()?;
        let tx = conn.transaction()?;

        let previous: Option<String> = tx
            .query_row(
                "SELECT outcome FROM diagnoses WHERE fix_id = ?1",
                params![fix_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        tx.execute(
            "INSERT INTO feedback (id, fix_id, success, issues_remaining, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                uuid::Uuid::new_v4().to_string(),
                fix_id,
                feedback.success,
                feedback.issues_remaining,
                feedback.truncated_comment(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        tx.execute(
            "UPDATE diagnoses SET outcome = ?2 WHERE fix_id = ?1",
            params![fix_id, feedback.outcome().as_str()],
        )?;

        tx.commit()?;
        Ok(previous.map(|s| Outcome::parse(&s)))
    }

    // =========================================================================
    // Pattern statistics
    // =========================================================================

    /// Increment the detected counter of each rule, creating rows on first sight.
    pub fn increment_detected(db: &Database, rule_ids: &[String]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut conn = db.conn.lock()?;
        let tx = conn.transaction()?;

        for rule_id in unique(rule_ids) {
            tx.execute(
                "INSERT INTO pattern_stats (rule_id, detected_count, fixed_count, success_rate,
                                            first_seen, last_seen)
                 VALUES (?1, 1, 0, 0, ?2, ?2)
                 ON CONFLICT(rule_id) DO UPDATE SET
                    detected_count = detected_count + 1,
                    success_rate = CAST(fixed_count AS REAL) / MAX(detected_count + 1, 1),
                    last_seen = excluded.last_seen",
                params![rule_id, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Increment the fixed counter of each rule and recompute its success rate.
    pub fn increment_fixed(db: &Database, rule_ids: &[String]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut conn = db.conn.lock()?;
        let tx = conn.transaction()?;

        for rule_id in unique(rule_ids) {
            tx.execute(
                "INSERT INTO pattern_stats (rule_id, detected_count, fixed_count, success_rate,
                                            first_seen, last_seen)
                 VALUES (?1, 0, 1, 1.0, ?2, ?2)
                 ON CONFLICT(rule_id) DO UPDATE SET
                    fixed_count = fixed_count + 1,
                    success_rate = CAST(fixed_count + 1 AS REAL) / MAX(detected_count, 1),
                    last_seen = excluded.last_seen",
                params![rule_id, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get one rule's counters.
    pub fn pattern_stats(db: &Database, rule_id: &str) -> Result<Option<PatternStats>> {
        let conn = db.conn.lock()?;

        let stats = conn
            .query_row(
                "SELECT rule_id, detected_count, fixed_count, success_rate
                 FROM pattern_stats WHERE rule_id = ?1",
                params![rule_id],
                parse_pattern_stats,
            )
            .optional()?;

        Ok(stats)
    }

    /// Aggregate statistics view.
    pub fn summary(db: &Database) -> Result<StatsSummary> {
        let conn = db.conn.lock()?;

        let total_diagnoses = count(&conn, "SELECT COUNT(*) FROM diagnoses")?;
        let total_feedback = count(&conn, "SELECT COUNT(*) FROM feedback")?;
        let successful_fixes = count(&conn, "SELECT COUNT(*) FROM feedback WHERE success = 1")?;

        let all_stats = conn
            .prepare(
                "SELECT rule_id, detected_count, fixed_count, success_rate
                 FROM pattern_stats
                 ORDER BY detected_count DESC, rule_id ASC",
            )?
            .query_map([], parse_pattern_stats)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let by_os = conn
            .prepare(
                "SELECT COALESCE(os, 'unknown'), COUNT(*) FROM diagnoses GROUP BY 1 ORDER BY 1",
            )?
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as u64))
            })?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

        Ok(StatsSummary {
            total_diagnoses,
            total_feedback,
            successful_fixes,
            by_severity: severity_breakdown(&all_stats),
            top_issues: all_stats.into_iter().take(TOP_ISSUES_LIMIT).collect(),
            by_os,
            source: StatsSource::Durable,
        })
    }
}

/// Detections per severity, keyed by the severity name. Rules no longer
/// in the catalog are not counted.
pub fn severity_breakdown(stats: &[PatternStats]) -> BTreeMap<String, u64> {
    let mut breakdown: BTreeMap<String, u64> = Severity::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();

    for entry in stats {
        let severity = RuleId::parse(&entry.rule_id)
            .and_then(|id| CATALOG.iter().find(|m| m.id == id))
            .map(|m| m.severity);
        if let Some(severity) = severity {
            *breakdown.entry(severity.as_str().to_string()).or_insert(0) += entry.detected;
        }
    }

    breakdown
}

/// SQLite-backed [`DurableBackend`].
pub struct SqliteBackend {
    db: Arc<Database>,
}

impl SqliteBackend {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ClawfixError::General(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl DurableBackend for SqliteBackend {
    async fn save_diagnosis(&self, result: &DiagnosisResult) -> Result<()> {
        let result = result.clone();
        self.run(move |db| DiagnosisRepository::save(db, &result)).await
    }

    async fn load_diagnosis(&self, fix_id: &str) -> Result<Option<DiagnosisResult>> {
        let fix_id = fix_id.to_string();
        self.run(move |db| DiagnosisRepository::find(db, &fix_id)).await
    }

    async fn record_feedback(
        &self,
        fix_id: &str,
        feedback: &FeedbackRequest,
    ) -> Result<Option<Outcome>> {
        let fix_id = fix_id.to_string();
        let feedback = feedback.clone();
        self.run(move |db| DiagnosisRepository::add_feedback(db, &fix_id, &feedback))
            .await
    }

    async fn increment_detected(&self, rule_ids: &[String]) -> Result<()> {
        let rule_ids = rule_ids.to_vec();
        self.run(move |db| DiagnosisRepository::increment_detected(db, &rule_ids))
            .await
    }

    async fn increment_fixed(&self, rule_ids: &[String]) -> Result<()> {
        let rule_ids = rule_ids.to_vec();
        self.run(move |db| DiagnosisRepository::increment_fixed(db, &rule_ids))
            .await
    }

    async fn stats_summary(&self) -> Result<StatsSummary> {
        self.run(DiagnosisRepository::summary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;

    fn sample(fix_id: &str, os: &str) -> DiagnosisResult {
        DiagnosisResult {
            fix_id: fix_id.to_string(),
            created_at: "2026-02-03T04:05:06Z".parse().unwrap(),
            issues: vec![Issue {
                id: "gateway-zombie".to_string(),
                severity: Severity::Critical,
                title: "Zombie".to_string(),
                description: "desc".to_string(),
                remediation: "true".to_string(),
            }],
            analysis: "Found 1 known issue.".to_string(),
            ai_insights: String::new(),
            fix_script: "#!/usr/bin/env bash\nset -euo pipefail\n".to_string(),
            model: "clawfix-rules".to_string(),
            provenance: Provenance {
                host_hash: Some("a1b2c3".to_string()),
                os: Some(os.to_string()),
                ..Default::default()
            },
            outcome: None,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_save_and_find_round_trip() {
        let db = create_test_database();
        let result = sample("abc123def456", "darwin");
        DiagnosisRepository::save(&db, &result).unwrap();

        let loaded = DiagnosisRepository::find(&db, "abc123def456").unwrap().unwrap();
        assert_eq!(loaded, result);
        assert!(DiagnosisRepository::find(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_feedback_sets_outcome() {
        let db = create_test_database();
        DiagnosisRepository::save(&db, &sample("abc123def456", "linux")).unwrap();

        let feedback = FeedbackRequest {
            success: true,
            issues_remaining: Some(0),
            comment: Some("worked".to_string()),
        };
        let previous = DiagnosisRepository::add_feedback(&db, "abc123def456", &feedback).unwrap();
        assert_eq!(previous, None);
        // Unknown ids are accepted
        assert_eq!(DiagnosisRepository::add_feedback(&db, "nope", &feedback).unwrap(), None);

        let loaded = DiagnosisRepository::find(&db, "abc123def456").unwrap().unwrap();
        assert_eq!(loaded.outcome, Some(Outcome::Success));

        let summary = DiagnosisRepository::summary(&db).unwrap();
        assert_eq!(summary.total_feedback, 2);
        assert_eq!(summary.successful_fixes, 2);

        let previous = DiagnosisRepository::add_feedback(&db, "abc123def456", &feedback).unwrap();
        assert_eq!(previous, Some(Outcome::Success));
    }

    #[test]
    fn test_corrupt_rows_are_errors() {
        let db = create_test_database();
        DiagnosisRepository::save(&db, &sample("badissues000", "linux")).unwrap();
        DiagnosisRepository::save(&db, &sample("baddate00000", "linux")).unwrap();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute(
                "UPDATE diagnoses SET issues = '[{\"id\":' WHERE fix_id = 'badissues000'",
                [],
            )
            .unwrap();
            conn.execute(
                "UPDATE diagnoses SET created_at = 'yesterday' WHERE fix_id = 'baddate00000'",
                [],
            )
            .unwrap();
        }

        let err = DiagnosisRepository::find(&db, "badissues000").unwrap_err();
        assert!(matches!(
            err,
            ClawfixError::Database(rusqlite::Error::FromSqlConversionFailure(2, _, _))
        ));
        let err = DiagnosisRepository::find(&db, "baddate00000").unwrap_err();
        assert!(matches!(
            err,
            ClawfixError::Database(rusqlite::Error::FromSqlConversionFailure(1, _, _))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_row_reads_as_not_found_through_store() {
        crate::logging::init_test();
        let db = Arc::new(create_test_database());
        DiagnosisRepository::save(&db, &sample("badissues000", "linux")).unwrap();
        db.conn
            .lock()
            .unwrap()
            .execute("UPDATE diagnoses SET issues = 'not json'", [])
            .unwrap();

        let backend: Arc<dyn DurableBackend> = Arc::new(SqliteBackend::new(db));
        let store = crate::services::diagnostics::ResultStore::new(10, Some(backend));
        assert_eq!(store.get("badissues000").await.unwrap(), None);
    }

    #[test]
    fn test_detected_counter_upsert() {
        let db = create_test_database();
        DiagnosisRepository::increment_detected(&db, &ids(&["gateway-zombie"])).unwrap();
        DiagnosisRepository::increment_detected(&db, &ids(&["gateway-zombie", "gateway-zombie"]))
            .unwrap();

        let stats = DiagnosisRepository::pattern_stats(&db, "gateway-zombie")
            .unwrap()
            .unwrap();
        assert_eq!(stats.detected, 2);
        assert_eq!(stats.fixed, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_fixed_counter_recomputes_rate() {
        let db = create_test_database();
        for _ in 0..4 {
            DiagnosisRepository::increment_detected(&db, &ids(&["error-burst"])).unwrap();
        }
        DiagnosisRepository::increment_fixed(&db, &ids(&["error-burst"])).unwrap();

        let stats = DiagnosisRepository::pattern_stats(&db, "error-burst").unwrap().unwrap();
        assert_eq!(stats.fixed, 1);
        assert_eq!(stats.success_rate, 0.25);

        // Fixed before ever detected: detected floors at 1
        DiagnosisRepository::increment_fixed(&db, &ids(&["memory-bloat"])).unwrap();
        let stats = DiagnosisRepository::pattern_stats(&db, "memory-bloat").unwrap().unwrap();
        assert_eq!(stats.success_rate, 1.0);
    }

    #[test]
    fn test_summary_breakdowns() {
        let db = create_test_database();
        DiagnosisRepository::save(&db, &sample("a", "darwin")).unwrap();
        DiagnosisRepository::save(&db, &sample("b", "darwin")).unwrap();
        DiagnosisRepository::save(&db, &sample("c", "linux")).unwrap();
        DiagnosisRepository::increment_detected(&db, &ids(&["gateway-zombie", "large-log-file"]))
            .unwrap();
        DiagnosisRepository::increment_detected(&db, &ids(&["gateway-zombie"])).unwrap();

        let summary = DiagnosisRepository::summary(&db).unwrap();
        assert_eq!(summary.source, StatsSource::Durable);
        assert_eq!(summary.total_diagnoses, 3);
        assert_eq!(summary.by_os.get("darwin"), Some(&2));
        assert_eq!(summary.top_issues[0].rule_id, "gateway-zombie");
        assert_eq!(summary.by_severity.get("critical"), Some(&2));
        assert_eq!(summary.by_severity.get("low"), Some(&1));
        assert_eq!(summary.by_severity.get("high"), Some(&0));
    }

    #[tokio::test]
    async fn test_backend_round_trip() {
        let backend = SqliteBackend::new(Arc::new(create_test_database()));
        let result = sample("abc123def456", "darwin");
        backend.save_diagnosis(&result).await.unwrap();
        assert_eq!(backend.load_diagnosis("abc123def456").await.unwrap(), Some(result));
        assert_eq!(backend.load_diagnosis("zzz").await.unwrap(), None);
    }
}
