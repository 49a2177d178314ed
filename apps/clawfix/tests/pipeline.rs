//! End-to-end checks through the public library surface.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use clawfix_lib::db::Database;
use clawfix_lib::services::diagnostics::augmenter::{AnalysisModel, AugmentError, Augmenter};
use clawfix_lib::services::diagnostics::{
    DiagnosisResult, DurableBackend, PublicDiagnosis, ResultStore, Severity, SqliteBackend,
};
use clawfix_lib::snapshot::Provenance;
use clawfix_lib::{App, AppConfig};

fn config() -> AppConfig {
    AppConfig {
        database_path: None,
        ..AppConfig::default()
    }
}

fn healthy() -> Value {
    json!({
        "version": "0.3.0",
        "hostHash": "a1b2c3d4",
        "system": { "os": "linux", "arch": "x64", "nodeVersion": "v22.12.0" },
        "openclaw": {
            "version": "2026.2.1",
            "processExists": true,
            "portListening": true,
            "gatewayStatus": "running"
        },
        "service": { "manager": "systemd", "activeState": "active" },
        "config": {
            "gateway": { "bind": "loopback", "auth": { "mode": "token", "token": "[REDACTED]" } },
            "agents": { "defaults": { "compaction": { "mode": "safeguard" } } }
        },
        "logs": { "recentErrors": [], "errorCount": 0, "handshakeFailures": 0, "logSizeBytes": 2048 },
        "workspace": { "fileCount": 3, "memoryFileCount": 1, "hasAgentsMd": true, "hasLockFile": false }
    })
}

fn result(fix_id: &str) -> DiagnosisResult {
    DiagnosisResult {
        fix_id: fix_id.to_string(),
        created_at: Utc::now(),
        issues: Vec::new(),
        analysis: "No known issues detected.".to_string(),
        ai_insights: String::new(),
        fix_script: "#!/bin/bash\nset -euo pipefail\n".to_string(),
        model: "clawfix-rules".to_string(),
        provenance: Provenance {
            host_hash: Some("deadbeef".to_string()),
            os: Some("darwin".to_string()),
            ..Provenance::default()
        },
        outcome: None,
    }
}

struct UnreachableModel;

#[async_trait]
impl AnalysisModel for UnreachableModel {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AugmentError> {
        Err(AugmentError::Status(503))
    }
}

#[tokio::test]
async fn test_cache_evicts_oldest_after_capacity() {
    let store = ResultStore::in_memory();
    for i in 0..1001 {
        store.put(result(&format!("fix{:04}", i))).unwrap();
    }

    assert_eq!(store.cached_len().unwrap(), 1000);
    assert!(store.get_cached("fix0000").unwrap().is_none());
    assert!(store.get_cached("fix0001").unwrap().is_some());
    assert!(store.get_cached("fix1000").unwrap().is_some());
}

#[tokio::test]
async fn test_public_projection_hides_provenance() {
    let store = ResultStore::in_memory();
    store.put(result("abc123def456")).unwrap();

    let stored = store.get("abc123def456").await.unwrap().unwrap();
    assert_eq!(stored.provenance.host_hash.as_deref(), Some("deadbeef"));

    let public = serde_json::to_value(PublicDiagnosis::from(&stored)).unwrap();
    let text = public.to_string();
    assert!(!text.contains("deadbeef"));
    assert!(public.get("provenance").is_none());
    assert!(public.get("hostHash").is_none());
    assert_eq!(public["fixId"], "abc123def456");
}

#[tokio::test]
async fn test_durable_reads_survive_cache_eviction() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let backend: Arc<dyn DurableBackend> = Arc::new(SqliteBackend::new(db));
    let store = ResultStore::new(1, Some(backend));

    store.put(result("first0000000")).unwrap();
    store.put(result("second000000")).unwrap();
    store.flush().await.unwrap();

    assert!(store.get_cached("first0000000").unwrap().is_none());
    let reloaded = store.get("first0000000").await.unwrap().unwrap();
    assert_eq!(reloaded.fix_id, "first0000000");
}

#[tokio::test]
async fn test_concurrent_detections_both_counted() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let backend: Arc<dyn DurableBackend> = Arc::new(SqliteBackend::new(Arc::clone(&db)));

    let ids = vec!["gateway-zombie".to_string()];
    let (a, b) = tokio::join!(
        backend.increment_detected(&ids),
        backend.increment_detected(&ids)
    );
    a.unwrap();
    b.unwrap();

    let summary = backend.stats_summary().await.unwrap();
    let zombie = summary
        .top_issues
        .iter()
        .find(|p| p.rule_id == "gateway-zombie")
        .unwrap();
    assert_eq!(zombie.detected, 2);
}

#[tokio::test]
async fn test_mem0_graph_snapshot_yields_one_critical_issue() {
    let app = App::with_parts(config(), None, Some(Augmenter::disabled()));
    let mut snapshot = healthy();
    snapshot["config"]["plugins"] =
        json!({ "entries": { "x": { "config": { "enableGraph": true } } } });

    let result = app.pipeline.diagnose(&snapshot).await.unwrap();
    let critical: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.severity == Severity::Critical)
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].id, "mem0-graph-free");
    assert!(result.fix_script.contains("# Rule: mem0-graph-free"));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_zombie_snapshot_excludes_not_running() {
    let app = App::with_parts(config(), None, Some(Augmenter::disabled()));
    let mut snapshot = healthy();
    snapshot["openclaw"]["portListening"] = json!(false);
    snapshot["openclaw"]["gatewayStatus"] = json!("stopped");

    let result = app.pipeline.diagnose(&snapshot).await.unwrap();
    let ids = result.rule_ids();
    assert!(ids.contains(&"gateway-zombie".to_string()));
    assert!(!ids.contains(&"gateway-not-running".to_string()));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failing_model_still_produces_analysis() {
    let augmenter = Augmenter::new(Some(Arc::new(UnreachableModel)), Duration::from_secs(1));
    let app = App::with_parts(config(), None, Some(augmenter));
    let mut snapshot = healthy();
    snapshot["workspace"]["hasAgentsMd"] = json!(false);

    let result = app.pipeline.diagnose(&snapshot).await.unwrap();
    assert!(!result.analysis.is_empty());
    assert!(result.ai_insights.is_empty());
    assert_eq!(result.model, "clawfix-rules");
    assert!(result.fix_script.starts_with("#!/usr/bin/env bash"));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_feedback_counts_fixed_patterns() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let backend: Arc<dyn DurableBackend> = Arc::new(SqliteBackend::new(db));
    let app = App::with_parts(config(), Some(backend), Some(Augmenter::disabled()));
    let mut snapshot = healthy();
    snapshot["workspace"]["hasLockFile"] = json!(true);
    snapshot["openclaw"]["processExists"] = json!(false);

    let result = app.pipeline.diagnose(&snapshot).await.unwrap();
    let body = json!({ "success": true }).to_string();
    // The script's own hook and a manual report both say it worked
    for _ in 0..2 {
        let response = clawfix_lib::api::feedback(&app, &result.fix_id, &body).await;
        assert_eq!(response.status, 200);
    }

    let tracker = Arc::clone(&app.tracker);
    app.shutdown().await.unwrap();

    let summary = tracker.summary().await.unwrap();
    let lock = summary
        .top_issues
        .iter()
        .find(|p| p.rule_id == "stale-lock-file")
        .unwrap();
    assert_eq!(lock.detected, 1);
    assert_eq!(lock.fixed, 1);
    assert!(lock.success_rate <= 1.0);
    assert_eq!(summary.total_diagnoses, 1);
    assert_eq!(summary.total_feedback, 2);
}
