//! Transport-agnostic request handlers.
//!
//! Each handler turns a request into an [`ApiResponse`] and never fails;
//! errors become 4xx/5xx bodies. Every diagnosis leaving this module goes
//! through [`PublicDiagnosis`], so internal provenance is never serialized.

use serde::Serialize;
use serde_json::{json, Value};

use crate::app::App;
use crate::services::diagnostics::{FeedbackRequest, PublicDiagnosis};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_SCRIPT: &str = "text/x-shellscript";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub content_disposition: Option<String>,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self {
                status,
                content_type: CONTENT_TYPE_JSON,
                content_disposition: None,
                body,
            },
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                Self {
                    status: 500,
                    content_type: CONTENT_TYPE_JSON,
                    content_disposition: None,
                    body: r#"{"error":"Internal error"}"#.to_string(),
                }
            }
        }
    }

    fn script(fix_id: &str, script: String) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_SCRIPT,
            content_disposition: Some(format!("attachment; filename=\"clawfix-{}.sh\"", fix_id)),
            body: script,
        }
    }

    /// Body parsed as JSON, for tests and CLI printing.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// `POST /api/diagnose`
pub async fn diagnose(app: &App, body: &str) -> ApiResponse {
    let hint = app.config().collector_hint();

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return ApiResponse::json(
                400,
                &json!({ "error": format!("Invalid JSON: {}", e), "hint": hint }),
            )
        }
    };

    match app.pipeline.diagnose(&value).await {
        Ok(result) => ApiResponse::json(200, &PublicDiagnosis::from(&result)),
        Err(e) if e.is_client_error() => {
            ApiResponse::json(400, &json!({ "error": e.to_string(), "hint": hint }))
        }
        Err(e) => {
            tracing::error!("Diagnosis failed: {}", e);
            ApiResponse::json(
                500,
                &json!({
                    "error": "Diagnosis failed",
                    "message": e.to_string(),
                    "issues": app.config().issue_tracker_url,
                }),
            )
        }
    }
}

/// Whether the caller asked for the raw script instead of JSON.
pub fn wants_script(accept: Option<&str>, format: Option<&str>) -> bool {
    if format.is_some_and(|f| f.eq_ignore_ascii_case("script")) {
        return true;
    }
    accept.is_some_and(|a| {
        let a = a.to_ascii_lowercase();
        a.contains("text/plain") || a.contains(CONTENT_TYPE_SCRIPT)
    })
}

/// `GET /api/fix/{id}`
pub async fn get_fix(app: &App, fix_id: &str, accept: Option<&str>, format: Option<&str>) -> ApiResponse {
    match app.store().get(fix_id).await {
        Ok(Some(result)) if wants_script(accept, format) => {
            ApiResponse::script(&result.fix_id, result.fix_script)
        }
        Ok(Some(result)) => ApiResponse::json(200, &PublicDiagnosis::from(&result)),
        Ok(None) => ApiResponse::json(404, &json!({ "error": "Fix not found", "fixId": fix_id })),
        Err(e) => {
            tracing::error!("Lookup of {} failed: {}", fix_id, e);
            ApiResponse::json(500, &json!({ "error": "Lookup failed", "message": e.to_string() }))
        }
    }
}

/// `POST /api/feedback/{id}`
///
/// Acknowledged whether or not the fix id exists.
pub async fn feedback(app: &App, fix_id: &str, body: &str) -> ApiResponse {
    let request: FeedbackRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            return ApiResponse::json(
                400,
                &json!({ "error": "Invalid feedback", "message": e.to_string() }),
            )
        }
    };

    if let Err(e) = app.pipeline.submit_feedback(fix_id, &request).await {
        tracing::warn!("Failed to record feedback for {}: {}", fix_id, e);
    }
    ApiResponse::json(200, &json!({ "ok": true }))
}

/// `GET /api/stats`
pub async fn stats(app: &App) -> ApiResponse {
    match app.tracker.summary().await {
        Ok(summary) => ApiResponse::json(200, &summary),
        Err(e) => {
            tracing::error!("Stats failed: {}", e);
            ApiResponse::json(500, &json!({ "error": "Stats unavailable", "message": e.to_string() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services::diagnostics::augmenter::Augmenter;

    fn app() -> App {
        let config = AppConfig {
            database_path: None,
            ..AppConfig::default()
        };
        App::with_parts(config, None, Some(Augmenter::disabled()))
    }

    const ZOMBIE: &str = r#"{
        "hostHash": "feedface",
        "system": { "os": "darwin", "arch": "arm64" },
        "openclaw": { "processExists": true, "portListening": false }
    }"#;

    #[test]
    fn test_wants_script() {
        assert!(wants_script(Some("text/plain"), None));
        assert!(wants_script(Some("text/x-shellscript, */*"), None));
        assert!(wants_script(None, Some("script")));
        assert!(!wants_script(Some("application/json"), None));
        assert!(!wants_script(None, None));
    }

    #[tokio::test]
    async fn test_diagnose_returns_public_projection() {
        let app = app();
        let response = diagnose(&app, ZOMBIE).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, CONTENT_TYPE_JSON);

        let body = response.json_body().unwrap();
        assert!(body["fixId"].is_string());
        assert!(body["knownIssues"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i["id"] == "gateway-zombie"));
        assert!(!response.body.contains("feedface"));
        assert!(!response.body.contains("arm64"));
    }

    #[tokio::test]
    async fn test_diagnose_rejects_missing_system() {
        let app = app();
        let response = diagnose(&app, r#"{"openclaw":{}}"#).await;
        assert_eq!(response.status, 400);
        let body = response.json_body().unwrap();
        assert!(body["hint"].as_str().unwrap().contains("curl"));

        let response = diagnose(&app, "not json").await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn test_get_fix_json_and_script() {
        let app = app();
        let created = diagnose(&app, ZOMBIE).await.json_body().unwrap();
        let fix_id = created["fixId"].as_str().unwrap().to_string();

        let json_response = get_fix(&app, &fix_id, Some("application/json"), None).await;
        assert_eq!(json_response.status, 200);
        assert!(!json_response.body.contains("feedface"));
        assert_eq!(json_response.json_body().unwrap(), created);

        let script = get_fix(&app, &fix_id, None, Some("script")).await;
        assert_eq!(script.status, 200);
        assert_eq!(script.content_type, CONTENT_TYPE_SCRIPT);
        assert_eq!(
            script.content_disposition.as_deref(),
            Some(format!("attachment; filename=\"clawfix-{}.sh\"", fix_id).as_str())
        );
        assert!(script.body.starts_with("#!/usr/bin/env bash"));
        assert!(!script.body.contains("feedface"));

        let missing = get_fix(&app, "000000000000", None, None).await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn test_feedback_always_acknowledged() {
        let app = app();
        let ok = feedback(&app, "unknown-id", r#"{"success":true,"comment":"thanks"}"#).await;
        assert_eq!(ok.status, 200);
        assert_eq!(ok.json_body().unwrap(), json!({ "ok": true }));

        let bad = feedback(&app, "unknown-id", r#"{"comment":"no success flag"}"#).await;
        assert_eq!(bad.status, 400);
    }

    #[tokio::test]
    async fn test_stats_without_backend() {
        let app = app();
        diagnose(&app, ZOMBIE).await;
        let response = stats(&app).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.json_body().unwrap()["source"], "memory");
    }
}
