//! End-to-end diagnosis orchestration.
//!
//! validate -> detect -> augment -> compose -> store -> emit. Only input
//! validation and script composition can fail the request; everything
//! after the script exists is best-effort.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::error::Result;
use crate::events::{AppEvent, EventBus};
use crate::operation_span;
use crate::snapshot::DiagnosticSnapshot;

use super::augmenter::Augmenter;
use super::composer::{compose, ComposeContext};
use super::models::{DiagnosisResult, FeedbackRequest};
use super::rules::RuleRegistry;
use super::scanner::detect;
use super::store::ResultStore;

/// Length of a generated fix id (hex characters).
pub const FIX_ID_LEN: usize = 12;

/// A fresh, URL-safe fix id.
pub fn new_fix_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(FIX_ID_LEN);
    id
}

pub struct DiagnosisPipeline {
    config: AppConfig,
    registry: RuleRegistry,
    augmenter: Augmenter,
    store: Arc<ResultStore>,
    events: EventBus,
}

impl DiagnosisPipeline {
    pub fn new(
        config: AppConfig,
        registry: RuleRegistry,
        augmenter: Augmenter,
        store: Arc<ResultStore>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            registry,
            augmenter,
            store,
            events,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Diagnose a raw request body.
    pub async fn diagnose(&self, body: &Value) -> Result<DiagnosisResult> {
        let snapshot = DiagnosticSnapshot::from_request(body)?;
        self.diagnose_snapshot(&snapshot).await
    }

    /// Diagnose an already-validated snapshot.
    pub async fn diagnose_snapshot(&self, snapshot: &DiagnosticSnapshot) -> Result<DiagnosisResult> {
        let fix_id = new_fix_id();
        let span = operation_span!("diagnose", fix_id = %fix_id, issues = tracing::field::Empty);
        self.run(snapshot, fix_id).instrument(span).await
    }

    async fn run(&self, snapshot: &DiagnosticSnapshot, fix_id: String) -> Result<DiagnosisResult> {
        let created_at = Utc::now();

        let issues = detect(&self.registry, snapshot);
        tracing::Span::current().record("issues", issues.len() as u64);

        let augmentation = self.augmenter.augment(snapshot, &issues).await;

        let ctx = ComposeContext {
            generated_at: created_at,
            feedback_url: Some(self.config.feedback_url(&fix_id)),
        };
        let fix_script = compose(&issues, &augmentation, &fix_id, &ctx)?;

        let result = DiagnosisResult {
            fix_id: fix_id.clone(),
            created_at,
            issues,
            analysis: augmentation.summary,
            ai_insights: augmentation.insights,
            fix_script,
            model: augmentation.model,
            provenance: snapshot.provenance(),
            outcome: None,
        };

        self.store.put(result.clone())?;

        self.events.emit(AppEvent::DiagnosisCompleted {
            fix_id,
            rule_ids: result.rule_ids(),
            os: result.provenance.os.clone(),
        });

        tracing::info!(model = %result.model, "Diagnosis complete");
        Ok(result)
    }

    /// Record user feedback for a fix id, known or not.
    pub async fn submit_feedback(&self, fix_id: &str, feedback: &FeedbackRequest) -> Result<()> {
        let credit_fix = self.store.record_feedback(fix_id, feedback).await?;
        self.events.emit(AppEvent::FeedbackReceived {
            fix_id: fix_id.to_string(),
            success: feedback.success,
            credit_fix,
        });
        Ok(())
    }
}
