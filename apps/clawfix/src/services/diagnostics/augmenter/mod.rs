//! Analysis augmenter.
//!
//! Asks an external model for findings the rule engine did not already
//! report. Entirely best-effort: with no model configured, or on any
//! failure, [`Augmenter::augment`] returns a deterministic fallback built
//! from the local issue count. It never returns an error.

mod client;
mod parse;
mod prompt;

pub use client::{AnthropicClient, ANTHROPIC_API_BASE, ANTHROPIC_VERSION};
pub use parse::{parse_analysis, ParsedAnalysis};
pub use prompt::{build_prompt, SYSTEM_PROMPT};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AppConfig;
use crate::snapshot::DiagnosticSnapshot;

use super::models::Issue;

/// Engine name recorded when no model contributed to the analysis.
pub const FALLBACK_MODEL: &str = "clawfix-rules";

/// Failures talking to the external model. Never leaves this module tree.
#[derive(Error, Debug)]
pub enum AugmentError {
    #[error("no model credential configured")]
    NotConfigured,

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned HTTP {0}")]
    Status(u16),

    #[error("malformed model response: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A text-completion backend.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    /// Model identifier recorded on the diagnosis.
    fn name(&self) -> &str;

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AugmentError>;
}

/// What the augmenter adds to a diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmentation {
    pub summary: String,
    /// Empty when the model did not contribute
    pub insights: String,
    /// Extra shell text for the composer
    pub extra_fix: Option<String>,
    pub model: String,
}

impl Augmentation {
    /// Deterministic result derived only from the local issue count.
    pub fn fallback(issue_count: usize) -> Self {
        Self {
            summary: fallback_summary(issue_count),
            insights: String::new(),
            extra_fix: None,
            model: FALLBACK_MODEL.to_string(),
        }
    }
}

pub fn fallback_summary(issue_count: usize) -> String {
    match issue_count {
        0 => "No known issues detected. Your OpenClaw installation looks healthy.".to_string(),
        1 => "Found 1 known issue. Review the fix script below before running it.".to_string(),
        n => format!(
            "Found {} known issues. Review the fix script below before running it.",
            n
        ),
    }
}

pub struct Augmenter {
    model: Option<Arc<dyn AnalysisModel>>,
    timeout: Duration,
}

impl Augmenter {
    pub fn new(model: Option<Arc<dyn AnalysisModel>>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Augmenter that always falls back.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(0))
    }

    /// Anthropic-backed augmenter when an API key is configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let model = config.anthropic_api_key.as_ref().map(|key| {
            Arc::new(AnthropicClient::new(key.clone(), config.model.clone())) as Arc<dyn AnalysisModel>
        });
        Self::new(model, config.augment_timeout)
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// Best-effort augmentation. Failures are logged and replaced by
    /// [`Augmentation::fallback`].
    pub async fn augment(&self, snapshot: &DiagnosticSnapshot, detected: &[Issue]) -> Augmentation {
        match self.try_augment(snapshot, detected).await {
            Ok(augmentation) => augmentation,
            Err(AugmentError::NotConfigured) => {
                tracing::debug!("Augmenter not configured, using fallback analysis");
                Augmentation::fallback(detected.len())
            }
            Err(e) => {
                tracing::warn!("Augmenter failed, using fallback analysis: {}", e);
                Augmentation::fallback(detected.len())
            }
        }
    }

    async fn try_augment(
        &self,
        snapshot: &DiagnosticSnapshot,
        detected: &[Issue],
    ) -> Result<Augmentation, AugmentError> {
        let model = self.model.as_ref().ok_or(AugmentError::NotConfigured)?;

        let detected_ids: Vec<&str> = detected.iter().map(|i| i.id.as_str()).collect();
        let prompt = build_prompt(snapshot, &detected_ids);

        let raw = tokio::time::timeout(self.timeout, model.complete(SYSTEM_PROMPT, &prompt))
            .await
            .map_err(|_| AugmentError::Timeout(self.timeout))??;

        let parsed = parse_analysis(&raw);
        Ok(Augmentation {
            summary: parsed
                .summary
                .unwrap_or_else(|| fallback_summary(detected.len())),
            insights: parsed.insights,
            extra_fix: parsed.extra_fix,
            model: model.name().to_string(),
        })
    }
}
