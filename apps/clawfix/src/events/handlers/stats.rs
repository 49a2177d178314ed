//! Statistics event handler.
//!
//! Feeds completed diagnoses and feedback reports into the pattern
//! statistics tracker.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::events::{AppEvent, EventReceiver};
use crate::services::diagnostics::stats::PatternStatsTracker;

/// Start the statistics handler. The task ends when the bus closes.
pub fn start_handler(
    tracker: Arc<PatternStatsTracker>,
    mut receiver: EventReceiver,
) -> JoinHandle<()> {
    tracing::debug!("Starting statistics event handler");

    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            if let Err(e) = handle_event(&tracker, event).await {
                tracing::error!("Statistics handler error: {}", e);
            }
        }
        tracing::debug!("Event bus closed, stopping statistics handler");
    })
}

async fn handle_event(tracker: &PatternStatsTracker, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::DiagnosisCompleted {
            fix_id,
            rule_ids,
            os,
        } => {
            tracing::debug!("Recording {} detections for {}", rule_ids.len(), fix_id);
            tracker.record_diagnosis(&rule_ids, os.as_deref()).await
        }
        AppEvent::FeedbackReceived {
            fix_id,
            success,
            credit_fix,
        } => {
            tracing::debug!("Recording feedback for {} (success={})", fix_id, success);
            tracker.record_feedback(&fix_id, success, credit_fix).await
        }
    }
}
