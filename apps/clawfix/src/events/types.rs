//! Application event types for the event bus.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum AppEvent {
    /// A diagnosis was stored
    DiagnosisCompleted {
        fix_id: String,
        rule_ids: Vec<String>,
        /// Reported OS family, for the statistics breakdown
        os: Option<String>,
    },

    /// A user reported the outcome of running a fix script
    FeedbackReceived {
        fix_id: String,
        success: bool,
        /// First success report for this fix id
        credit_fix: bool,
    },
}

impl AppEvent {
    /// Short description for logging.
    pub fn description(&self) -> String {
        match self {
            AppEvent::DiagnosisCompleted { fix_id, rule_ids, .. } => {
                format!("DiagnosisCompleted({}, {} issues)", fix_id, rule_ids.len())
            }
            AppEvent::FeedbackReceived { fix_id, success, .. } => {
                format!("FeedbackReceived({}, success={})", fix_id, success)
            }
        }
    }
}
