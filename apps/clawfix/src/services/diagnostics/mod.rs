//! Diagnosis pipeline for OpenClaw installations.
//!
//! # Architecture
//!
//! - **Models**: core types (Severity, RuleId, Issue, DiagnosisResult)
//! - **Rules**: static catalog joined to pure predicates, grouped by area
//! - **Scanner**: runs every rule against one snapshot
//! - **Augmenter**: best-effort model analysis with a deterministic fallback
//! - **Composer**: turns issues into one idempotent bash script
//! - **Cache / Store**: bounded FIFO cache in front of a durable backend
//! - **Repository**: SQLite durable backend
//! - **Stats**: per-rule detection and fix counters
//! - **Pipeline**: ties the above together for one request
//!
//! # Rule ids
//!
//! Rule ids are kebab-case (`gateway-zombie`) and are the join key for
//! statistics. An id is never reused for a different meaning.

pub mod augmenter;
pub mod cache;
pub mod composer;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod rules;
pub mod scanner;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use models::{
    DiagnosisResult, FeedbackRequest, Issue, Outcome, PatternStats, PublicDiagnosis, RuleGroup,
    RuleId, RuleMetadata, Severity, StatsSource, StatsSummary,
};
pub use pipeline::DiagnosisPipeline;
pub use repository::{DiagnosisRepository, SqliteBackend};
pub use rules::{DiagnosticRule, RuleRegistry};
pub use scanner::detect;
pub use stats::PatternStatsTracker;
pub use store::{DurableBackend, ResultStore};
