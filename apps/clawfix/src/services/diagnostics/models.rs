//! Diagnostic models and types.
//!
//! This module defines the core types used throughout the diagnostics
//! pipeline: severities, rule identifiers and metadata, detected issues,
//! stored diagnosis results and their client-facing projection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::Provenance;

/// Severity level for diagnostic issues.
///
/// Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic or hygiene problems
    Low,
    /// Degraded behaviour that should be addressed soon
    Medium,
    /// Functionality is broken or exposed
    High,
    /// The installation is down or actively misbehaving
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rule groups for organizing diagnostic rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleGroup {
    /// Gateway process and port
    Gateway,
    /// Service manager registration and exit state
    Service,
    /// Configuration tree
    Config,
    /// Log excerpts and counters
    Logs,
    /// Agent workspace files
    Workspace,
    /// Host runtime
    System,
}

impl RuleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleGroup::Gateway => "gateway",
            RuleGroup::Service => "service",
            RuleGroup::Config => "config",
            RuleGroup::Logs => "logs",
            RuleGroup::Workspace => "workspace",
            RuleGroup::System => "system",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RuleGroup::Gateway => "Gateway",
            RuleGroup::Service => "Service Manager",
            RuleGroup::Config => "Configuration",
            RuleGroup::Logs => "Logs",
            RuleGroup::Workspace => "Workspace",
            RuleGroup::System => "System",
        }
    }
}

/// Stable identifier of a known-issue rule.
///
/// The string form is a join key for pattern statistics and must never be
/// reused for a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    Mem0GraphFree,
    GatewayZombie,
    GatewayNotRunning,
    PortConflict,
    ServiceCrashed,
    SigtermRestartLoop,
    GatewayAuthMissing,
    GatewayBindExposed,
    NodeVersionOutdated,
    ApiRateLimited,
    HandshakeSpam,
    ErrorBurst,
    DuplicatePlugin,
    StateDirMigration,
    ServiceNotRegistered,
    CompactionUnset,
    ExtendedDowntime,
    LargeLogFile,
    StaleLockFile,
    MemoryBloat,
    WorkspaceMissingAgentsMd,
}

impl RuleId {
    pub const ALL: [RuleId; 21] = [
        RuleId::Mem0GraphFree,
        RuleId::GatewayZombie,
        RuleId::GatewayNotRunning,
        RuleId::PortConflict,
        RuleId::ServiceCrashed,
        RuleId::SigtermRestartLoop,
        RuleId::GatewayAuthMissing,
        RuleId::GatewayBindExposed,
        RuleId::NodeVersionOutdated,
        RuleId::ApiRateLimited,
        RuleId::HandshakeSpam,
        RuleId::ErrorBurst,
        RuleId::DuplicatePlugin,
        RuleId::StateDirMigration,
        RuleId::ServiceNotRegistered,
        RuleId::CompactionUnset,
        RuleId::ExtendedDowntime,
        RuleId::LargeLogFile,
        RuleId::StaleLockFile,
        RuleId::MemoryBloat,
        RuleId::WorkspaceMissingAgentsMd,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::Mem0GraphFree => "mem0-graph-free",
            RuleId::GatewayZombie => "gateway-zombie",
            RuleId::GatewayNotRunning => "gateway-not-running",
            RuleId::PortConflict => "port-conflict",
            RuleId::ServiceCrashed => "service-crashed",
            RuleId::SigtermRestartLoop => "sigterm-restart-loop",
            RuleId::GatewayAuthMissing => "gateway-auth-missing",
            RuleId::GatewayBindExposed => "gateway-bind-exposed",
            RuleId::NodeVersionOutdated => "node-version-outdated",
            RuleId::ApiRateLimited => "api-rate-limited",
            RuleId::HandshakeSpam => "handshake-spam",
            RuleId::ErrorBurst => "error-burst",
            RuleId::DuplicatePlugin => "duplicate-plugin",
            RuleId::StateDirMigration => "state-dir-migration",
            RuleId::ServiceNotRegistered => "service-not-registered",
            RuleId::CompactionUnset => "compaction-unset",
            RuleId::ExtendedDowntime => "extended-downtime",
            RuleId::LargeLogFile => "large-log-file",
            RuleId::StaleLockFile => "stale-lock-file",
            RuleId::MemoryBloat => "memory-bloat",
            RuleId::WorkspaceMissingAgentsMd => "workspace-missing-agents-md",
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static metadata about a diagnostic rule.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMetadata {
    pub id: RuleId,
    pub group: RuleGroup,
    pub severity: Severity,
    /// Short human-readable title
    pub title: &'static str,
    /// What the issue means for the user
    pub description: &'static str,
    /// Idempotent shell fragment. May use the variables declared in the
    /// composed script's preamble (`$OPENCLAW_DIR`, `$CONFIG_FILE`, ...).
    #[serde(skip)]
    pub remediation: &'static str,
    /// Whether the rule flags an issue when the data it reads is entirely absent
    pub fails_open: bool,
}

/// A rule's positive match against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Rule id (e.g. "gateway-zombie")
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub remediation: String,
}

impl Issue {
    /// Create an issue carrying a rule's static metadata.
    pub fn from_rule(metadata: &RuleMetadata) -> Self {
        Self {
            id: metadata.id.as_str().to_string(),
            severity: metadata.severity,
            title: metadata.title.to_string(),
            description: metadata.description.to_string(),
            remediation: metadata.remediation.to_string(),
        }
    }
}

/// Outcome reported back by the user after running a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
    Unknown,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failed => "failed",
            Outcome::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "success" => Outcome::Success,
            "failed" => Outcome::Failed,
            _ => Outcome::Unknown,
        }
    }
}

/// A stored diagnosis.
///
/// Deliberately not `Serialize`: the only way out to a client is
/// [`PublicDiagnosis`], so provenance cannot leak through a forgotten field.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisResult {
    pub fix_id: String,
    pub created_at: DateTime<Utc>,
    /// Issues in detection order
    pub issues: Vec<Issue>,
    pub analysis: String,
    /// Free-text model insights; empty when the augmenter fell back
    pub ai_insights: String,
    pub fix_script: String,
    /// Model or engine that produced the analysis
    pub model: String,
    /// Internal only
    pub provenance: Provenance,
    /// Internal only; attached later by feedback
    pub outcome: Option<Outcome>,
}

impl DiagnosisResult {
    pub fn rule_ids(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.id.clone()).collect()
    }
}

/// Client-visible summary of one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIssue {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

/// Client-visible projection of a [`DiagnosisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDiagnosis {
    pub fix_id: String,
    pub timestamp: DateTime<Utc>,
    pub issues_found: usize,
    pub known_issues: Vec<PublicIssue>,
    pub analysis: String,
    pub fix_script: String,
    pub ai_insights: String,
    pub model: String,
}

impl From<&DiagnosisResult> for PublicDiagnosis {
    fn from(result: &DiagnosisResult) -> Self {
        Self {
            fix_id: result.fix_id.clone(),
            timestamp: result.created_at,
            issues_found: result.issues.len(),
            known_issues: result
                .issues
                .iter()
                .map(|issue| PublicIssue {
                    id: issue.id.clone(),
                    severity: issue.severity,
                    title: issue.title.clone(),
                    description: issue.description.clone(),
                })
                .collect(),
            analysis: result.analysis.clone(),
            fix_script: result.fix_script.clone(),
            ai_insights: result.ai_insights.clone(),
            model: result.model.clone(),
        }
    }
}

/// Feedback body posted for a fix id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub success: bool,
    #[serde(default)]
    pub issues_remaining: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Per-rule counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub rule_id: String,
    pub detected: u64,
    pub fixed: u64,
    pub success_rate: f64,
}

impl PatternStats {
    pub fn new(rule_id: impl Into<String>, detected: u64, fixed: u64) -> Self {
        Self {
            rule_id: rule_id.into(),
            detected,
            fixed,
            success_rate: success_rate(fixed, detected),
        }
    }
}

/// `fixed / detected`, with `detected` floored at 1.
pub fn success_rate(fixed: u64, detected: u64) -> f64 {
    fixed as f64 / detected.max(1) as f64
}

/// Maximum stored length of a feedback comment, in characters.
pub const MAX_FEEDBACK_COMMENT_CHARS: usize = 1000;

impl FeedbackRequest {
    pub fn outcome(&self) -> Outcome {
        if self.success {
            Outcome::Success
        } else {
            Outcome::Failed
        }
    }

    /// Comment cut to [`MAX_FEEDBACK_COMMENT_CHARS`]; blank comments are dropped.
    pub fn truncated_comment(&self) -> Option<String> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| c.chars().take(MAX_FEEDBACK_COMMENT_CHARS).collect())
    }
}

/// Where a [`StatsSummary`] was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsSource {
    Durable,
    #[default]
    Memory,
}

/// Aggregate, read-only statistics view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_diagnoses: u64,
    pub total_feedback: u64,
    pub successful_fixes: u64,
    /// Most frequently detected rules, highest first
    pub top_issues: Vec<PatternStats>,
    pub by_severity: BTreeMap<String, u64>,
    pub by_os: BTreeMap<String, u64>,
    pub source: StatsSource,
}

/// Number of rules listed in [`StatsSummary::top_issues`].
pub const TOP_ISSUES_LIMIT: usize = 10;
