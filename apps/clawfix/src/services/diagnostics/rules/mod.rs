//! Diagnostic rules system.
//!
//! Every rule is a pure predicate over a [`DiagnosticSnapshot`] joined to a
//! static metadata entry in [`catalog::CATALOG`]. The registry keeps rules in
//! catalog order, which is also the order issues are reported in.

use super::models::{RuleGroup, RuleId, RuleMetadata, Severity};
use crate::snapshot::DiagnosticSnapshot;

pub mod catalog;
pub mod config;
pub mod gateway;
pub mod logs;
pub mod service;
pub mod system;
pub mod thresholds;
pub mod workspace;

/// Trait for diagnostic rules.
///
/// `check` must be pure: same snapshot, same answer, no I/O.
pub trait DiagnosticRule: Send + Sync {
    /// Get the rule's metadata.
    fn metadata(&self) -> &RuleMetadata;

    /// Whether the snapshot exhibits this rule's problem.
    fn check(&self, snapshot: &DiagnosticSnapshot) -> bool;
}

pub type Predicate = fn(&DiagnosticSnapshot) -> bool;

/// A catalog entry paired with its predicate.
pub struct CatalogRule {
    metadata: &'static RuleMetadata,
    predicate: Predicate,
}

impl CatalogRule {
    pub fn new(metadata: &'static RuleMetadata) -> Self {
        Self {
            metadata,
            predicate: predicate_for(metadata.id),
        }
    }
}

impl DiagnosticRule for CatalogRule {
    fn metadata(&self) -> &RuleMetadata {
        self.metadata
    }

    fn check(&self, snapshot: &DiagnosticSnapshot) -> bool {
        (self.predicate)(snapshot)
    }
}

/// Predicate implementing a rule id.
pub fn predicate_for(id: RuleId) -> Predicate {
    match id {
        RuleId::Mem0GraphFree => config::mem0_graph_free,
        RuleId::GatewayZombie => gateway::gateway_zombie,
        RuleId::GatewayNotRunning => gateway::gateway_not_running,
        RuleId::PortConflict => gateway::port_conflict,
        RuleId::ServiceCrashed => service::service_crashed,
        RuleId::SigtermRestartLoop => service::sigterm_restart_loop,
        RuleId::GatewayAuthMissing => config::gateway_auth_missing,
        RuleId::GatewayBindExposed => config::gateway_bind_exposed,
        RuleId::NodeVersionOutdated => system::node_version_outdated,
        RuleId::ApiRateLimited => logs::api_rate_limited,
        RuleId::HandshakeSpam => logs::handshake_spam,
        RuleId::ErrorBurst => logs::error_burst,
        RuleId::DuplicatePlugin => config::duplicate_plugin,
        RuleId::StateDirMigration => config::state_dir_migration,
        RuleId::ServiceNotRegistered => service::service_not_registered,
        RuleId::CompactionUnset => config::compaction_unset,
        RuleId::ExtendedDowntime => service::extended_downtime,
        RuleId::LargeLogFile => logs::large_log_file,
        RuleId::StaleLockFile => workspace::stale_lock_file,
        RuleId::MemoryBloat => workspace::memory_bloat,
        RuleId::WorkspaceMissingAgentsMd => workspace::workspace_missing_agents_md,
    }
}

/// Registry of all available diagnostic rules.
pub struct RuleRegistry {
    rules: Vec<Box<dyn DiagnosticRule>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    /// Create a new registry with every catalog rule, in catalog order.
    pub fn new() -> Self {
        let rules = catalog::CATALOG
            .iter()
            .map(|metadata| Box::new(CatalogRule::new(metadata)) as Box<dyn DiagnosticRule>)
            .collect();
        Self { rules }
    }

    /// Build a registry from an explicit rule list.
    pub fn with_rules(rules: Vec<Box<dyn DiagnosticRule>>) -> Self {
        Self { rules }
    }

    /// Get all rules.
    pub fn all(&self) -> &[Box<dyn DiagnosticRule>] {
        &self.rules
    }

    /// Get a rule by ID.
    pub fn get(&self, rule_id: &str) -> Option<&dyn DiagnosticRule> {
        let id = RuleId::parse(rule_id)?;
        self.rules
            .iter()
            .find(|r| r.metadata().id == id)
            .map(|r| r.as_ref())
    }

    /// Get all rule metadata.
    pub fn metadata(&self) -> Vec<RuleMetadata> {
        self.rules.iter().map(|r| *r.metadata()).collect()
    }

    /// Get rules by group.
    pub fn by_group(&self, group: RuleGroup) -> Vec<&dyn DiagnosticRule> {
        self.rules
            .iter()
            .filter(|r| r.metadata().group == group)
            .map(|r| r.as_ref())
            .collect()
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<&dyn DiagnosticRule> {
        self.rules
            .iter()
            .filter(|r| r.metadata().severity == severity)
            .map(|r| r.as_ref())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
