//! Detection engine.
//!
//! Runs every registered rule against one snapshot and collects the matches.
//! A rule that panics is logged and treated as not matching; the remaining
//! rules still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crate::snapshot::DiagnosticSnapshot;

use super::models::Issue;
use super::rules::{DiagnosticRule, RuleRegistry};

/// Evaluate every rule in registry order.
///
/// Output order is the registry's declaration order. It is not re-sorted
/// by severity here.
pub fn detect(registry: &RuleRegistry, snapshot: &DiagnosticSnapshot) -> Vec<Issue> {
    let start = Instant::now();

    let issues: Vec<Issue> = registry
        .all()
        .iter()
        .filter(|rule| evaluate(rule.as_ref(), snapshot))
        .map(|rule| Issue::from_rule(rule.metadata()))
        .collect();

    tracing::debug!(
        rules = registry.len(),
        matched = issues.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Detection complete"
    );

    issues
}

fn evaluate(rule: &dyn DiagnosticRule, snapshot: &DiagnosticSnapshot) -> bool {
    match catch_unwind(AssertUnwindSafe(|| rule.check(snapshot))) {
        Ok(matched) => matched,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!("Rule {} failed: {}", rule.metadata().id, reason);
            false
        }
    }
}
