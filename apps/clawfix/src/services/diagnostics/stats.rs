//! Pattern statistics tracker.
//!
//! Counts how often each rule fires and how often users confirm a fix. The
//! durable backend is the source of truth and is updated with atomic
//! upserts. In-process counters shadow it so the statistics view still has
//! figures when no backend is configured or the backend is failing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::Result;

use super::models::{PatternStats, StatsSource, StatsSummary, TOP_ISSUES_LIMIT};
use super::repository::severity_breakdown;
use super::store::{DurableBackend, ResultStore};

#[derive(Default)]
struct MemoryStats {
    diagnoses: u64,
    feedback: u64,
    successes: u64,
    /// rule id -> (detected, fixed)
    patterns: HashMap<String, (u64, u64)>,
    by_os: BTreeMap<String, u64>,
}

pub struct PatternStatsTracker {
    store: Arc<ResultStore>,
    memory: Mutex<MemoryStats>,
}

impl PatternStatsTracker {
    /// The tracker writes through the store's durable backend, if any.
    pub fn new(store: Arc<ResultStore>) -> Self {
        Self {
            store,
            memory: Mutex::new(MemoryStats::default()),
        }
    }

    fn backend(&self) -> Option<&Arc<dyn DurableBackend>> {
        self.store.backend()
    }

    /// Count one finished diagnosis and its detections.
    pub async fn record_diagnosis(&self, rule_ids: &[String], os: Option<&str>) -> Result<()> {
        {
            let mut memory = self.memory.lock()?;
            memory.diagnoses += 1;
            let os = os.unwrap_or("unknown").to_string();
            *memory.by_os.entry(os).or_insert(0) += 1;
        }
        self.record_detections(rule_ids).await
    }

    /// Increment the detected counter of every rule id once.
    pub async fn record_detections(&self, rule_ids: &[String]) -> Result<()> {
        if rule_ids.is_empty() {
            return Ok(());
        }
        {
            let mut memory = self.memory.lock()?;
            let mut seen = HashSet::new();
            for id in rule_ids.iter().filter(|id| seen.insert(id.as_str())) {
                memory.patterns.entry(id.clone()).or_insert((0, 0)).0 += 1;
            }
        }

        if let Some(backend) = self.backend() {
            if let Err(e) = backend.increment_detected(rule_ids).await {
                tracing::error!("Failed to record detections {:?}: {}", rule_ids, e);
            }
        }
        Ok(())
    }

    /// Count a feedback report. With `credit_fix` (the first success for
    /// this fix id), credit every rule attached to the diagnosis. Unknown
    /// fix ids only count toward feedback totals.
    pub async fn record_feedback(
        &self,
        fix_id: &str,
        success: bool,
        credit_fix: bool,
    ) -> Result<()> {
        {
            let mut memory = self.memory.lock()?;
            memory.feedback += 1;
            if success {
                memory.successes += 1;
            }
        }

        if !(success && credit_fix) {
            return Ok(());
        }

        let Some(result) = self.store.get(fix_id).await? else {
            tracing::debug!("Feedback for unknown fix id {}", fix_id);
            return Ok(());
        };
        let rule_ids = result.rule_ids();
        if rule_ids.is_empty() {
            return Ok(());
        }

        {
            let mut memory = self.memory.lock()?;
            for id in &rule_ids {
                memory.patterns.entry(id.clone()).or_insert((0, 0)).1 += 1;
            }
        }

        if let Some(backend) = self.backend() {
            if let Err(e) = backend.increment_fixed(&rule_ids).await {
                tracing::error!("Failed to record fixes for {}: {}", fix_id, e);
            }
        }
        Ok(())
    }

    /// In-process counters for one rule.
    pub fn memory_pattern(&self, rule_id: &str) -> Result<Option<PatternStats>> {
        let memory = self.memory.lock()?;
        Ok(memory
            .patterns
            .get(rule_id)
            .map(|(detected, fixed)| PatternStats::new(rule_id, *detected, *fixed)))
    }

    /// Statistics from the durable backend, or from memory when it is
    /// missing or failing.
    pub async fn summary(&self) -> Result<StatsSummary> {
        if let Some(backend) = self.backend() {
            match backend.stats_summary().await {
                Ok(summary) => return Ok(summary),
                Err(e) => tracing::warn!("Durable stats unavailable, using memory: {}", e),
            }
        }
        self.memory_summary()
    }

    fn memory_summary(&self) -> Result<StatsSummary> {
        let memory = self.memory.lock()?;

        let mut patterns: Vec<PatternStats> = memory
            .patterns
            .iter()
            .map(|(id, (detected, fixed))| PatternStats::new(id.clone(), *detected, *fixed))
            .collect();
        patterns.sort_by(|a, b| {
            b.detected
                .cmp(&a.detected)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });

        Ok(StatsSummary {
            total_diagnoses: memory.diagnoses,
            total_feedback: memory.feedback,
            successful_fixes: memory.successes,
            by_severity: severity_breakdown(&patterns),
            top_issues: patterns.into_iter().take(TOP_ISSUES_LIMIT).collect(),
            by_os: memory.by_os.clone(),
            source: StatsSource::Memory,
        })
    }
}
