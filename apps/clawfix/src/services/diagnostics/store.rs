//! Result store.
//!
//! Two tiers: a bounded FIFO cache that every `put` writes to, and an
//! optional durable backend written asynchronously. Durable failures are
//! logged and swallowed on both paths, so with the backend down the store
//! degrades to cache-only.
//!
//! Consistency: the durable write is not ordered against reads from other
//! processes. A `get` on another instance immediately after a `put` here can
//! miss in its own cache and in the backend and answer not-found. That
//! window is accepted.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::error::Result;

use super::cache::{FifoCache, RESULT_CACHE_CAPACITY};
use super::models::{DiagnosisResult, FeedbackRequest, Outcome, StatsSummary};

/// Persistent storage behind the result store and the statistics tracker.
#[async_trait]
pub trait DurableBackend: Send + Sync {
    async fn save_diagnosis(&self, result: &DiagnosisResult) -> Result<()>;

    async fn load_diagnosis(&self, fix_id: &str) -> Result<Option<DiagnosisResult>>;

    /// Append feedback and attach its outcome to the diagnosis. Returns the
    /// outcome the diagnosis carried before, if any.
    async fn record_feedback(
        &self,
        fix_id: &str,
        feedback: &FeedbackRequest,
    ) -> Result<Option<Outcome>>;

    /// Atomic per-rule increment of the detected counter.
    async fn increment_detected(&self, rule_ids: &[String]) -> Result<()>;

    /// Atomic per-rule increment of the fixed counter.
    async fn increment_fixed(&self, rule_ids: &[String]) -> Result<()>;

    async fn stats_summary(&self) -> Result<StatsSummary>;
}

pub struct ResultStore {
    cache: Mutex<FifoCache<DiagnosisResult>>,
    backend: Option<Arc<dyn DurableBackend>>,
    pending: Mutex<JoinSet<()>>,
}

impl ResultStore {
    pub fn new(capacity: usize, backend: Option<Arc<dyn DurableBackend>>) -> Self {
        Self {
            cache: Mutex::new(FifoCache::new(capacity)),
            backend,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    /// Cache-only store with the default capacity.
    pub fn in_memory() -> Self {
        Self::new(RESULT_CACHE_CAPACITY, None)
    }

    pub fn backend(&self) -> Option<&Arc<dyn DurableBackend>> {
        self.backend.as_ref()
    }

    /// Cache the result and schedule the durable write.
    ///
    /// Returns once the cache holds the result. The durable write runs in
    /// the background; outside a Tokio runtime it is skipped.
    pub fn put(&self, result: DiagnosisResult) -> Result<()> {
        let fix_id = result.fix_id.clone();
        {
            let mut cache = self.cache.lock()?;
            cache.insert(fix_id.clone(), result.clone());
        }

        let Some(backend) = self.backend.clone() else {
            return Ok(());
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, skipping durable write for {}", fix_id);
            return Ok(());
        };

        let mut pending = self.pending.lock()?;
        // Reap finished writes so the set does not grow without bound
        while pending.try_join_next().is_some() {}
        pending.spawn_on(
            async move {
                if let Err(e) = backend.save_diagnosis(&result).await {
                    tracing::error!("Failed to persist diagnosis {}: {}", fix_id, e);
                }
            },
            &handle,
        );

        Ok(())
    }

    /// Look up a result: cache, then durable backend.
    ///
    /// A durable hit is copied back into the cache. Durable errors read as
    /// not-found.
    pub async fn get(&self, fix_id: &str) -> Result<Option<DiagnosisResult>> {
        if let Some(hit) = self.get_cached(fix_id)? {
            return Ok(Some(hit));
        }

        let Some(backend) = self.backend.as_ref() else {
            return Ok(None);
        };

        match backend.load_diagnosis(fix_id).await {
            Ok(Some(result)) => {
                let mut cache = self.cache.lock()?;
                cache.insert(fix_id.to_string(), result.clone());
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!("Durable lookup of {} failed: {}", fix_id, e);
                Ok(None)
            }
        }
    }

    /// Cache-only lookup.
    pub fn get_cached(&self, fix_id: &str) -> Result<Option<DiagnosisResult>> {
        let cache = self.cache.lock()?;
        Ok(cache.get(fix_id))
    }

    /// Attach a feedback outcome to a stored result.
    ///
    /// Returns whether this report is the first success for the fix id;
    /// only that report may credit the fixed counters. Durable failures are
    /// logged, never returned.
    pub async fn record_feedback(&self, fix_id: &str, feedback: &FeedbackRequest) -> Result<bool> {
        let cached_before = {
            let mut cache = self.cache.lock()?;
            let mut before = None;
            cache.update(fix_id, |result| {
                before = result.outcome;
                result.outcome = Some(feedback.outcome());
            });
            before
        };

        let durable_before = match self.backend.as_ref() {
            Some(backend) => match backend.record_feedback(fix_id, feedback).await {
                Ok(before) => before,
                Err(e) => {
                    tracing::warn!("Failed to persist feedback for {}: {}", fix_id, e);
                    None
                }
            },
            None => None,
        };

        let already_fixed = cached_before == Some(Outcome::Success)
            || durable_before == Some(Outcome::Success);
        if feedback.success && already_fixed {
            tracing::debug!("Repeat success report for {}", fix_id);
        }
        Ok(feedback.success && !already_fixed)
    }

    /// Wait for all scheduled durable writes to finish.
    pub async fn flush(&self) -> Result<()> {
        let mut pending = {
            let mut guard = self.pending.lock()?;
            std::mem::take(&mut *guard)
        };
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Durable write task failed: {}", e);
            }
        }
        Ok(())
    }

    pub fn cached_len(&self) -> Result<usize> {
        Ok(self.cache.lock()?.len())
    }
}
