//! Application state.
//!
//! Builds the pipeline, store, tracker and event handlers from an
//! [`AppConfig`], and tears them down in order so background work is not
//! lost when a short-lived process exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::Result;
use crate::events::{handlers, EventBus};
use crate::services::diagnostics::augmenter::Augmenter;
use crate::services::diagnostics::{
    DiagnosisPipeline, DurableBackend, PatternStatsTracker, ResultStore, RuleRegistry,
    SqliteBackend,
};

/// How long shutdown waits for the statistics handler to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct App {
    pub pipeline: DiagnosisPipeline,
    pub tracker: Arc<PatternStatsTracker>,
    stats_handler: Option<JoinHandle<()>>,
}

impl App {
    /// Build everything from configuration. Must run inside a Tokio runtime.
    ///
    /// A database that fails to open is logged and the app runs cache-only.
    pub fn init(config: AppConfig) -> Result<Self> {
        let backend = open_backend(&config);
        Ok(Self::with_parts(config, backend, None))
    }

    /// Build with an explicit backend and augmenter.
    pub fn with_parts(
        config: AppConfig,
        backend: Option<Arc<dyn DurableBackend>>,
        augmenter: Option<Augmenter>,
    ) -> Self {
        let store = Arc::new(ResultStore::new(config.cache_capacity, backend));
        let tracker = Arc::new(PatternStatsTracker::new(Arc::clone(&store)));
        let events = EventBus::new();

        // Handlers subscribe before anything can emit
        let stats_handler = handlers::stats::start_handler(Arc::clone(&tracker), events.subscribe());

        let augmenter = augmenter.unwrap_or_else(|| Augmenter::from_config(&config));
        if !augmenter.is_enabled() {
            tracing::info!("No ANTHROPIC_API_KEY set, AI analysis disabled");
        }

        let pipeline = DiagnosisPipeline::new(config, RuleRegistry::new(), augmenter, store, events);

        Self {
            pipeline,
            tracker,
            stats_handler: Some(stats_handler),
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.pipeline.config()
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        self.pipeline.store()
    }

    /// Flush durable writes, close the event bus and wait for handlers.
    pub async fn shutdown(mut self) -> Result<()> {
        self.pipeline.store().flush().await?;

        let handler = self.stats_handler.take();
        // Dropping the pipeline drops the last EventBus sender
        drop(self);

        if let Some(handle) = handler {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Statistics handler panicked: {}", e),
                Err(_) => tracing::warn!("Statistics handler did not finish in time"),
            }
        }
        Ok(())
    }
}

fn open_backend(config: &AppConfig) -> Option<Arc<dyn DurableBackend>> {
    let path = config.database_path.as_ref()?;
    match Database::open(path) {
        Ok(db) => {
            tracing::debug!("Opened database at {}", path.display());
            Some(Arc::new(SqliteBackend::new(Arc::new(db))) as Arc<dyn DurableBackend>)
        }
        Err(e) => {
            tracing::error!(
                "Failed to open database at {}, running cache-only: {}",
                path.display(),
                e
            );
            None
        }
    }
}
