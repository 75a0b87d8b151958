//! Background ingestion and retention workers

use crate::config::TagQuery;
use motd_cache::{CacheStore, TrimReport};
use motd_providers::{CaptionedProvider, TaggedProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome of one ingestion sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub ingested: usize,
    pub failed: usize,
}

/// Pulls fresh content from the configured providers into the cache.
///
/// Every tag query and the captioned provider are tried once per sweep.
/// A failure is logged and the sweep moves on to the next source.
pub struct IngestionWorker {
    cache: Arc<CacheStore>,
    tagged: Option<Arc<dyn TaggedProvider>>,
    tags: Vec<TagQuery>,
    captioned: Option<Arc<dyn CaptionedProvider>>,
}

impl IngestionWorker {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self {
            cache,
            tagged: None,
            tags: Vec::new(),
            captioned: None,
        }
    }

    pub fn with_tagged(mut self, provider: Arc<dyn TaggedProvider>, tags: Vec<TagQuery>) -> Self {
        self.tagged = Some(provider);
        self.tags = tags;
        self
    }

    pub fn with_captioned(mut self, provider: Arc<dyn CaptionedProvider>) -> Self {
        self.captioned = Some(provider);
        self
    }

    /// True when no source is configured, so sweeps can never add anything
    pub fn is_idle(&self) -> bool {
        (self.tagged.is_none() || self.tags.is_empty()) && self.captioned.is_none()
    }

    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        if let Some(provider) = &self.tagged {
            for query in &self.tags {
                let outcome = match provider.random(&query.tag, &query.rating).await {
                    Ok(url) => self
                        .cache
                        .ingest(&url, None)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                match outcome {
                    Ok(path) => {
                        debug!(provider = provider.name(), tag = %query.tag, path = ?path, "Ingested");
                        report.ingested += 1;
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), tag = %query.tag, error = %e, "Ingestion failed");
                        report.failed += 1;
                    }
                }
            }
        }

        if let Some(provider) = &self.captioned {
            let outcome = match provider.random().await {
                Ok(item) => self
                    .cache
                    .ingest(&item.url, item.caption.as_deref())
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(path) => {
                    debug!(provider = provider.name(), path = ?path, "Ingested");
                    report.ingested += 1;
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Ingestion failed");
                    report.failed += 1;
                }
            }
        }

        if report.ingested > 0 || report.failed > 0 {
            info!(ingested = report.ingested, failed = report.failed, "Ingestion sweep finished");
        }
        report
    }
}

/// Keeps the cache at or below its size ceiling
pub struct RetentionWorker {
    cache: Arc<CacheStore>,
    max_files: usize,
}

impl RetentionWorker {
    pub fn new(cache: Arc<CacheStore>, max_files: usize) -> Self {
        Self { cache, max_files }
    }

    pub async fn sweep(&self) -> motd_cache::Result<TrimReport> {
        let report = self.cache.trim(self.max_files).await?;
        if !report.is_clean() {
            warn!(failed = report.failed.len(), "Some cache entries could not be evicted");
        }

        match self.cache.stats().await {
            Ok(stats) => debug!(entries = stats.entries, total_size = stats.total_size, "Cache stats"),
            Err(e) => debug!(error = %e, "Failed to read cache stats"),
        }
        Ok(report)
    }
}

/// Run `tick` every `period` until `stop` turns true.
///
/// The first run happens one period after spawning. A tick that overruns
/// pushes the schedule back instead of bursting to catch up. A stop request
/// is observed between ticks; a tick in progress runs to completion.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut stop: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(worker = name, period_secs = period.as_secs_f64(), "Worker started");

        loop {
            tokio::select! {
                biased;
                _ = async { let _ = stop.wait_for(|stopped| *stopped).await; } => break,
                _ = interval.tick() => tick().await,
            }
        }

        info!(worker = name, "Worker stopped");
    })
}

/// Spawn the ingestion loop
pub fn spawn_ingestion(
    worker: IngestionWorker,
    period: Duration,
    stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let worker = Arc::new(worker);
    spawn_periodic("ingestion", period, stop, move || {
        let worker = worker.clone();
        async move {
            worker.sweep().await;
        }
    })
}

/// Spawn the retention loop
pub fn spawn_retention(
    worker: RetentionWorker,
    period: Duration,
    stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let worker = Arc::new(worker);
    spawn_periodic("retention", period, stop, move || {
        let worker = worker.clone();
        async move {
            if let Err(e) = worker.sweep().await {
                error!(error = %e, "Retention sweep failed");
            }
        }
    })
}
