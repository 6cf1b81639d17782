//! Bounded-parallel ingestion of many repositories

use super::{IngestionPipeline, RepositorySource};
use crate::config::{BatchTimeoutPolicy, IngestionConfig};
use crate::error::IngestionError;
use crate::types::BatchReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Upper bound on concurrently running repository pipelines
pub const MAX_CONCURRENT_REPOS: usize = 16;

/// Runs one pipeline per repository, at most `max_concurrency` at a time
///
/// Job failures are logged with their source and counted; they never affect
/// sibling jobs.
pub struct MultiRepoCoordinator {
    pipeline: Arc<IngestionPipeline>,
    max_concurrency: usize,
    wait_bound: Duration,
    on_timeout: BatchTimeoutPolicy,
}

/// Applies the timeout policy to whatever is still in the set when it drops,
/// including when the waiting future itself is dropped
struct BatchJobs {
    set: JoinSet<bool>,
    policy: BatchTimeoutPolicy,
}

impl Drop for BatchJobs {
    fn drop(&mut self) {
        match self.policy {
            BatchTimeoutPolicy::Detach => self.set.detach_all(),
            BatchTimeoutPolicy::Abort => self.set.abort_all(),
        }
    }
}

impl MultiRepoCoordinator {
    pub fn new(pipeline: Arc<IngestionPipeline>) -> Self {
        Self::from_config(pipeline, &IngestionConfig::default())
    }

    pub fn from_config(pipeline: Arc<IngestionPipeline>, config: &IngestionConfig) -> Self {
        Self {
            pipeline,
            max_concurrency: config.max_concurrent_repos.clamp(1, MAX_CONCURRENT_REPOS),
            wait_bound: Duration::from_secs(config.batch_wait_secs),
            on_timeout: config.on_batch_timeout,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.clamp(1, MAX_CONCURRENT_REPOS);
        self
    }

    pub fn with_wait_bound(mut self, wait_bound: Duration) -> Self {
        self.wait_bound = wait_bound;
        self
    }

    pub fn with_timeout_policy(mut self, policy: BatchTimeoutPolicy) -> Self {
        self.on_timeout = policy;
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Ingest every source and wait for the batch (up to the wait bound)
    pub async fn ingest_all(&self, sources: Vec<RepositorySource>) -> BatchReport {
        self.run_batch(sources, CancellationToken::new()).await.0
    }

    /// Like [`ingest_all`](Self::ingest_all), but stops waiting when `cancel`
    /// fires and reports the cancellation to the caller
    pub async fn ingest_all_with_cancel(
        &self,
        sources: Vec<RepositorySource>,
        cancel: CancellationToken,
    ) -> Result<BatchReport, IngestionError> {
        let (report, cancelled) = self.run_batch(sources, cancel).await;
        if cancelled {
            tracing::warn!(
                "Batch ingestion cancelled with {} jobs unfinished",
                report.unfinished
            );
            return Err(IngestionError::Cancelled);
        }
        Ok(report)
    }

    #[tracing::instrument(skip_all, fields(repos = sources.len()))]
    async fn run_batch(
        &self,
        sources: Vec<RepositorySource>,
        cancel: CancellationToken,
    ) -> (BatchReport, bool) {
        let mut report = BatchReport {
            submitted: sources.len(),
            ..BatchReport::default()
        };
        if sources.is_empty() {
            return (report, false);
        }

        let workers = self.max_concurrency.min(sources.len());
        tracing::info!(
            "Ingesting {} repositories with {} workers",
            sources.len(),
            workers
        );

        let permits = Arc::new(Semaphore::new(workers));
        let mut jobs = BatchJobs {
            set: JoinSet::new(),
            policy: self.on_timeout,
        };

        for source in sources {
            let permits = permits.clone();
            let pipeline = self.pipeline.clone();
            jobs.set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return false;
                };
                match pipeline.ingest(&source).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::error!(repo = %source, "Failed to ingest repository: {}", e);
                        false
                    }
                }
            });
        }

        let deadline = tokio::time::sleep(self.wait_bound);
        tokio::pin!(deadline);
        let mut cancelled = false;

        loop {
            tokio::select! {
                joined = jobs.set.join_next() => match joined {
                    Some(Ok(true)) => report.succeeded += 1,
                    Some(Ok(false)) => report.failed += 1,
                    Some(Err(e)) => {
                        tracing::error!("Ingestion task panicked: {}", e);
                        report.failed += 1;
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    report.timed_out = true;
                    break;
                }
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
            }
        }

        report.unfinished = jobs.set.len();
        if report.unfinished > 0 {
            match self.on_timeout {
                BatchTimeoutPolicy::Detach => tracing::warn!(
                    "Stopped waiting with {} jobs still running; they continue in the background",
                    report.unfinished
                ),
                BatchTimeoutPolicy::Abort => tracing::warn!(
                    "Stopped waiting; aborting {} unfinished jobs",
                    report.unfinished
                ),
            }
        }

        tracing::info!(
            "Batch finished: {} succeeded, {} failed, {} unfinished",
            report.succeeded,
            report.failed,
            report.unfinished
        );
        (report, cancelled)
    }
}
