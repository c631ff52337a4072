use std::{ops::RangeInclusive, sync::Arc, time::Duration};

use log::{debug, error, info};

use crate::{sync::SyncTask, Error, Result};

const DEFAULT_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillConfig {
    /// Number of heights synced concurrently. The next batch starts only once every member of
    /// the current one has completed.
    pub batch_size: usize,
    /// Upper bound on a single height's sync. Without it one stuck call stalls its whole batch.
    pub request_timeout: Option<Duration>,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: None,
        }
    }
}

/// Outcome of a backfill run. Failures are per height and never abort the run.
#[derive(Debug, Default)]
pub struct BackfillReport {
    pub synced: usize,
    pub failed: Vec<(u64, Error)>,
}

/// Drives a sync task over every height from a starting point down to 1, in fixed-size batches.
#[derive(Debug)]
pub struct Backfill<T> {
    task: Arc<T>,
    config: BackfillConfig,
}

impl<T> Backfill<T>
where
    T: SyncTask + 'static,
{
    pub fn new(task: T, config: BackfillConfig) -> Self {
        Self {
            task: Arc::new(task),
            config: BackfillConfig {
                batch_size: config.batch_size.max(1),
                ..config
            },
        }
    }

    pub async fn run(&self, from_height: u64) -> BackfillReport {
        let mut report = BackfillReport::default();

        for range in descending_batches(from_height, self.config.batch_size) {
            debug!(
                "Backfilling {} #{}..=#{}",
                self.task.entity(),
                range.start(),
                range.end()
            );

            let batch: Vec<u64> = range.rev().collect();
            let handles: Vec<_> = batch
                .iter()
                .map(|&height| tokio::spawn(self.sync_one(height)))
                .collect();

            let results = futures_util::future::join_all(handles).await;
            for (&height, result) in batch.iter().zip(results) {
                let result = result.unwrap_or_else(|e| {
                    Err(Error::Task {
                        height,
                        reason: e.to_string(),
                    })
                });

                match result {
                    Ok(_) => report.synced += 1,
                    Err(e) => {
                        error!("Failed to sync {} at #{}: {}", self.task.entity(), height, e);
                        report.failed.push((height, e));
                    }
                }
            }
        }

        info!(
            "Backfill of {} finished: {} synced, {} failed",
            self.task.entity(),
            report.synced,
            report.failed.len()
        );
        report
    }

    fn sync_one(&self, height: u64) -> impl std::future::Future<Output = Result<usize>> + Send {
        let task = self.task.clone();
        let request_timeout = self.config.request_timeout;

        async move {
            let records = match request_timeout {
                Some(after) => match tokio::time::timeout(after, task.sync(height)).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout { height, after }),
                },
                None => task.sync(height).await,
            }?;

            debug!("{} #{} processed successfully", task.entity(), height);
            Ok(records)
        }
    }
}

/// Splits `top..=1` into ranges of at most `size` heights, highest range first.
fn descending_batches(top: u64, size: usize) -> impl Iterator<Item = RangeInclusive<u64>> {
    let span = (size.max(1) as u64) - 1;
    let mut upper = Some(top).filter(|&h| h >= 1);

    std::iter::from_fn(move || {
        let hi = upper?;
        let lo = hi.saturating_sub(span).max(1);
        upper = lo.checked_sub(1).filter(|&h| h >= 1);
        Some(lo..=hi)
    })
}
