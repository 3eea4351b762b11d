//! Aggregation engine
//!
//! Keeps one owner's dashboard counters live. Every recomputation re-reads
//! current repository state instead of applying deltas, so the published
//! value after any interleaving of notifications equals the value computed
//! from the final state. Bursts are coalesced behind a debounce window; a
//! receiver that lags simply forces a recompute, so no notification is lost
//! without a subsequent re-read.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use diligence_core::models::AggregateStats;
use diligence_core::{AppError, Config};
use diligence_db::{ChangeFeed, ChangeNotification, MetadataRepository};

#[derive(Clone)]
pub struct StatsConfig {
    /// Quiet period before recomputing after a burst of notifications.
    pub debounce: Duration,
    /// Backoff before the single recompute retry after a read failure.
    pub retry_backoff: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            retry_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&Config> for StatsConfig {
    fn from(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.stats_debounce_ms),
            retry_backoff: Duration::from_secs(config.stats_retry_backoff_secs),
        }
    }
}

/// Re-derive all four counters from current repository state.
pub async fn compute_stats(
    repository: &dyn MetadataRepository,
    owner_id: Uuid,
) -> Result<AggregateStats, AppError> {
    let (documents_processed, issues_detected, compliance_score, active_analyses) = tokio::try_join!(
        repository.count_processed_documents(owner_id),
        repository.count_unresolved_red_flags(owner_id),
        repository.average_compliance_score(owner_id),
        repository.count_analyses_in_progress(owner_id),
    )?;

    Ok(AggregateStats {
        documents_processed,
        issues_detected,
        compliance_score,
        active_analyses,
    })
}

pub struct AggregationEngine {
    repository: Arc<dyn MetadataRepository>,
    feed: Arc<dyn ChangeFeed>,
    config: StatsConfig,
}

impl AggregationEngine {
    pub fn new(
        repository: Arc<dyn MetadataRepository>,
        feed: Arc<dyn ChangeFeed>,
        config: StatsConfig,
    ) -> Self {
        Self {
            repository,
            feed,
            config,
        }
    }

    /// Begin maintaining live statistics for one owner.
    ///
    /// Computes the initial snapshot, then spawns a worker that recomputes
    /// on every relevant change notification. The returned handle owns the
    /// worker: call [`StatsSubscription::close`] to stop it gracefully;
    /// dropping the handle tears it down as well.
    pub async fn start(&self, owner_id: Uuid) -> Result<StatsSubscription, AppError> {
        // Subscribe before the initial read so a change landing in between
        // still triggers a recompute.
        let mut feed_rx = self.feed.subscribe();
        let initial = compute_stats(self.repository.as_ref(), owner_id).await?;
        let (stats_tx, stats_rx) = watch::channel(initial);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let repository = self.repository.clone();
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            tracing::debug!(owner_id = %owner_id, "Aggregation worker started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    received = feed_rx.recv() => {
                        let relevant = match received {
                            Ok(change) => is_relevant(&change, owner_id),
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, owner_id = %owner_id, "Change feed lagged; forcing recompute");
                                true
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        };
                        if !relevant {
                            continue;
                        }

                        drain_burst(&mut feed_rx, config.debounce).await;
                        recompute_and_publish(
                            repository.as_ref(),
                            owner_id,
                            &stats_tx,
                            config.retry_backoff,
                        )
                        .await;
                    }
                }
            }
            tracing::debug!(owner_id = %owner_id, "Aggregation worker stopped");
        });

        Ok(StatsSubscription {
            owner_id,
            stats_rx,
            shutdown_tx,
            handle: Some(handle),
        })
    }
}

fn is_relevant(change: &ChangeNotification, owner_id: Uuid) -> bool {
    change.owner_id == owner_id && change.table.is_monitored()
}

/// Swallow further notifications until the debounce window closes. Every
/// drained notification is covered by the recompute that follows.
async fn drain_burst(feed_rx: &mut broadcast::Receiver<ChangeNotification>, debounce: Duration) {
    let deadline = tokio::time::sleep(debounce);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => return,
            received = feed_rx.recv() => match received {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

async fn recompute_and_publish(
    repository: &dyn MetadataRepository,
    owner_id: Uuid,
    stats_tx: &watch::Sender<AggregateStats>,
    retry_backoff: Duration,
) {
    match compute_stats(repository, owner_id).await {
        Ok(stats) => {
            stats_tx.send_replace(stats);
        }
        Err(e) => {
            // Keep the last-known-good snapshot; never publish a zeroed one.
            tracing::warn!(error = %e, owner_id = %owner_id, "Stats recompute failed; retaining last snapshot");
            tokio::time::sleep(retry_backoff).await;
            match compute_stats(repository, owner_id).await {
                Ok(stats) => {
                    stats_tx.send_replace(stats);
                }
                Err(e) => {
                    tracing::error!(error = %e, owner_id = %owner_id, "Stats recompute retry failed; waiting for next change");
                }
            }
        }
    }
}

/// Live statistics handle for one owner.
///
/// Owns the background worker; release it with [`close`](Self::close) (or by
/// dropping the handle) when the consumer goes away.
pub struct StatsSubscription {
    owner_id: Uuid,
    stats_rx: watch::Receiver<AggregateStats>,
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StatsSubscription {
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// Latest published snapshot.
    pub fn current(&self) -> AggregateStats {
        *self.stats_rx.borrow()
    }

    /// A receiver over the published snapshots.
    pub fn receiver(&self) -> watch::Receiver<AggregateStats> {
        self.stats_rx.clone()
    }

    /// Wait until a newer snapshot than the last observed one is published.
    pub async fn changed(&mut self) -> Result<(), AppError> {
        self.stats_rx
            .changed()
            .await
            .map_err(|_| AppError::Internal("Aggregation worker stopped".to_string()))
    }

    /// Stop the worker and wait for it to finish.
    pub async fn close(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for StatsSubscription {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
