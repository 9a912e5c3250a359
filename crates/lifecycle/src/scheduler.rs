//! Recurring trigger for the cleanup job.

use crate::cleanup::CleanupJob;
use crate::reconcile::Reconciler;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::config::CleanupConfig;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

/// Spawn the configured cleanup schedule.
///
/// The reconciler only runs when `reconcile_enabled` is set.
pub fn spawn_cleanup_scheduler(
    job: Arc<CleanupJob>,
    reconciler: Arc<Reconciler>,
    config: &CleanupConfig,
) -> JoinHandle<()> {
    let reconciler = config.reconcile_enabled.then_some(reconciler);
    spawn_cleanup_every(job, reconciler, config.interval())
}

/// Spawn a task that starts one cleanup run every `period`.
///
/// Each tick spawns its own run, so a slow run does not delay the next one
/// and runs may overlap. Abort the returned handle to stop the schedule;
/// runs already started finish on their own.
pub fn spawn_cleanup_every(
    job: Arc<CleanupJob>,
    reconciler: Option<Arc<Reconciler>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            interval_secs = period.as_secs(),
            reconcile = reconciler.is_some(),
            "Cleanup scheduler enabled"
        );

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let job = job.clone();
            let reconciler = reconciler.clone();
            tokio::spawn(async move {
                if let Some(reconciler) = reconciler
                    && let Err(e) = reconciler.scan(OffsetDateTime::now_utc()).await
                {
                    tracing::error!(error = %e, "Scheduled reconciliation failed");
                }
                job.run().await;
            });
        }
    })
}
