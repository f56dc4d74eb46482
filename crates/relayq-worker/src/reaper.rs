//! Background sweep that returns jobs with expired leases to the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing;

use relayq_core::events::JobEvent;
use relayq_core::result::AppResult;
use relayq_entity::job::ReapReport;
use relayq_events::EventNotifier;

use crate::queue::JobQueue;

/// Shortest sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Periodically calls [`JobQueue::requeue_expired`].
#[derive(Debug)]
pub struct Reaper {
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Start sweeping every `interval` until `shutdown` flips to `true`.
    pub fn spawn(
        queue: Arc<JobQueue>,
        interval: Duration,
        notifier: EventNotifier,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let handle = tokio::spawn(async move {
            tracing::info!(
                queue = %queue.name(),
                interval_ms = interval.as_millis() as u64,
                "Reaper started"
            );

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = sweep(&queue, &notifier).await {
                            tracing::error!(
                                queue = %queue.name(),
                                error = %e,
                                "Reaper sweep failed"
                            );
                        }
                    }
                }
            }

            tracing::info!(queue = %queue.name(), "Reaper stopped");
        });

        Self { handle }
    }

    /// Wait for the sweep task to exit.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Run one sweep: wake slots for requeued jobs and publish `failed` for
/// jobs that ran out of attempts.
pub async fn sweep(queue: &JobQueue, notifier: &EventNotifier) -> AppResult<ReapReport> {
    let report = queue.requeue_expired().await?;
    if report.is_empty() {
        return Ok(report);
    }

    if !report.requeued.is_empty() {
        tracing::warn!(
            queue = %queue.name(),
            count = report.requeued.len(),
            "Requeued jobs with expired leases"
        );
        queue.wake(report.requeued.len());
    }

    for job in &report.failed {
        let reason = job.failure_reason.clone().unwrap_or_default();
        tracing::warn!(
            job_id = %job.id,
            attempts_made = job.attempts_made,
            reason = %reason,
            "Job failed after lease expiry"
        );
        notifier.publish(
            queue.name(),
            JobEvent::Failed {
                job_id: job.id,
                error_message: reason,
                attempts_made: job.attempts_made,
            },
        );
    }

    Ok(report)
}
