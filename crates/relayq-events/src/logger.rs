//! Subscriber that writes every job event to the log.

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use relayq_core::events::{EventEnvelope, JobEvent};

use crate::notifier::EventNotifier;

/// Logs completed and failed jobs as they are published.
#[derive(Debug)]
pub struct EventLogger {
    handle: JoinHandle<()>,
}

impl EventLogger {
    /// Subscribe to `notifier` and log until `shutdown` flips to `true`
    /// or the notifier is dropped.
    pub fn spawn(notifier: &EventNotifier, shutdown: watch::Receiver<bool>) -> Self {
        let rx = notifier.subscribe();
        let handle = tokio::spawn(run(rx, shutdown));
        Self { handle }
    }

    /// Wait for the logging task to finish.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

async fn run(mut rx: broadcast::Receiver<EventEnvelope>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(envelope) => log_event(&envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    // drain whatever was already published
                    while let Ok(envelope) = rx.try_recv() {
                        log_event(&envelope);
                    }
                    break;
                }
            }
        }
    }
}

fn log_event(envelope: &EventEnvelope) {
    match &envelope.event {
        JobEvent::Completed {
            job_id,
            result,
            processing_time_ms,
        } => {
            info!(
                event = envelope.event.kind(),
                job_id = %job_id,
                queue = %envelope.queue,
                processing_time_ms,
                result = %result,
                "Job completed"
            );
        }
        JobEvent::Failed {
            job_id,
            error_message,
            attempts_made,
        } => {
            warn!(
                event = envelope.event.kind(),
                job_id = %job_id,
                queue = %envelope.queue,
                attempts_made,
                error = %error_message,
                "Job failed"
            );
        }
    }
}
