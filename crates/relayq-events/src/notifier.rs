//! Broadcast notifier for job events.

use tokio::sync::broadcast;
use tracing::trace;

use relayq_core::config::events::EventsConfig;
use relayq_core::events::{EventEnvelope, JobEvent};

/// Publishes job events to every current subscriber.
#[derive(Debug, Clone)]
pub struct EventNotifier {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventNotifier {
    /// Create a notifier with room for `buffer_size` undelivered events
    /// per subscriber.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    /// Create a notifier from configuration.
    pub fn from_config(config: &EventsConfig) -> Self {
        Self::new(config.buffer_size)
    }

    /// Publish an event for `queue`. Returns how many subscribers got it.
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, queue: &str, event: JobEvent) -> usize {
        let envelope = EventEnvelope::new(queue, event);
        match self.tx.send(envelope) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!(queue, "Job event dropped, no subscribers");
                0
            }
        }
    }

    /// Register a new subscriber. It only sees events published after
    /// this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::from_config(&EventsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayq_core::types::id::JobId;

    fn completed(job_id: JobId) -> JobEvent {
        JobEvent::Completed {
            job_id,
            result: serde_json::json!({"processed": true}),
            processing_time_ms: 1000,
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let notifier = EventNotifier::new(16);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        let job_id = JobId::new();
        assert_eq!(notifier.publish("messageQueue", completed(job_id)), 2);

        let got_a = a.recv().await.unwrap();
        let got_b = b.recv().await.unwrap();
        assert_eq!(got_a.event.job_id(), job_id);
        assert_eq!(got_b.queue, "messageQueue");
        assert_eq!(got_a.id, got_b.id);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let notifier = EventNotifier::default();
        assert_eq!(notifier.publish("q", completed(JobId::new())), 0);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_blocking() {
        let notifier = EventNotifier::new(2);
        let mut rx = notifier.subscribe();
        for _ in 0..5 {
            notifier.publish("q", completed(JobId::new()));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert!(rx.recv().await.is_ok());
    }
}
