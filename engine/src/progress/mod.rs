//! Progress notifications for in-flight turns
//!
//! The ProgressBus fans turn and video-polling events out to any number of
//! subscribers (a terminal spinner, a JSON event stream, tests). Each
//! subscriber gets a bounded channel. Publishing never waits: when a
//! subscriber's buffer is full the event is dropped for that subscriber, and
//! subscribers whose receiver is gone are pruned.

use serde::Serialize;
use sdk::types::{VideoOutcome, VideoStatus};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Channel buffer size per subscriber
const CHANNEL_BUFFER_SIZE: usize = 64;

/// Events published while a turn is processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A turn was accepted and the reply is being generated
    TurnStarted { turn_id: String },

    /// The text reply is available
    ReplyReady { turn_id: String },

    /// The video backend accepted a job
    VideoSubmitted { turn_id: String, job_id: String },

    /// The job is still queued or generating
    VideoProgress {
        job_id: String,
        status: VideoStatus,
        elapsed_secs: u64,
        fetches: u32,
    },

    /// A status fetch failed and will be retried
    VideoTransientMiss {
        job_id: String,
        consecutive_failures: u32,
        error: String,
    },

    /// The video reached a terminal outcome
    VideoFinished { turn_id: String, outcome: VideoOutcome },
}

/// Cloneable handle to a set of progress subscribers
#[derive(Clone, Default)]
pub struct ProgressBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<ProgressEvent>>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event published after this call
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Publish an event to all live subscribers without blocking
    pub fn publish(&self, event: ProgressEvent) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };

        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Progress subscriber lagging, dropped event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> ProgressEvent {
        ProgressEvent::TurnStarted {
            turn_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = ProgressBus::new();
        let mut rx = bus.subscribe();

        bus.publish(started("turn-1"));

        assert_eq!(rx.recv().await.unwrap(), started("turn-1"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = ProgressBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(started("turn-2"));

        assert_eq!(rx1.recv().await.unwrap(), started("turn-2"));
        assert_eq!(rx2.recv().await.unwrap(), started("turn-2"));
    }

    #[tokio::test]
    async fn test_full_subscriber_does_not_block() {
        let bus = ProgressBus::new();
        let mut rx = bus.subscribe();

        for i in 0..(CHANNEL_BUFFER_SIZE + 10) {
            bus.publish(started(&i.to_string()));
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, CHANNEL_BUFFER_SIZE);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let bus = ProgressBus::new();
        let rx = bus.subscribe();
        drop(rx);

        bus.publish(started("turn-3"));

        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::VideoProgress {
            job_id: "v1".to_string(),
            status: VideoStatus::Generating,
            elapsed_secs: 20,
            fetches: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "video_progress");
        assert_eq!(json["status"], "generating");
    }
}
