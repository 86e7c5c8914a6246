//! Publish/subscribe fan-out of progress events
//!
//! The pipeline only publishes; any transport (WebSocket, SSE, polling)
//! subscribes independently and receives events in publication order.

use super::{ProgressEvent, ProgressHandler};
use tokio::sync::broadcast;
use tracing::debug;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts progress events over a tokio broadcast channel
///
/// A subscriber that falls more than the channel capacity behind receives
/// `RecvError::Lagged` and must resynchronise from its own state.
#[derive(Debug, Clone)]
pub struct ProgressBroadcaster {
    tx: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns the number of subscribers that received the event
    pub fn publish(&self, event: ProgressEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(
                    session = %event.session_id,
                    stage = %event.stage,
                    "No progress subscribers"
                );
                0
            }
        }
    }
}

impl ProgressHandler for ProgressBroadcaster {
    fn on_progress(&self, event: &ProgressEvent) {
        self.publish(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SessionStatus;
    use crate::progress::ProgressKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(percent: u8) -> ProgressEvent {
        ProgressEvent {
            session_id: Uuid::nil(),
            stage: SessionStatus::StructureAnalysis,
            kind: ProgressKind::StageStarted,
            progress_percent: percent,
            message: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let broadcaster = ProgressBroadcaster::default();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.on_progress(&event(5));
        broadcaster.on_progress(&event(25));

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap().progress_percent, 5);
            assert_eq!(rx.recv().await.unwrap().progress_percent, 25);
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let broadcaster = ProgressBroadcaster::new(4);
        assert_eq!(broadcaster.publish(event(5)), 0);
    }
}
