//! View-model publisher
//!
//! Assembles derived metrics and rendered series into immutable frames and
//! fans them out over a bounded broadcast channel. Frames carry a strictly
//! increasing sequence number; each subscriber sees them in order. A
//! subscriber that falls more than the buffer behind skips ahead to the
//! oldest retained frame, so the newest frame is always delivered.

use crate::types::SubscriberId;
use cna_metrics::{ChartSeriesSet, DerivedMetrics};
use cna_transition::CancellationToken;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Frames retained for a subscriber that is not reading
pub const DEFAULT_FRAME_BUFFER: usize = 64;

/// One renderable frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModelFrame {
    /// Strictly increasing per publisher
    pub sequence: u64,
    /// Contract revision the frame was derived from
    pub revision: u64,
    pub metrics: DerivedMetrics,
    /// Rendered (possibly mid-animation) series
    pub series: ChartSeriesSet,
    /// Whether more frames follow for this revision
    pub animating: bool,
}

/// Receiving end of a subscription
///
/// Dropping it unregisters the subscriber.
#[derive(Debug)]
pub struct FrameSubscription {
    id: SubscriberId,
    receiver: broadcast::Receiver<Arc<ViewModelFrame>>,
    /// Latest frame at subscribe time, handed out first
    pending: Option<Arc<ViewModelFrame>>,
    membership: CancellationToken,
}

impl FrameSubscription {
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next frame; `None` once the publisher is gone or this subscriber was removed
    ///
    /// Frames overwritten while this subscriber lagged are skipped.
    pub async fn recv(&mut self) -> Option<Arc<ViewModelFrame>> {
        if let Some(frame) = self.pending.take() {
            return Some(frame);
        }
        loop {
            tokio::select! {
                biased;
                () = self.membership.cancelled() => return None,
                received = self.receiver.recv() => match received {
                    Ok(frame) => return Some(frame),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(subscriber = %self.id, skipped, "Subscriber lagged, skipping to newer frames");
                    }
                    Err(RecvError::Closed) => return None,
                },
            }
        }
    }

    /// Next frame if one is queued
    pub fn try_recv(&mut self) -> Option<Arc<ViewModelFrame>> {
        if let Some(frame) = self.pending.take() {
            return Some(frame);
        }
        if self.membership.is_cancelled() {
            return None;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(frame) => return Some(frame),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(subscriber = %self.id, skipped, "Subscriber lagged, skipping to newer frames");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        self.membership.cancel();
    }
}

#[derive(Debug)]
struct PublisherState {
    sender: broadcast::Sender<Arc<ViewModelFrame>>,
    subscribers: HashMap<SubscriberId, CancellationToken>,
    latest: Option<Arc<ViewModelFrame>>,
    next_sequence: u64,
}

/// Frame fan-out
#[derive(Debug)]
pub struct ViewModelPublisher {
    state: Mutex<PublisherState>,
}

impl Default for ViewModelPublisher {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FRAME_BUFFER)
    }
}

impl ViewModelPublisher {
    /// Create publisher with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create publisher retaining `capacity` frames per subscriber
    ///
    /// The channel rounds capacity up to a power of two; zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Mutex::new(PublisherState {
                sender,
                subscribers: HashMap::new(),
                latest: None,
                next_sequence: 0,
            }),
        }
    }

    /// Register a subscriber; it receives the latest frame straight away
    pub fn subscribe(&self) -> FrameSubscription {
        let id = SubscriberId::new();
        let membership = CancellationToken::new();
        let mut state = self.state.lock();
        state.subscribers.insert(id, membership.clone());
        tracing::debug!(subscriber = %id, total = state.subscribers.len(), "Subscriber added");
        FrameSubscription {
            id,
            receiver: state.sender.subscribe(),
            pending: state.latest.clone(),
            membership,
        }
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut state = self.state.lock();
        let Some(membership) = state.subscribers.remove(&id) else {
            return false;
        };
        membership.cancel();
        tracing::debug!(subscriber = %id, remaining = state.subscribers.len(), "Subscriber removed");
        true
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .subscribers
            .values()
            .filter(|membership| !membership.is_cancelled())
            .count()
    }

    /// Most recently published frame
    #[must_use]
    pub fn latest(&self) -> Option<Arc<ViewModelFrame>> {
        self.state.lock().latest.clone()
    }

    /// Publish a frame to every subscriber
    ///
    /// Dropped subscriptions are pruned.
    pub fn publish(
        &self,
        revision: u64,
        metrics: DerivedMetrics,
        series: ChartSeriesSet,
        animating: bool,
    ) -> Arc<ViewModelFrame> {
        let mut state = self.state.lock();
        state.next_sequence += 1;
        let frame = Arc::new(ViewModelFrame {
            sequence: state.next_sequence,
            revision,
            metrics,
            series,
            animating,
        });

        let before = state.subscribers.len();
        state.subscribers.retain(|_, membership| !membership.is_cancelled());
        let pruned = before - state.subscribers.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned closed subscribers");
        }

        // no receivers is fine; the frame is still kept as latest
        let _ = state.sender.send(Arc::clone(&frame));
        state.latest = Some(Arc::clone(&frame));
        tracing::trace!(sequence = frame.sequence, revision, animating, "Published frame");
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cna_metrics::{build_series, MarketConfig};
    use cna_test_utils::{fixed_engine, ups_contract};

    fn publish(publisher: &ViewModelPublisher, animating: bool) -> Arc<ViewModelFrame> {
        let snapshot = ups_contract();
        let metrics = fixed_engine(70).derive(&snapshot).unwrap();
        let series = build_series(&snapshot, &MarketConfig::default()).unwrap();
        publisher.publish(1, metrics, series, animating)
    }

    #[test]
    fn sequence_is_strictly_increasing() {
        let publisher = ViewModelPublisher::new();
        let mut sub = publisher.subscribe();
        for _ in 0..5 {
            publish(&publisher, true);
        }
        let mut last = 0;
        while let Some(frame) = sub.try_recv() {
            assert!(frame.sequence > last);
            last = frame.sequence;
        }
        assert_eq!(last, 5);
    }

    #[test]
    fn late_subscriber_gets_latest_frame() {
        let publisher = ViewModelPublisher::new();
        publish(&publisher, true);
        let latest = publish(&publisher, false);

        let mut sub = publisher.subscribe();
        assert_eq!(sub.try_recv(), Some(latest));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let publisher = ViewModelPublisher::new();
        let keep = publisher.subscribe();
        drop(publisher.subscribe());
        assert_eq!(publisher.subscriber_count(), 1);

        publish(&publisher, false);
        assert_eq!(publisher.state.lock().subscribers.len(), 1);
        drop(keep);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn stalled_subscriber_keeps_at_most_the_buffer() {
        let publisher = ViewModelPublisher::with_capacity(4);
        let mut stalled = publisher.subscribe();
        for i in 0..100 {
            publish(&publisher, i < 99);
        }

        let mut drained = Vec::new();
        while let Some(frame) = stalled.try_recv() {
            drained.push(frame);
        }
        assert!(drained.len() <= 4, "retained {} frames", drained.len());
        assert!(drained.windows(2).all(|w| w[0].sequence < w[1].sequence));
        let last = drained.last().unwrap();
        assert_eq!(last.sequence, 100);
        assert!(!last.animating);
    }

    #[tokio::test]
    async fn lagging_reader_skips_to_settled_frame() {
        let publisher = ViewModelPublisher::with_capacity(2);
        let mut sub = publisher.subscribe();
        for i in 0..10 {
            publish(&publisher, i < 9);
        }
        let first = sub.recv().await.unwrap();
        assert_eq!(first.sequence, 9);
        let second = sub.recv().await.unwrap();
        assert_eq!(second.sequence, 10);
        assert!(!second.animating);
    }

    #[tokio::test]
    async fn unsubscribed_recv_returns_none() {
        let publisher = ViewModelPublisher::new();
        publish(&publisher, false);
        let mut sub = publisher.subscribe();
        assert!(sub.recv().await.is_some());
        publisher.unsubscribe(sub.id());
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_ends_when_publisher_is_dropped() {
        let publisher = ViewModelPublisher::new();
        let mut sub = publisher.subscribe();
        publish(&publisher, false);
        drop(publisher);
        assert_eq!(sub.recv().await.map(|f| f.sequence), Some(1));
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let publisher = ViewModelPublisher::new();
        let mut sub = publisher.subscribe();
        assert!(publisher.unsubscribe(sub.id()));
        assert!(!publisher.unsubscribe(sub.id()));
        publish(&publisher, false);
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn frames_serialize() {
        let publisher = ViewModelPublisher::new();
        let frame = publish(&publisher, false);
        let json = serde_json::to_value(frame.as_ref()).unwrap();
        assert_eq!(json["sequence"], 1);
        assert!(json["series"]["discountComparison"].is_array());
        assert_eq!(json["metrics"]["carrier"], "UPS");
    }
}
