//! Broadcast Hub - per-event fan-out of room events
//!
//! One `tokio::sync::broadcast` channel per event with at least one open
//! stream. The channel is a bounded ring: a subscriber that falls behind loses
//! the oldest payloads (it sees `Lagged`) while everybody else keeps receiving,
//! and `publish` never waits on any subscriber.

use crate::dtos::RoomEvent;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::{self, Receiver, Sender, error::RecvError};
use tracing::{debug, info, instrument, warn};

/// Payload shared by every subscriber of a publish call
pub type RoomPayload = Arc<RoomEvent>;

struct HubInner {
    /// tx head of the broadcast channel of each event with open streams
    channels: DashMap<i64, Sender<RoomPayload>>,
    capacity: usize,
    next_connection_id: AtomicU64,
}

impl HubInner {
    /// Drops the event's channel once nobody listens to it any more.
    /// `remove_if` runs under the shard lock, so a concurrent `subscribe` on the
    /// same event either sees the old channel before removal or creates a new one.
    fn drop_if_unused(&self, event_id: i64) {
        if self
            .channels
            .remove_if(&event_id, |_, tx| tx.receiver_count() == 0)
            .is_some()
        {
            debug!(event_id, "Removed broadcast channel without subscribers");
        }
    }
}

/// In-memory pub/sub scoped per event. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    /// `capacity` is the per-subscriber queue length
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: DashMap::new(),
                capacity: capacity.max(1),
                next_connection_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a new subscriber for `event_id`
    #[instrument(skip(self))]
    pub fn subscribe(&self, event_id: i64) -> Subscription {
        let receiver = self
            .inner
            .channels
            .entry(event_id)
            .or_insert_with(|| {
                info!("Creating new broadcast channel for event");
                broadcast::channel::<RoomPayload>(self.inner.capacity).0
            })
            .subscribe();

        let connection_id = self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed);
        debug!(connection_id, "Subscribed to event channel");

        Subscription {
            event_id,
            connection_id,
            receiver: Some(receiver),
            hub: Arc::clone(&self.inner),
            dropped: 0,
        }
    }

    /// Removes the subscription. Dropping it has the same effect.
    pub fn unsubscribe(&self, mut subscription: Subscription) {
        subscription.release();
    }

    /// Sends `payload` to every current subscriber of `event_id`.
    ///
    /// Returns how many subscribers the payload was queued for; zero when the
    /// event has no open stream. The map lock is released before sending.
    #[instrument(skip(self, payload), fields(kind = payload.kind()))]
    pub fn publish(&self, event_id: i64, payload: RoomEvent) -> usize {
        let sender = match self.inner.channels.get(&event_id) {
            Some(entry) => entry.value().clone(),
            None => {
                debug!("No open streams for event, payload discarded");
                return 0;
            }
        };

        match sender.send(Arc::new(payload)) {
            Ok(receivers) => {
                debug!(receivers, "Payload broadcast");
                receivers
            }
            Err(_) => {
                warn!("No active receivers, removing channel");
                // Nessuno sta ascoltando, rimuovi il channel
                self.inner.drop_if_unused(event_id);
                0
            }
        }
    }

    /// Number of open subscriptions for an event
    pub fn subscriber_count(&self, event_id: i64) -> usize {
        self.inner
            .channels
            .get(&event_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of events with at least one channel in the map
    pub fn active_events(&self) -> usize {
        self.inner.channels.len()
    }
}

/// Handle of one subscriber. Receives the event's payloads until released;
/// released at most once, on `release` or on drop.
pub struct Subscription {
    event_id: i64,
    connection_id: u64,
    receiver: Option<Receiver<RoomPayload>>,
    hub: Arc<HubInner>,
    dropped: u64,
}

impl Subscription {
    pub fn event_id(&self) -> i64 {
        self.event_id
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Payloads skipped so far because this subscriber lagged behind
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Next payload in publish order. `None` once released or when the hub is
    /// gone. Lagging skips the oldest payloads and keeps going.
    pub async fn recv(&mut self) -> Option<RoomPayload> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        event_id = self.event_id,
                        connection_id = self.connection_id,
                        skipped,
                        "Subscriber lagging, oldest payloads dropped"
                    );
                    self.dropped += skipped;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Gives the subscription back to the hub. Returns `true` only for the
    /// call that actually released it.
    pub fn release(&mut self) -> bool {
        match self.receiver.take() {
            Some(receiver) => {
                drop(receiver);
                self.hub.drop_if_unused(self.event_id);
                debug!(
                    event_id = self.event_id,
                    connection_id = self.connection_id,
                    "Subscription released"
                );
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
