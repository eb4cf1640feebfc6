//! Stream connection - lifecycle of one client stream
//!
//! `Connecting → Open → Closed`. Opening runs the access guard and subscribes
//! to the hub; the resulting stream races the next hub payload against the
//! keep-alive tick. Dropping the stream (client gone) closes the connection
//! and releases the subscription exactly once.

use crate::core::{AppError, has_access};
use crate::dtos::RoomEvent;
use crate::entities::EventDetails;
use crate::stream::hub::{BroadcastHub, RoomPayload, Subscription};
use chrono::Utc;
use futures_util::stream::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

pub struct StreamConnection {
    event_id: i64,
    user_id: i64,
    keep_alive: Duration,
    state: ConnectionState,
    subscription: Option<Subscription>,
}

impl StreamConnection {
    pub fn new(event_id: i64, user_id: i64, keep_alive: Duration) -> Self {
        Self {
            event_id,
            user_id,
            keep_alive,
            state: ConnectionState::Connecting,
            subscription: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connecting → Open.
    ///
    /// Checks access against `event`, subscribes to the hub and returns the
    /// `connected` frame to send first. A denied connection goes straight to
    /// Closed without ever touching the hub.
    pub fn open(&mut self, hub: &BroadcastHub, event: &EventDetails) -> Result<RoomEvent, AppError> {
        if self.state != ConnectionState::Connecting {
            warn!(state = ?self.state, "Open requested on a connection that is not connecting");
            return Err(AppError::internal_server_error("Stream already opened"));
        }
        if event.event.id != self.event_id || !has_access(event, self.user_id) {
            self.state = ConnectionState::Closed;
            return Err(AppError::access_denied());
        }

        let subscription = hub.subscribe(self.event_id);
        info!(
            event_id = self.event_id,
            user_id = self.user_id,
            connection_id = subscription.connection_id(),
            "Stream opened"
        );
        self.subscription = Some(subscription);
        self.state = ConnectionState::Open;

        Ok(RoomEvent::Connected {
            event_id: self.event_id,
            user_id: self.user_id,
            timestamp: Utc::now(),
        })
    }

    /// Open → Closed, releasing the hub subscription. Idempotent.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.release();
        }
        self.state = ConnectionState::Closed;
        info!(event_id = self.event_id, user_id = self.user_id, "Stream closed");
    }

    /// Turns an open connection into the stream of frames for the client:
    /// `connected` first, then hub payloads interleaved with `ping` every
    /// keep-alive interval. Ends when the hub goes away or right after the
    /// `participant_left` naming this connection's user; the connection is
    /// closed when the stream ends or is dropped.
    pub fn into_stream(mut self, connected: RoomEvent) -> impl Stream<Item = RoomPayload> + Send + 'static {
        async_stream::stream! {
            yield Arc::new(connected);

            let period = self.keep_alive;
            let mut keep_alive = interval_at(Instant::now() + period, period);
            keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let Some(subscription) = self.subscription.as_mut() else {
                    break;
                };
                let next = tokio::select! {
                    payload = subscription.recv() => payload,
                    _ = keep_alive.tick() => Some(Arc::new(RoomEvent::Ping { timestamp: Utc::now() })),
                };
                match next {
                    Some(payload) => {
                        let removed = matches!(
                            payload.as_ref(),
                            RoomEvent::ParticipantLeft { user_id, .. } if *user_id == self.user_id
                        );
                        yield payload;
                        if removed {
                            info!(
                                event_id = self.event_id,
                                user_id = self.user_id,
                                "Participant removed, ending stream"
                            );
                            break;
                        }
                    }
                    None => {
                        debug!(event_id = self.event_id, "Hub channel closed, ending stream");
                        break;
                    }
                }
            }

            self.close();
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Event, EventCollaborator};
    use axum::http::StatusCode;
    use chrono::Duration as ChronoDuration;
    use futures_util::StreamExt;
    use std::pin::pin;

    fn event(collaborators: &[i64]) -> EventDetails {
        let start = Utc::now() + ChronoDuration::days(1);
        EventDetails {
            event: Event {
                id: 1,
                title: "Summer Party".to_string(),
                creator_id: 1,
                start_date: start,
                end_date: start + ChronoDuration::hours(4),
                notify_before: Some(30),
            },
            collaborators: collaborators
                .iter()
                .map(|&user_id| EventCollaborator {
                    event_id: 1,
                    user_id,
                    role: "editor".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn stranger_is_rejected_before_subscribing() {
        let hub = BroadcastHub::new(8);
        let mut connection = StreamConnection::new(1, 4, Duration::from_secs(30));

        let err = connection.open(&hub, &event(&[2])).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(hub.active_events(), 0);
    }

    #[test]
    fn open_twice_is_refused() {
        let hub = BroadcastHub::new(8);
        let mut connection = StreamConnection::new(1, 1, Duration::from_secs(30));
        connection.open(&hub, &event(&[])).unwrap();
        assert!(connection.open(&hub, &event(&[])).is_err());
        assert_eq!(hub.subscriber_count(1), 1);
    }

    #[tokio::test]
    async fn first_frame_is_connected_then_hub_payloads() {
        let hub = BroadcastHub::new(8);
        let mut connection = StreamConnection::new(1, 2, Duration::from_secs(30));
        let connected = connection.open(&hub, &event(&[2])).unwrap();
        assert_eq!(connection.state(), ConnectionState::Open);

        let mut frames = pin!(connection.into_stream(connected));

        match frames.next().await.unwrap().as_ref() {
            RoomEvent::Connected { user_id, event_id, .. } => {
                assert_eq!((*user_id, *event_id), (2, 1));
            }
            other => panic!("expected connected, got {:?}", other),
        }

        hub.publish(
            1,
            RoomEvent::ParticipantLeft {
                chat_room_id: 1,
                user_id: 3,
            },
        );
        assert_eq!(frames.next().await.unwrap().kind(), "participant_left");
    }

    #[tokio::test]
    async fn stream_ends_when_its_own_user_leaves_the_room() {
        let hub = BroadcastHub::new(8);
        let mut connection = StreamConnection::new(1, 2, Duration::from_secs(30));
        let connected = connection.open(&hub, &event(&[2])).unwrap();
        let mut frames = Box::pin(connection.into_stream(connected));
        frames.next().await.unwrap();

        hub.publish(
            1,
            RoomEvent::ParticipantLeft {
                chat_room_id: 1,
                user_id: 2,
            },
        );
        match frames.next().await.unwrap().as_ref() {
            RoomEvent::ParticipantLeft { user_id, .. } => assert_eq!(*user_id, 2),
            other => panic!("expected participant_left, got {:?}", other),
        }
        assert!(frames.next().await.is_none());
        assert_eq!(hub.subscriber_count(1), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_stream_emits_pings_on_the_keep_alive_interval() {
        let hub = BroadcastHub::new(8);
        let mut connection = StreamConnection::new(1, 1, Duration::from_secs(30));
        let connected = connection.open(&hub, &event(&[])).unwrap();
        let mut frames = pin!(connection.into_stream(connected));
        frames.next().await.unwrap();

        let started = Instant::now();
        assert_eq!(frames.next().await.unwrap().kind(), "ping");
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(frames.next().await.unwrap().kind(), "ping");
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn dropping_the_stream_releases_the_subscription() {
        let hub = BroadcastHub::new(8);
        let mut connection = StreamConnection::new(1, 1, Duration::from_secs(30));
        let connected = connection.open(&hub, &event(&[])).unwrap();
        let mut frames = Box::pin(connection.into_stream(connected));
        frames.next().await.unwrap();
        assert_eq!(hub.subscriber_count(1), 1);

        drop(frames);
        assert_eq!(hub.subscriber_count(1), 0);
        assert_eq!(hub.active_events(), 0);
    }

    #[test]
    fn dropping_an_unstarted_stream_releases_too() {
        let hub = BroadcastHub::new(8);
        let mut connection = StreamConnection::new(1, 1, Duration::from_secs(30));
        let connected = connection.open(&hub, &event(&[])).unwrap();
        let frames = connection.into_stream(connected);
        assert_eq!(hub.subscriber_count(1), 1);

        drop(frames);
        assert_eq!(hub.active_events(), 0);
    }
}
