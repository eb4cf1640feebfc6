//! Stream Module - real-time delivery of room events
//!
//! - `hub`: per-event fan-out of room events to subscribers
//! - `connection`: lifecycle of one client stream (guard, subscribe, keep-alive)
//! - `reconnect`: retry state machine for clients of the stream
//!
//! The endpoint is served as Server-Sent Events: each frame's `data` is one JSON
//! object `{"type": ..., "data": ...}`.

pub mod connection;
pub mod hub;
pub mod reconnect;

// Re-exports pubblici
pub use connection::{ConnectionState, StreamConnection};
pub use hub::{BroadcastHub, RoomPayload, Subscription};
pub use reconnect::{ReconnectInput, ReconnectPolicy, ReconnectState, Reconnector};

use crate::core::{AppError, AppState, EventAccess};
use crate::entities::User;
use crate::services::room::touch_room;
use axum::{
    Extension,
    extract::State,
    response::sse::{Event, Sse},
};
use futures_util::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{info, instrument, warn};

/// Entry point dello stream di una chat room.
///
/// The access guard has already run as middleware; opening the connection runs
/// it again against the same event before subscribing. The connection lives as
/// long as the response body: when the client goes away axum drops the stream,
/// which closes the connection and releases the hub subscription.
#[instrument(skip(state, current_user, access), fields(user_id = %current_user.id, event_id = %access.event_id()))]
pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    touch_room(&state, &access, &current_user).await?;

    let mut connection = StreamConnection::new(
        access.event_id(),
        current_user.id,
        state.config.stream_keepalive,
    );
    let connected = connection.open(&state.hub, &access.event)?;
    info!("Streaming room events to user {}", current_user.id);

    let frames = connection
        .into_stream(connected)
        .filter_map(|payload| match Event::default().json_data(&*payload) {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                warn!("Dropping {} frame that failed to serialize: {:?}", payload.kind(), e);
                None
            }
        });

    Ok(Sse::new(frames))
}
