//! Room event DTOs - payloads carried by the broadcast hub and the stream

use crate::dtos::{MessageDTO, ParticipantDTO, ReactionDTO};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tagged union of everything a stream client can receive.
///
/// Serde writes it as `{ "type": "new_message", "data": { ... } }`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum RoomEvent {
    /// First frame of every stream, only ever sent to its own subscriber
    Connected {
        event_id: i64,
        user_id: i64,
        timestamp: DateTime<Utc>,
    },
    /// Keep-alive
    Ping { timestamp: DateTime<Utc> },
    NewMessage(MessageDTO),
    MessageUpdated(MessageDTO),
    MessageDeleted {
        message_id: i64,
        chat_room_id: i64,
        deleted_by: i64,
    },
    ReactionAdded(ReactionEventDTO),
    ReactionRemoved(ReactionEventDTO),
    ParticipantJoined(ParticipantDTO),
    ParticipantLeft { chat_room_id: i64, user_id: i64 },
}

impl RoomEvent {
    /// Wire name of the variant, as found in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            RoomEvent::Connected { .. } => "connected",
            RoomEvent::Ping { .. } => "ping",
            RoomEvent::NewMessage(_) => "new_message",
            RoomEvent::MessageUpdated(_) => "message_updated",
            RoomEvent::MessageDeleted { .. } => "message_deleted",
            RoomEvent::ReactionAdded(_) => "reaction_added",
            RoomEvent::ReactionRemoved(_) => "reaction_removed",
            RoomEvent::ParticipantJoined(_) => "participant_joined",
            RoomEvent::ParticipantLeft { .. } => "participant_left",
        }
    }
}

/// Reaction change with the message's reaction list after the change
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEventDTO {
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub reactions: Vec<ReactionDTO>,
}
