//! ChatRoom DTOs

use crate::dtos::ParticipantDTO;
use crate::entities::ChatRoom;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Room returned by `GET /events/{id}/chat`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomDTO {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<ParticipantDTO>,
}

impl From<ChatRoom> for ChatRoomDTO {
    fn from(value: ChatRoom) -> Self {
        Self {
            id: value.id,
            event_id: value.event_id,
            name: value.name,
            description: value.description,
            created_at: value.created_at,
            participants: Vec::new(), // da popolare manualmente se necessario
        }
    }
}

/// DTO per creare una nuova chat room (senza id e created_at)
#[derive(Debug, Clone)]
pub struct CreateChatRoomDTO {
    pub event_id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl CreateChatRoomDTO {
    /// Name and description are derived from the event title
    pub fn for_event(event_id: i64, title: &str) -> Self {
        Self {
            event_id,
            name: format!("{} Chat", title),
            description: Some(format!("Chat room for {}", title)),
        }
    }
}
