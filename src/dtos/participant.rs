//! Participant DTOs

use crate::dtos::UserDTO;
use crate::entities::{Participant, ParticipantRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDTO {
    pub chat_room_id: i64,
    pub user_id: i64,
    pub role: ParticipantRole,
    pub is_muted: bool,
    pub joined_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDTO>,
}

impl From<Participant> for ParticipantDTO {
    fn from(value: Participant) -> Self {
        Self {
            chat_room_id: value.chat_room_id,
            user_id: value.user_id,
            role: value.role,
            is_muted: value.is_muted,
            joined_at: value.joined_at,
            user: None, // arricchito dal servizio con i dati dello user store
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateParticipantDTO {
    pub chat_room_id: i64,
    pub user_id: i64,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
}

/// Body of `PATCH /events/{id}/chat/participants/{user_id}`
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParticipantDTO {
    pub role: Option<ParticipantRole>,
    pub is_muted: Option<bool>,
}
