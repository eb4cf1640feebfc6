//! Participant entity - membership of a user in a chat room

use super::enums::ParticipantRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Participant {
    pub chat_room_id: i64,
    pub user_id: i64,
    pub role: ParticipantRole,
    // il partecipante non riceve notifiche per i nuovi messaggi
    pub is_muted: bool,
    pub joined_at: DateTime<Utc>,
}
