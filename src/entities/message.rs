//! Message entity - chat message, soft-deleted but never removed

use super::enums::MessageType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Content shown in place of a deleted message.
pub const TOMBSTONE: &str = "This message was deleted";

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Message {
    pub id: i64,
    pub chat_room_id: i64,
    pub user_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    // riferimento non proprietario, il messaggio citato può essere stato cancellato
    pub reply_to_id: Option<i64>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
