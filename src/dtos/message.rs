//! Message DTOs - Data Transfer Objects per messaggi

use crate::dtos::{ReactionDTO, UserDTO};
use crate::entities::{Message, MessageType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Message as seen by clients, on the REST API and on the stream
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MessageDTO {
    pub id: i64,
    pub chat_room_id: i64,
    pub user_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub reply_to_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyPreviewDTO>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDTO>,
    #[serde(default)]
    pub reactions: Vec<ReactionDTO>,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            id: value.id,
            chat_room_id: value.chat_room_id,
            user_id: value.user_id,
            content: value.content,
            message_type: value.message_type,
            file_url: value.file_url,
            file_name: value.file_name,
            file_size: value.file_size,
            reply_to_id: value.reply_to_id,
            reply_to: None,
            is_edited: value.is_edited,
            is_deleted: value.is_deleted,
            created_at: value.created_at,
            updated_at: value.updated_at,
            user: None,
            reactions: Vec::new(),
        }
    }
}

/// Short view of the message being replied to
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPreviewDTO {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_deleted: bool,
}

impl From<&Message> for ReplyPreviewDTO {
    fn from(value: &Message) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            content: value.content.clone(),
            is_deleted: value.is_deleted,
        }
    }
}

/// Body of `POST /events/{id}/chat/messages`
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(max = 5000, message = "Message content must be at most 5000 characters"))]
    pub content: Option<String>,

    #[validate(url(message = "fileUrl must be a valid URL"))]
    pub file_url: Option<String>,

    #[validate(length(min = 1, max = 255, message = "fileName must be between 1 and 255 characters"))]
    pub file_name: Option<String>,

    #[validate(range(min = 0, message = "fileSize cannot be negative"))]
    pub file_size: Option<i64>,

    pub reply_to_id: Option<i64>,
}

impl SendMessageRequest {
    /// Trimmed content, `None` when missing or blank
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|content| !content.is_empty())
    }

    /// File url, `None` when missing or blank
    pub fn file(&self) -> Option<&str> {
        self.file_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Body of `PATCH /events/{id}/chat/messages/{message_id}`
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,
}

/// DTO per creare un nuovo messaggio (senza id)
#[derive(Debug, Clone)]
pub struct CreateMessageDTO {
    pub chat_room_id: i64,
    pub user_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// One page of `GET /events/{id}/chat/messages`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MessagePageDTO {
    pub messages: Vec<MessageDTO>,
    pub next_cursor: Option<i64>,
    pub has_more: bool,
}
