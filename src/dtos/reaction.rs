//! Reaction DTOs

use crate::entities::Reaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionDTO {
    pub id: i64,
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl From<Reaction> for ReactionDTO {
    fn from(value: Reaction) -> Self {
        Self {
            id: value.id,
            message_id: value.message_id,
            user_id: value.user_id,
            emoji: value.emoji,
            created_at: value.created_at,
        }
    }
}

/// Body of `POST /events/{id}/chat/reaction`
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionRequest {
    pub message_id: i64,
    #[validate(length(min = 1, max = 32, message = "Emoji must be between 1 and 32 characters"))]
    pub emoji: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

/// Outcome of a toggle: `reaction` is the new row when added, `None` when
/// removed. `reactions` is the message's full list after the toggle.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReactionToggleDTO {
    pub action: ReactionAction,
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub reaction: Option<ReactionDTO>,
    pub reactions: Vec<ReactionDTO>,
}

#[derive(Debug, Clone)]
pub struct CreateReactionDTO {
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}
