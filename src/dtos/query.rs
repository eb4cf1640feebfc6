//! Query DTOs - query string parameters

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query parameters of `GET /events/{id}/chat/messages`.
///
/// `cursor` walks towards older messages, `beforeId` towards newer ones; at
/// most one of the two may be given.
#[derive(Serialize, Deserialize, Debug, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    #[serde(default)]
    pub cursor: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    #[serde(default)]
    pub before_id: Option<i64>,
}

/// Query parameters of `GET /notifications`
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub unread: Option<bool>,
}
