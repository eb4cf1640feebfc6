//! Notification DTOs

use crate::entities::{Notification, NotificationType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDTO {
    pub id: i64,
    pub user_id: i64,
    pub event_id: Option<i64>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationDTO {
    fn from(value: Notification) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            event_id: value.event_id,
            notification_type: value.notification_type,
            message: value.message,
            is_read: value.is_read,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateNotificationDTO {
    pub user_id: i64,
    pub event_id: Option<i64>,
    pub notification_type: NotificationType,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
