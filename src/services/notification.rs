//! Notification services - the current user's notification feed

use crate::core::{AppError, AppState};
use crate::dtos::{NotificationDTO, NotificationsQuery};
use crate::entities::User;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Upper bound on one listing
const NOTIFICATION_LIMIT: i64 = 100;

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<NotificationDTO>>, AppError> {
    let unread_only = query.unread.unwrap_or(false);
    debug!("Listing notifications (unread only: {})", unread_only);

    let notifications: Vec<NotificationDTO> = state
        .notification
        .find_many_by_user(&current_user.id, unread_only, NOTIFICATION_LIMIT)
        .await?
        .into_iter()
        .map(NotificationDTO::from)
        .collect();

    info!("Returning {} notifications", notifications.len());
    Ok(Json(notifications))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, notification_id = %notification_id))]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(notification_id): Path<i64>,
) -> Result<Json<NotificationDTO>, AppError> {
    let notification = state
        .notification
        .mark_read(&notification_id, &current_user.id)
        .await?
        .ok_or_else(|| {
            // anche le notifiche di altri utenti risultano "non trovate"
            warn!("Notification {} not found for user", notification_id);
            AppError::not_found("Notification not found")
        })?;

    debug!("Notification {} marked as read", notification.id);
    Ok(Json(NotificationDTO::from(notification)))
}
