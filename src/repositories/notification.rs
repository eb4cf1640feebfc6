//! NotificationRepository - reminders and chat notifications

use super::{Create, PoolType};
use crate::dtos::CreateNotificationDTO;
use crate::entities::{Notification, NotificationType};
use sqlx::Error;

const NOTIFICATION_COLUMNS: &str = "id, user_id, event_id, type, message, is_read, created_at";

pub struct NotificationRepository {
    connection_pool: PoolType,
}

impl NotificationRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// Whether `user_id` was already reminded about `event_id`
    pub async fn has_reminder(&self, event_id: &i64, user_id: &i64) -> Result<bool, Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE event_id = ? AND user_id = ? AND type = ?",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(NotificationType::Reminder)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok(count > 0)
    }

    /// A user's notifications, newest first
    pub async fn find_many_by_user(
        &self,
        user_id: &i64,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, Error> {
        let filter = if unread_only { "AND is_read = 0" } else { "" };
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? {filter} ORDER BY id DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Marks one of the user's notifications as read. `None` when the
    /// notification does not exist or belongs to someone else.
    pub async fn mark_read(&self, id: &i64, user_id: &i64) -> Result<Option<Notification>, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ? RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Create<Notification, CreateNotificationDTO> for NotificationRepository {
    async fn create(&self, data: &CreateNotificationDTO) -> Result<Notification, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (user_id, event_id, type, message, is_read, created_at) VALUES (?, ?, ?, ?, 0, ?) RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(data.user_id)
        .bind(data.event_id)
        .bind(data.notification_type)
        .bind(&data.message)
        .bind(data.created_at)
        .fetch_one(&self.connection_pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::is_unique_violation;
    use chrono::Utc;
    use sqlx::SqlitePool;

    fn reminder(user_id: i64) -> CreateNotificationDTO {
        CreateNotificationDTO {
            user_id,
            event_id: Some(1),
            notification_type: NotificationType::Reminder,
            message: "Reminder".to_string(),
            created_at: Utc::now(),
        }
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events")))]
    async fn store_refuses_a_second_reminder(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = NotificationRepository::new(pool);

        assert!(!repo.has_reminder(&1, &2).await?);
        repo.create(&reminder(2)).await?;
        assert!(repo.has_reminder(&1, &2).await?);

        let err = repo.create(&reminder(2)).await.expect_err("one reminder per pair");
        assert!(is_unique_violation(&err));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events")))]
    async fn chat_notifications_do_not_count_as_reminders(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = NotificationRepository::new(pool);
        let mut chat = reminder(3);
        chat.notification_type = NotificationType::ChatMessage;

        repo.create(&chat).await?;
        repo.create(&chat).await?;

        assert!(!repo.has_reminder(&1, &3).await?);
        assert_eq!(repo.find_many_by_user(&3, true, 10).await?.len(), 2);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events")))]
    async fn mark_read_is_scoped_to_the_owner(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = NotificationRepository::new(pool);
        let notification = repo.create(&reminder(2)).await?;

        assert!(repo.mark_read(&notification.id, &3).await?.is_none());
        let read = repo.mark_read(&notification.id, &2).await?.expect("owner can read");
        assert!(read.is_read);
        assert!(repo.find_many_by_user(&2, true, 10).await?.is_empty());
        Ok(())
    }
}
