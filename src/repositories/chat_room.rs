//! ChatRoomRepository - one room per event, created together with its seed data

use super::{PoolType, Read};
use crate::dtos::CreateChatRoomDTO;
use crate::entities::{ChatRoom, MessageType, ParticipantRole};
use chrono::Utc;
use sqlx::Error;
use tracing::{debug, instrument};

const ROOM_COLUMNS: &str = "id, event_id, name, description, created_at";

// CHAT ROOM REPO
pub struct ChatRoomRepository {
    connection_pool: PoolType,
}

impl ChatRoomRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    pub async fn find_by_event_id(&self, event_id: &i64) -> Result<Option<ChatRoom>, Error> {
        sqlx::query_as::<_, ChatRoom>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE event_id = ?"
        ))
        .bind(event_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Creates the room, its seed participants and the system announcement in
    /// one transaction.
    ///
    /// The room insert is the first statement, so a concurrent creation for the
    /// same event fails on `chat_rooms.event_id` UNIQUE before anything else is
    /// written; the caller resolves that conflict by reading the winner's room.
    ///
    /// # Arguments
    /// * `data` - Room to create
    /// * `seed` - `(user_id, role)` participants to add
    /// * `announced_by` - Author of the system message
    /// * `announcement` - Content of the system message
    #[instrument(skip(self, data, seed, announcement), fields(event_id = data.event_id))]
    pub async fn create_seeded(
        &self,
        data: &CreateChatRoomDTO,
        seed: &[(i64, ParticipantRole)],
        announced_by: i64,
        announcement: &str,
    ) -> Result<ChatRoom, Error> {
        let now = Utc::now();
        let mut tx = self.connection_pool.begin().await?;

        let room = sqlx::query_as::<_, ChatRoom>(&format!(
            "INSERT INTO chat_rooms (event_id, name, description, created_at) VALUES (?, ?, ?, ?) RETURNING {ROOM_COLUMNS}"
        ))
        .bind(data.event_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for (user_id, role) in seed {
            sqlx::query(
                r#"
                INSERT INTO chat_participants (chat_room_id, user_id, role, is_muted, joined_at)
                VALUES (?, ?, ?, 0, ?)
                ON CONFLICT (chat_room_id, user_id) DO NOTHING
                "#,
            )
            .bind(room.id)
            .bind(user_id)
            .bind(role)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO chat_messages (chat_room_id, user_id, content, message_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(room.id)
        .bind(announced_by)
        .bind(announcement)
        .bind(MessageType::System)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(room_id = room.id, participants = seed.len(), "Chat room created");

        Ok(room)
    }
}

impl Read<ChatRoom, i64> for ChatRoomRepository {
    async fn read(&self, id: &i64) -> Result<Option<ChatRoom>, Error> {
        sqlx::query_as::<_, ChatRoom>(&format!("SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::is_unique_violation;
    use sqlx::SqlitePool;

    fn room_for(event_id: i64) -> CreateChatRoomDTO {
        CreateChatRoomDTO {
            event_id,
            name: "Board Meeting Chat".to_string(),
            description: Some("Chat room for Board Meeting".to_string()),
        }
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events")))]
    async fn create_seeded_writes_room_participants_and_announcement(
        pool: SqlitePool,
    ) -> sqlx::Result<()> {
        let repo = ChatRoomRepository::new(pool.clone());

        let room = repo
            .create_seeded(&room_for(2), &[(1, ParticipantRole::Admin)], 1, "created")
            .await?;

        assert_eq!(repo.find_by_event_id(&2).await?.map(|r| r.id), Some(room.id));

        let (participants,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM chat_participants WHERE chat_room_id = ?")
                .bind(room.id)
                .fetch_one(&pool)
                .await?;
        let (messages,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM chat_messages WHERE chat_room_id = ? AND message_type = 'system'",
        )
        .bind(room.id)
        .fetch_one(&pool)
        .await?;

        assert_eq!(participants, 1);
        assert_eq!(messages, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events")))]
    async fn second_room_for_same_event_is_a_unique_violation(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = ChatRoomRepository::new(pool.clone());
        repo.create_seeded(&room_for(2), &[], 1, "created").await?;

        let err = repo
            .create_seeded(&room_for(2), &[], 1, "created")
            .await
            .expect_err("event_id is unique");
        assert!(is_unique_violation(&err));

        // the failed transaction left nothing behind
        let (rooms,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_rooms WHERE event_id = 2")
            .fetch_one(&pool)
            .await?;
        assert_eq!(rooms, 1);
        Ok(())
    }
}
