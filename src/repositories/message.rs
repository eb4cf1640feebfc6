//! MessageRepository - chat messages, cursor pagination and soft delete

use super::{Create, PoolType, Read, ReadMany};
use crate::dtos::CreateMessageDTO;
use crate::entities::{Message, TOMBSTONE};
use chrono::{DateTime, Utc};
use sqlx::{Error, QueryBuilder, Sqlite};

const MESSAGE_COLUMNS: &str = "id, chat_room_id, user_id, content, message_type, file_url, file_name, \
     file_size, reply_to_id, is_edited, is_deleted, created_at, updated_at";

/// Which slice of a room's history to read. Ids grow with insertion order, so
/// they double as the pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    /// Most recent messages
    Latest,
    /// Messages with id strictly lower than the cursor (walks back in time)
    OlderThan(i64),
    /// Messages with id strictly greater than the cursor (walks forward)
    NewerThan(i64),
}

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: PoolType,
}

impl MessageRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// One page of a room's messages, always ordered newest first.
    ///
    /// Deleted messages are part of the page: their content is already the
    /// tombstone.
    pub async fn find_page(
        &self,
        chat_room_id: &i64,
        direction: PageDirection,
        limit: i64,
    ) -> Result<Vec<Message>, Error> {
        let messages = match direction {
            PageDirection::Latest => {
                sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE chat_room_id = ? ORDER BY id DESC LIMIT ?"
                ))
                .bind(chat_room_id)
                .bind(limit)
                .fetch_all(&self.connection_pool)
                .await?
            }
            PageDirection::OlderThan(cursor) => {
                sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE chat_room_id = ? AND id < ? ORDER BY id DESC LIMIT ?"
                ))
                .bind(chat_room_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.connection_pool)
                .await?
            }
            PageDirection::NewerThan(cursor) => {
                // i più vicini al cursore prima, poi si ribalta per mantenere l'ordine DESC
                let mut page = sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE chat_room_id = ? AND id > ? ORDER BY id ASC LIMIT ?"
                ))
                .bind(chat_room_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.connection_pool)
                .await?;
                page.reverse();
                page
            }
        };

        Ok(messages)
    }

    /// Replaces content, marks the message as edited
    pub async fn update_content(
        &self,
        id: &i64,
        content: &str,
        now: &DateTime<Utc>,
    ) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(&format!(
            "UPDATE chat_messages SET content = ?, is_edited = 1, updated_at = ? WHERE id = ? RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(content)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?
        .ok_or(Error::RowNotFound)
    }

    /// Soft delete: the row stays, content becomes the tombstone and the file
    /// reference is dropped. Irreversible.
    pub async fn soft_delete(&self, id: &i64, now: &DateTime<Utc>) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            UPDATE chat_messages
            SET content = ?, is_deleted = 1, file_url = NULL, file_name = NULL, file_size = NULL, updated_at = ?
            WHERE id = ?
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(TOMBSTONE)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?
        .ok_or(Error::RowNotFound)
    }
}

impl Create<Message, CreateMessageDTO> for MessageRepository {
    async fn create(&self, data: &CreateMessageDTO) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO chat_messages
                (chat_room_id, user_id, content, message_type, file_url, file_name, file_size, reply_to_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(data.chat_room_id)
        .bind(data.user_id)
        .bind(&data.content)
        .bind(data.message_type)
        .bind(&data.file_url)
        .bind(&data.file_name)
        .bind(data.file_size)
        .bind(data.reply_to_id)
        .bind(data.created_at)
        .bind(data.created_at)
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<Message, i64> for MessageRepository {
    async fn read(&self, id: &i64) -> Result<Option<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!("SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl ReadMany<Message, i64> for MessageRepository {
    async fn read_many(&self, ids: &[i64]) -> Result<Vec<Message>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query
            .build_query_as::<Message>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MessageType;
    use sqlx::SqlitePool;

    fn ids(page: &[Message]) -> Vec<i64> {
        page.iter().map(|m| m.id).collect()
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "events", "chat_rooms", "messages")
    ))]
    async fn pages_are_newest_first_in_both_directions(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = MessageRepository::new(pool);

        let latest = repo.find_page(&1, PageDirection::Latest, 2).await?;
        assert_eq!(ids(&latest), vec![5, 4]);

        let older = repo.find_page(&1, PageDirection::OlderThan(4), 2).await?;
        assert_eq!(ids(&older), vec![3, 2]);

        let newer = repo.find_page(&1, PageDirection::NewerThan(1), 2).await?;
        assert_eq!(ids(&newer), vec![3, 2]);
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "events", "chat_rooms", "messages")
    ))]
    async fn soft_delete_keeps_the_row(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = MessageRepository::new(pool);
        let now = Utc::now();

        let created = repo
            .create(&CreateMessageDTO {
                chat_room_id: 1,
                user_id: 2,
                content: "see attachment".to_string(),
                message_type: MessageType::File,
                file_url: Some("https://files.example.com/a.pdf".to_string()),
                file_name: Some("a.pdf".to_string()),
                file_size: Some(1024),
                reply_to_id: Some(4),
                created_at: now,
            })
            .await?;

        let deleted = repo.soft_delete(&created.id, &now).await?;
        assert!(deleted.is_deleted);
        assert_eq!(deleted.content, TOMBSTONE);
        assert!(deleted.file_url.is_none());
        assert_eq!(deleted.reply_to_id, Some(4));

        let still_there = repo.read(&created.id).await?;
        assert!(still_there.is_some());
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "events", "chat_rooms", "messages")
    ))]
    async fn update_content_marks_edited(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = MessageRepository::new(pool);

        let edited = repo.update_content(&3, "Thanks a lot alice", &Utc::now()).await?;
        assert!(edited.is_edited);
        assert_eq!(edited.content, "Thanks a lot alice");

        let missing = repo.update_content(&404, "nope", &Utc::now()).await;
        assert!(matches!(missing, Err(Error::RowNotFound)));
        Ok(())
    }
}
