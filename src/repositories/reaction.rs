//! ReactionRepository - (message, user, emoji) triples

use super::{Create, Delete, PoolType};
use crate::dtos::CreateReactionDTO;
use crate::entities::Reaction;
use sqlx::{Error, QueryBuilder, Sqlite};

const REACTION_COLUMNS: &str = "id, message_id, user_id, emoji, created_at";

pub struct ReactionRepository {
    connection_pool: PoolType,
}

impl ReactionRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    pub async fn find_one(
        &self,
        message_id: &i64,
        user_id: &i64,
        emoji: &str,
    ) -> Result<Option<Reaction>, Error> {
        sqlx::query_as::<_, Reaction>(&format!(
            "SELECT {REACTION_COLUMNS} FROM message_reactions WHERE message_id = ? AND user_id = ? AND emoji = ?"
        ))
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Removes the triple, whatever its id. Returns whether a row was removed.
    pub async fn delete_triple(
        &self,
        message_id: &i64,
        user_id: &i64,
        emoji: &str,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = ? AND user_id = ? AND emoji = ?",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All reactions on one message, in the order they were added
    pub async fn find_many_by_message(&self, message_id: &i64) -> Result<Vec<Reaction>, Error> {
        sqlx::query_as::<_, Reaction>(&format!(
            "SELECT {REACTION_COLUMNS} FROM message_reactions WHERE message_id = ? ORDER BY id ASC"
        ))
        .bind(message_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Reactions for a whole page of messages in one query
    pub async fn find_many_by_messages(&self, message_ids: &[i64]) -> Result<Vec<Reaction>, Error> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {REACTION_COLUMNS} FROM message_reactions WHERE message_id IN ("
        ));
        let mut separated = query.separated(", ");
        for id in message_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        query
            .build_query_as::<Reaction>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

impl Create<Reaction, CreateReactionDTO> for ReactionRepository {
    async fn create(&self, data: &CreateReactionDTO) -> Result<Reaction, Error> {
        sqlx::query_as::<_, Reaction>(&format!(
            "INSERT INTO message_reactions (message_id, user_id, emoji, created_at) VALUES (?, ?, ?, ?) RETURNING {REACTION_COLUMNS}"
        ))
        .bind(data.message_id)
        .bind(data.user_id)
        .bind(&data.emoji)
        .bind(data.created_at)
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Delete<i64> for ReactionRepository {
    async fn delete(&self, id: &i64) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM message_reactions WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
