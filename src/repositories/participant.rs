//! ParticipantRepository - membership rows of the chat rooms

use super::{Delete, PoolType, Read, Update};
use crate::dtos::{CreateParticipantDTO, UpdateParticipantDTO};
use crate::entities::Participant;
use sqlx::Error;

const PARTICIPANT_COLUMNS: &str = "chat_room_id, user_id, role, is_muted, joined_at";

pub struct ParticipantRepository {
    connection_pool: PoolType,
}

impl ParticipantRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// All participants of a room, oldest member first
    pub async fn find_many_by_room(&self, chat_room_id: &i64) -> Result<Vec<Participant>, Error> {
        sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM chat_participants WHERE chat_room_id = ? ORDER BY joined_at ASC, user_id ASC"
        ))
        .bind(chat_room_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Idempotent insert.
    ///
    /// # Returns
    /// * `Ok(Some(p))` - The row was created by this call
    /// * `Ok(None)` - The user was already a participant
    pub async fn insert_if_missing(
        &self,
        data: &CreateParticipantDTO,
    ) -> Result<Option<Participant>, Error> {
        sqlx::query_as::<_, Participant>(&format!(
            r#"
            INSERT INTO chat_participants (chat_room_id, user_id, role, is_muted, joined_at)
            VALUES (?, ?, ?, 0, ?)
            ON CONFLICT (chat_room_id, user_id) DO NOTHING
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(data.chat_room_id)
        .bind(data.user_id)
        .bind(data.role)
        .bind(data.joined_at)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Read<Participant, (i64, i64)> for ParticipantRepository {
    /// Key is `(chat_room_id, user_id)`
    async fn read(&self, id: &(i64, i64)) -> Result<Option<Participant>, Error> {
        sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM chat_participants WHERE chat_room_id = ? AND user_id = ?"
        ))
        .bind(id.0)
        .bind(id.1)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Update<Participant, UpdateParticipantDTO, (i64, i64)> for ParticipantRepository {
    async fn update(
        &self,
        id: &(i64, i64),
        data: &UpdateParticipantDTO,
    ) -> Result<Participant, Error> {
        // COALESCE lascia invariati i campi non specificati
        sqlx::query_as::<_, Participant>(&format!(
            r#"
            UPDATE chat_participants
            SET role = COALESCE(?, role), is_muted = COALESCE(?, is_muted)
            WHERE chat_room_id = ? AND user_id = ?
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(data.role)
        .bind(data.is_muted)
        .bind(id.0)
        .bind(id.1)
        .fetch_optional(&self.connection_pool)
        .await?
        .ok_or(Error::RowNotFound)
    }
}

impl Delete<(i64, i64)> for ParticipantRepository {
    async fn delete(&self, id: &(i64, i64)) -> Result<bool, Error> {
        let result =
            sqlx::query("DELETE FROM chat_participants WHERE chat_room_id = ? AND user_id = ?")
                .bind(id.0)
                .bind(id.1)
                .execute(&self.connection_pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
