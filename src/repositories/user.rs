//! UserRepository - read access to the planner's user records

use super::{PoolType, Read, ReadMany};
use crate::entities::User;
use sqlx::{Error, QueryBuilder, Sqlite};

// USER REPO
pub struct UserRepository {
    connection_pool: PoolType,
}

impl UserRepository {
    pub fn new(connection_pool: PoolType) -> UserRepository {
        Self { connection_pool }
    }
}

impl Read<User, i64> for UserRepository {
    async fn read(&self, id: &i64) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>("SELECT id, name, email, image FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl ReadMany<User, i64> for UserRepository {
    async fn read_many(&self, ids: &[i64]) -> Result<Vec<User>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, name, email, image FROM users WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query
            .build_query_as::<User>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn read_many_skips_unknown_ids(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        let mut users = repo.read_many(&[3, 1, 42]).await?;
        users.sort_by_key(|u| u.id);

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "alice");
        assert_eq!(users[1].name, "charlie");
        assert!(repo.read_many(&[]).await?.is_empty());
        Ok(())
    }
}
