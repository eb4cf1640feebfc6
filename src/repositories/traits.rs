//! Common repository traits
//!
//! Generic CRUD seams implemented by the repositories where the operation fits
//! the table. Operations that do not (paginated reads, upserts, soft deletes)
//! live as inherent methods on the repository.

/// Inserts a new row and returns it with the id assigned by the store.
///
/// # Type Parameters
/// * `Entity` - Row type returned after insertion
/// * `CreateDTO` - Input without the generated fields
pub trait Create<Entity, CreateDTO> {
    /// # Returns
    /// * `Ok(Entity)` - The inserted row
    /// * `Err(sqlx::Error)` - Insert failed (unique violations included)
    async fn create(&self, data: &CreateDTO) -> Result<Entity, sqlx::Error>;
}

/// Reads one row by primary key (`i64`, or a tuple for composite keys).
pub trait Read<Entity, Id> {
    /// `Ok(None)` when no row has that key.
    async fn read(&self, id: &Id) -> Result<Option<Entity>, sqlx::Error>;
}

/// Reads many rows by primary key in a single query.
///
/// Rows come back in store order, which need not match the order of `ids`;
/// missing ids are simply absent from the result.
pub trait ReadMany<Entity, Id> {
    async fn read_many(&self, ids: &[Id]) -> Result<Vec<Entity>, sqlx::Error>;
}

/// Partial update: only `Some(_)` fields of the DTO are written.
pub trait Update<Entity, UpdateDTO, Id> {
    /// # Returns
    /// * `Ok(Entity)` - Row after the update
    /// * `Err(sqlx::Error::RowNotFound)` - No row with that key
    async fn update(&self, id: &Id, data: &UpdateDTO) -> Result<Entity, sqlx::Error>;
}

/// Removes a row by primary key. Messages never implement this: they are
/// soft-deleted.
pub trait Delete<Id> {
    /// `Ok(true)` when a row was removed, `Ok(false)` when none matched.
    async fn delete(&self, id: &Id) -> Result<bool, sqlx::Error>;
}
