//! Repositories module - one repository per table
//!
//! Queries are runtime-checked (`sqlx::query_as::<_, T>` + `FromRow`), so the
//! crate builds without a live database. Every repository owns a clone of the
//! shared pool.

pub mod chat_room;
pub mod event;
pub mod message;
pub mod notification;
pub mod participant;
pub mod reaction;
pub mod traits;
pub mod user;

// alias di tipo per il pool, per semplificare lo switch in caso in cui vogliamo usare un altro db
pub type PoolType = sqlx::SqlitePool;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{Create, Delete, Read, ReadMany, Update};

// Re-esportazione delle struct dei repository per facilitare l'import
pub use chat_room::ChatRoomRepository;
pub use event::EventRepository;
pub use message::{MessageRepository, PageDirection};
pub use notification::NotificationRepository;
pub use participant::ParticipantRepository;
pub use reaction::ReactionRepository;
pub use user::UserRepository;
