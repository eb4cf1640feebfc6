//! Entities module - domain entities
//!
//! Every entity maps one table. Events, collaborators and users are owned by the
//! surrounding planner application and are only read here.

pub mod chat_room;
pub mod enums;
pub mod event;
pub mod message;
pub mod notification;
pub mod participant;
pub mod reaction;
pub mod user;

// Re-exports per facilitare l'import
pub use chat_room::ChatRoom;
pub use enums::{MessageType, NotificationType, ParticipantRole};
pub use event::{Event, EventCollaborator, EventDetails};
pub use message::{Message, TOMBSTONE};
pub use notification::Notification;
pub use participant::Participant;
pub use reaction::Reaction;
pub use user::User;
