//! DTOs module - Data Transfer Objects
//!
//! External representation (REST bodies, stream payloads) kept apart from the
//! entities. Client-facing DTOs use camelCase field names.

pub mod chat_room;
pub mod message;
pub mod notification;
pub mod participant;
pub mod query;
pub mod reaction;
pub mod room_event;
pub mod user;

pub use chat_room::{ChatRoomDTO, CreateChatRoomDTO};
pub use message::{
    CreateMessageDTO, EditMessageRequest, MessageDTO, MessagePageDTO, ReplyPreviewDTO,
    SendMessageRequest,
};
pub use notification::{CreateNotificationDTO, NotificationDTO};
pub use participant::{CreateParticipantDTO, ParticipantDTO, UpdateParticipantDTO};
pub use query::{MessagesQuery, NotificationsQuery};
pub use reaction::{
    CreateReactionDTO, ReactionAction, ReactionDTO, ReactionToggleDTO, ToggleReactionRequest,
};
pub use room_event::{ReactionEventDTO, RoomEvent};
pub use user::UserDTO;
