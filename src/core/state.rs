//! Application State - shared state injected into every handler
//!
//! Holds the repositories, the configuration and the broadcast hub. The hub is
//! built here, once per process, and handed to handlers through `Arc<AppState>`.

use crate::core::Config;
use crate::repositories::{
    ChatRoomRepository, EventRepository, MessageRepository, NotificationRepository,
    ParticipantRepository, ReactionRepository, UserRepository,
};
use crate::stream::BroadcastHub;
use sqlx::SqlitePool;

/// Global state shared by all routes, middleware and the reminder scheduler
pub struct AppState {
    /// User store (display info and authentication lookup)
    pub user: UserRepository,

    /// Event and collaborator store
    pub event: EventRepository,

    /// Chat rooms, one per event
    pub room: ChatRoomRepository,

    /// Chat room participants
    pub participant: ParticipantRepository,

    /// Chat messages
    pub msg: MessageRepository,

    /// Message reactions
    pub reaction: ReactionRepository,

    /// User notifications
    pub notification: NotificationRepository,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Runtime configuration
    pub config: Config,

    /// Per-event fan-out of room events to the open streams
    pub hub: BroadcastHub,
}

impl AppState {
    /// Builds the state, every repository sharing the given pool.
    ///
    /// # Arguments
    /// * `pool` - Pool di connessioni condiviso
    /// * `config` - Configurazione runtime (JWT secret, keep-alive, capacità del hub)
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self {
            user: UserRepository::new(pool.clone()),
            event: EventRepository::new(pool.clone()),
            room: ChatRoomRepository::new(pool.clone()),
            participant: ParticipantRepository::new(pool.clone()),
            msg: MessageRepository::new(pool.clone()),
            reaction: ReactionRepository::new(pool.clone()),
            notification: NotificationRepository::new(pool),
            jwt_secret: config.jwt_secret.clone(),
            hub: BroadcastHub::new(config.broadcast_capacity),
            config,
        }
    }
}
