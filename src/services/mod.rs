//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Handlers are grouped by resource. Every chat handler receives the
//! authenticated `User` and the `EventAccess` resolved by the access guard as
//! extensions; notifications only need the user.

pub mod message;
pub mod notification;
pub mod participant;
pub mod reaction;
pub mod room;

// Re-exports per facilitare l'import
pub use message::{create_message, delete_message, edit_message, list_messages};
pub use notification::{list_notifications, mark_notification_read};
pub use participant::{list_participants, update_participant};
pub use reaction::toggle_reaction;
pub use room::get_chat_room;

use crate::core::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
