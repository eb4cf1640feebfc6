//! Event chat server library - espone i moduli principali per i test
//!
//! Real-time collaboration layer of the event planner: one chat room per event,
//! live delivery over a server push stream and a background reminder scan.

pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod scheduler;
pub mod services;
pub mod stream;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppError, AppState, Config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(configure_chat_routes(state.clone()))
        .nest("/notifications", configure_notification_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Configura le routes della chat di un evento.
///
/// Layers run bottom-up: authentication first, then the access guard, which
/// needs the authenticated user.
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::{authentication_middleware, event_access_middleware};
    use crate::stream::stream_handler;
    use services::*;

    Router::new()
        .route("/events/{event_id}/chat", get(get_chat_room))
        .route(
            "/events/{event_id}/chat/messages",
            get(list_messages).post(create_message),
        )
        .route(
            "/events/{event_id}/chat/messages/{message_id}",
            patch(edit_message).delete(delete_message),
        )
        .route("/events/{event_id}/chat/reaction", post(toggle_reaction))
        .route("/events/{event_id}/chat/participants", get(list_participants))
        .route(
            "/events/{event_id}/chat/participants/{user_id}",
            patch(update_participant),
        )
        .route("/events/{event_id}/chat/stream", get(stream_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            event_access_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes delle notifiche dell'utente corrente
fn configure_notification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_notifications))
        .route("/{notification_id}/read", patch(mark_notification_read))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
