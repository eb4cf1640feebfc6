//! Access Guard - who may read and write an event's chat room
//!
//! Access is derived from the event alone: the creator and every collaborator
//! have it, nobody else does. `event_access_middleware` runs the check before
//! any chat handler (stream included) and hands the resolved event down as an
//! [`EventAccess`] extension.

use crate::core::{AppError, AppState};
use crate::entities::{EventDetails, User};
use axum::extract::State;
use axum::{body::Body, extract::Request, http::Response, middleware::Next};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// True iff `user_id` is the creator of the event or one of its collaborators.
pub fn has_access(event: &EventDetails, user_id: i64) -> bool {
    event.is_creator(user_id) || event.collaborator_ids().any(|id| id == user_id)
}

/// Result of a successful access check, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct EventAccess {
    pub event: EventDetails,
    pub is_creator: bool,
}

impl EventAccess {
    /// Runs the guard; `AccessDenied` when the user has no access.
    pub fn check(event: EventDetails, user_id: i64) -> Result<Self, AppError> {
        if !has_access(&event, user_id) {
            return Err(AppError::access_denied());
        }
        let is_creator = event.is_creator(user_id);
        Ok(Self { event, is_creator })
    }

    pub fn event_id(&self) -> i64 {
        self.event.event.id
    }
}

/// Id dell'evento: il segmento subito dopo `events` (`/events/{event_id}/chat/...`).
/// A missing or non-numeric segment is a 400.
fn event_id_from_path(path: &str) -> Result<i64, AppError> {
    let segment = path
        .split('/')
        .skip_while(|segment| *segment != "events")
        .nth(1)
        .ok_or_else(|| {
            warn!("Event ID not found in path: {}", path);
            AppError::bad_request("Event ID not found in path")
        })?;
    segment.parse::<i64>().map_err(|_| {
        warn!("Invalid event ID in path: {}", path);
        AppError::bad_request("Invalid event ID")
    })
}

/// Middleware che verifica che l'utente corrente abbia accesso all'evento nel path.
#[instrument(skip(state, req, next))]
pub async fn event_access_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running event access middleware");
    let current_user = req
        .extensions()
        .get::<User>()
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?
        .clone();

    let event_id = event_id_from_path(req.uri().path())?;

    let event = state.event.get_event(&event_id).await?.ok_or_else(|| {
        warn!("Event {} not found", event_id);
        AppError::not_found("Event not found")
    })?;

    let access = EventAccess::check(event, current_user.id).inspect_err(|_| {
        warn!(
            "User {} has no access to event {}",
            current_user.id, event_id
        );
    })?;

    info!(
        "User {} verified on event {} (creator: {})",
        current_user.id, event_id, access.is_creator
    );
    req.extensions_mut().insert(access);

    Ok(next.run(req).await)
}
