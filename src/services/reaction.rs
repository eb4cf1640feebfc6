//! Reaction services - toggle semantics on (message, user, emoji)

use crate::core::{AppError, AppState, EventAccess, is_unique_violation};
use crate::dtos::{
    CreateReactionDTO, ReactionAction, ReactionDTO, ReactionEventDTO, ReactionToggleDTO,
    RoomEvent, ToggleReactionRequest,
};
use crate::entities::User;
use crate::repositories::{Create, Read};
use crate::services::room::room_for_request;
use axum::{
    Extension,
    extract::{Json, State},
};
use axum_macros::debug_handler;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Adds the reaction if absent, removes it if present.
///
/// The check-then-insert races with a concurrent toggle by the same user: when
/// the insert hits the unique index the reaction already exists, so the toggle
/// resolves to a removal.
#[debug_handler]
#[instrument(skip(state, current_user, access, body), fields(user_id = %current_user.id, message_id = %body.message_id))]
pub async fn toggle_reaction(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
    Json(body): Json<ToggleReactionRequest>,
) -> Result<Json<ReactionToggleDTO>, AppError> {
    debug!("Toggling reaction");
    body.validate()?;
    let emoji = body.emoji.trim();
    if emoji.is_empty() {
        return Err(AppError::bad_request("Emoji cannot be empty"));
    }

    let room = room_for_request(&state, &access, &current_user).await?;
    match state.msg.read(&body.message_id).await? {
        Some(message) if message.chat_room_id == room.id => {}
        _ => {
            warn!("Message {} not found in chat room {}", body.message_id, room.id);
            return Err(AppError::not_found("Message not found"));
        }
    }

    let existing = state
        .reaction
        .find_one(&body.message_id, &current_user.id, emoji)
        .await?;

    let (action, reaction) = match existing {
        Some(_) => {
            state
                .reaction
                .delete_triple(&body.message_id, &current_user.id, emoji)
                .await?;
            (ReactionAction::Removed, None)
        }
        None => {
            let new_reaction = CreateReactionDTO {
                message_id: body.message_id,
                user_id: current_user.id,
                emoji: emoji.to_string(),
                created_at: Utc::now(),
            };
            match state.reaction.create(&new_reaction).await {
                Ok(reaction) => (ReactionAction::Added, Some(ReactionDTO::from(reaction))),
                Err(e) if is_unique_violation(&e) => {
                    debug!("Reaction inserted concurrently, removing instead");
                    state
                        .reaction
                        .delete_triple(&body.message_id, &current_user.id, emoji)
                        .await?;
                    (ReactionAction::Removed, None)
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let reactions: Vec<ReactionDTO> = state
        .reaction
        .find_many_by_message(&body.message_id)
        .await?
        .into_iter()
        .map(ReactionDTO::from)
        .collect();
    info!(
        "Reaction {} {:?} on message {} ({} total)",
        emoji,
        action,
        body.message_id,
        reactions.len()
    );

    let payload = ReactionEventDTO {
        message_id: body.message_id,
        user_id: current_user.id,
        emoji: emoji.to_string(),
        reactions: reactions.clone(),
    };
    let event = match action {
        ReactionAction::Added => RoomEvent::ReactionAdded(payload),
        ReactionAction::Removed => RoomEvent::ReactionRemoved(payload),
    };
    state.hub.publish(room.event_id, event);

    Ok(Json(ReactionToggleDTO {
        action,
        message_id: body.message_id,
        user_id: current_user.id,
        emoji: emoji.to_string(),
        reaction,
        reactions,
    }))
}
