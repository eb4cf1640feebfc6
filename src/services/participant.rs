//! Participant services - membership of a chat room
//!
//! Role changes belong to the event creator (the room admin) and can never
//! demote the creator. Muting is allowed to the participant themself and to
//! admins and moderators.

use crate::core::{AppError, AppState, EventAccess};
use crate::dtos::{ParticipantDTO, UpdateParticipantDTO};
use crate::entities::{ParticipantRole, User};
use crate::repositories::{Read, Update};
use crate::services::room::{enrich_participants, room_for_request};
use axum::{
    Extension,
    extract::{Json, Path, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[instrument(skip(state, current_user, access), fields(user_id = %current_user.id, event_id = %access.event_id()))]
pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
) -> Result<Json<Vec<ParticipantDTO>>, AppError> {
    debug!("Listing participants");
    let room = room_for_request(&state, &access, &current_user).await?;
    let participants = state.participant.find_many_by_room(&room.id).await?;
    let participants = enrich_participants(&state, participants).await?;
    info!("Room {} has {} participants", room.id, participants.len());
    Ok(Json(participants))
}

#[instrument(skip(state, current_user, access, body), fields(user_id = %current_user.id, target_user = %target_user_id))]
pub async fn update_participant(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
    Path((_event_id, target_user_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateParticipantDTO>,
) -> Result<Json<ParticipantDTO>, AppError> {
    debug!("Updating participant with {:?}", body);
    if body.role.is_none() && body.is_muted.is_none() {
        return Err(AppError::bad_request("Nothing to update"));
    }

    let room = room_for_request(&state, &access, &current_user).await?;
    let target = state
        .participant
        .read(&(room.id, target_user_id))
        .await?
        .ok_or_else(|| {
            warn!("User {} is not a participant of room {}", target_user_id, room.id);
            AppError::not_found("Participant not found")
        })?;

    if let Some(role) = body.role {
        if !access.is_creator {
            warn!("User {} tried to change a role without being admin", current_user.id);
            return Err(AppError::forbidden("Only the room admin can change roles"));
        }
        if access.event.is_creator(target.user_id) && role != ParticipantRole::Admin {
            return Err(AppError::bad_request("The event creator is always admin"));
        }
    }

    if body.is_muted.is_some() && target.user_id != current_user.id {
        let requester_role = state
            .participant
            .read(&(room.id, current_user.id))
            .await?
            .map(|p| p.role);
        if !matches!(
            requester_role,
            Some(ParticipantRole::Admin) | Some(ParticipantRole::Moderator)
        ) {
            warn!("User {} may not mute user {}", current_user.id, target.user_id);
            return Err(AppError::forbidden("Only admins and moderators can mute other participants"));
        }
    }

    let updated = state
        .participant
        .update(&(room.id, target.user_id), &body)
        .await?;
    info!(
        "Participant {} of room {} updated: role={:?} muted={}",
        updated.user_id, room.id, updated.role, updated.is_muted
    );

    let mut dtos = enrich_participants(&state, vec![updated]).await?;
    dtos.pop()
        .map(Json)
        .ok_or_else(|| AppError::internal_server_error("Participant enrichment failed"))
}
