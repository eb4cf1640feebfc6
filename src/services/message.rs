//! Message services - Gestione messaggi di una chat room
//!
//! Every handler runs behind the access guard, then persists and only then
//! publishes to the hub. Notification fan-out on send is best-effort.

use crate::core::{AppError, AppState, EventAccess};
use crate::dtos::{
    CreateMessageDTO, CreateNotificationDTO, EditMessageRequest, MessageDTO, MessagePageDTO,
    MessagesQuery, ReactionDTO, ReplyPreviewDTO, RoomEvent, SendMessageRequest, UserDTO,
};
use crate::entities::{ChatRoom, Message, MessageType, NotificationType, User};
use crate::repositories::{Create, PageDirection, Read, ReadMany};
use crate::services::room::room_for_request;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use axum_macros::debug_handler;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

/// Builds the client view of `messages`: author display info, reaction list
/// and reply preview, in three batched lookups.
pub(crate) async fn enrich_messages(
    state: &AppState,
    messages: Vec<Message>,
) -> Result<Vec<MessageDTO>, AppError> {
    if messages.is_empty() {
        return Ok(Vec::new());
    }

    let message_ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
    let reply_ids: Vec<i64> = messages.iter().filter_map(|m| m.reply_to_id).collect();

    let replies: HashMap<i64, Message> = state
        .msg
        .read_many(&reply_ids)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let mut user_ids: Vec<i64> = messages
        .iter()
        .map(|m| m.user_id)
        .chain(replies.values().map(|m| m.user_id))
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let users: HashMap<i64, User> = state
        .user
        .read_many(&user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut reactions: HashMap<i64, Vec<ReactionDTO>> = HashMap::new();
    for reaction in state.reaction.find_many_by_messages(&message_ids).await? {
        reactions
            .entry(reaction.message_id)
            .or_default()
            .push(ReactionDTO::from(reaction));
    }

    Ok(messages
        .into_iter()
        .map(|m| {
            let reply_to = m
                .reply_to_id
                .and_then(|id| replies.get(&id))
                .map(ReplyPreviewDTO::from);
            let user = users.get(&m.user_id).cloned().map(UserDTO::from);
            let reactions = reactions.remove(&m.id).unwrap_or_default();
            MessageDTO {
                reply_to,
                user,
                reactions,
                ..MessageDTO::from(m)
            }
        })
        .collect())
}

async fn enrich_message(state: &AppState, message: Message) -> Result<MessageDTO, AppError> {
    enrich_messages(state, vec![message])
        .await?
        .pop()
        .ok_or_else(|| AppError::internal_server_error("Message enrichment failed"))
}

/// Client view of a message that is already persisted. When enrichment fails
/// the plain view is returned, so the write is still published and answered.
async fn persisted_view(state: &AppState, message: Message) -> MessageDTO {
    let message_id = message.id;
    match enrich_message(state, message.clone()).await {
        Ok(dto) => dto,
        Err(e) => {
            error!("Could not enrich message {}, sending it without details: {:?}", message_id, e);
            MessageDTO::from(message)
        }
    }
}

/// Loads a message, requiring it to belong to `room`
async fn room_message(state: &AppState, room: &ChatRoom, message_id: i64) -> Result<Message, AppError> {
    match state.msg.read(&message_id).await? {
        Some(message) if message.chat_room_id == room.id => Ok(message),
        _ => {
            warn!("Message {} not found in chat room {}", message_id, room.id);
            Err(AppError::not_found("Message not found"))
        }
    }
}

/// Writes a chat-message notification for every other unmuted participant.
/// Failures are logged and never reach the sender.
async fn notify_participants(state: &AppState, room: &ChatRoom, sender: &User) {
    let participants = match state.participant.find_many_by_room(&room.id).await {
        Ok(participants) => participants,
        Err(e) => {
            error!("Could not load participants of room {} for notifications: {:?}", room.id, e);
            return;
        }
    };

    let text = format!("{} sent a message in {}", sender.name, room.name);
    let now = Utc::now();
    let mut sent = 0;
    for participant in participants
        .iter()
        .filter(|p| p.user_id != sender.id && !p.is_muted)
    {
        let notification = CreateNotificationDTO {
            user_id: participant.user_id,
            event_id: Some(room.event_id),
            notification_type: NotificationType::ChatMessage,
            message: text.clone(),
            created_at: now,
        };
        match state.notification.create(&notification).await {
            Ok(_) => sent += 1,
            Err(e) => warn!(
                "Failed to notify user {} about a message in room {}: {:?}",
                participant.user_id, room.id, e
            ),
        }
    }
    debug!("Sent {} chat notifications for room {}", sent, room.id);
}

#[debug_handler]
#[instrument(skip(state, current_user, access, query), fields(user_id = current_user.id, event_id = access.event_id()))]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagePageDTO>, AppError> {
    debug!("Listing messages with query {:?}", query);
    query.validate()?;

    let direction = match (query.cursor, query.before_id) {
        (Some(_), Some(_)) => {
            warn!("Both cursor and beforeId given");
            return Err(AppError::bad_request("Use either cursor or beforeId, not both"));
        }
        (Some(cursor), None) => PageDirection::OlderThan(cursor),
        (None, Some(before_id)) => PageDirection::NewerThan(before_id),
        (None, None) => PageDirection::Latest,
    };
    let limit = query.limit.unwrap_or(state.config.message_page_limit);

    let room = room_for_request(&state, &access, &current_user).await?;
    let page = state.msg.find_page(&room.id, direction, limit).await?;

    let has_more = page.len() as i64 == limit;
    // la pagina è sempre DESC: il più vecchio è l'ultimo, il più recente il primo
    let next_cursor = match direction {
        PageDirection::NewerThan(_) => page.first().map(|m| m.id),
        _ => page.last().map(|m| m.id),
    };

    let messages = enrich_messages(&state, page).await?;
    info!("Returning {} messages from room {}", messages.len(), room.id);

    Ok(Json(MessagePageDTO {
        messages,
        next_cursor,
        has_more,
    }))
}

#[debug_handler]
#[instrument(skip(state, current_user, access, body), fields(user_id = current_user.id, event_id = access.event_id()))]
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageDTO>), AppError> {
    debug!("Creating message");
    body.validate()?;

    let text = body.text();
    let file_url = body.file();
    if text.is_none() && file_url.is_none() {
        warn!("Empty message rejected");
        return Err(AppError::bad_request("Message must have content or a file"));
    }

    let room = room_for_request(&state, &access, &current_user).await?;

    if let Some(reply_to_id) = body.reply_to_id {
        match state.msg.read(&reply_to_id).await? {
            Some(target) if target.chat_room_id == room.id => {}
            _ => {
                warn!("Reply target {} not in room {}", reply_to_id, room.id);
                return Err(AppError::bad_request("Reply target not found in this chat"));
            }
        }
    }

    let (message_type, file_name, file_size) = match file_url {
        Some(_) => (MessageType::File, body.file_name.clone(), body.file_size),
        None => (MessageType::Text, None, None),
    };
    let new_message = CreateMessageDTO {
        chat_room_id: room.id,
        user_id: current_user.id,
        content: text.unwrap_or_default().to_string(),
        message_type,
        file_url: file_url.map(str::to_string),
        file_name,
        file_size,
        reply_to_id: body.reply_to_id,
        created_at: Utc::now(),
    };
    let message = state.msg.create(&new_message).await?;
    info!("Message {} created in room {}", message.id, room.id);

    let dto = persisted_view(&state, message).await;
    let delivered = state
        .hub
        .publish(room.event_id, RoomEvent::NewMessage(dto.clone()));
    debug!("new_message delivered to {} subscribers", delivered);

    notify_participants(&state, &room, &current_user).await;

    Ok((StatusCode::CREATED, Json(dto)))
}

#[debug_handler]
#[instrument(skip(state, current_user, access, body), fields(user_id = %current_user.id, message_id = %message_id))]
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
    Path((_event_id, message_id)): Path<(i64, i64)>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<MessageDTO>, AppError> {
    debug!("Editing message");
    body.validate()?;
    let content = body.content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("Message content cannot be empty"));
    }

    let room = room_for_request(&state, &access, &current_user).await?;
    let message = room_message(&state, &room, message_id).await?;

    if message.user_id != current_user.id {
        warn!("User {} is not the author of message {}", current_user.id, message_id);
        return Err(AppError::forbidden("Only the author can edit this message"));
    }
    if message.is_deleted {
        return Err(AppError::bad_request("Deleted messages cannot be edited"));
    }

    let updated = state
        .msg
        .update_content(&message.id, content, &Utc::now())
        .await?;
    info!("Message {} edited", updated.id);

    let dto = persisted_view(&state, updated).await;
    state
        .hub
        .publish(room.event_id, RoomEvent::MessageUpdated(dto.clone()));

    Ok(Json(dto))
}

#[debug_handler]
#[instrument(skip(state, current_user, access), fields(user_id = %current_user.id, message_id = %message_id))]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
    Path((_event_id, message_id)): Path<(i64, i64)>,
) -> Result<Json<MessageDTO>, AppError> {
    debug!("Deleting message");
    let room = room_for_request(&state, &access, &current_user).await?;
    let message = room_message(&state, &room, message_id).await?;

    if message.user_id != current_user.id && !access.is_creator {
        warn!(
            "User {} may not delete message {} (not author nor event creator)",
            current_user.id, message_id
        );
        return Err(AppError::forbidden("Only the author or the event creator can delete this message"));
    }

    if message.is_deleted {
        debug!("Message {} already deleted", message_id);
        return Ok(Json(enrich_message(&state, message).await?));
    }

    let deleted = state.msg.soft_delete(&message.id, &Utc::now()).await?;
    info!("Message {} deleted by user {}", deleted.id, current_user.id);

    state.hub.publish(
        room.event_id,
        RoomEvent::MessageDeleted {
            message_id: deleted.id,
            chat_room_id: room.id,
            deleted_by: current_user.id,
        },
    );

    Ok(Json(persisted_view(&state, deleted).await))
}
