//! Room services - Room Registry
//!
//! One chat room per event, created lazily by the event creator. Collaborators
//! are seeded as members at creation and added on their next access afterwards;
//! `ensure_participant` is the idempotent upsert every chat operation goes
//! through.

use crate::core::{AppError, AppState, EventAccess, has_access, is_unique_violation};
use crate::dtos::{
    ChatRoomDTO, CreateChatRoomDTO, CreateParticipantDTO, ParticipantDTO, RoomEvent, UserDTO,
};
use crate::entities::{ChatRoom, Participant, ParticipantRole, User};
use crate::repositories::{Delete, ReadMany};
use axum::{
    Extension,
    extract::{Json, State},
};
use axum_macros::debug_handler;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Role a user gets when joining the room of `access`'s event
fn role_for(access: &EventAccess, user_id: i64) -> ParticipantRole {
    if access.event.is_creator(user_id) {
        ParticipantRole::Admin
    } else {
        ParticipantRole::Member
    }
}

/// Attaches display info from the user store to each participant.
pub(crate) async fn enrich_participants(
    state: &AppState,
    participants: Vec<Participant>,
) -> Result<Vec<ParticipantDTO>, AppError> {
    let ids: Vec<i64> = participants.iter().map(|p| p.user_id).collect();
    let users: HashMap<i64, User> = state
        .user
        .read_many(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(participants
        .into_iter()
        .map(|p| {
            let user = users.get(&p.user_id).cloned().map(UserDTO::from);
            ParticipantDTO {
                user,
                ..ParticipantDTO::from(p)
            }
        })
        .collect())
}

async fn publish_joined(state: &AppState, event_id: i64, participant: Participant) {
    // la notifica sullo stream non deve far fallire la richiesta
    match enrich_participants(state, vec![participant]).await {
        Ok(mut dtos) => {
            if let Some(dto) = dtos.pop() {
                state.hub.publish(event_id, RoomEvent::ParticipantJoined(dto));
            }
        }
        Err(e) => warn!(event_id, "Could not load participant for broadcast: {:?}", e),
    }
}

/// Idempotent upsert of the user as a participant of `room`.
///
/// Publishes `participant_joined` only when this call created the row.
#[instrument(skip(state, room, access), fields(room_id = room.id))]
pub(crate) async fn ensure_participant(
    state: &AppState,
    room: &ChatRoom,
    access: &EventAccess,
    user_id: i64,
) -> Result<(), AppError> {
    let created = state
        .participant
        .insert_if_missing(&CreateParticipantDTO {
            chat_room_id: room.id,
            user_id,
            role: role_for(access, user_id),
            joined_at: Utc::now(),
        })
        .await?;

    if let Some(participant) = created {
        info!("User {} joined chat room {}", user_id, room.id);
        publish_joined(state, room.event_id, participant).await;
    }
    Ok(())
}

/// Brings the participant set in line with the event: collaborators without a
/// row are added, participants who lost access are removed.
#[instrument(skip(state, room, access), fields(room_id = room.id))]
async fn reconcile(state: &AppState, room: &ChatRoom, access: &EventAccess) -> Result<(), AppError> {
    let participants = state.participant.find_many_by_room(&room.id).await?;

    for participant in &participants {
        if has_access(&access.event, participant.user_id) {
            continue;
        }
        if state
            .participant
            .delete(&(room.id, participant.user_id))
            .await?
        {
            info!("User {} lost access, removed from chat room {}", participant.user_id, room.id);
            state.hub.publish(
                room.event_id,
                RoomEvent::ParticipantLeft {
                    chat_room_id: room.id,
                    user_id: participant.user_id,
                },
            );
        }
    }

    let missing: Vec<i64> = std::iter::once(access.event.event.creator_id)
        .chain(access.event.collaborator_ids())
        .filter(|id| !participants.iter().any(|p| p.user_id == *id))
        .collect();
    for user_id in missing {
        ensure_participant(state, room, access, user_id).await?;
    }

    Ok(())
}

/// Returns the event's room, creating it when the requester is the creator.
///
/// Existing rooms are reconciled with the collaborator set. Anybody but the
/// creator gets `NotFound` while the room does not exist yet. Two creators
/// racing resolve to the same room: the loser's insert hits the unique index on
/// `event_id` and re-reads the winner's row.
#[instrument(skip(state, access, requester), fields(event_id = access.event_id(), user_id = requester.id))]
pub(crate) async fn get_or_create_room(
    state: &AppState,
    access: &EventAccess,
    requester: &User,
) -> Result<ChatRoom, AppError> {
    let event_id = access.event_id();

    if let Some(room) = state.room.find_by_event_id(&event_id).await? {
        reconcile(state, &room, access).await?;
        return Ok(room);
    }

    if !access.is_creator {
        debug!("Chat room for event {} not created yet", event_id);
        return Err(AppError::not_found("Chat room not created yet"));
    }

    let title = &access.event.event.title;
    let mut seed: BTreeMap<i64, ParticipantRole> = access
        .event
        .collaborator_ids()
        .map(|id| (id, ParticipantRole::Member))
        .collect();
    seed.insert(requester.id, ParticipantRole::Admin);
    let seed: Vec<(i64, ParticipantRole)> = seed.into_iter().collect();

    let created = state
        .room
        .create_seeded(
            &CreateChatRoomDTO::for_event(event_id, title),
            &seed,
            requester.id,
            &format!("Chat room created for {}", title),
        )
        .await;

    match created {
        Ok(room) => {
            info!("Chat room {} created for event {}", room.id, event_id);
            Ok(room)
        }
        Err(e) if is_unique_violation(&e) => {
            debug!("Chat room for event {} created concurrently, re-reading", event_id);
            let room = state.room.find_by_event_id(&event_id).await?.ok_or_else(|| {
                warn!("Chat room for event {} vanished after conflict", event_id);
                AppError::internal_server_error("Chat room creation conflict")
            })?;
            reconcile(state, &room, access).await?;
            Ok(room)
        }
        Err(e) => Err(e.into()),
    }
}

/// Room for a chat operation: existing rooms get the requester as participant,
/// missing rooms go through `get_or_create_room`.
pub(crate) async fn room_for_request(
    state: &AppState,
    access: &EventAccess,
    requester: &User,
) -> Result<ChatRoom, AppError> {
    match state.room.find_by_event_id(&access.event_id()).await? {
        Some(room) => {
            ensure_participant(state, &room, access, requester.id).await?;
            Ok(room)
        }
        None => get_or_create_room(state, access, requester).await,
    }
}

/// Joins the requester to the room if it exists, never creating it. Used by the
/// stream, which may be opened before the creator first opens the chat.
pub(crate) async fn touch_room(
    state: &AppState,
    access: &EventAccess,
    requester: &User,
) -> Result<Option<ChatRoom>, AppError> {
    let room = state.room.find_by_event_id(&access.event_id()).await?;
    if let Some(room) = &room {
        ensure_participant(state, room, access, requester.id).await?;
    }
    Ok(room)
}

#[debug_handler]
#[instrument(skip(state, current_user, access), fields(user_id = current_user.id, event_id = access.event_id()))]
pub async fn get_chat_room(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(access): Extension<EventAccess>,
) -> Result<Json<ChatRoomDTO>, AppError> {
    debug!("Opening chat room");
    let room = get_or_create_room(&state, &access, &current_user).await?;

    let participants = state.participant.find_many_by_room(&room.id).await?;
    let participants = enrich_participants(&state, participants).await?;
    debug!("Chat room {} has {} participants", room.id, participants.len());

    Ok(Json(ChatRoomDTO {
        participants,
        ..ChatRoomDTO::from(room)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::entities::{Event, EventCollaborator, EventDetails};
    use sqlx::SqlitePool;

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name),
            image: None,
        }
    }

    async fn access_for(state: &AppState, event_id: i64, user_id: i64) -> EventAccess {
        let event = state.event.get_event(&event_id).await.unwrap().unwrap();
        EventAccess::check(event, user_id).unwrap()
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events")))]
    async fn creator_creates_room_with_seeded_participants(pool: SqlitePool) -> sqlx::Result<()> {
        let state = AppState::new(pool, Config::default());
        let access = access_for(&state, 1, 1).await;

        let room = get_or_create_room(&state, &access, &user(1, "alice")).await.unwrap();
        assert_eq!(room.event_id, 1);
        assert_eq!(room.name, "Summer Party Chat");

        let participants = state.participant.find_many_by_room(&room.id).await?;
        let roles: Vec<(i64, ParticipantRole)> =
            participants.iter().map(|p| (p.user_id, p.role)).collect();
        assert_eq!(
            roles,
            vec![
                (1, ParticipantRole::Admin),
                (2, ParticipantRole::Member),
                (3, ParticipantRole::Member)
            ]
        );
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events")))]
    async fn collaborator_cannot_create_room(pool: SqlitePool) -> sqlx::Result<()> {
        let state = AppState::new(pool, Config::default());
        let access = access_for(&state, 1, 2).await;

        let err = get_or_create_room(&state, &access, &user(2, "bob")).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
        assert!(state.room.find_by_event_id(&1).await?.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events", "chat_rooms")))]
    async fn reconcile_adds_new_collaborators_and_drops_revoked_ones(
        pool: SqlitePool,
    ) -> sqlx::Result<()> {
        // bob perde l'accesso, charlie non ha ancora una riga
        sqlx::query("DELETE FROM event_collaborators WHERE event_id = 1 AND user_id = 2")
            .execute(&pool)
            .await?;
        let state = AppState::new(pool, Config::default());
        let mut sub = state.hub.subscribe(1);
        let access = access_for(&state, 1, 1).await;

        get_or_create_room(&state, &access, &user(1, "alice")).await.unwrap();

        let mut ids: Vec<i64> = state
            .participant
            .find_many_by_room(&1)
            .await?
            .iter()
            .map(|p| p.user_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);

        let left = sub.recv().await.unwrap();
        assert_eq!(left.kind(), "participant_left");
        let joined = sub.recv().await.unwrap();
        match &*joined {
            RoomEvent::ParticipantJoined(p) => {
                assert_eq!(p.user_id, 3);
                assert_eq!(p.user.as_ref().map(|u| u.name.as_str()), Some("charlie"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "events", "chat_rooms")))]
    async fn ensure_participant_is_idempotent(pool: SqlitePool) -> sqlx::Result<()> {
        let state = AppState::new(pool, Config::default());
        let access = access_for(&state, 1, 3).await;
        let room = state.room.find_by_event_id(&1).await?.unwrap();
        let mut sub = state.hub.subscribe(1);

        ensure_participant(&state, &room, &access, 3).await.unwrap();
        ensure_participant(&state, &room, &access, 3).await.unwrap();

        assert_eq!(state.participant.find_many_by_room(&room.id).await?.len(), 3);
        assert_eq!(sub.recv().await.unwrap().kind(), "participant_joined");
        state.hub.publish(1, RoomEvent::Ping { timestamp: Utc::now() });
        assert_eq!(sub.recv().await.unwrap().kind(), "ping");
        Ok(())
    }

    #[test]
    fn creator_joins_as_admin() {
        let start = Utc::now();
        let access = EventAccess::check(
            EventDetails {
                event: Event {
                    id: 9,
                    title: "t".into(),
                    creator_id: 1,
                    start_date: start,
                    end_date: start,
                    notify_before: None,
                },
                collaborators: vec![EventCollaborator {
                    event_id: 9,
                    user_id: 2,
                    role: "editor".into(),
                }],
            },
            1,
        )
        .unwrap();
        assert_eq!(role_for(&access, 1), ParticipantRole::Admin);
        assert_eq!(role_for(&access, 2), ParticipantRole::Member);
    }
}
