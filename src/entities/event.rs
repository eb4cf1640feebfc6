//! Event entity - read-only view over the planner's events and collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub creator_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    // minuti prima dell'inizio, None = nessun promemoria
    pub notify_before: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct EventCollaborator {
    pub event_id: i64,
    pub user_id: i64,
    pub role: String,
}

/// An event together with its current collaborator set, as returned by the
/// event store.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EventDetails {
    pub event: Event,
    pub collaborators: Vec<EventCollaborator>,
}

impl EventDetails {
    pub fn collaborator_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.collaborators.iter().map(|c| c.user_id)
    }

    pub fn is_creator(&self, user_id: i64) -> bool {
        self.event.creator_id == user_id
    }
}
