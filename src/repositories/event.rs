//! EventRepository - read access to events and their collaborators
//!
//! The event planner owns these tables; the chat layer only needs the two
//! lookups below.

use super::PoolType;
use crate::entities::{Event, EventCollaborator, EventDetails};
use chrono::{DateTime, Utc};
use sqlx::Error;
use std::collections::HashMap;
use tracing::{debug, instrument};

const EVENT_COLUMNS: &str = "id, title, creator_id, start_date, end_date, notify_before";

pub struct EventRepository {
    connection_pool: PoolType,
}

impl EventRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// Event with its current collaborator set, `None` if it does not exist.
    pub async fn get_event(&self, id: &i64) -> Result<Option<EventDetails>, Error> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        let Some(event) = event else {
            return Ok(None);
        };

        let collaborators = sqlx::query_as::<_, EventCollaborator>(
            "SELECT event_id, user_id, role FROM event_collaborators WHERE event_id = ? ORDER BY user_id",
        )
        .bind(id)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(Some(EventDetails {
            event,
            collaborators,
        }))
    }

    /// All events starting strictly after `now`, earliest first, each with
    /// its collaborators. Two queries regardless of the number of events.
    #[instrument(skip(self))]
    pub async fn list_future_events(&self, now: &DateTime<Utc>) -> Result<Vec<EventDetails>, Error> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE start_date > ? ORDER BY start_date ASC"
        ))
        .bind(now)
        .fetch_all(&self.connection_pool)
        .await?;

        let collaborators = sqlx::query_as::<_, EventCollaborator>(
            r#"
            SELECT c.event_id, c.user_id, c.role
            FROM event_collaborators c
            JOIN events e ON e.id = c.event_id
            WHERE e.start_date > ?
            ORDER BY c.user_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.connection_pool)
        .await?;

        let mut by_event: HashMap<i64, Vec<EventCollaborator>> = HashMap::new();
        for collaborator in collaborators {
            by_event
                .entry(collaborator.event_id)
                .or_default()
                .push(collaborator);
        }

        debug!(count = events.len(), "Loaded future events");

        Ok(events
            .into_iter()
            .map(|event| {
                let collaborators = by_event.remove(&event.id).unwrap_or_default();
                EventDetails {
                    event,
                    collaborators,
                }
            })
            .collect())
    }
}
