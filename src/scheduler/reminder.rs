//! Reminder Scheduler - recurring scan that emits at-most-once reminders
//!
//! Each tick loads the future events and, for every event whose reminder window
//! is open (`start - notify_before <= now < start`), writes one reminder
//! notification per creator and collaborator that does not have one yet. A
//! partial unique index on `(event_id, user_id)` for reminders backs the
//! pre-insert check, so a racing insert is counted as already reminded.

use crate::core::{AppState, is_unique_violation};
use crate::dtos::CreateNotificationDTO;
use crate::entities::{Event, EventDetails, NotificationType};
use crate::repositories::Create;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

/// `[notify_time, start)` for events with a positive `notify_before`
pub fn reminder_window(event: &Event) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let minutes = event.notify_before.filter(|m| *m > 0)?;
    let notify_time = event.start_date - ChronoDuration::minutes(minutes);
    Some((notify_time, event.start_date))
}

pub fn is_due(event: &Event, now: DateTime<Utc>) -> bool {
    match reminder_window(event) {
        Some((notify_time, start)) => notify_time <= now && now < start,
        None => false,
    }
}

/// Text of the reminder for `event`
pub fn reminder_message(event: &Event) -> String {
    format!(
        "Reminder: \"{}\" starts at {}",
        event.title,
        event.start_date.format("%Y-%m-%d %H:%M UTC")
    )
}

/// Outcome of one tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Future events loaded
    pub events_scanned: usize,
    /// Events whose reminder window is open
    pub events_due: usize,
    pub reminders_created: usize,
    /// Per-user failures, logged and skipped
    pub failures: usize,
    /// True when a previous tick was still running and this one did nothing
    pub skipped: bool,
}

pub struct ReminderScheduler {
    state: Arc<AppState>,
    period: Duration,
    // single-flight: un solo tick alla volta
    running: Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(state: Arc<AppState>, period: Duration) -> Self {
        Self {
            state,
            period,
            running: Mutex::new(()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs one scan at `now`.
    ///
    /// Returns a skipped report without touching the store when another tick
    /// is in progress. Only loading the events can fail the tick; per-user
    /// failures are counted in the report.
    #[instrument(skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, sqlx::Error> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Previous reminder tick still running, skipping");
            return Ok(TickReport {
                skipped: true,
                ..TickReport::default()
            });
        };

        let events = self.state.event.list_future_events(&now).await?;
        let mut report = TickReport {
            events_scanned: events.len(),
            ..TickReport::default()
        };

        for details in events.iter().filter(|d| is_due(&d.event, now)) {
            report.events_due += 1;
            self.remind(details, now, &mut report).await;
        }

        if report.reminders_created > 0 || report.failures > 0 {
            info!(
                "Reminder tick: {} events scanned, {} due, {} reminders created, {} failures",
                report.events_scanned, report.events_due, report.reminders_created, report.failures
            );
        } else {
            debug!("Reminder tick: {} events scanned, nothing to send", report.events_scanned);
        }
        Ok(report)
    }

    async fn remind(&self, details: &EventDetails, now: DateTime<Utc>, report: &mut TickReport) {
        let event = &details.event;
        let recipients: BTreeSet<i64> = std::iter::once(event.creator_id)
            .chain(details.collaborator_ids())
            .collect();
        let message = reminder_message(event);

        for user_id in recipients {
            match self.state.notification.has_reminder(&event.id, &user_id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!("Reminder check failed for event {} user {}: {:?}", event.id, user_id, e);
                    report.failures += 1;
                    continue;
                }
            }

            let reminder = CreateNotificationDTO {
                user_id,
                event_id: Some(event.id),
                notification_type: NotificationType::Reminder,
                message: message.clone(),
                created_at: now,
            };
            match self.state.notification.create(&reminder).await {
                Ok(_) => {
                    debug!("Reminder created for event {} user {}", event.id, user_id);
                    report.reminders_created += 1;
                }
                Err(e) if is_unique_violation(&e) => {
                    debug!("Reminder for event {} user {} created concurrently", event.id, user_id);
                }
                Err(e) => {
                    warn!("Failed to create reminder for event {} user {}: {:?}", event.id, user_id, e);
                    report.failures += 1;
                }
            }
        }
    }

    /// Starts the periodic scan. The task ends when `shutdown` becomes `true`
    /// or its sender is dropped.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            // un tick lento non deve accumulare tick arretrati
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Reminder scheduler started (every {}s)", self.period.as_secs());

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = self.tick(Utc::now()).await {
                            error!("Reminder tick failed: {:?}", e);
                        }
                    }
                }
            }

            info!("Reminder scheduler stopped");
        })
    }
}
