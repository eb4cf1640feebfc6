//! Scheduler Module - background tasks running beside the HTTP server
//!
//! Only the reminder scan lives here. It shares the application state with the
//! handlers and stops when the shutdown signal flips to `true`.

pub mod reminder;

pub use reminder::{ReminderScheduler, TickReport, is_due, reminder_message, reminder_window};
