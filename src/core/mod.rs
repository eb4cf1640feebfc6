//! Core Module - infrastructure shared by every component
//!
//! - Authentication (JWT) and the access guard
//! - Configuration
//! - Error handling
//! - Application state

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;

// Re-exports per facilitare l'import
pub use access::{EventAccess, event_access_middleware, has_access};
pub use auth::{Claims, authentication_middleware, decode_jwt, encode_jwt};
pub use config::Config;
pub use error::{AppError, is_unique_violation};
pub use state::AppState;
