#![allow(dead_code)]

use axum_test::TestServer;
use event_chat_server::core::{AppState, Config, encode_jwt};
use sqlx::SqlitePool;
use std::sync::Arc;

pub const TEST_JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

/// Crea un AppState per i test
///
/// # Arguments
/// * `pool` - Connection pool SQLite preparato da `sqlx::test`
///
/// # Returns
/// Arc<AppState> configurato con il JWT secret di test e i valori di default
pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    let config = Config {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..Config::default()
    };
    Arc::new(AppState::new(pool, config))
}

/// Crea un TestServer per i test
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = event_chat_server::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un JWT token per testing, valido 24 ore
pub fn create_test_jwt(user_id: i64, name: &str) -> String {
    encode_jwt(name.to_string(), user_id, TEST_JWT_SECRET).expect("Failed to create JWT token")
}

/// Valore dell'header Authorization per l'utente
pub fn bearer(user_id: i64, name: &str) -> String {
    format!("Bearer {}", create_test_jwt(user_id, name))
}
