//! Configuration loaded from the environment (and `.env`, when present)

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "un segreto meno bello";

/// Upper bound for the `limit` query parameter on message listing.
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub app_env: String,
    /// Interval between `ping` frames on an open stream
    pub stream_keepalive: Duration,
    /// Period of the reminder scheduler
    pub reminder_interval: Duration,
    /// Per-subscriber queue length in the broadcast hub
    pub broadcast_capacity: usize,
    /// Default page size for message listing
    pub message_page_limit: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            max_connections: 16,
            app_env: "development".to_string(),
            stream_keepalive: Duration::from_secs(30),
            reminder_interval: Duration::from_secs(60),
            broadcast_capacity: 64,
            message_page_limit: 50,
        }
    }
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        let defaults = Config::default();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set in .env file".to_string())?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            DEFAULT_JWT_SECRET.to_string()
        });

        let server_host = env::var("SERVER_HOST").unwrap_or(defaults.server_host);
        let server_port = parse_var("SERVER_PORT", defaults.server_port)?;
        let max_connections = parse_var("MAX_DB_CONNECTIONS", defaults.max_connections)?;
        let app_env = env::var("APP_ENV").unwrap_or(defaults.app_env);

        let keepalive_secs: u64 = parse_var("STREAM_KEEPALIVE_SECS", 30)?;
        let reminder_secs: u64 = parse_var("REMINDER_INTERVAL_SECS", 60)?;
        if keepalive_secs == 0 || reminder_secs == 0 {
            return Err("STREAM_KEEPALIVE_SECS and REMINDER_INTERVAL_SECS must be positive".to_string());
        }

        let broadcast_capacity: usize = parse_var("BROADCAST_CAPACITY", defaults.broadcast_capacity)?;
        if broadcast_capacity == 0 {
            return Err("BROADCAST_CAPACITY must be positive".to_string());
        }

        let message_page_limit: i64 = parse_var("MESSAGE_PAGE_LIMIT", defaults.message_page_limit)?;
        if !(1..=MAX_PAGE_LIMIT).contains(&message_page_limit) {
            return Err(format!("MESSAGE_PAGE_LIMIT must be between 1 and {}", MAX_PAGE_LIMIT));
        }

        Ok(Config {
            database_url,
            jwt_secret,
            server_host,
            server_port,
            max_connections,
            app_env,
            stream_keepalive: Duration::from_secs(keepalive_secs),
            reminder_interval: Duration::from_secs(reminder_secs),
            broadcast_capacity,
            message_page_limit,
        })
    }

    /// Logs the configuration, hiding secrets
    pub fn print_info(&self) {
        info!(
            environment = %self.app_env,
            address = %format!("{}:{}", self.server_host, self.server_port),
            database = %Self::mask_url(&self.database_url),
            max_db_connections = self.max_connections,
            keepalive_secs = self.stream_keepalive.as_secs(),
            reminder_interval_secs = self.reminder_interval.as_secs(),
            broadcast_capacity = self.broadcast_capacity,
            "Server configuration"
        );
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("JWT secret: USING DEFAULT (INSECURE!)");
        }
    }

    /// Maschera l'URL del database per il logging
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        // sqlite: il percorso del file non è un segreto
        if url.starts_with("sqlite:") {
            return url.to_string();
        }
        "***".to_string()
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| format!("Invalid {}: '{}' is not a valid number", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_url_hides_credentials() {
        assert_eq!(
            Config::mask_url("mysql://root:pw@db:3306/app"),
            "mysql://***@db:3306/app"
        );
        assert_eq!(Config::mask_url("sqlite://chat.db"), "sqlite://chat.db");
        assert_eq!(Config::mask_url("whatever"), "***");
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.stream_keepalive, Duration::from_secs(30));
        assert_eq!(config.reminder_interval, Duration::from_secs(60));
        assert_eq!(config.message_page_limit, 50);
    }
}
