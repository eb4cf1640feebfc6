use event_chat_server::core::{AppState, Config};
use event_chat_server::create_router;
use event_chat_server::scheduler::ReminderScheduler;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    // Carica la configurazione dalle variabili d'ambiente (.env incluso)
    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    config.print_info();

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connect_options)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready, migrations applied");

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let reminder_interval = config.reminder_interval;
    let state = Arc::new(AppState::new(pool, config));

    // lo scheduler si ferma quando il server termina
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Arc::new(ReminderScheduler::new(state.clone(), reminder_interval));
    let scheduler_task = scheduler.spawn(shutdown_rx);

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Event chat server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_task.await {
        error!("Reminder scheduler task failed: {:?}", e);
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => error!("Failed to listen for Ctrl+C: {:?}", e),
    }
}
