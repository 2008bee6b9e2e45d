use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use eventnow::auth::session;
use eventnow::config::{Cli, Config, TransportKind};
use eventnow::db;
use eventnow::notify::{LogTransport, MailTransport, NotificationDispatcher, OutboxTransport};
use eventnow::routes;
use eventnow::state::{AppState, DbPool};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    if let Some(password) = &config.admin.password {
        db::ensure_admin(
            &pool,
            &config.admin.email,
            &config.admin.full_name,
            password,
            config.auth.bcrypt_cost,
        )?;
    }

    // Notification worker
    let transport: Arc<dyn MailTransport> = match config.notifications.transport {
        TransportKind::Log => Arc::new(LogTransport),
        TransportKind::Outbox => Arc::new(OutboxTransport::new(pool.clone())),
    };
    let (notifier, _worker) = NotificationDispatcher::start(transport);

    tokio::spawn(sweep_sessions(pool.clone()));

    let state = AppState {
        db: pool,
        config: config.clone(),
        notifier,
    };
    let app = routes::build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop expired sessions.
async fn sweep_sessions(pool: DbPool) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let swept = pool
            .get()
            .map_err(|e| e.to_string())
            .and_then(|conn| session::purge_expired(&conn, Utc::now()).map_err(|e| e.to_string()));
        match swept {
            Ok(0) => {}
            Ok(n) => tracing::info!("Removed {} expired sessions", n),
            Err(e) => tracing::warn!("Session sweep failed: {}", e),
        }
    }
}
