//! Bookings Server
//!
//! Main server process for the bookings site.
//!
//! This binary:
//! - Connects to `PostgreSQL` and applies migrations
//! - Connects to Redis for session storage
//! - Starts the notification dispatcher (SMTP, or console without a relay)
//! - Serves the site until Ctrl+C / SIGTERM, then drains queued mail
//!
//! # Usage
//!
//! ```bash
//! # PostgreSQL and Redis must be reachable (see `Config::from_env`)
//! DATABASE_URL=postgres://localhost/bookings cargo run --bin server
//! ```

use anyhow::Context;
use bookings_auth::AccountService;
use bookings_core::{BookingFlow, SharedNotifier, SharedRepository};
use bookings_postgres::PostgresRepository;
use bookings_runtime::metrics::MetricsServer;
use bookings_runtime::{
    ConsoleEmailProvider, DispatcherWorkers, NotificationDispatcher, SmtpEmailProvider,
};
use bookings_web::{AppState, Config, JsonRenderer, RedisSessionStore, Sessions, build_router};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bookings=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting bookings server...");

    let config = Config::from_env();
    tracing::info!(
        redis = %config.redis.url,
        smtp = config.mail.smtp.is_some(),
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new(config.metrics_addr()?);
    metrics.start().context("Failed to start metrics exporter")?;

    let repository = PostgresRepository::connect(&config.postgres.pool_config())
        .await
        .context("Failed to connect to PostgreSQL")?;
    repository
        .migrate()
        .await
        .context("Failed to run migrations")?;
    let repository: SharedRepository = Arc::new(repository);
    tracing::info!("✓ PostgreSQL ready");

    let session_store = RedisSessionStore::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;
    session_store
        .ping()
        .await
        .context("Redis did not answer PING")?;
    tracing::info!("✓ Redis ready");

    let (dispatcher, workers) = start_dispatcher(&config);
    let notifier: SharedNotifier = Arc::new(dispatcher);

    let flow = BookingFlow::new(
        Arc::clone(&repository),
        notifier,
        config.mail.mail_config(),
    )
    .with_storage_timeout(config.postgres.storage_timeout());
    let accounts = AccountService::new(repository, config.postgres.account_config())
        .context("Invalid account configuration")?;
    let sessions = Sessions::new(Arc::new(session_store), config.session.clone());

    let state = AppState::new(flow, accounts, sessions, Arc::new(JsonRenderer));
    let app = build_router(state);

    let addr = config.http_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Bookings server is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Draining notification queue...");
    if !workers.shutdown(config.shutdown_timeout()).await {
        tracing::warn!("Notification workers did not finish within the grace period");
    }

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn start_dispatcher(config: &Config) -> (NotificationDispatcher, DispatcherWorkers) {
    let dispatcher = config.mail.dispatcher_config();
    match config.mail.smtp_config() {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, "Sending mail through SMTP");
            NotificationDispatcher::start(SmtpEmailProvider::new(smtp), dispatcher)
        }
        None => {
            tracing::info!("No SMTP host configured, logging mail to the console");
            NotificationDispatcher::start(ConsoleEmailProvider::new(), dispatcher)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
