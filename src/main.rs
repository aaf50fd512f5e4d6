//! Bookings Server
//!
//! Lodging reservation web service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookings_server::{
    api,
    config::{AppConfig, SessionBackendKind},
    repository::{BookingRepository, MemoryRepository, Repository},
    services::{
        mail::{MailWorker, Mailer},
        session::{MemorySessionBackend, RedisSessionBackend, SessionBackend, SessionStore},
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bookings_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Bookings Server v{}", env!("CARGO_PKG_VERSION"));

    let repository: Arc<dyn BookingRepository> = if config.database.in_memory {
        tracing::warn!("Using the in-memory repository, data is lost on restart");
        Arc::new(MemoryRepository::with_rooms(&["General's Quarters", "Major's Suite"]))
    } else {
        // Create database connection pool
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await?;

        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Database migrations completed");
        Arc::new(Repository::new(pool))
    };

    let lifetime = Duration::from_secs(config.session.lifetime_hours * 3600);
    let session_backend: Arc<dyn SessionBackend> = match config.session.backend {
        SessionBackendKind::Redis => {
            let backend = RedisSessionBackend::new(&config.redis.url, lifetime.as_secs() as i64).await?;
            tracing::info!("Connected to Redis");
            Arc::new(backend)
        }
        SessionBackendKind::Memory => {
            tracing::warn!("Sessions are kept in memory and lost on restart");
            Arc::new(MemorySessionBackend::with_lifetime(lifetime))
        }
    };

    // Mail queue and its worker
    let (mailer, receiver) = Mailer::channel(config.email.queue_capacity);
    tokio::spawn(MailWorker::new(config.email.clone(), receiver).run());

    let services = Services::new(
        repository,
        SessionStore::new(session_backend),
        mailer,
        config.email.clone(),
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
