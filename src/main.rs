use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vista::api::{self, AppState, RateLimiter};
use vista::auth::TokenService;
use vista::config::{Config, DatabaseBackend};
use vista::cursor::CursorSigner;
use vista::media::{CloudinaryHost, DisabledImageHost, ImageHost};
use vista::storage::{PostgresStorage, SqliteStorage, Storage};
use vista::views::{SystemClock, ViewService};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    info!("Loaded configuration");

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage");
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections)
                    .await?,
            )
        }
    };

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    let media: Arc<dyn ImageHost> = match config.media.cloudinary.clone() {
        Some(cloudinary) => {
            info!("Image uploads go to Cloudinary cloud '{}'", cloudinary.cloud_name);
            Arc::new(CloudinaryHost::new(cloudinary)?)
        }
        None => {
            warn!("Cloudinary is not configured, image uploads are disabled");
            Arc::new(DisabledImageHost)
        }
    };

    if config.pagination.cursor_hmac_secret.is_none() {
        warn!("CURSOR_HMAC_SECRET not set, listing cursors will not survive a restart");
    }

    let rate_limiter = RateLimiter::new(&config.rate_limit);
    if config.rate_limit.enabled {
        info!(
            "Rate limiting: {} requests per {}s per client",
            config.rate_limit.max_requests, config.rate_limit.window_secs
        );
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window());
            loop {
                interval.tick().await;
                limiter.purge_expired();
            }
        });
    }

    let state = Arc::new(AppState {
        views: ViewService::new(Arc::clone(&storage), Arc::new(SystemClock)),
        tokens: TokenService::new(&config.auth),
        cursors: CursorSigner::new(config.pagination.cursor_hmac_secret.as_deref()),
        storage,
        media,
        rate_limiter,
        config: Arc::clone(&config),
    });

    let app = api::create_api_router(state);

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 API server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
