use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bookings::{
    AppState,
    auth::{Authorizer, JwtVerifier},
    config::{BookingConfig, JwtConfig, StoreKind},
    http::create_router,
    repositories::{BookingStore, InMemoryBookingStore, PgBookingStore},
    service::BookingService,
};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
    env::var_opt,
    revocation::RevocationList,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting bookings service");

    let config = BookingConfig::from_env()?;
    let calendar = config.calendar()?;

    let (store, db_pool) = match config.store {
        StoreKind::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            if health_check(&pool).await {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            let store = PgBookingStore::new(pool.clone());
            store.migrate().await.context("failed to run booking migrations")?;
            let store: Arc<dyn BookingStore> = Arc::new(store);
            (store, Some(pool))
        }
        StoreKind::Memory => {
            warn!("Using the in-memory booking store; bookings are lost on restart");
            let store: Arc<dyn BookingStore> = Arc::new(InMemoryBookingStore::new());
            (store, None)
        }
    };

    // Revocation checks need Redis; the in-memory mode only uses it when configured
    let revocations = if config.store == StoreKind::Postgres || var_opt("REDIS_URL").is_some() {
        let redis = RedisPool::new(&RedisConfig::from_env())?;
        Some(RevocationList::new(redis))
    } else {
        warn!("REDIS_URL not set; revoked tokens will not be rejected");
        None
    };

    let jwt_config = JwtConfig::from_env()?;
    let verifier = JwtVerifier::new(&jwt_config.public_key, revocations)
        .context("invalid JWT public key")?;

    let state = AppState {
        service: BookingService::new(store, calendar),
        authorizer: Authorizer::new(Arc::new(verifier)),
        db_pool,
    };

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "Bookings service listening on {} (UTC offset {} min)",
        addr, config.utc_offset_minutes
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Bookings service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
