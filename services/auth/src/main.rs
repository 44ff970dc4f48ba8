use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod jwt;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod session;
mod state;
mod validation;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
    env::{var_opt, var_or},
    revocation::RevocationList,
};

use crate::{
    jwt::{JwtConfig, JwtService},
    models::NewUser,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    session::SessionManager,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let user_repository = UserRepository::new(pool.clone());
    user_repository
        .migrate()
        .await
        .context("failed to run user migrations")?;

    // Initialize JWT service
    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    // Initialize Redis connection pool
    let redis_pool = RedisPool::new(&RedisConfig::from_env())?;
    let sessions = SessionManager::new(redis_pool.clone(), jwt_service.refresh_token_expiry());
    let revocations = RevocationList::new(redis_pool);

    bootstrap_admin(&user_repository).await?;

    let app_state = AppState {
        db_pool: pool,
        jwt_service,
        user_repository,
        sessions,
        revocations,
        rate_limiter: RateLimiter::new(RateLimiterConfig::from_env()),
    };

    let app = routes::create_router(app_state);

    let addr = format!("0.0.0.0:{}", var_or("AUTH_PORT", 3000u16));
    let listener = TcpListener::bind(&addr).await?;
    info!("Authentication service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Authentication service stopped");
    Ok(())
}

/// Create the first admin from `AUTH_BOOTSTRAP_ADMIN_EMAIL` and `AUTH_BOOTSTRAP_ADMIN_PASSWORD`
async fn bootstrap_admin(users: &UserRepository) -> Result<()> {
    let (Some(email), Some(password)) = (
        var_opt("AUTH_BOOTSTRAP_ADMIN_EMAIL"),
        var_opt("AUTH_BOOTSTRAP_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    if users.find_by_email(&email).await?.is_some() {
        return Ok(());
    }

    validation::validate_email(&email).map_err(anyhow::Error::msg)?;
    validation::validate_password(&password).map_err(anyhow::Error::msg)?;

    let admin = users
        .create(&NewUser {
            email,
            display_name: "Administrator".to_string(),
            password,
            is_admin: true,
        })
        .await?;
    info!("Bootstrapped admin user {}", admin.id);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
