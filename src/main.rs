//! Return Case Tracker - Main Entry Point

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use defect_tracker_backend::{
    api::{routes, AppState},
    config::Config,
    db,
    error::Result,
    services::auth_service::AuthService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "defect_tracker_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Starting return case tracker");

    // Connect to the database and run migrations
    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Bootstrap the admin account, if configured
    bootstrap_admin(&pool, &config).await?;

    // Build shared state and the router
    let state = Arc::new(AppState::new(config.clone(), pool));
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "Listening");
    axum::serve(listener, router).await?;

    Ok(())
}

/// Create the initial admin user when ADMIN_EMAIL and ADMIN_PASSWORD are
/// set and no such account exists yet.
async fn bootstrap_admin(pool: &sqlx::PgPool, config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let password_hash = AuthService::hash_password(password)?;
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, role, first_name, last_name)
        VALUES ($1, $2, 'admin', 'Admin', 'Account')
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(email)
    .bind(&password_hash)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!(email = %email, "Bootstrap admin account created");
    }
    Ok(())
}
