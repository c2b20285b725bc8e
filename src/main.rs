use std::{net::SocketAddr, sync::Arc};

use blog_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initialises logging, connects to Postgres, applies the
/// migrations and serves the API until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration & Environment Loading
    // .env is read first so AppConfig::load() sees its values. A bad value stops startup here.
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and request-level logs from tower-http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_api=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: pretty, multi-line output.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: one JSON object per line for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Signing Secret Check
    // The default secret is allowed but never silently.
    if config.uses_default_secret() {
        match config.env {
            Env::Production => tracing::error!(
                "SECRET_KEY is not set; tokens are signed with the publicly known default secret"
            ),
            Env::Local => tracing::warn!("SECRET_KEY is not set; using the default signing secret"),
        }
    }

    // 5. Database Initialization (Postgres) and Migrations
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    // Repository behind an Arc, shared by every handler and the auth guard.
    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 6. Unified State Assembly and Router
    // AppState::new builds the token codec, response cache and rate limiter from the config.
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(repo, config));

    // 7. Server Startup
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    // ConnectInfo carries the peer address the rate limiter keys on.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
