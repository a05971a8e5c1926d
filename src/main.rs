use std::sync::Arc;

use dashboard::api::router;
use dashboard::config::{AppConfig, Backend};
use dashboard::gateway::{DashboardGateway, RestGateway, SqliteGateway};
use dashboard::services::Dashboard;
use dashboard::session::{SessionStore, spawn_session_listener};
use dashboard::state::AppState;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dashboard=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;
    let rest = Arc::new(RestGateway::new(config.gateway.clone())?);

    let gateway: Arc<dyn DashboardGateway> = match &config.backend {
        Backend::Rest => {
            info!("reading tables from {}", config.gateway.base_url);
            rest.clone()
        }
        Backend::Sqlite { database_url } => {
            let options = database_url
                .parse::<SqliteConnectOptions>()?
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?;
            let sqlite = SqliteGateway::new(pool);
            sqlite.migrate().await?;
            info!("reading tables from {}", database_url);
            Arc::new(sqlite)
        }
    };

    let session = SessionStore::new();
    let dashboard = Arc::new(Dashboard::new(gateway, session.clone(), config.request_timeout));
    let _listener = spawn_session_listener(&session, dashboard.clone());

    let state = AppState {
        session,
        auth: rest,
        dashboard,
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
