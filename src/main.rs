mod config;
mod db;
mod error;
mod handlers;
mod hub;
mod models;
mod rooms;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::{
    MemoryRoomStore, PgRoomStore, PgUserDirectory, RoomRepository, RoomStore,
    StaticUserDirectory, UserDirectory,
};
use crate::hub::RealtimeHub;
use crate::rooms::RoomService;

pub struct AppState {
    pub rooms: RoomService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomnotes=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    let (store, users): (Arc<dyn RoomStore>, Arc<dyn UserDirectory>) = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database");
            let db_pool = db::create_pool(database_url, config.db_max_connections)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Running database migrations");
            db::run_migrations(&db_pool)
                .await
                .context("Failed to run migrations")?;

            (
                Arc::new(PgRoomStore::new(db_pool.clone())),
                Arc::new(PgUserDirectory::new(db_pool)),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set; rooms are kept in memory and lost on restart");
            (
                Arc::new(MemoryRoomStore::new()),
                Arc::new(StaticUserDirectory::new()),
            )
        }
    };

    // The hub is shared by the command surface and the socket adapter
    let hub = Arc::new(RealtimeHub::new());
    let repo = RoomRepository::new(store, users);
    let state = Arc::new(AppState {
        rooms: RoomService::new(repo, hub),
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(handlers::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
