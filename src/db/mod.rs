pub mod pg_store;
pub mod room;
pub mod store;
pub mod user;

pub use pg_store::PgRoomStore;
pub use room::RoomRepository;
pub use store::{MemoryRoomStore, RoomStore, StoreError};
pub use user::{PgUserDirectory, StaticUserDirectory, UserDirectory};

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
}
