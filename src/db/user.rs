use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::store::StoreError;
use crate::models::UserSummary;

/// Resolves user ids issued by the external auth system.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up every id; ids the directory does not know are omitted.
    async fn lookup(&self, ids: &[String]) -> Result<HashMap<String, UserSummary>, StoreError>;

    /// Records a caller's username. Directories backed by the auth service ignore this.
    async fn remember(&self, _id: &str, _username: &str) {}
}

/// Reads the `users` table maintained by the auth service.
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn lookup(&self, ids: &[String]) -> Result<HashMap<String, UserSummary>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, username)| (id.clone(), UserSummary::new(id, username)))
            .collect())
    }
}

/// In-memory directory, filled as authenticated callers are seen.
#[derive(Default)]
pub struct StaticUserDirectory {
    users: RwLock<HashMap<String, String>>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn lookup(&self, ids: &[String]) -> Result<HashMap<String, UserSummary>, StoreError> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                users
                    .get(id)
                    .map(|name| (id.clone(), UserSummary::new(id.clone(), name.clone())))
            })
            .collect())
    }

    async fn remember(&self, id: &str, username: &str) {
        self.users
            .write()
            .await
            .insert(id.to_string(), username.to_string());
    }
}
