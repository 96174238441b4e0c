use anyhow::{Context, Result};

/// Process settings, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u16>()
            .context("Invalid PORT")?;
        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse::<u32>()
            .context("Invalid DB_MAX_CONNECTIONS")?;

        Ok(Self {
            database_url,
            host,
            port,
            db_max_connections,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
