//! SQLite connection pool bootstrap.

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use thiserror::Error;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to ping database: {0}")]
    Ping(#[source] sqlx::Error),

    #[error("failed to initialize schema: {0}")]
    Schema(#[source] sqlx::Error),
}

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS blog_posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        tags TEXT NOT NULL,
        published_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_blog_posts_published_at ON blog_posts(published_at)",
];

/// Handle to the shared connection pool.
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
}

impl SqliteDb {
    /// Open the pool, apply pragmas, verify connectivity and create the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(timeout);

        if config.wal_mode {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .pragma("cache_size", "1000") // 1MB cache
                .pragma("temp_store", "memory");
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_open_conns)
            // sqlx has no idle cap: keep `max_idle_conns` warm and close
            // anything above that once it sits idle past the timeout.
            .min_connections(config.max_idle_conns)
            .idle_timeout(timeout)
            .max_lifetime(timeout)
            .connect_with(options)
            .await
            .map_err(DatabaseError::Connect)?;

        let db = Self { pool };
        db.ping().await?;
        db.init_schema().await?;

        tracing::info!(
            path = %config.path,
            wal_mode = config.wal_mode,
            max_connections = config.max_open_conns,
            "Database ready"
        );
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(DatabaseError::Schema)?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(DatabaseError::Ping)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
