//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::Database;

impl Database {
    /// Create a new database connection
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        // Connect to database with foreign key enforcement and WAL mode
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let db = Self { pool };

        // Run migrations
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        // Create schema version table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        // Check current version
        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?
                .flatten();

        let current_version = current_version.unwrap_or(0);

        // Apply migrations
        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }
        if current_version < 2 {
            Self::migrate_v2(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: Create initial schema
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        let statements = [
            r#"
            CREATE TABLE seen_videos (
                video_id TEXT PRIMARY KEY,
                last_seen_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE videos (
                video_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                channel_id TEXT NOT NULL,
                channel_title TEXT,
                published_at TEXT,
                view_count INTEGER NOT NULL DEFAULT 0,
                like_count INTEGER NOT NULL DEFAULT 0,
                comment_count INTEGER NOT NULL DEFAULT 0,
                duration TEXT,
                tags TEXT,
                category TEXT,
                detected_language TEXT,
                relevance_score REAL NOT NULL DEFAULT 0,
                quality_score REAL NOT NULL DEFAULT 0,
                engagement_score REAL NOT NULL DEFAULT 0,
                spam_score REAL NOT NULL DEFAULT 0,
                composite_score REAL NOT NULL DEFAULT 0,
                is_relevant INTEGER NOT NULL DEFAULT 0,
                search_query TEXT,
                video_url TEXT,
                extracted_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE extraction_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT UNIQUE NOT NULL,
                mode TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                started_at INTEGER NOT NULL,
                ended_at INTEGER,
                total_strategies INTEGER NOT NULL DEFAULT 0,
                completed_strategies INTEGER NOT NULL DEFAULT 0,
                items_extracted INTEGER NOT NULL DEFAULT 0,
                relevant_items INTEGER NOT NULL DEFAULT 0,
                error_count INTEGER NOT NULL DEFAULT 0,
                configuration TEXT
            )
            "#,
            "CREATE INDEX idx_videos_extracted_at ON videos(extracted_at)",
            "CREATE INDEX idx_videos_relevant ON videos(is_relevant)",
            "CREATE INDEX idx_videos_channel ON videos(channel_id)",
            "CREATE INDEX idx_sessions_status ON extraction_sessions(status)",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&mut *conn).await.map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Migration v1 failed: {}",
                    e
                )))
            })?;
        }

        Self::record_version(conn, 1).await
    }

    /// Migration v2: Request usage log
    async fn migrate_v2(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v2");

        let statements = [
            r#"
            CREATE TABLE api_usage_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                credential_hash TEXT NOT NULL,
                request_kind TEXT NOT NULL,
                success INTEGER NOT NULL,
                quota_error INTEGER NOT NULL DEFAULT 0,
                occurred_at INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX idx_usage_occurred_at ON api_usage_log(occurred_at)",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&mut *conn).await.map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Migration v2 failed: {}",
                    e
                )))
            })?;
        }

        Self::record_version(conn, 2).await
    }

    async fn record_version(conn: &mut SqliteConnection, version: i64) -> Result<()> {
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to record schema version {}: {}",
                    version, e
                )))
            })?;
        Ok(())
    }

    /// Close the connection pool, flushing WAL state.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
