//! SQLite-backed `Store` for Syndicast

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use crate::error::{DbError, Result};
use crate::store::Store;
use crate::types::{SyndicationOutcome, SyndicationStatus};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes work for SQLite URLs on every platform;
        // mode=rwc creates the file on first use
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        tracing::debug!("Opened database at {}", expanded_path);

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for Database {
    async fn get_option(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM options WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(value)
    }

    async fn set_option(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO options (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn delete_option(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM options WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn get_post_status(&self, post_id: &str) -> Result<Option<SyndicationStatus>> {
        use sqlx::Row;

        let row = sqlx::query(
            r#"
            SELECT outcome, body, recorded_at
            FROM post_status WHERE post_id = ?
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let outcome_str: String = row.get("outcome");
        let outcome =
            SyndicationOutcome::from_db_str(&outcome_str).ok_or_else(|| DbError::CorruptRow {
                table: "post_status",
                reason: format!("unknown outcome '{}' for post {}", outcome_str, post_id),
            })?;

        Ok(Some(SyndicationStatus {
            outcome,
            body: row.get("body"),
            recorded_at: row.get("recorded_at"),
        }))
    }

    async fn set_post_status(&self, post_id: &str, status: &SyndicationStatus) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO post_status (post_id, outcome, body, recorded_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(post_id) DO UPDATE SET
                outcome = excluded.outcome,
                body = excluded.body,
                recorded_at = excluded.recorded_at
            "#,
        )
        .bind(post_id)
        .bind(status.outcome.as_str())
        .bind(&status.body)
        .bind(status.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}
