//! SQLite database layer (embedded, no external dependencies)

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::models::{NewRecord, Record, STATUS_ACTIVE};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        // Create parent directory if needed
        if let Some(parent) = std::path::Path::new(database_path).parent() {
            tracing::info!("Creating parent directory: {}", parent.display());
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        // Check if directory is writable
        let parent = std::path::Path::new(database_path)
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Invalid database path: no parent directory"))?;

        let test_file = parent.join(".write_test");
        match tokio::fs::write(&test_file, b"test").await {
            Ok(_) => {
                let _ = tokio::fs::remove_file(&test_file).await;
                tracing::info!("Database directory is writable");
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Database directory is not writable: {}: {}",
                    parent.display(),
                    e
                ));
            }
        }

        tracing::info!("Connecting to SQLite...");

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        tracing::info!("SQLite connection established, running migrations...");

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self { pool })
    }

    /// In-memory database for tests. A single pooled connection keeps the
    /// database alive for the lifetime of the pool.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        use std::str::FromStr;
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        // Records table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_records_title ON records (title)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_records_status ON records (status)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Open a scoped transaction. Commit is explicit; dropping the handle
    /// rolls back everything performed on it.
    pub async fn begin(&self) -> Result<StoreTx<'_>, sqlx::Error> {
        let tx = self.pool.begin().await?;
        Ok(StoreTx { tx })
    }
}

/// One storage session: all reads and writes of a single operation run on
/// the same underlying transaction.
pub struct StoreTx<'a> {
    tx: Transaction<'a, Sqlite>,
}

impl StoreTx<'_> {
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    /// All records, newest first, optionally restricted to one status.
    pub async fn list(&mut self, status: Option<&str>) -> Result<Vec<Record>, sqlx::Error> {
        let records: Vec<Record> = match status {
            Some(status) => {
                sqlx::query_as(
                    r#"
                    SELECT id, title, description, status, created_at, updated_at
                    FROM records WHERE status = ?1
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .bind(status)
                .fetch_all(&mut *self.tx)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, title, description, status, created_at, updated_at
                    FROM records
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .fetch_all(&mut *self.tx)
                .await?
            }
        };

        Ok(records)
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Record>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, title, description, status, created_at, updated_at
            FROM records WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
    }

    /// Id of an active record carrying this exact title, if any. Pass
    /// `exclude_id` to ignore the record currently being updated.
    pub async fn find_active_title(
        &mut self,
        title: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = match exclude_id {
            Some(id) => {
                sqlx::query_as(
                    r#"
                    SELECT id FROM records
                    WHERE title = ?1 AND status = ?2 AND id != ?3
                    "#,
                )
                .bind(title)
                .bind(STATUS_ACTIVE)
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id FROM records
                    WHERE title = ?1 AND status = ?2
                    "#,
                )
                .bind(title)
                .bind(STATUS_ACTIVE)
                .fetch_optional(&mut *self.tx)
                .await?
            }
        };

        Ok(row.map(|(id,)| id))
    }

    /// Insert a new row, assigning id and both timestamps.
    pub async fn insert(&mut self, new: &NewRecord) -> Result<Record, sqlx::Error> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO records (title, description, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&new.title)
        .bind(new.description.as_deref())
        .bind(&new.status)
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        Ok(Record {
            id: result.last_insert_rowid(),
            title: new.title.clone(),
            description: new.description.clone(),
            status: new.status.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Persist a record's mutable fields and refresh its `updated_at`.
    pub async fn update(&mut self, record: &mut Record) -> Result<(), sqlx::Error> {
        record.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE records
            SET title = ?1, description = ?2, status = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(&record.title)
        .bind(record.description.as_deref())
        .bind(&record.status)
        .bind(record.updated_at)
        .bind(record.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Remove a row. Reports whether a row was actually deleted.
    pub async fn delete(&mut self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM records WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
