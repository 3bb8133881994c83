// Database connection and pool management
// This module handles SQLite database connections using sqlx

use std::path::Path;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        // Create database file directory if it doesn't exist
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        if let Some(parent) = Path::new(db_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Ensure the database file exists by creating it if necessary
        if !Path::new(db_path).exists() {
            std::fs::File::create(db_path)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_titles_sql = r#"
            CREATE TABLE IF NOT EXISTS titles (
                appid INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            )
        "#;

        let create_samples_sql = r#"
            CREATE TABLE IF NOT EXISTS samples (
                appid INTEGER NOT NULL,
                date TEXT NOT NULL,
                players INTEGER NOT NULL CHECK (players >= 0)
            )
        "#;

        let create_indexes_sql = r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_samples_appid_date ON samples (appid, date);
            CREATE INDEX IF NOT EXISTS idx_samples_date ON samples (date);
        "#;

        sqlx::query(create_titles_sql).execute(&self.pool).await?;
        sqlx::query(create_samples_sql).execute(&self.pool).await?;
        sqlx::query(create_indexes_sql).execute(&self.pool).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test.db");
        let database_url = format!("sqlite:{}", db_path.to_string_lossy());

        let db = DatabaseConnection::new(&database_url, 5).await?;
        assert!(!db.pool().is_closed());
        Ok(())
    }

    #[tokio::test]
    async fn test_database_migration() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test_migration.db");
        let database_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseConnection::new(&database_url, 5).await?;
        db.migrate().await?;

        let result = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('titles', 'samples')",
        )
        .fetch_all(db.pool())
        .await?;
        assert_eq!(result.len(), 2);
        Ok(())
    }
}
