//! SQLite-backed title/sample store

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::domain::constants::sync::CORRUPT_SAMPLE_DATE;
use crate::domain::repositories::TitleStore;
use crate::domain::title::{Sample, Title};

/// Rows per bulk INSERT statement, comfortably under SQLite's
/// bind-variable limit at three binds per row.
const SAMPLE_INSERT_CHUNK: usize = 300;

#[derive(Clone)]
pub struct SqliteTitleStore {
    pool: Arc<SqlitePool>,
}

impl SqliteTitleStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TitleStore for SqliteTitleStore {
    async fn all_titles(&self) -> Result<Vec<Title>> {
        let rows = sqlx::query("SELECT appid, name FROM titles ORDER BY appid")
            .fetch_all(&*self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Title {
                    appid: row.try_get("appid")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn find_title(&self, appid: i64) -> Result<Option<Title>> {
        let row = sqlx::query("SELECT appid, name FROM titles WHERE appid = ?")
            .bind(appid)
            .fetch_optional(&*self.pool)
            .await?;

        row.map(|row| {
            Ok(Title {
                appid: row.try_get("appid")?,
                name: row.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn append_titles(&self, titles: &[Title]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for title in titles {
            // OR IGNORE keeps the one-row-per-appid invariant if the remote
            // lists an id twice across pages.
            sqlx::query("INSERT OR IGNORE INTO titles (appid, name) VALUES (?, ?)")
                .bind(title.appid)
                .bind(&title.name)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_all_samples(&self, samples: &[Sample]) -> Result<()> {
        // Delete and insert share one transaction; a failure mid-replace
        // rolls back to the previous sample set.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM samples").execute(&mut *tx).await?;

        for chunk in samples.chunks(SAMPLE_INSERT_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO samples (appid, date, players) ");
            builder.push_values(chunk, |mut row, sample| {
                row.push_bind(sample.appid)
                    .push_bind(sample.date)
                    .push_bind(sample.players);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn max_sample_date(&self) -> Result<Option<NaiveDate>> {
        let max = sqlx::query_scalar::<_, Option<NaiveDate>>(
            "SELECT max(date) FROM samples WHERE date != ?",
        )
        .bind(CORRUPT_SAMPLE_DATE)
        .fetch_one(&*self.pool)
        .await?;
        Ok(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::infrastructure::database_connection::DatabaseConnection;

    async fn store(dir: &tempfile::TempDir) -> SqliteTitleStore {
        let db_path = dir.path().join("store.db");
        let url = format!("sqlite:{}", db_path.display());
        let db = DatabaseConnection::new(&url, 5).await.unwrap();
        db.migrate().await.unwrap();
        SqliteTitleStore::new(Arc::new(db.pool().clone()))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample(appid: i64, date_: NaiveDate, players: i64) -> Sample {
        Sample {
            appid,
            date: date_,
            players,
        }
    }

    #[tokio::test]
    async fn append_is_deduplicated_by_appid() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        store
            .append_titles(&[Title::new(10, "Alpha"), Title::new(11, "Beta")])
            .await
            .unwrap();
        store
            .append_titles(&[Title::new(10, "Alpha again"), Title::new(12, "Gamma")])
            .await
            .unwrap();

        let titles = store.all_titles().await.unwrap();
        assert_eq!(titles.len(), 3);
        // The first write of an id wins; re-listing never mutates a title.
        assert_eq!(titles[0], Title::new(10, "Alpha"));
    }

    #[tokio::test]
    async fn find_title_returns_only_matching_rows() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;
        store
            .append_titles(&[Title::new(10, "Alpha")])
            .await
            .unwrap();

        assert_eq!(
            store.find_title(10).await.unwrap(),
            Some(Title::new(10, "Alpha"))
        );
        assert_eq!(store.find_title(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_discards_the_previous_sample_set() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        store
            .replace_all_samples(&[
                sample(10, date(2024, 5, 1), 7),
                sample(10, date(2024, 5, 2), 9),
            ])
            .await
            .unwrap();
        store
            .replace_all_samples(&[sample(11, date(2024, 6, 1), 3)])
            .await
            .unwrap();

        let max = store.max_sample_date().await.unwrap();
        assert_eq!(max, Some(date(2024, 6, 1)));

        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM samples")
            .fetch_one(&*store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn replace_survives_large_batches() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let start = date(2020, 1, 1);
        let samples: Vec<Sample> = (0..1_000i64)
            .map(|i| sample(10, start + chrono::Duration::days(i), i + 1))
            .collect();
        store.replace_all_samples(&samples).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM samples")
            .fetch_one(&*store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1_000);
    }

    #[tokio::test]
    async fn max_sample_date_is_none_on_empty_store() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;
        assert_eq!(store.max_sample_date().await.unwrap(), None);
    }

    #[tokio::test]
    async fn max_sample_date_ignores_the_corrupted_day() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        store
            .replace_all_samples(&[
                sample(10, date(2019, 7, 20), 4),
                // The corrupted crawl day is newer but must not win.
                sample(10, date(2019, 7, 24), 40_000),
            ])
            .await
            .unwrap();

        assert_eq!(
            store.max_sample_date().await.unwrap(),
            Some(date(2019, 7, 20))
        );
    }
}
