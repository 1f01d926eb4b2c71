use crate::database::models::ChartRow;
use crate::database::query;
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions};
use std::path::{Path, PathBuf};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens or creates the database file.
    pub async fn new(db_path: &Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            return Err(sqlx::Error::Io(std::io::Error::other(format!(
                "Unable to create parent directory: {}",
                e
            ))));
        }

        let absolute_path = if db_path.is_absolute() {
            db_path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(db_path)
        };

        let options = SqliteConnectOptions::new()
            .filename(&absolute_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database. A single connection keeps every query on the same store.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        let db = Database { pool };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chart (
                track_id TEXT PRIMARY KEY,
                track_name TEXT NOT NULL,
                artist_name TEXT NOT NULL,
                bpm REAL NOT NULL,
                duration_ms INTEGER NOT NULL,
                note_count INTEGER NOT NULL,
                notes BLOB NOT NULL,
                high_score INTEGER NOT NULL DEFAULT 0,
                best_multiplier INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS unlock (
                name TEXT PRIMARY KEY,
                unlocked INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_chart(&self, track_id: &str) -> Result<Option<ChartRow>, sqlx::Error> {
        query::get_chart(&self.pool, track_id).await
    }

    pub async fn upsert_chart(&self, row: &ChartRow) -> Result<(), sqlx::Error> {
        query::upsert_chart(&self.pool, row).await
    }

    pub async fn update_high_score(
        &self,
        track_id: &str,
        score: i64,
        multiplier: i64,
    ) -> Result<bool, sqlx::Error> {
        query::update_high_score(&self.pool, track_id, score, multiplier).await
    }

    pub async fn get_high_scores(&self) -> Result<Vec<(String, i64)>, sqlx::Error> {
        query::get_high_scores(&self.pool).await
    }

    pub async fn get_unlock(&self, name: &str) -> Result<bool, sqlx::Error> {
        query::get_unlock(&self.pool, name).await
    }

    pub async fn set_unlock(&self, name: &str, unlocked: bool) -> Result<(), sqlx::Error> {
        query::set_unlock(&self.pool, name, unlocked).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(track_id: &str) -> ChartRow {
        ChartRow {
            track_id: track_id.to_string(),
            track_name: "Song".into(),
            artist_name: "Band".into(),
            bpm: 120.0,
            duration_ms: 30_000,
            note_count: 0,
            notes: Vec::new(),
            high_score: 0,
            best_multiplier: 1,
        }
    }

    #[tokio::test]
    async fn test_upsert_then_read() {
        let db = Database::in_memory().await.unwrap();
        db.upsert_chart(&row("a")).await.unwrap();

        let mut changed = row("a");
        changed.bpm = 174.0;
        db.upsert_chart(&changed).await.unwrap();

        let stored = db.get_chart("a").await.unwrap().unwrap();
        assert_eq!(stored.bpm, 174.0);
        assert!(db.get_chart("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_high_score_needs_a_better_score() {
        let db = Database::in_memory().await.unwrap();
        db.upsert_chart(&row("a")).await.unwrap();

        assert!(db.update_high_score("a", 300, 2).await.unwrap());
        assert!(!db.update_high_score("a", 200, 4).await.unwrap());
        assert!(!db.update_high_score("missing", 900, 4).await.unwrap());
        assert_eq!(db.get_high_scores().await.unwrap(), vec![("a".to_string(), 300)]);
    }

    #[tokio::test]
    async fn test_unlock_flag() {
        let db = Database::in_memory().await.unwrap();
        assert!(!db.get_unlock("legendary").await.unwrap());
        db.set_unlock("legendary", true).await.unwrap();
        db.set_unlock("legendary", true).await.unwrap();
        assert!(db.get_unlock("legendary").await.unwrap());
    }
}
