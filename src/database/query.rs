//! Raw sqlx query helpers for the chart cache.

use crate::database::models::ChartRow;
use sqlx::SqlitePool;

/// Fetches the cached chart row for a track.
pub async fn get_chart(pool: &SqlitePool, track_id: &str) -> Result<Option<ChartRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT track_id, track_name, artist_name, bpm, duration_ms, note_count, notes, high_score, best_multiplier
         FROM chart WHERE track_id = ?1",
    )
    .bind(track_id)
    .fetch_optional(pool)
    .await
}

/// Inserts or replaces the chart of a track.
pub async fn upsert_chart(pool: &SqlitePool, row: &ChartRow) -> Result<(), sqlx::Error> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT track_id FROM chart WHERE track_id = ?1")
            .bind(&row.track_id)
            .fetch_optional(pool)
            .await?;

    match existing {
        Some(_) => {
            sqlx::query(
                "UPDATE chart SET track_name = ?1, artist_name = ?2, bpm = ?3, duration_ms = ?4, note_count = ?5, notes = ?6, high_score = ?7, best_multiplier = ?8 WHERE track_id = ?9",
            )
            .bind(&row.track_name)
            .bind(&row.artist_name)
            .bind(row.bpm)
            .bind(row.duration_ms)
            .bind(row.note_count)
            .bind(&row.notes)
            .bind(row.high_score)
            .bind(row.best_multiplier)
            .bind(&row.track_id)
            .execute(pool)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO chart (track_id, track_name, artist_name, bpm, duration_ms, note_count, notes, high_score, best_multiplier) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&row.track_id)
            .bind(&row.track_name)
            .bind(&row.artist_name)
            .bind(row.bpm)
            .bind(row.duration_ms)
            .bind(row.note_count)
            .bind(&row.notes)
            .bind(row.high_score)
            .bind(row.best_multiplier)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

/// Raises the high score. Returns `false` when the stored score is already as high.
pub async fn update_high_score(
    pool: &SqlitePool,
    track_id: &str,
    score: i64,
    multiplier: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE chart SET high_score = ?1, best_multiplier = ?2 WHERE track_id = ?3 AND high_score < ?1",
    )
    .bind(score)
    .bind(multiplier)
    .bind(track_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// High scores of every cached chart.
pub async fn get_high_scores(pool: &SqlitePool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT track_id, high_score FROM chart ORDER BY track_id")
        .fetch_all(pool)
        .await
}

pub async fn get_unlock(pool: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
    let unlocked: Option<i64> = sqlx::query_scalar("SELECT unlocked FROM unlock WHERE name = ?1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(unlocked.unwrap_or(0) != 0)
}

pub async fn set_unlock(pool: &SqlitePool, name: &str, unlocked: bool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO unlock (name, unlocked) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET unlocked = excluded.unlocked",
    )
    .bind(name)
    .bind(unlocked as i64)
    .execute(pool)
    .await?;
    Ok(())
}
