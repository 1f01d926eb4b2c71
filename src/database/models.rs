//! Data structures mirroring the SQLite tables.

use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ChartRow {
    pub track_id: String, // Opaque id from the host catalog
    pub track_name: String,
    pub artist_name: String,
    pub bpm: f64,
    pub duration_ms: i64,
    pub note_count: i64,
    pub notes: Vec<u8>, // bincode + zstd, see chart_storage
    pub high_score: i64,
    pub best_multiplier: i64,
}
