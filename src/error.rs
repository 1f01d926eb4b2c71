//! Error types shared across the crate.

use thiserror::Error;

/// Failures while turning a track into a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    /// The track is longer than the configured maximum; no audio was read.
    #[error("track lasts {duration_ms} ms, the limit is {max_ms} ms")]
    DurationExceeded { duration_ms: i64, max_ms: i64 },

    /// Decoding or onset analysis failed. Nothing must be cached.
    #[error("chart analysis failed: {0}")]
    AnalysisFailed(String),

    /// The caller abandoned the generation before it finished.
    #[error("chart generation cancelled")]
    Cancelled,
}

/// Failures of the durable chart cache.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode notes: {0}")]
    Encode(String),

    #[error("failed to decode notes: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("track {0} is not in the catalog")]
    UnknownTrack(String),
}
