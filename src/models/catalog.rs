//! Downloaded-track catalog provided by the host music player.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One downloaded track that can be offered for play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEntry {
    pub track_id: String,
    pub local_audio_path: PathBuf,
    pub name: String,
    pub artist: String,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub tracks: Vec<TrackEntry>,
}

impl Catalog {
    /// Reads a JSON array of track entries.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        let tracks: Vec<TrackEntry> = serde_json::from_str(&content)?;
        log::info!("CATALOG: {} tracks from {:?}", tracks.len(), path);
        Ok(Self { tracks })
    }

    pub fn find(&self, track_id: &str) -> Result<&TrackEntry, CatalogError> {
        self.tracks
            .iter()
            .find(|t| t.track_id == track_id)
            .ok_or_else(|| CatalogError::UnknownTrack(track_id.to_string()))
    }
}
