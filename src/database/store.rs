//! The chart cache: generated charts, best scores and global unlocks.
//!
//! Read failures never surface as errors. A missing, unreadable or corrupt
//! entry is reported as a cache miss so the caller regenerates the chart.

use crate::database::chart_storage::{chart_to_row, row_to_chart};
use crate::database::connection::Database;
use crate::error::StoreError;
use crate::models::chart::ChartData;
use crate::models::progress::GlobalUnlockState;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::runtime::Runtime;

const LEGENDARY_UNLOCK: &str = "legendary";

/// Durable mapping from track id to chart, plus the global unlock flag.
pub trait ChartStore: Send + Sync {
    /// Cached chart for a track; `None` on miss or unreadable entry.
    fn get(&self, track_id: &str) -> Option<ChartData>;

    fn save(&self, chart: &ChartData) -> Result<(), StoreError>;

    /// Stores `score` only when it beats the cached high score. Returns whether it did.
    fn update_score(&self, track_id: &str, score: u32, multiplier: u32) -> Result<bool, StoreError>;

    /// Best score of every cached chart.
    fn high_scores(&self) -> Vec<(String, u32)>;

    fn load_unlocks(&self) -> GlobalUnlockState;

    fn save_unlocks(&self, unlocks: &GlobalUnlockState) -> Result<(), StoreError>;
}

/// SQLite-backed store. Owns a tokio runtime and blocks on each query.
pub struct SqliteChartStore {
    rt: Runtime,
    db: Database,
}

impl SqliteChartStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let rt = Runtime::new()?;
        let db = rt.block_on(Database::new(db_path))?;
        log::info!("DB: Chart cache opened at {:?}", db_path);
        Ok(Self { rt, db })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let rt = Runtime::new()?;
        let db = rt.block_on(Database::in_memory())?;
        Ok(Self { rt, db })
    }
}

impl ChartStore for SqliteChartStore {
    fn get(&self, track_id: &str) -> Option<ChartData> {
        let row = match self.rt.block_on(self.db.get_chart(track_id)) {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("DB: Reading chart {} failed, treating as miss: {}", track_id, e);
                return None;
            }
        };

        match row_to_chart(row) {
            Ok(chart) => Some(chart),
            Err(e) => {
                log::warn!("DB: Cached chart {} is corrupt, regenerating: {}", track_id, e);
                None
            }
        }
    }

    fn save(&self, chart: &ChartData) -> Result<(), StoreError> {
        let row = chart_to_row(chart)?;
        self.rt.block_on(self.db.upsert_chart(&row))?;
        log::info!(
            "DB: Cached chart {} ({} notes)",
            chart.track_id,
            chart.notes.len()
        );
        Ok(())
    }

    fn update_score(&self, track_id: &str, score: u32, multiplier: u32) -> Result<bool, StoreError> {
        let updated = self.rt.block_on(self.db.update_high_score(
            track_id,
            score as i64,
            multiplier as i64,
        ))?;
        if updated {
            log::info!("DB: New high score {} on {}", score, track_id);
        }
        Ok(updated)
    }

    fn high_scores(&self) -> Vec<(String, u32)> {
        match self.rt.block_on(self.db.get_high_scores()) {
            Ok(rows) => rows
                .into_iter()
                .map(|(id, score)| (id, u32::try_from(score).unwrap_or(0)))
                .collect(),
            Err(e) => {
                log::warn!("DB: Reading high scores failed: {}", e);
                Vec::new()
            }
        }
    }

    fn load_unlocks(&self) -> GlobalUnlockState {
        match self.rt.block_on(self.db.get_unlock(LEGENDARY_UNLOCK)) {
            Ok(legendary_unlocked) => GlobalUnlockState { legendary_unlocked },
            Err(e) => {
                log::warn!("DB: Reading unlocks failed: {}", e);
                GlobalUnlockState::default()
            }
        }
    }

    fn save_unlocks(&self, unlocks: &GlobalUnlockState) -> Result<(), StoreError> {
        self.rt
            .block_on(self.db.set_unlock(LEGENDARY_UNLOCK, unlocks.legendary_unlocked))?;
        Ok(())
    }
}

/// Volatile store used when no database is wanted.
#[derive(Default)]
pub struct MemoryChartStore {
    charts: Mutex<HashMap<String, ChartData>>,
    unlocks: Mutex<GlobalUnlockState>,
}

impl MemoryChartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChartStore for MemoryChartStore {
    fn get(&self, track_id: &str) -> Option<ChartData> {
        let charts = self.charts.lock().ok()?;
        charts.get(track_id).cloned()
    }

    fn save(&self, chart: &ChartData) -> Result<(), StoreError> {
        if let Ok(mut charts) = self.charts.lock() {
            charts.insert(chart.track_id.clone(), chart.clone());
        }
        Ok(())
    }

    fn update_score(&self, track_id: &str, score: u32, multiplier: u32) -> Result<bool, StoreError> {
        let Ok(mut charts) = self.charts.lock() else {
            return Ok(false);
        };
        match charts.get_mut(track_id) {
            Some(chart) if score > chart.high_score => {
                chart.high_score = score;
                chart.best_multiplier = multiplier;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn high_scores(&self) -> Vec<(String, u32)> {
        let Ok(charts) = self.charts.lock() else {
            return Vec::new();
        };
        let mut scores: Vec<(String, u32)> = charts
            .values()
            .map(|c| (c.track_id.clone(), c.high_score))
            .collect();
        scores.sort();
        scores
    }

    fn load_unlocks(&self) -> GlobalUnlockState {
        self.unlocks.lock().map(|u| *u).unwrap_or_default()
    }

    fn save_unlocks(&self, unlocks: &GlobalUnlockState) -> Result<(), StoreError> {
        if let Ok(mut stored) = self.unlocks.lock() {
            *stored = *unlocks;
        }
        Ok(())
    }
}
