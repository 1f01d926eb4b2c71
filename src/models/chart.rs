//! Chart data: the note sequence derived from a track.

use crate::models::engine::constants::{
    DOUBLE_POINTS_DURATION_MS, LIGHTNING_DURATION_MS, NOTE_MAGNET_DURATION_MS, NUM_LANES,
};
use serde::{Deserialize, Serialize};

/// Power-up granted by a bonus note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusType {
    /// One random lane is auto-hit for a while.
    LightningLane,
    /// Absorbs the next two misses.
    Shield,
    /// Doubles the effective multiplier for a while.
    DoublePoints,
    /// Jumps straight to the maximum multiplier.
    MultiplierBoost,
    /// Widens the hit windows for a while.
    NoteMagnet,
}

impl BonusType {
    pub const ALL: [BonusType; 5] = [
        BonusType::LightningLane,
        BonusType::Shield,
        BonusType::DoublePoints,
        BonusType::MultiplierBoost,
        BonusType::NoteMagnet,
    ];

    /// How long the effect lasts, `None` for effects without expiry.
    pub fn duration_ms(self) -> Option<i64> {
        match self {
            BonusType::LightningLane => Some(LIGHTNING_DURATION_MS),
            BonusType::DoublePoints => Some(DOUBLE_POINTS_DURATION_MS),
            BonusType::NoteMagnet => Some(NOTE_MAGNET_DURATION_MS),
            BonusType::Shield | BonusType::MultiplierBoost => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BonusType::LightningLane => "Lightning Lane",
            BonusType::Shield => "Shield",
            BonusType::DoublePoints => "Double Points",
            BonusType::MultiplierBoost => "Multiplier Boost",
            BonusType::NoteMagnet => "Note Magnet",
        }
    }
}

/// A single note in a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartNote {
    /// Position in the track.
    pub timestamp_ms: i64,
    /// Lane index, 0 to 4.
    pub lane: u8,
    /// Set for bonus notes only.
    pub bonus: Option<BonusType>,
}

impl ChartNote {
    pub fn tap(timestamp_ms: i64, lane: u8) -> Self {
        Self {
            timestamp_ms,
            lane,
            bonus: None,
        }
    }

    pub fn bonus(timestamp_ms: i64, lane: u8, bonus: BonusType) -> Self {
        Self {
            timestamp_ms,
            lane,
            bonus: Some(bonus),
        }
    }

    #[inline]
    pub fn is_bonus(&self) -> bool {
        self.bonus.is_some()
    }
}

/// A generated chart plus its cached best score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub bpm: f64,
    pub duration_ms: i64,
    /// Sorted by timestamp.
    pub notes: Vec<ChartNote>,
    pub high_score: u32,
    /// Multiplier reached on the run that set `high_score`.
    pub best_multiplier: u32,
}

impl ChartData {
    /// Number of notes that count toward accuracy (bonus notes excluded).
    pub fn playable_note_count(&self) -> usize {
        self.notes.iter().filter(|n| !n.is_bonus()).count()
    }

    pub fn bonus_note_count(&self) -> usize {
        self.notes.len() - self.playable_note_count()
    }

    /// Checks the ordering and lane invariants.
    pub fn is_well_formed(&self) -> bool {
        self.bpm > 0.0
            && self
                .notes
                .windows(2)
                .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms)
            && self.notes.iter().all(|n| (n.lane as usize) < NUM_LANES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(notes: Vec<ChartNote>) -> ChartData {
        ChartData {
            track_id: "t".into(),
            track_name: "Track".into(),
            artist_name: "Artist".into(),
            bpm: 120.0,
            duration_ms: 10_000,
            notes,
            high_score: 0,
            best_multiplier: 1,
        }
    }

    #[test]
    fn test_well_formed_rejects_unsorted_and_bad_lanes() {
        assert!(chart(vec![ChartNote::tap(100, 0), ChartNote::tap(100, 4)]).is_well_formed());
        assert!(!chart(vec![ChartNote::tap(200, 0), ChartNote::tap(100, 1)]).is_well_formed());
        assert!(!chart(vec![ChartNote::tap(100, 5)]).is_well_formed());
    }

    #[test]
    fn test_playable_count_skips_bonus() {
        let c = chart(vec![
            ChartNote::tap(100, 0),
            ChartNote::bonus(500, 2, BonusType::Shield),
            ChartNote::tap(900, 1),
        ]);
        assert_eq!(c.playable_note_count(), 2);
        assert_eq!(c.bonus_note_count(), 1);
    }

    #[test]
    fn test_only_timed_bonuses_expire() {
        assert_eq!(BonusType::LightningLane.duration_ms(), Some(5000));
        assert_eq!(BonusType::DoublePoints.duration_ms(), Some(5000));
        assert_eq!(BonusType::NoteMagnet.duration_ms(), Some(3000));
        assert_eq!(BonusType::Shield.duration_ms(), None);
        assert_eq!(BonusType::MultiplierBoost.duration_ms(), None);
    }
}
