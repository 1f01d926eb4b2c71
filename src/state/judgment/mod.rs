//! Real-time judgment of lane taps against a chart.
//!
//! The engine is immutable during a run and only holds the chart and its
//! derived windows. Everything that changes lives in [`JudgmentState`], which
//! the caller owns and passes into [`JudgmentEngine::tick`] and
//! [`JudgmentEngine::on_lane_tap`]. Time is always the playback position in
//! milliseconds, never wall-clock time.

mod input;
mod notes;
mod result;
mod scoring;

pub use result::RunResult;

use crate::logic::generator::track_seed;
use crate::models::chart::{BonusType, ChartData};
use crate::models::engine::HitWindow;
use crate::models::stats::{Judgement, calculate_accuracy};
use crate::shared::snapshot::JudgmentSnapshot;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// How far ahead of the playhead the snapshot lists notes.
const SNAPSHOT_LOOKAHEAD_MS: i64 = 2_000;

/// Timed power-up currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveBonus {
    pub kind: BonusType,
    pub expires_at_ms: i64,
}

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgmentEvent {
    Perfect { lane: u8 },
    Good { lane: u8 },
    Miss { lane: u8 },
    /// A miss absorbed by a shield charge.
    Shielded { lane: u8 },
    BonusCollected { bonus: BonusType },
    BonusExpired { bonus: BonusType },
    /// Celebration at combo 50 and 100.
    Milestone { combo: u32 },
    MultiplierUp { multiplier: u32 },
    /// A note auto-hit by the lightning lane.
    LightningHit { lane: u8 },
}

/// Mutable state of one run. Reset at every session start.
#[derive(Debug, Clone)]
pub struct JudgmentState {
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    /// 1 to 4.
    pub multiplier: u32,
    /// Highest multiplier reached during the run.
    pub peak_multiplier: u32,
    pub perfect_hits: u32,
    pub good_hits: u32,
    pub missed_notes: u32,

    /// Index of the first note that may still be unresolved. Only moves forward.
    pub next_note_index: usize,

    pub active_bonus: Option<ActiveBonus>,
    pub shield_charges: u32,
    pub lightning_lane: Option<u8>,
    pub double_points_active: bool,
    pub note_magnet_active: bool,
    pub bonuses_collected: u32,

    pub last_judgement: Option<Judgement>,
    /// Tap time minus note time of the last hit (positive when late).
    pub last_offset_ms: Option<i64>,

    resolved: Vec<bool>,
    rng: StdRng,
}

impl JudgmentState {
    fn new(note_count: usize, seed: u64) -> Self {
        Self {
            score: 0,
            combo: 0,
            max_combo: 0,
            multiplier: 1,
            peak_multiplier: 1,
            perfect_hits: 0,
            good_hits: 0,
            missed_notes: 0,
            next_note_index: 0,
            active_bonus: None,
            shield_charges: 0,
            lightning_lane: None,
            double_points_active: false,
            note_magnet_active: false,
            bonuses_collected: 0,
            last_judgement: None,
            last_offset_ms: None,
            resolved: vec![false; note_count],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// When the active bonus runs out, if any.
    pub fn bonus_expiry_ms(&self) -> Option<i64> {
        self.active_bonus.map(|b| b.expires_at_ms)
    }

    pub fn is_resolved(&self, index: usize) -> bool {
        self.resolved.get(index).copied().unwrap_or(true)
    }

    /// Notes judged so far, bonus notes excluded.
    pub fn judged_notes(&self) -> u32 {
        self.perfect_hits + self.good_hits + self.missed_notes
    }

    /// Moves the cursor past every resolved note at its head.
    fn advance_cursor(&mut self) {
        while self.next_note_index < self.resolved.len() && self.resolved[self.next_note_index] {
            self.next_note_index += 1;
        }
    }
}

/// Judges one chart. Windows are derived from the chart's BPM on construction.
#[derive(Debug, Clone)]
pub struct JudgmentEngine {
    chart: ChartData,
    hit_window: HitWindow,
    total_notes: u32,
    seed: u64,
}

impl JudgmentEngine {
    pub fn new(chart: ChartData) -> Self {
        let hit_window = HitWindow::from_bpm(chart.bpm);
        let total_notes = chart.playable_note_count() as u32;
        let seed = track_seed(&chart.track_id);
        log::info!(
            "LOGIC: Chart {} loaded ({} notes, hit {} ms, perfect {} ms)",
            chart.track_id,
            total_notes,
            hit_window.hit_ms,
            hit_window.perfect_ms
        );
        Self {
            chart,
            hit_window,
            total_notes,
            seed,
        }
    }

    /// Fresh state for a new run of this chart.
    pub fn new_state(&self) -> JudgmentState {
        JudgmentState::new(self.chart.notes.len(), self.seed)
    }

    pub fn chart(&self) -> &ChartData {
        &self.chart
    }

    pub fn hit_window(&self) -> HitWindow {
        self.hit_window
    }

    /// Windows in force for `state`, widened while a note magnet runs.
    pub fn effective_window(&self, state: &JudgmentState) -> HitWindow {
        if state.note_magnet_active {
            self.hit_window.with_magnet()
        } else {
            self.hit_window
        }
    }

    /// Notes that count toward accuracy.
    pub fn total_notes(&self) -> u32 {
        self.total_notes
    }

    /// Read-only view for the presentation layer.
    pub fn snapshot(
        &self,
        state: &JudgmentState,
        position_ms: i64,
        lane_bands: [f32; 5],
    ) -> JudgmentSnapshot {
        let horizon = position_ms + SNAPSHOT_LOOKAHEAD_MS;
        let upcoming = self
            .chart
            .notes
            .iter()
            .enumerate()
            .skip(state.next_note_index)
            .take_while(|(_, n)| n.timestamp_ms <= horizon)
            .filter(|(i, _)| !state.is_resolved(*i))
            .map(|(_, n)| *n)
            .collect();

        JudgmentSnapshot {
            position_ms,
            score: state.score,
            combo: state.combo,
            max_combo: state.max_combo,
            multiplier: state.multiplier,
            perfect_hits: state.perfect_hits,
            good_hits: state.good_hits,
            missed_notes: state.missed_notes,
            accuracy: calculate_accuracy(state.perfect_hits + state.good_hits, state.judged_notes()),
            shield_charges: state.shield_charges,
            active_bonus: state
                .active_bonus
                .map(|b| (b.kind, (b.expires_at_ms - position_ms).max(0))),
            lightning_lane: state.lightning_lane,
            bonuses_collected: state.bonuses_collected,
            last_judgement: state.last_judgement,
            last_offset_ms: state.last_offset_ms,
            upcoming,
            lane_bands,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::chart::ChartNote;

    /// 120 BPM: hit window 143 ms, perfect window 57 ms.
    pub(crate) fn chart(notes: Vec<ChartNote>) -> ChartData {
        ChartData {
            track_id: "test-track".into(),
            track_name: "Test".into(),
            artist_name: "Tester".into(),
            bpm: 120.0,
            duration_ms: 60_000,
            notes,
            high_score: 0,
            best_multiplier: 1,
        }
    }

    #[test]
    fn test_new_state_is_reset() {
        let engine = JudgmentEngine::new(chart(vec![ChartNote::tap(1_000, 0)]));
        let state = engine.new_state();
        assert_eq!(state.score, 0);
        assert_eq!(state.multiplier, 1);
        assert_eq!(state.next_note_index, 0);
        assert!(state.active_bonus.is_none());
        assert!(!state.is_resolved(0));
        assert!(state.is_resolved(1));
    }

    #[test]
    fn test_total_notes_excludes_bonuses() {
        let engine = JudgmentEngine::new(chart(vec![
            ChartNote::tap(1_000, 0),
            ChartNote::bonus(1_500, 1, BonusType::Shield),
            ChartNote::tap(2_000, 2),
        ]));
        assert_eq!(engine.total_notes(), 2);
        assert_eq!(engine.hit_window().hit_ms, 143.0);
    }

    #[test]
    fn test_snapshot_lists_upcoming_notes() {
        let engine = JudgmentEngine::new(chart(vec![
            ChartNote::tap(1_000, 0),
            ChartNote::tap(2_500, 1),
            ChartNote::tap(5_000, 2),
        ]));
        let mut state = engine.new_state();
        engine.on_lane_tap(&mut state, 0, 1_000);

        let snap = engine.snapshot(&state, 1_000, [0.5; 5]);
        assert_eq!(snap.upcoming, vec![ChartNote::tap(2_500, 1)]);
        assert_eq!(snap.score, 50);
        assert_eq!(snap.accuracy, 100.0);
        assert_eq!(snap.lane_bands, [0.5; 5]);
    }
}
