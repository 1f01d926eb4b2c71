//! End of run: final sweep, grading, high score and unlock bookkeeping.

use super::{JudgmentEngine, JudgmentState};
use crate::database::ChartStore;
use crate::models::progress::GlobalUnlockState;
use crate::models::stats::{Grade, calculate_accuracy};

/// Summary shown on the result screen.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub track_id: String,
    pub score: u32,
    pub max_combo: u32,
    pub combo: u32,
    pub peak_multiplier: u32,
    pub perfect_hits: u32,
    pub good_hits: u32,
    pub missed_notes: u32,
    pub total_notes: u32,
    /// Percentage, 0 to 100.
    pub accuracy: f64,
    pub grade: Grade,
    pub bonuses_collected: u32,
    pub new_high_score: bool,
    /// True when this run granted the legendary unlock for the first time.
    pub legendary_unlocked_now: bool,
}

impl RunResult {
    pub fn is_full_combo(&self) -> bool {
        self.missed_notes == 0 && self.total_notes > 0
    }
}

impl JudgmentEngine {
    /// Closes a run, on natural completion or manual quit.
    ///
    /// Every note still pending counts as missed. A better score is written
    /// through `store`, and a zero-miss run grants the legendary unlock.
    pub fn finish(
        &mut self,
        state: &mut JudgmentState,
        unlocks: &mut GlobalUnlockState,
        store: &dyn ChartStore,
    ) -> RunResult {
        self.sweep_remaining(state);

        let accuracy = calculate_accuracy(state.perfect_hits + state.good_hits, self.total_notes);
        let grade = Grade::from_accuracy(accuracy);

        let new_high_score = state.score > self.chart.high_score;
        if new_high_score {
            self.chart.high_score = state.score;
            self.chart.best_multiplier = state.peak_multiplier;
            if let Err(e) = store.update_score(&self.chart.track_id, state.score, state.peak_multiplier) {
                log::error!("DB: Failed to save high score for {}: {}", self.chart.track_id, e);
            }
        }

        let mut legendary_unlocked_now = false;
        if state.missed_notes == 0 && self.total_notes > 0 && unlocks.grant_legendary() {
            legendary_unlocked_now = true;
            log::info!("LOGIC: Legendary unlocked on {}", self.chart.track_id);
            if let Err(e) = store.save_unlocks(unlocks) {
                log::error!("DB: Failed to save unlocks: {}", e);
            }
        }

        let result = RunResult {
            track_id: self.chart.track_id.clone(),
            score: state.score,
            max_combo: state.max_combo,
            combo: state.combo,
            peak_multiplier: state.peak_multiplier,
            perfect_hits: state.perfect_hits,
            good_hits: state.good_hits,
            missed_notes: state.missed_notes,
            total_notes: self.total_notes,
            accuracy,
            grade,
            bonuses_collected: state.bonuses_collected,
            new_high_score,
            legendary_unlocked_now,
        };
        log::info!(
            "LOGIC: Run over on {}: {} pts, {:.2}% ({})",
            result.track_id,
            result.score,
            result.accuracy,
            result.grade
        );
        result
    }
}
