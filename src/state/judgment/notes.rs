//! Per-frame processing: bonus expiry, lightning auto-hits and the miss sweep.

use super::{JudgmentEngine, JudgmentEvent, JudgmentState};
use crate::models::engine::LIGHTNING_WINDOW_MS;
use crate::models::stats::Judgement;

impl JudgmentEngine {
    /// Reconciles `state` with the playback position `now_ms`.
    ///
    /// Only absolute time is used, so a late or skipped tick converges to the
    /// same state as a steady stream of ticks.
    pub fn tick(&self, state: &mut JudgmentState, now_ms: i64) -> Vec<JudgmentEvent> {
        let mut events = Vec::new();
        self.expire_bonus(state, now_ms, &mut events);
        self.lightning_hits(state, now_ms, &mut events);
        self.sweep_misses(state, now_ms, &mut events);
        events
    }

    fn expire_bonus(&self, state: &mut JudgmentState, now_ms: i64, events: &mut Vec<JudgmentEvent>) {
        let Some(active) = state.active_bonus else {
            return;
        };
        if now_ms < active.expires_at_ms {
            return;
        }
        log::debug!("LOGIC: {} expired at {} ms", active.kind.label(), now_ms);
        state.clear_timed_effects();
        events.push(JudgmentEvent::BonusExpired { bonus: active.kind });
    }

    fn lightning_hits(&self, state: &mut JudgmentState, now_ms: i64, events: &mut Vec<JudgmentEvent>) {
        let Some(lane) = state.lightning_lane else {
            return;
        };

        for i in state.next_note_index..self.chart.notes.len() {
            let note = self.chart.notes[i];
            if note.timestamp_ms > now_ms + LIGHTNING_WINDOW_MS {
                break;
            }
            if state.resolved[i] || note.is_bonus() || note.lane != lane {
                continue;
            }
            if (note.timestamp_ms - now_ms).abs() <= LIGHTNING_WINDOW_MS {
                state.resolved[i] = true;
                events.push(JudgmentEvent::LightningHit { lane });
                self.resolve_hit(state, lane, true, events);
            }
        }
        state.advance_cursor();
    }

    /// Resolves the notes whose (possibly magnet-widened) window closed before `now_ms`.
    pub(super) fn sweep_misses(
        &self,
        state: &mut JudgmentState,
        now_ms: i64,
        events: &mut Vec<JudgmentEvent>,
    ) {
        let deadline = now_ms as f64 - self.effective_window(state).hit_ms;

        while state.next_note_index < self.chart.notes.len() {
            let i = state.next_note_index;
            if state.resolved[i] {
                state.next_note_index += 1;
                continue;
            }

            let note = self.chart.notes[i];
            if (note.timestamp_ms as f64) >= deadline {
                break;
            }

            state.resolved[i] = true;
            state.next_note_index += 1;
            if note.is_bonus() {
                log::trace!("LOGIC: Bonus note at {} ms passed", note.timestamp_ms);
            } else {
                self.miss_note(state, note.lane, events);
            }
        }
    }

    /// Resolves every note still pending as missed. Shields do not apply.
    pub(crate) fn sweep_remaining(&self, state: &mut JudgmentState) {
        let mut swept = 0u32;
        for i in state.next_note_index..self.chart.notes.len() {
            if state.resolved[i] {
                continue;
            }
            state.resolved[i] = true;
            if !self.chart.notes[i].is_bonus() {
                swept += 1;
            }
        }
        state.next_note_index = self.chart.notes.len();

        if swept > 0 {
            state.missed_notes += swept;
            state.combo = 0;
            state.multiplier = 1;
            state.last_judgement = Some(Judgement::Miss);
            log::debug!("LOGIC: {} unplayed notes counted as missed", swept);
        }
    }
}

impl JudgmentState {
    pub(super) fn clear_timed_effects(&mut self) {
        self.active_bonus = None;
        self.lightning_lane = None;
        self.double_points_active = false;
        self.note_magnet_active = false;
    }
}
