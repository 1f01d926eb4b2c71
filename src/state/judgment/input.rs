//! Lane tap resolution.

use super::{JudgmentEngine, JudgmentEvent, JudgmentState};
use crate::models::engine::NUM_LANES;
use crate::models::stats::Judgement;

impl JudgmentEngine {
    /// Judges a tap on `lane` at playback position `now_ms`.
    ///
    /// Notes whose window closed before `now_ms` are swept first, so a tap
    /// applied ahead of the next tick sees the chart as of its own time.
    /// Then only the earliest unresolved note of the lane is considered. A tap
    /// that reaches no note is ignored without penalty, as is an out-of-range lane.
    pub fn on_lane_tap(&self, state: &mut JudgmentState, lane: u8, now_ms: i64) -> Vec<JudgmentEvent> {
        let mut events = Vec::new();
        if lane as usize >= NUM_LANES {
            return events;
        }
        self.sweep_misses(state, now_ms, &mut events);

        let window = self.effective_window(state);
        let reach = now_ms as f64 + window.hit_ms;

        let target = (state.next_note_index..self.chart.notes.len())
            .take_while(|&i| self.chart.notes[i].timestamp_ms as f64 <= reach)
            .find(|&i| !state.resolved[i] && self.chart.notes[i].lane == lane);

        let Some(index) = target else {
            log::trace!("LOGIC: Empty tap on lane {} at {} ms", lane, now_ms);
            return events;
        };

        let note = self.chart.notes[index];
        let offset_ms = now_ms - note.timestamp_ms;

        if let Some(bonus) = note.bonus {
            if window.contains(offset_ms) {
                state.resolved[index] = true;
                self.collect_bonus(state, bonus, now_ms, &mut events);
            }
        } else if let Some(judgement) = window.judge(offset_ms) {
            state.resolved[index] = true;
            state.last_offset_ms = Some(offset_ms);
            self.resolve_hit(state, lane, judgement == Judgement::Perfect, &mut events);
        }

        state.advance_cursor();
        events
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::chart;
    use super::*;
    use crate::models::chart::{BonusType, ChartNote};

    #[test]
    fn test_perfect_good_and_out_of_window() {
        let engine = JudgmentEngine::new(chart(vec![
            ChartNote::tap(1_000, 0),
            ChartNote::tap(2_000, 0),
            ChartNote::tap(3_000, 0),
        ]));
        let mut state = engine.new_state();

        assert_eq!(
            engine.on_lane_tap(&mut state, 0, 1_057),
            vec![JudgmentEvent::Perfect { lane: 0 }]
        );
        assert_eq!(state.last_offset_ms, Some(57));
        assert_eq!(
            engine.on_lane_tap(&mut state, 0, 1_858),
            vec![JudgmentEvent::Good { lane: 0 }]
        );
        assert_eq!(state.last_offset_ms, Some(-142));

        assert!(engine.on_lane_tap(&mut state, 0, 2_800).is_empty());
        assert_eq!(state.perfect_hits, 1);
        assert_eq!(state.good_hits, 1);
        assert_eq!(state.next_note_index, 2);
    }

    #[test]
    fn test_tap_never_skips_earlier_note() {
        let engine = JudgmentEngine::new(chart(vec![
            ChartNote::tap(1_000, 1),
            ChartNote::tap(1_100, 1),
        ]));
        let mut state = engine.new_state();

        // Closer to the 1 100 ms note, but the 1 000 ms one is still in reach.
        assert_eq!(
            engine.on_lane_tap(&mut state, 1, 1_090),
            vec![JudgmentEvent::Good { lane: 1 }]
        );
        assert!(state.is_resolved(0));
        assert!(!state.is_resolved(1));
        assert_eq!(state.last_offset_ms, Some(90));
    }

    #[test]
    fn test_tap_before_tick_passes_stale_note() {
        let engine = JudgmentEngine::new(chart(vec![
            ChartNote::tap(1_000, 0),
            ChartNote::tap(1_200, 0),
        ]));
        let mut state = engine.new_state();
        for t in (0..=1_136).step_by(16) {
            engine.tick(&mut state, t);
        }
        assert_eq!(state.missed_notes, 0);

        // The 1 000 ms note closed at 1 143 but no tick has swept it yet.
        assert_eq!(
            engine.on_lane_tap(&mut state, 0, 1_150),
            vec![
                JudgmentEvent::Miss { lane: 0 },
                JudgmentEvent::Perfect { lane: 0 }
            ]
        );
        assert_eq!(state.perfect_hits, 1);
        assert_eq!(state.missed_notes, 1);

        engine.tick(&mut state, 1_152);
        assert_eq!(state.missed_notes, 1);
        assert_eq!(state.next_note_index, 2);
    }

    #[test]
    fn test_tap_only_matches_its_lane() {
        let engine = JudgmentEngine::new(chart(vec![
            ChartNote::tap(1_000, 0),
            ChartNote::tap(1_010, 3),
        ]));
        let mut state = engine.new_state();

        engine.on_lane_tap(&mut state, 3, 1_010);
        assert!(state.is_resolved(1));
        assert!(!state.is_resolved(0));
        assert_eq!(state.next_note_index, 0);

        engine.on_lane_tap(&mut state, 0, 1_000);
        assert_eq!(state.next_note_index, 2);
    }

    #[test]
    fn test_out_of_range_lane_is_ignored() {
        let engine = JudgmentEngine::new(chart(vec![ChartNote::tap(1_000, 4)]));
        let mut state = engine.new_state();
        assert!(engine.on_lane_tap(&mut state, 5, 1_000).is_empty());
        assert!(engine.on_lane_tap(&mut state, 200, 1_000).is_empty());
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_bonus_note_is_collected_not_scored() {
        let engine = JudgmentEngine::new(chart(vec![
            ChartNote::bonus(1_000, 2, BonusType::Shield),
            ChartNote::tap(2_000, 2),
        ]));
        let mut state = engine.new_state();

        let events = engine.on_lane_tap(&mut state, 2, 1_100);
        assert_eq!(
            events,
            vec![JudgmentEvent::BonusCollected {
                bonus: BonusType::Shield
            }]
        );
        assert_eq!(state.score, 0);
        assert_eq!(state.combo, 0);
        assert_eq!(state.bonuses_collected, 1);
        assert_eq!(state.next_note_index, 1);
    }

    #[test]
    fn test_note_magnet_widens_windows() {
        let engine = JudgmentEngine::new(chart(vec![
            ChartNote::bonus(1_000, 0, BonusType::NoteMagnet),
            ChartNote::tap(2_000, 1),
            ChartNote::tap(3_000, 1),
        ]));
        let mut state = engine.new_state();
        engine.on_lane_tap(&mut state, 0, 1_000);
        assert!(state.note_magnet_active);

        // 100 ms off: good normally, perfect under the magnet (114.4 ms).
        engine.on_lane_tap(&mut state, 1, 2_100);
        assert_eq!(state.perfect_hits, 1);

        // 200 ms early: outside 143 ms, inside 214.5 ms.
        engine.on_lane_tap(&mut state, 1, 2_800);
        assert_eq!(state.good_hits, 1);
    }
}
